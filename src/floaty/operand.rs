//--> Imports <--

use crate::text;

use super::opcode::IsaError;

//--> Constants <--

pub const PLACEHOLDERS: [char; 5] = ['n', 'w', 'x', 'y', 'z'];

// Unsigned byte range plus a small signed allowance.
pub const IMMEDIATE_MIN: i64 = -127;
pub const IMMEDIATE_MAX: i64 = 255;

//--> Structs <--

// One classified token of a mnemonic format, e.g. `Nx` or `[Iy+Bz+n]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Operand {
	pub kind: OperandType,
	// Placeholder letter the operand's value (or register digit) is packed into.
	pub binding: Option<char>,
	// Secondary register of `[Iy+Bz+n]`.
	pub index_binding: Option<char>,
}

// An argument of the shape `[I<hex>]`, `[I<hex>+<offset>]`, `[I<hex>+B<hex>]` or `[I<hex>+B<hex>+<offset>]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Indexed<'a> {
	pub ireg: u8,
	pub breg: Option<u8>,
	pub offset: Option<&'a str>,
}

//--> Enums <--

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperandType {
	ByteImmediate,
	Address,
	IndirectAddr,
	NReg,
	BReg,
	IReg,
	BIndirectReg,
	IIndirectReg,
	StackPointer,
	IndirectIReg,
	IndirectIRegPlusN,
	IndirectIRegPlusBRegPlusN,
	SoundTimer,
	DelayTimer,
}

//--> Functions <--

pub fn is_placeholder(c: char) -> bool { PLACEHOLDERS.contains(&c) }

impl Operand {
	pub fn classify(token: &str) -> Result<Operand, IsaError> {
		let count = |c: char| token.chars().filter(|&t| t == c).count();

		if count('[') != count(']') || count('(') != count(')') {
			return Err(IsaError::Unbalanced(String::from(token)));
		}

		let chars = token.chars().collect::<Vec<char>>();
		let letter = |i: usize| chars.get(i).copied().filter(|&c| is_placeholder(c));

		let (kind, binding, index_binding) = match token {
			_ if chars.len() == 1 && letter(0).is_some() => (OperandType::ByteImmediate, letter(0), None),
			"addr" => (OperandType::Address, None, None),
			"[addr]" => (OperandType::IndirectAddr, None, None),
			"ST" => (OperandType::SoundTimer, None, None),
			"DT" => (OperandType::DelayTimer, None, None),
			"SP" => (OperandType::StackPointer, None, None),
			_ if chars.len() == 5 && token.starts_with("B(N") && token.ends_with(')') && letter(3).is_some() => {
				(OperandType::BIndirectReg, letter(3), None)
			},
			_ if chars.len() == 5 && token.starts_with("I(N") && token.ends_with(')') && letter(3).is_some() => {
				(OperandType::IIndirectReg, letter(3), None)
			},
			_ if chars.len() == 6 && token.starts_with("[I") && token.ends_with("+n]") && letter(2).is_some() => {
				(OperandType::IndirectIRegPlusN, letter(2), None)
			},
			_ if chars.len() == 9 && token.starts_with("[I") && chars[3] == '+' && chars[4] == 'B' && token.ends_with("+n]")
				&& letter(2).is_some() && letter(5).is_some() => {
				(OperandType::IndirectIRegPlusBRegPlusN, letter(2), letter(5))
			},
			_ if chars.len() == 4 && token.starts_with("[I") && token.ends_with(']') && letter(2).is_some() => {
				(OperandType::IndirectIReg, letter(2), None)
			},
			_ if chars.len() == 2 && letter(1).is_some() => match chars[0] {
				'N' => (OperandType::NReg, letter(1), None),
				'B' => (OperandType::BReg, letter(1), None),
				'I' => (OperandType::IReg, letter(1), None),
				_ => return Err(IsaError::UnknownOperand(String::from(token)))
			},
			_ => return Err(IsaError::UnknownOperand(String::from(token)))
		};

		Ok(Operand { kind, binding, index_binding })
	}

	// Every placeholder letter this operand needs from the opcode pattern.
	pub fn letters(&self) -> Vec<char> {
		let mut letters = self.binding.into_iter().chain(self.index_binding).collect::<Vec<char>>();

		if let OperandType::IndirectIRegPlusN | OperandType::IndirectIRegPlusBRegPlusN = self.kind {
			letters.push('n');
		}

		letters
	}
}

impl OperandType {
	// Syntax check of one source argument. Values are range checked here only for immediates,
	// indexed offsets are checked when encoding.
	pub fn accepts(self, arg: &str) -> bool {
		match self {
			OperandType::ByteImmediate => text::parse_number(arg).map_or(false, |v| (IMMEDIATE_MIN..=IMMEDIATE_MAX).contains(&v)),
			OperandType::Address => is_address(arg),
			OperandType::IndirectAddr => bracketed(arg).map_or(false, is_address),
			OperandType::NReg => register_digit(arg, 'N').is_some(),
			OperandType::BReg => register_digit(arg, 'B').is_some(),
			OperandType::IReg => register_digit(arg, 'I').is_some(),
			OperandType::BIndirectReg => indirect_register_digit(arg, 'B').is_some(),
			OperandType::IIndirectReg => indirect_register_digit(arg, 'I').is_some(),
			OperandType::StackPointer => arg == "SP",
			OperandType::SoundTimer => arg == "ST",
			OperandType::DelayTimer => arg == "DT",
			OperandType::IndirectIReg => indexed(arg).map_or(false, |ix| ix.breg.is_none() && ix.offset.is_none()),
			OperandType::IndirectIRegPlusN => indexed(arg).map_or(false, |ix| ix.breg.is_none()),
			OperandType::IndirectIRegPlusBRegPlusN => indexed(arg).map_or(false, |ix| ix.breg.is_some()),
		}
	}
}

pub fn is_address(arg: &str) -> bool {
	text::is_number(arg) || text::is_identifier(arg)
}

pub fn bracketed(arg: &str) -> Option<&str> {
	arg.strip_prefix('[')?.strip_suffix(']').filter(|inner| !inner.is_empty())
}

// `N3` -> 3 when the class letter matches.
pub fn register_digit(arg: &str, class: char) -> Option<u8> {
	let mut chars = arg.chars();

	if chars.next()? != class { return None }

	let digit = text::hex_digit(chars.next()?)?;

	if chars.next().is_some() { None } else { Some(digit) }
}

// `B(N3)` -> 3 when the class letter matches.
pub fn indirect_register_digit(arg: &str, class: char) -> Option<u8> {
	let mut chars = arg.strip_suffix(')')?.chars();

	if chars.next()? != class || chars.next()? != '(' || chars.next()? != 'N' { return None }

	let digit = text::hex_digit(chars.next()?)?;

	if chars.next().is_some() { None } else { Some(digit) }
}

pub fn indexed(arg: &str) -> Option<Indexed> {
	let inner = bracketed(arg)?.strip_prefix('I')?;
	let mut chars = inner.chars();
	let ireg = text::hex_digit(chars.next()?)?;
	let rest = chars.as_str();

	if rest.is_empty() {
		return Some(Indexed { ireg, breg: None, offset: None });
	}

	let rest = rest.strip_prefix('+')?;
	let mut chars = rest.chars();

	let breg = match (chars.next(), chars.next(), chars.clone().next()) {
		(Some('B'), Some(d), None) | (Some('B'), Some(d), Some('+')) => text::hex_digit(d),
		_ => None,
	};

	let offset = match breg {
		Some(_) => match chars.as_str() {
			"" => None,
			more => Some(more.strip_prefix('+')?),
		},
		None => Some(rest),
	};

	if offset == Some("") { return None }

	Some(Indexed { ireg, breg, offset })
}

//--> Tests <--
