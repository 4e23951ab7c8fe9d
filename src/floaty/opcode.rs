//--> Imports <--

use std::fmt;

use crate::ErrorKind;

use super::{
	assembler::SymbolTable,
	encoder,
	matcher,
	operand::{
		self,
		Operand,
	},
	parser::Instruction,
};

//--> Structs <--

// Where one placeholder letter lives in the instruction word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Field {
	pub letter: char,
	// Nibble index of the field's most significant nibble, 5 being the top of the word.
	pub offset: u32,
	pub nibbles: u32,
	pub bits: u32,
}

#[derive(Clone, Debug)]
pub struct Opcode {
	pub pattern: &'static str,
	pub format: &'static str,
	pub mnemonic: &'static str,
	pub operands: Vec<Operand>,
	pub base: u32,
	pub mask: u32,
	pub fields: Vec<Field>,
}

pub struct OpcodeTable {
	opcodes: Vec<Opcode>,
}

//--> Enums <--

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum IsaError {
	#[error("pattern '{0}' must be exactly 6 nibbles long")]
	PatternLength(String),

	#[error("pattern '{pattern}' contains '{found}', expected a hex digit, '_' or one of n, w, x, y, z")]
	PatternAlphabet { pattern: String, found: char },

	#[error("pattern '{0}' has no fixed nibble")]
	NoFixedNibble(String),

	#[error("placeholder '{letter}' is split across pattern '{pattern}'")]
	SplitPlaceholder { pattern: String, letter: char },

	#[error("format for pattern '{0}' has no mnemonic")]
	EmptyFormat(String),

	#[error("mnemonic '{0}' must be uppercase")]
	LowercaseMnemonic(String),

	#[error("operand '{0}' has unbalanced brackets")]
	Unbalanced(String),

	#[error("unknown operand '{0}'")]
	UnknownOperand(String),

	#[error("'{format}' uses placeholder '{letter}', which pattern '{pattern}' doesn't contain")]
	UnboundPlaceholder { pattern: String, format: String, letter: char },

	#[error("'{first}' and '{second}' have the same fixed bits")]
	Ambiguous { first: String, second: String },
}

//--> Functions <--

impl Field {
	// Masks the value to the field width and to the nibbles it occupies, then moves it into place.
	pub fn pack(&self, value: i64) -> u32 {
		let width = if self.bits >= 32 { u64::from(u32::MAX) } else { (1u64 << self.bits) - 1 };
		let slots = (1u64 << (self.nibbles * 4)) - 1;
		let shift = (self.offset + 1 - self.nibbles) * 4;

		(((value as u64) & width & slots) << shift) as u32
	}
}

impl Opcode {
	pub fn new(pattern: &'static str, format: &'static str) -> Result<Opcode, IsaError> {
		let nibbles = pattern.chars().collect::<Vec<char>>();

		if nibbles.len() != 6 {
			return Err(IsaError::PatternLength(String::from(pattern)));
		}

		let mut base = 0u32;
		let mut mask = 0u32;
		let mut fields: Vec<Field> = Vec::new();

		for (index, &c) in nibbles.iter().enumerate() {
			let position = 5 - index as u32;

			if let Some(digit) = c.to_digit(16) {
				base |= digit << (position * 4);
				mask |= 0xF << (position * 4);
			} else if operand::is_placeholder(c) {
				if fields.iter().any(|f| f.letter == c) { continue }

				let last = nibbles.iter().rposition(|&n| n == c).unwrap_or(index);
				let count = nibbles.iter().filter(|&&n| n == c).count();

				if last - index + 1 != count {
					return Err(IsaError::SplitPlaceholder { pattern: String::from(pattern), letter: c });
				}

				let count = count as u32;
				let bits = match count {
					0..=2 => 8,
					3..=4 => 16,
					_ => 32,
				};

				fields.push(Field { letter: c, offset: position, nibbles: count, bits });
			} else if c != '_' {
				return Err(IsaError::PatternAlphabet { pattern: String::from(pattern), found: c });
			}
		}

		if mask == 0 {
			return Err(IsaError::NoFixedNibble(String::from(pattern)));
		}

		let (mnemonic, rest) = match format.trim().split_once(' ') {
			Some((mnemonic, rest)) => (mnemonic, rest.trim()),
			None => (format.trim(), ""),
		};

		if mnemonic.is_empty() {
			return Err(IsaError::EmptyFormat(String::from(pattern)));
		}

		if !mnemonic.chars().all(|c| c.is_ascii_uppercase()) {
			return Err(IsaError::LowercaseMnemonic(String::from(mnemonic)));
		}

		let operands = if rest.is_empty() {
			Vec::new()
		} else {
			rest.split(',').map(|token| Operand::classify(token.trim())).collect::<Result<Vec<Operand>, IsaError>>()?
		};

		for letter in operands.iter().flat_map(Operand::letters) {
			if !fields.iter().any(|f| f.letter == letter) {
				return Err(IsaError::UnboundPlaceholder { pattern: String::from(pattern), format: String::from(format), letter });
			}
		}

		Ok(Opcode { pattern, format, mnemonic, operands, base, mask, fields })
	}

	pub fn field(&self, letter: char) -> Option<&Field> {
		self.fields.iter().find(|f| f.letter == letter)
	}

	pub fn matches_word(&self, word: u32) -> bool {
		word & self.mask == self.base
	}
}

impl OpcodeTable {
	pub fn new(definitions: &[(&'static str, &'static str)]) -> Result<OpcodeTable, IsaError> {
		let opcodes = definitions.iter()
			.map(|&(pattern, format)| Opcode::new(pattern, format))
			.collect::<Result<Vec<Opcode>, IsaError>>()?;

		for (i, first) in opcodes.iter().enumerate() {
			if let Some(second) = opcodes[i + 1..].iter().find(|o| o.mask == first.mask && o.base == first.base) {
				return Err(IsaError::Ambiguous { first: first.to_string(), second: second.to_string() });
			}
		}

		Ok(OpcodeTable { opcodes })
	}

	// First definition in table order that accepts the instruction.
	pub fn find(&self, ins: &Instruction) -> Option<&Opcode> {
		self.opcodes.iter().find(|opcode| matcher::try_match(opcode, ins))
	}

	pub fn encode(&self, ins: &Instruction, symbols: &SymbolTable) -> Result<u32, ErrorKind> {
		match self.find(ins) {
			Some(opcode) => encoder::encode(opcode, ins, symbols),
			None => Err(ErrorKind::UnrecognizedInstruction(ins.to_string())),
		}
	}

	pub fn len(&self) -> usize { self.opcodes.len() }

	pub fn iter(&self) -> impl Iterator<Item = &Opcode> { self.opcodes.iter() }
}

impl fmt::Display for Opcode {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{} {}", self.pattern, self.format)
	}
}

//--> Tests <--
