//--> Imports <--

use crate::{
	text,
	ErrorKind,
};

use super::{
	assembler::SymbolTable,
	matcher,
	opcode::Opcode,
	operand::{
		self,
		Operand,
		OperandType,
		IMMEDIATE_MAX,
		IMMEDIATE_MIN,
	},
	parser::Instruction,
};

//--> Type Aliases <--

type Result<T> = std::result::Result<T, ErrorKind>;

//--> Constants <--

const OFFSET_MIN: i64 = -128;
const OFFSET_MAX: i64 = 127;
const DOUBLE_OFFSET_MIN: i64 = 0;
const DOUBLE_OFFSET_MAX: i64 = 15;

//--> Functions <--

// Packs the arguments of an instruction the opcode already accepted into its 24-bit word.
pub fn encode(opcode: &Opcode, ins: &Instruction, symbols: &SymbolTable) -> Result<u32> {
	let arguments = matcher::normalize(opcode, &ins.arguments);

	if arguments.len() != opcode.operands.len() {
		return Err(ErrorKind::UnrecognizedInstruction(ins.to_string()));
	}

	let mut word = opcode.base;

	for (operand, arg) in opcode.operands.iter().zip(arguments.iter()) {
		word |= operand_bits(opcode, operand, arg, symbols).map_err(|kind| match kind {
			ErrorKind::Syntax(_) => ErrorKind::UnrecognizedInstruction(ins.to_string()),
			other => other,
		})?;
	}

	debug_assert!(opcode.matches_word(word));
	log::debug!("{} -> {:06X}", ins, word);

	Ok(word)
}

fn operand_bits(opcode: &Opcode, operand: &Operand, arg: &str, symbols: &SymbolTable) -> Result<u32> {
	let place = |letter: Option<char>, value: i64| letter.and_then(|c| opcode.field(c)).map_or(0, |f| f.pack(value));
	let shape = || ErrorKind::Syntax(String::from(arg));

	let bits = match operand.kind {
		OperandType::ByteImmediate => {
			let value = text::parse_number(arg).ok_or_else(shape)?;
			place(operand.binding, in_range("immediate", value, IMMEDIATE_MIN, IMMEDIATE_MAX)?)
		},
		OperandType::Address => address(arg, symbols)?,
		OperandType::IndirectAddr => address(operand::bracketed(arg).ok_or_else(shape)?, symbols)?,
		OperandType::NReg => place(operand.binding, register(operand::register_digit(arg, 'N')).ok_or_else(shape)?),
		OperandType::BReg => place(operand.binding, register(operand::register_digit(arg, 'B')).ok_or_else(shape)?),
		OperandType::IReg => place(operand.binding, register(operand::register_digit(arg, 'I')).ok_or_else(shape)?),
		OperandType::BIndirectReg => place(operand.binding, register(operand::indirect_register_digit(arg, 'B')).ok_or_else(shape)?),
		OperandType::IIndirectReg => place(operand.binding, register(operand::indirect_register_digit(arg, 'I')).ok_or_else(shape)?),
		OperandType::StackPointer | OperandType::SoundTimer | OperandType::DelayTimer => 0,
		OperandType::IndirectIReg => {
			let ix = operand::indexed(arg).ok_or_else(shape)?;
			place(operand.binding, i64::from(ix.ireg))
		},
		OperandType::IndirectIRegPlusN => {
			let ix = operand::indexed(arg).ok_or_else(shape)?;
			let offset = offset(ix.offset, OFFSET_MIN, OFFSET_MAX)?;
			place(operand.binding, i64::from(ix.ireg)) | place(Some('n'), offset)
		},
		OperandType::IndirectIRegPlusBRegPlusN => {
			let ix = operand::indexed(arg).ok_or_else(shape)?;
			let breg = ix.breg.ok_or_else(shape)?;
			let offset = offset(ix.offset, DOUBLE_OFFSET_MIN, DOUBLE_OFFSET_MAX)?;
			place(operand.binding, i64::from(ix.ireg)) | place(operand.index_binding, i64::from(breg)) | place(Some('n'), offset)
		},
	};

	Ok(bits)
}

fn register(digit: Option<u8>) -> Option<i64> { digit.map(i64::from) }

// Addresses are numeric or a label, and always fill the low 16 bits.
fn address(arg: &str, symbols: &SymbolTable) -> Result<u32> {
	let value = match text::parse_number(arg) {
		Some(value) => value,
		None => match symbols.resolve(arg) {
			Some(address) => i64::from(address),
			None => return Err(ErrorKind::UndefinedLabel(String::from(arg))),
		}
	};

	Ok(in_range("address", value, 0, 0xFFFF)? as u32)
}

fn offset(suffix: Option<&str>, min: i64, max: i64) -> Result<i64> {
	match suffix {
		None => Ok(0),
		Some(t) => match text::parse_number(t) {
			Some(value) => in_range("offset", value, min, max),
			None => Err(ErrorKind::InvalidOffset(String::from(t))),
		}
	}
}

fn in_range(what: &str, value: i64, min: i64, max: i64) -> Result<i64> {
	if (min..=max).contains(&value) {
		Ok(value)
	} else {
		Err(ErrorKind::OutOfRange { what: String::from(what), value, min, max })
	}
}

//--> Tests <--
