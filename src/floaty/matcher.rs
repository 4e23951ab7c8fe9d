//--> Imports <--

use std::borrow::Cow;

use super::{
	opcode::Opcode,
	parser::Instruction,
};

//--> Functions <--

// `ADD N1, N2` against a three operand format reads as `ADD N1, N1, N2`.
pub fn normalize<'a>(opcode: &Opcode, arguments: &'a [String]) -> Cow<'a, [String]> {
	match arguments {
		[first, second] if opcode.operands.len() == 3 => Cow::Owned(vec![first.clone(), first.clone(), second.clone()]),
		_ => Cow::Borrowed(arguments),
	}
}

pub fn try_match(opcode: &Opcode, ins: &Instruction) -> bool {
	if ins.mnemonic != opcode.mnemonic { return false }

	let arguments = normalize(opcode, &ins.arguments);

	arguments.len() == opcode.operands.len()
		&& opcode.operands.iter().zip(arguments.iter()).all(|(operand, arg)| operand.kind.accepts(arg))
}

//--> Tests <--
