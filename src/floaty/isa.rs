// The FloatyChip instruction set.
// Each pattern is six nibbles, most significant first: a hex digit is fixed, `_` is ignored, and the
// letters n, w, x, y and z are where the operand of the same name in the format is packed.
// Lookup takes the first match, so overlapping shapes go most specific first. Register operands come
// before the address forms since a register name also reads as a label.

//--> Constants <--

pub const DEFINITIONS: &[(&str, &str)] = &[
	// Control
	("000000", "NOP"),
	("0000E0", "CLS"),
	("0000EE", "RET"),
	("0000FD", "HLT"),
	("0F__ww", "SYS w"),
	("14___x", "JMP Ix"),
	("10____", "JMP addr"),
	("11____", "CALL addr"),
	("12____", "JMP [addr]"),
	("13____", "CALL [addr]"),
	("15____", "JZ addr"),
	("16____", "JNZ addr"),
	("17____", "JC addr"),
	("18____", "JNC addr"),

	// 8-bit arithmetic
	("200xyz", "ADD Nx, Ny, Nz"),
	("201xyz", "SUB Nx, Ny, Nz"),
	("202xyz", "AND Nx, Ny, Nz"),
	("203xyz", "OR Nx, Ny, Nz"),
	("204xyz", "XOR Nx, Ny, Nz"),
	("205xyz", "MUL Nx, Ny, Nz"),
	("206xyz", "DIV Nx, Ny, Nz"),
	("207xyz", "SHL Nx, Ny, Nz"),
	("208xyz", "SHR Nx, Ny, Nz"),
	("209xy_", "ADD Nx, By"),
	("20Axy_", "SUB Nx, By"),
	("30xynn", "ADD Nx, Ny, n"),
	("31xynn", "SUB Nx, Ny, n"),
	("32xynn", "AND Nx, Ny, n"),
	("33xynn", "OR Nx, Ny, n"),
	("34xynn", "XOR Nx, Ny, n"),

	// 16-bit and index arithmetic
	("400xyz", "ADD Bx, By, Bz"),
	("401xyz", "SUB Bx, By, Bz"),
	("402xy_", "ADD Bx, Ny"),
	("403xnn", "ADD Bx, n"),
	("50_xnn", "ADD Ix, n"),
	("51_xy_", "ADD Ix, By"),
	("52_x__", "INC Ix"),
	("53_x__", "DEC Ix"),

	// Loads
	("6__xnn", "LD Nx, n"),
	("70_xy_", "LD Nx, Ny"),
	("71_xy_", "LD Bx, By"),
	("72_xy_", "LD Ix, Iy"),
	("73_xy_", "LD Ix, By"),
	("74_xy_", "LD Nx, B(Ny)"),
	("75_xy_", "LD B(Nx), Ny"),
	("76_xy_", "LD Nx, I(Ny)"),
	("77_xy_", "LD I(Nx), Ny"),
	("78_x__", "LD Nx, DT"),
	("79_x__", "LD DT, Nx"),
	("7A_x__", "LD ST, Nx"),
	("7B_x__", "LD Bx, SP"),
	("7C_x__", "LD SP, Bx"),
	("B4_xy_", "LD Nx, [Iy]"),
	("B5_xy_", "LD [Iy], Nx"),
	("B2xyzn", "LD Nx, [Iy+Bz+n]"),
	("B3xyzn", "LD [Iy+Bz+n], Nx"),
	("B0xynn", "LD Nx, [Iy+n]"),
	("B1xynn", "LD [Iy+n], Nx"),
	("8x____", "LD Ix, addr"),
	("9x____", "LD Nx, [addr]"),
	("Ax____", "LD [addr], Nx"),

	// Stack
	("C0_x__", "PUSH Nx"),
	("C1_x__", "POP Nx"),
	("C2_x__", "PUSH Bx"),
	("C3_x__", "POP Bx"),
	("C4_x__", "PUSH Ix"),
	("C5_x__", "POP Ix"),

	// Unary and compare
	("D0_x__", "INC Nx"),
	("D1_x__", "DEC Nx"),
	("D2_x__", "NOT Nx"),
	("D3_xy_", "CMP Nx, Ny"),
	("D4_xnn", "CMP Nx, n"),
	("D5_x__", "INC Bx"),
	("D6_x__", "DEC Bx"),

	// Display and input
	("E0xynn", "DRW Nx, Ny, n"),
	("E1_xnn", "RND Nx, n"),
	("E2_x__", "KEY Nx"),
	("E3_x__", "SKP Nx"),
	("E4_x__", "SKNP Nx"),
];

//--> Tests <--

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use super::*;

	use crate::floaty::{
		assembler::SymbolTable,
		opcode::OpcodeTable,
		parser::Instruction,
	};

	fn table() -> OpcodeTable {
		match OpcodeTable::new(DEFINITIONS) {
			Ok(table) => table,
			Err(err) => panic!("built-in instruction set is ill-formed: {}", err),
		}
	}

	fn encode(mnemonic: &str, arguments: &[&str]) -> Option<u32> {
		let ins = Instruction {
			label: None,
			mnemonic: String::from(mnemonic),
			arguments: arguments.iter().map(|a| a.to_string()).collect(),
			line: 1,
			file: PathBuf::from("isa.asm"),
		};

		table().encode(&ins, &SymbolTable::new()).ok()
	}

	#[test]
	fn built_in_table_is_well_formed() {
		assert_eq!(table().len(), DEFINITIONS.len());
	}

	#[test]
	fn every_definition_encodes_onto_its_own_pattern() {
		for opcode in table().iter() {
			assert!(opcode.matches_word(opcode.base), "{}", opcode);
		}
	}

	#[test]
	fn overlapping_shapes_pick_the_specific_form() {
		assert_eq!(encode("LD", &["N1", "[I2]"]), Some(0xB40120));
		assert_eq!(encode("LD", &["N1", "[I2+B3]"]), Some(0xB21230));
		assert_eq!(encode("LD", &["N1", "[I2+3]"]), Some(0xB01203));
		assert_eq!(encode("LD", &["[I2+B3+1]", "N1"]), Some(0xB31231));
		assert_eq!(encode("LD", &["[I2]", "N1"]), Some(0xB50120));
		assert_eq!(encode("LD", &["N1", "[buffer]"]), None);
		assert_eq!(encode("LD", &["N1", "[0x300]"]), Some(0x910300));
	}

	#[test]
	fn arithmetic_forms() {
		assert_eq!(encode("ADD", &["N1", "N2"]), Some(0x200112));
		assert_eq!(encode("ADD", &["N1", "B2"]), Some(0x209120));
		assert_eq!(encode("ADD", &["N1", "5"]), Some(0x301105));
		assert_eq!(encode("ADD", &["B1", "N2"]), Some(0x402120));
		assert_eq!(encode("ADD", &["B1", "7"]), Some(0x403107));
		assert_eq!(encode("ADD", &["I1", "7"]), Some(0x500107));
		assert_eq!(encode("ADD", &["I1", "B7"]), Some(0x510170));
	}

	#[test]
	fn control_flow() {
		assert_eq!(encode("NOP", &[]), Some(0x000000));
		assert_eq!(encode("RET", &[]), Some(0x0000EE));
		assert_eq!(encode("JMP", &["0x200"]), Some(0x100200));
		assert_eq!(encode("JMP", &["[0x200]"]), Some(0x120200));
		assert_eq!(encode("JMP", &["I3"]), Some(0x140003));
		assert_eq!(encode("LD", &["I3", "0x1234"]), Some(0x831234));
	}

	#[test]
	fn unknown_shapes_are_not_encoded() {
		assert_eq!(encode("LD", &["SP", "N1"]), None);
		assert_eq!(encode("FLY", &[]), None);
		assert_eq!(encode("LD", &["N1", "300"]), None);
	}
}
