//--> Imports <--

mod assembler;
mod encoder;
mod isa;
mod lexer;
mod matcher;
mod opcode;
mod operand;
mod parser;
mod pseudo;

use std::path::Path;

use crate::ErrorList;

pub use assembler::Assembly;
pub use isa::DEFINITIONS;
pub use opcode::OpcodeTable;

//--> Type Aliases <--

pub(crate) type Result = std::result::Result<Assembly, ErrorList>;

//--> Functions <--

// Parses already preprocessed FloatyChip source and assembles it into a flat image loaded at address 0.
pub(crate) fn assemble(table: &OpcodeTable, source: &str, file: &Path) -> Result {
	let directives = parser::parse(source, file)?;

	log::info!("Parsed {} directives from '{}'.", directives.len(), file.display());

	assembler::assemble(table, &directives).map_err(|err| vec![err])
}

//--> Tests <--
