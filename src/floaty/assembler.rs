//--> Imports <--

use std::{
	collections::HashMap,
	fmt,
	mem,
};

use byteorder::{
	BigEndian,
	ByteOrder,
};

use crate::{
	Error,
	ErrorKind,
};

use super::{
	opcode::OpcodeTable,
	parser::{
		Directive,
		Instruction,
		Label,
	},
	pseudo::{
		self,
		Sink,
	},
};

//--> Type Aliases <--

type Result<T> = std::result::Result<T, Error>;

//--> Constants <--

pub const WORD_SIZE: usize = 3;

//--> Structs <--

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Symbol {
	pub address: u16,
	pub line: usize,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
	symbols: HashMap<String, Symbol>,
}

// First pass: only tracks where the output would be.
#[derive(Default)]
struct OffsetCounter {
	offset: usize,
}

// Second pass: writes into the image and remembers what the current directive wrote.
struct Output<'a> {
	table: &'a OpcodeTable,
	symbols: &'a SymbolTable,
	image: Vec<u8>,
	cursor: usize,
	origin: usize,
	start: Option<usize>,
	trace: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListingEntry {
	pub address: usize,
	pub bytes: Vec<u8>,
	pub source: String,
}

#[derive(Clone, Debug, Default)]
pub struct Listing {
	pub entries: Vec<ListingEntry>,
}

#[derive(Debug)]
pub struct Assembly {
	pub image: Vec<u8>,
	pub symbols: SymbolTable,
	pub listing: Listing,
}

//--> Functions <--

pub fn assemble(table: &OpcodeTable, directives: &[Directive]) -> Result<Assembly> {
	let (symbols, size) = bind_symbols(directives)?;

	log::info!("Bound {} labels, the image is {} bytes.", symbols.len(), size);

	let mut output = Output::new(table, &symbols, size);
	let mut listing = Listing::default();

	for directive in directives {
		output.origin = output.cursor;

		if let Directive::Instruction(ins) = directive {
			pseudo::process(ins, &mut output)?;
		}

		listing.entries.push(output.record(directive));
	}

	debug_assert_eq!(output.cursor, size);

	let image = output.image;

	Ok(Assembly { image, symbols, listing })
}

// Every label gets the offset its directive starts at.
fn bind_symbols(directives: &[Directive]) -> Result<(SymbolTable, usize)> {
	let mut symbols = SymbolTable::new();
	let mut counter = OffsetCounter::default();

	for directive in directives {
		match directive {
			Directive::Label(label) => symbols.define(label, counter.offset)?,
			Directive::Instruction(ins) => {
				if let Some(label) = &ins.label {
					symbols.define(label, counter.offset)?;
				}

				pseudo::process(ins, &mut counter)?;
			}
		}
	}

	Ok((symbols, counter.offset))
}

impl SymbolTable {
	pub fn new() -> SymbolTable { SymbolTable::default() }

	pub fn define(&mut self, label: &Label, offset: usize) -> Result<()> {
		if let Some(first) = self.symbols.get(&label.name) {
			return Err(label.error(ErrorKind::DuplicateLabel { name: label.name.clone(), first_line: first.line }));
		}

		let address = u16::try_from(offset).map_err(|_| label.error(ErrorKind::OutOfRange {
			what: format!("address of label '{}'", label.name),
			value: offset as i64,
			min: 0,
			max: i64::from(u16::MAX),
		}))?;

		log::debug!("{} = {:04X}", label.name, address);

		self.symbols.insert(label.name.clone(), Symbol { address, line: label.line });
		Ok(())
	}

	pub fn resolve(&self, name: &str) -> Option<u16> {
		self.symbols.get(name).map(|s| s.address)
	}

	pub fn len(&self) -> usize { self.symbols.len() }
}

impl Sink for OffsetCounter {
	fn position(&self) -> usize { self.offset }

	fn seek(&mut self, to: usize) { self.offset = to; }

	fn emit(&mut self, bytes: &[u8]) -> std::result::Result<(), ErrorKind> {
		self.offset += bytes.len();
		Ok(())
	}

	fn instruction(&mut self, _: &Instruction) -> Result<()> {
		self.offset += WORD_SIZE;
		Ok(())
	}
}

impl<'a> Output<'a> {
	fn new(table: &'a OpcodeTable, symbols: &'a SymbolTable, size: usize) -> Output<'a> {
		Output { table, symbols, image: vec![0; size], cursor: 0, origin: 0, start: None, trace: Vec::new() }
	}

	// Closes off what the directive just processed wrote. Directives that wrote nothing are listed where they began.
	fn record(&mut self, directive: &Directive) -> ListingEntry {
		ListingEntry {
			address: self.start.take().unwrap_or(self.origin),
			bytes: mem::take(&mut self.trace),
			source: directive.to_string(),
		}
	}
}

impl Sink for Output<'_> {
	fn position(&self) -> usize { self.cursor }

	fn seek(&mut self, to: usize) { self.cursor = to; }

	// The first pass sized the image, so a write past its end means the passes disagree.
	fn emit(&mut self, bytes: &[u8]) -> std::result::Result<(), ErrorKind> {
		let end = self.cursor + bytes.len();
		let size = self.image.len();

		let slot = self.image.get_mut(self.cursor..end).ok_or_else(|| ErrorKind::OutOfRange {
			what: String::from("write offset"),
			value: end as i64,
			min: 0,
			max: size as i64,
		})?;

		slot.copy_from_slice(bytes);
		self.start.get_or_insert(self.cursor);
		self.trace.extend_from_slice(bytes);
		self.cursor = end;
		Ok(())
	}

	fn instruction(&mut self, ins: &Instruction) -> Result<()> {
		let word = self.table.encode(ins, self.symbols).map_err(|kind| ins.error(kind))?;
		let mut bytes = [0u8; WORD_SIZE];

		BigEndian::write_u24(&mut bytes, word);
		self.emit(&bytes).map_err(|kind| ins.error(kind))
	}
}

impl fmt::Display for ListingEntry {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		let bytes = self.bytes.iter().map(|b| format!("{:02X}", b)).collect::<Vec<String>>().join(" ");

		write!(f, "{:04X}  {:<8}  {}", self.address, bytes, self.source)
	}
}

impl fmt::Display for Listing {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		for entry in &self.entries {
			writeln!(f, "{}", entry)?;
		}

		Ok(())
	}
}

//--> Tests <--
