//--> Imports <--

// Handles assembly of code targeting the 24-bit FloatyChip instruction set architecture.
mod floaty;

// Handles macros, conditionals and includes before anything is parsed.
mod preprocess;

// Handles numbers, names and strings going into assembly.
mod text;

use std::{
	fmt,
	fs,
	path::PathBuf,
	process,
};

use clap::{
	Arg,
	ArgAction,
};

use log::{
	Level,
	LevelFilter,
	Metadata,
	Record,
};

use floaty::OpcodeTable;

use preprocess::{
	FsLoader,
	Preprocessor,
};

//--> Type Aliases <--

pub type ErrorList = Vec<Error>;

//--> Structs <--

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Error {
	pub file: PathBuf,
	pub line: Option<usize>,
	pub kind: ErrorKind,
}

// Prints log records the way the rest of the output looks, `ERR: ...`, `INFO: ...` and so on.
struct Logger;

//--> Enums <--

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
	#[error("invalid {directive} directive: {reason}")]
	MalformedDirective { directive: String, reason: String },

	#[error("cannot SEEK backwards from {from:#X} to {to:#X}")]
	BackwardSeek { from: usize, to: usize },

	#[error("label '{0}' doesn't exist")]
	UndefinedLabel(String),

	#[error("multiple definition of label '{name}', first defined on line {first_line}")]
	DuplicateLabel { name: String, first_line: usize },

	#[error("{what} {value} is out of range [{min}, {max}]")]
	OutOfRange { what: String, value: i64, min: i64, max: i64 },

	#[error("invalid offset '{0}'")]
	InvalidOffset(String),

	#[error("invalid instruction '{0}'")]
	UnrecognizedInstruction(String),

	#[error("{0}")]
	Syntax(String),

	#[error("{0}")]
	Preprocess(String),

	#[error("{0}")]
	Io(String),
}

//--> Statics <--

static LOGGER: Logger = Logger;

//--> Functions <--

fn main() {
	let args = cli().get_matches();

	if log::set_logger(&LOGGER).is_ok() {
		log::set_max_level(verbosity(args.get_count("verbose")));
	}

	let input_path = match args.get_one::<PathBuf>("infile") {
		Some(path) => path.clone(),
		None => {
			log::error!("No source file was given.");
			process::exit(1);
		}
	};

	let output_path = args.get_one::<PathBuf>("output").cloned().unwrap_or_else(|| PathBuf::from("a.out"));

	let listing_path = args.get_one::<PathBuf>("listing").cloned();

	let source = match fs::read_to_string(&input_path) {
		Ok(source) => source,
		Err(err) => {
			log::error!("{}", Error::new(input_path.clone(), None, ErrorKind::Io(err.to_string())));
			process::exit(1);
		}
	};

	let loader = FsLoader;
	let mut preprocessor = Preprocessor::new(&loader);

	for dir in args.get_many::<PathBuf>("include").into_iter().flatten() {
		preprocessor.include_dir(dir.clone());
	}

	for definition in args.get_many::<String>("define").into_iter().flatten() {
		match macro_definition(definition) {
			Some((name, value)) => preprocessor.define(name, value),
			None => {
				log::error!("'{}' doesn't start with a valid macro name.", definition);
				process::exit(1);
			}
		}
	}

	let preprocessed = match preprocessor.process(&source, &input_path) {
		Ok(text) => text,
		Err(errs) => fail("preprocess", errs),
	};

	log::info!("Preprocessed '{}'.", input_path.display());

	if args.contains_id("preprocess") {
		print!("{}", preprocessed);
		return;
	}

	let table = match OpcodeTable::new(floaty::DEFINITIONS) {
		Ok(table) => table,
		Err(err) => {
			log::error!("The built-in instruction set is ill-formed: {}", err);
			process::exit(2);
		}
	};

	log::info!("Loaded {} opcode definitions.", table.len());

	for opcode in table.iter() {
		log::debug!("{:06X}/{:06X}  {}", opcode.base, opcode.mask, opcode);
	}

	let assembly = match floaty::assemble(&table, &preprocessed, &input_path) {
		Ok(assembly) => assembly,
		Err(errs) => fail("assemble", errs),
	};

	if let Err(err) = fs::write(&output_path, &assembly.image) {
		log::error!("{}", Error::new(output_path.clone(), None, ErrorKind::Io(err.to_string())));
		process::exit(1);
	}

	log::info!("Successfully assembled {} bytes with {} labels.", assembly.image.len(), assembly.symbols.len());
	log::info!("The binary was output at '{}'.", output_path.display());

	if let Some(path) = listing_path {
		if let Err(err) = fs::write(&path, assembly.listing.to_string()) {
			log::error!("{}", Error::new(path.clone(), None, ErrorKind::Io(err.to_string())));
			process::exit(1);
		}

		log::info!("The listing file was output at '{}'.", path.display());
	}
}

fn cli() -> clap::Command<'static> {
	clap::command!()
	.long_about(
		"The FloatyChip Assembler (fcasm) turns FloatyChip assembly into a flat binary image, loaded at address 0. \
		Sources go through a small C-style preprocessor first (#define, #undef, #ifdef, #ifndef, #else, #endif and #include), \
		then two passes: the first binds every label to its address, the second encodes each instruction into a 24-bit word.\n\n\
		Besides instructions, sources may use the pseudo-instructions SEEK, DB, DW, DD, DS and DUP."
	)
	.arg_required_else_help(true)
	.args([
		{
			Arg::new("verbose")
			.short('v')
			.long("verbose")
			.action(ArgAction::Count)
			.help("Tells the assembler to output additional information while assembling. Give it twice for per-label and per-instruction detail.")
		},
		{
			Arg::new("output")
			.short('o')
			.long("out")
			.value_name("OUTPATH")
			.value_parser(clap::value_parser!(PathBuf))
			.help("Specifies a custom path for the output binary. By default, the binary will be placed in the current working directory as 'a.out'.")
		},
		{
			Arg::new("listing")
			.short('l')
			.long("list")
			.value_name("LISTPATH")
			.value_parser(clap::value_parser!(PathBuf))
			.help("Specifies a path to generate a listing file at. By default, no listing file is generated.")
		},
		{
			Arg::new("define")
			.short('D')
			.long("define")
			.value_name("NAME[=VALUE]")
			.value_parser(clap::value_parser!(String))
			.action(ArgAction::Append)
			.help("Defines a preprocessor macro before the source is read. The value defaults to 1.")
		},
		{
			Arg::new("include")
			.short('I')
			.long("include")
			.value_name("DIR")
			.value_parser(clap::value_parser!(PathBuf))
			.action(ArgAction::Append)
			.help("Adds a directory to search for #include files, after the directory of the including file.")
		},
		{
			Arg::new("preprocess")
			.short('E')
			.long("preprocess-only")
			.help("Prints the preprocessed source and stops.")
		},
		{
			Arg::new("infile")
			.value_name("INPATH")
			.value_parser(clap::value_parser!(PathBuf))
			.required(true)
			.help("Path to the source file.")
		}
	])
}

// -v for info, -vv for everything.
fn verbosity(count: u8) -> LevelFilter {
	match count {
		0 => LevelFilter::Warn,
		1 => LevelFilter::Info,
		_ => LevelFilter::Debug,
	}
}

fn fail(stage: &str, errs: ErrorList) -> ! {
	let err_count = errs.len();

	for err in errs {
		log::error!("{}", err);
	}

	log::error!("Failed to {}, with {} errors.", stage, err_count);
	process::exit(2);
}

// `NAME=VALUE`, or just `NAME` for a value of 1.
fn macro_definition(definition: &str) -> Option<(&str, &str)> {
	let (name, value) = definition.split_once('=').unwrap_or((definition, "1"));

	if text::is_identifier(name) { Some((name, value)) } else { None }
}

impl Error {
	pub fn new(file: PathBuf, line: Option<usize>, kind: ErrorKind) -> Error {
		Error { file, line, kind }
	}
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self.line {
			Some(l) => write!(f, "{}, line {}, in {}", self.kind, l, self.file.display()),
			None => write!(f, "{}, in {}", self.kind, self.file.display()),
		}
	}
}

impl log::Log for Logger {
	fn enabled(&self, metadata: &Metadata) -> bool {
		metadata.level() <= log::max_level()
	}

	fn log(&self, record: &Record) {
		if !self.enabled(record.metadata()) { return }

		let start = match record.level() {
			Level::Error => "ERR",
			Level::Warn => "WARN",
			Level::Info => "INFO",
			Level::Debug | Level::Trace => "DEBUG",
		};

		eprintln!("{}: {}", start, record.args());
	}

	fn flush(&self) {}
}

//--> Tests <--
