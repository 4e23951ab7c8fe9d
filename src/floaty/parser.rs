//--> Imports <--

use std::{
	fmt,
	path::{
		Path,
		PathBuf,
	},
};

use crate::{
	text,
	Error,
	ErrorKind,
	ErrorList,
};

use super::lexer::{
	self,
	Token,
	TokenInner,
};

//--> Type Aliases <--

pub(crate) type Result = std::result::Result<Vec<Directive>, ErrorList>;

//--> Structs <--

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Label {
	pub name: String,
	pub line: usize,
	pub file: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
	pub label: Option<Label>,
	pub mnemonic: String,
	pub arguments: Vec<String>,
	pub line: usize,
	pub file: PathBuf,
}

// Line-by-line state. A label alone on its line waits in `pending` for the next instruction.
struct Parser {
	file: PathBuf,
	line: usize,
	pending: Option<Label>,
	directives: Vec<Directive>,
	errs: ErrorList,
}

//--> Enums <--

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Directive {
	Instruction(Instruction),
	// A label nothing followed, bound to wherever the output is at that point.
	Label(Label),
}

//--> Functions <--

pub(crate) fn parse(source: &str, file: &Path) -> Result {
	let mut parser = Parser::new(file);

	for text in source.lines() {
		parser.process_line(text);
	}

	parser.finish()
}

impl Parser {
	fn new(file: &Path) -> Parser {
		Parser { file: file.to_path_buf(), line: 1, pending: None, directives: Vec::new(), errs: Vec::new() }
	}

	fn process_line(&mut self, text: &str) {
		let tokens = match lexer::lex(text, self.line, &self.file) {
			Ok(tokens) => tokens,
			Err(mut errs) => {
				self.errs.append(&mut errs);
				self.line += 1;
				return;
			}
		};

		let items = tokens.into_iter().filter(|t| t.inner != TokenInner::Comma).collect::<Vec<Token>>();

		match items.first() {
			None => self.line += 1,
			Some(first) if first.source == "#line" => self.line_marker(&items),
			Some(first) if items.len() == 1 && first.is_label() => {
				if let Some(label) = self.label(first) {
					if let Some(previous) = self.pending.replace(label) {
						self.directives.push(Directive::Label(previous));
					}
				}

				self.line += 1;
			},
			Some(_) => {
				self.instruction(&items);
				self.line += 1;
			}
		}
	}

	// #line <number> ["file"]
	fn line_marker(&mut self, items: &[Token]) {
		if items.len() != 2 && items.len() != 3 {
			self.error("malformed #line directive");
			self.line += 1;
			return;
		}

		match text::parse_number(&items[1].source) {
			Some(number) if number >= 0 => self.line = number as usize,
			_ => {
				self.error("invalid line number for #line directive");
				self.line += 1;
				return;
			}
		}

		if let Some(name) = items.get(2) {
			self.file = PathBuf::from(text::unquoted(&name.source));
		}
	}

	fn instruction(&mut self, items: &[Token]) {
		let mut label = self.pending.take();
		let mut rest = items;

		if rest[0].is_label() {
			if label.is_some() {
				self.error("an instruction can only have one label");
				return;
			}

			label = match self.label(&rest[0]) {
				Some(l) => Some(l),
				None => return
			};
			rest = &rest[1..];
		}

		if rest.first().map_or(false, Token::is_label) {
			self.error("an instruction can only have one label");
			return;
		}

		let (mnemonic, arguments) = match rest.split_first() {
			Some((m, args)) if m.inner == TokenInner::Word => (m.source.to_uppercase(), args),
			Some((m, _)) => {
				self.error(&format!("expected a mnemonic, found {} at column {}", m, m.column()));
				return;
			},
			None => {
				self.error("invalid instruction");
				return;
			}
		};

		self.directives.push(Directive::Instruction(Instruction {
			label,
			mnemonic,
			arguments: arguments.iter().map(|t| t.source.clone()).collect(),
			line: self.line,
			file: self.file.clone(),
		}));
	}

	fn label(&mut self, token: &Token) -> Option<Label> {
		let name = token.source.strip_suffix(':')?;

		if text::is_identifier(name) {
			Some(Label { name: String::from(name), line: self.line, file: self.file.clone() })
		} else {
			self.error(&format!("invalid label name '{}' at column {}", name, token.column()));
			None
		}
	}

	fn error(&mut self, message: &str) {
		self.errs.push(Error::new(self.file.clone(), Some(self.line), ErrorKind::Syntax(String::from(message))));
	}

	fn finish(mut self) -> Result {
		if let Some(label) = self.pending.take() {
			self.directives.push(Directive::Label(label));
		}

		if self.errs.is_empty() { Ok(self.directives) } else { Err(self.errs) }
	}
}

impl Instruction {
	// Used by DUP to build the instruction it repeats.
	pub fn synthesize(&self, mnemonic: &str, arguments: &[String]) -> Instruction {
		Instruction {
			label: None,
			mnemonic: mnemonic.to_uppercase(),
			arguments: arguments.to_vec(),
			line: self.line,
			file: self.file.clone(),
		}
	}

	pub fn error(&self, kind: ErrorKind) -> Error {
		Error::new(self.file.clone(), Some(self.line), kind)
	}
}

impl Label {
	pub fn error(&self, kind: ErrorKind) -> Error {
		Error::new(self.file.clone(), Some(self.line), kind)
	}
}

impl fmt::Display for Instruction {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}", self.mnemonic)?;

		if !self.arguments.is_empty() {
			write!(f, " {}", self.arguments.join(", "))?;
		}

		Ok(())
	}
}

impl fmt::Display for Directive {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Directive::Instruction(ins) => match &ins.label {
				Some(label) => write!(f, "{}: {}", label.name, ins),
				None => write!(f, "{}", ins),
			},
			Directive::Label(label) => write!(f, "{}:", label.name),
		}
	}
}

//--> Tests <--

#[cfg(test)]
mod tests {
	use super::*;

	fn parse_ok(source: &str) -> Vec<Directive> {
		match parse(source, Path::new("main.asm")) {
			Ok(directives) => directives,
			Err(errs) => panic!("unexpected errors: {:?}", errs),
		}
	}

	fn instruction(directive: &Directive) -> &Instruction {
		match directive {
			Directive::Instruction(ins) => ins,
			Directive::Label(label) => panic!("expected an instruction, found label {}", label.name),
		}
	}

	#[test]
	fn instruction_with_inline_label() {
		let directives = parse_ok("start: ld N1, 5");
		let ins = instruction(&directives[0]);

		assert_eq!(ins.label.as_ref().map(|l| l.name.as_str()), Some("start"));
		assert_eq!(ins.mnemonic, "LD");
		assert_eq!(ins.arguments, vec!["N1", "5"]);
		assert_eq!(ins.line, 1);
	}

	#[test]
	fn lone_label_attaches_to_next_instruction() {
		let directives = parse_ok("loop:\n\n  ; comment\n  JMP loop\n");
		assert_eq!(directives.len(), 1);

		let ins = instruction(&directives[0]);
		let label = ins.label.as_ref().map(|l| (l.name.as_str(), l.line));
		assert_eq!(label, Some(("loop", 1)));
		assert_eq!(ins.line, 4);
	}

	#[test]
	fn trailing_and_stacked_labels_become_label_directives() {
		let directives = parse_ok("a:\nb:\nNOP\nend:");

		assert!(matches!(&directives[0], Directive::Label(l) if l.name == "a"));
		assert_eq!(instruction(&directives[1]).label.as_ref().map(|l| l.name.clone()), Some("b".to_string()));
		assert!(matches!(&directives[2], Directive::Label(l) if l.name == "end" && l.line == 4));
	}

	#[test]
	fn two_labels_on_one_instruction_is_an_error() {
		let errs = parse("first:\nsecond: NOP", Path::new("main.asm")).unwrap_err();
		assert_eq!(errs.len(), 1);
		assert_eq!(errs[0].line, Some(2));

		let errs = parse("first: second: NOP", Path::new("main.asm")).unwrap_err();
		assert_eq!(errs.len(), 1);
	}

	#[test]
	fn line_markers_move_position() {
		let directives = parse_ok("#line 10 \"inc.asm\"\nNOP\n#line 3\nCLS");

		let nop = instruction(&directives[0]);
		assert_eq!((nop.line, nop.file.as_path()), (10, Path::new("inc.asm")));

		let cls = instruction(&directives[1]);
		assert_eq!((cls.line, cls.file.as_path()), (3, Path::new("inc.asm")));
	}

	#[test]
	fn malformed_line_markers() {
		assert!(parse("#line", Path::new("x")).is_err());
		assert!(parse("#line ten", Path::new("x")).is_err());
	}

	#[test]
	fn strings_survive_as_single_arguments() {
		let directives = parse_ok("msg: DS \"a, b c\"");
		assert_eq!(instruction(&directives[0]).arguments, vec!["\"a, b c\""]);
	}

	#[test]
	fn errors_are_collected_across_lines() {
		let errs = parse("1bad: NOP\nDS \"open\nNOP\n\"str\"", Path::new("main.asm")).unwrap_err();
		let lines = errs.iter().map(|e| e.line).collect::<Vec<_>>();
		assert_eq!(lines, vec![Some(1), Some(2), Some(4)]);
	}

	#[test]
	fn errors_point_at_their_column() {
		let errs = parse("  1bad: NOP\n\"str\" NOP", Path::new("main.asm")).unwrap_err();
		let messages = errs.iter().map(|e| e.kind.to_string()).collect::<Vec<String>>();

		assert_eq!(messages, vec![
			"invalid label name '1bad' at column 3",
			"expected a mnemonic, found a string literal \"str\" at column 1",
		]);
	}

	#[test]
	fn renders_back_to_source() {
		let directives = parse_ok("top: add n1,  n2");
		assert_eq!(directives[0].to_string(), "top: ADD n1, n2");
	}
}
