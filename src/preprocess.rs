//--> Imports <--

use std::{
	collections::HashMap,
	fs,
	io,
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

//--> Type Aliases <--

pub(crate) type Result = std::result::Result<String, ErrorList>;

//--> Constants <--

const MAX_INCLUDE_DEPTH: usize = 64;

const MAX_NESTING: usize = 32;

const MAX_EXPANSION: usize = 0x10000;

//--> Traits <--

pub trait SourceLoader {
	fn load(&self, path: &Path) -> io::Result<String>;
}

//--> Structs <--

pub struct FsLoader;

pub struct Preprocessor<'a, L: SourceLoader> {
	loader: &'a L,
	include_dirs: Vec<PathBuf>,
	macros: HashMap<String, String>,
	out: String,
	errs: ErrorList,
	// Where the parser will think the next output line comes from.
	next: Option<(PathBuf, usize)>,
}

// One open #ifdef/#ifndef.
struct Condition {
	active: bool,
	parent_active: bool,
	seen_else: bool,
	line: usize,
}

// Maps physical lines of one file to the positions reported downstream, moved by #line.
struct Position {
	file: PathBuf,
	base: usize,
	anchor: usize,
}

//--> Functions <--

impl SourceLoader for FsLoader {
	fn load(&self, path: &Path) -> io::Result<String> {
		fs::read_to_string(path)
	}
}

impl<'a, L: SourceLoader> Preprocessor<'a, L> {
	pub fn new(loader: &'a L) -> Preprocessor<'a, L> {
		Preprocessor { loader, include_dirs: Vec::new(), macros: HashMap::new(), out: String::new(), errs: Vec::new(), next: None }
	}

	pub fn include_dir(&mut self, dir: PathBuf) {
		self.include_dirs.push(dir);
	}

	pub fn define(&mut self, name: &str, value: &str) {
		self.macros.insert(String::from(name), String::from(value));
	}

	pub fn process(mut self, source: &str, file: &Path) -> Result {
		self.next = Some((file.to_path_buf(), 1));
		self.file(source, file, 0);

		if self.errs.is_empty() { Ok(self.out) } else { Err(self.errs) }
	}

	fn file(&mut self, source: &str, file: &Path, depth: usize) {
		let mut conditions: Vec<Condition> = Vec::new();
		let mut position = Position { file: file.to_path_buf(), base: 1, anchor: 1 };

		for (index, raw) in source.lines().enumerate() {
			let line = index + 1;
			let active = conditions.last().map_or(true, |c| c.active);

			let directive = match raw.trim_start().strip_prefix('#') {
				Some(directive) => directive.trim_start(),
				None => {
					if active {
						let reported = position.base + (line - position.anchor);
						self.source_line(raw, file, line, &position.file, reported);
					}

					continue;
				}
			};

			let (name, rest) = match directive.split_once(|c: char| c.is_whitespace()) {
				Some((name, rest)) => (name, strip_comment(rest.trim())),
				None => (strip_comment(directive), ""),
			};

			let error = |message: String| Error::new(file.to_path_buf(), Some(line), ErrorKind::Preprocess(message));

			match name {
				"ifdef" | "ifndef" => {
					if !text::is_identifier(rest) {
						self.errs.push(error(format!("#{} expects a macro name", name)));
					}

					let defined = self.macros.contains_key(rest);
					conditions.push(Condition { active: active && defined == (name == "ifdef"), parent_active: active, seen_else: false, line });
				},
				"else" => match conditions.last_mut() {
					Some(c) if !c.seen_else => {
						c.seen_else = true;
						c.active = c.parent_active && !c.active;
					},
					Some(_) => self.errs.push(error(String::from("#else after #else"))),
					None => self.errs.push(error(String::from("#else without #ifdef or #ifndef"))),
				},
				"endif" => if conditions.pop().is_none() {
					self.errs.push(error(String::from("#endif without #ifdef or #ifndef")));
				},
				_ if !active => {},
				"define" => {
					let (macro_name, value) = match rest.split_once(|c: char| c.is_whitespace()) {
						Some((macro_name, value)) => (macro_name, value.trim()),
						None => (rest, ""),
					};

					if macro_name.contains('(') {
						self.errs.push(error(format!("function-like macro '{}' is not supported", macro_name)));
					} else if !text::is_identifier(macro_name) {
						self.errs.push(error(format!("invalid macro name '{}'", macro_name)));
					} else {
						log::debug!("#define {} {}", macro_name, value);
						self.define(macro_name, value);
					}
				},
				"undef" => {
					if text::is_identifier(rest) {
						self.macros.remove(rest);
					} else {
						self.errs.push(error(String::from("#undef expects a macro name")));
					}
				},
				"include" => {
					if depth + 1 >= MAX_INCLUDE_DEPTH {
						self.errs.push(error(format!("#include nested more than {} levels deep", MAX_INCLUDE_DEPTH)));
					} else if let Err(message) = self.include(rest, file, depth) {
						self.errs.push(error(message));
					}
				},
				"line" => {
					let mut args = rest.splitn(2, |c: char| c.is_whitespace());

					match args.next().and_then(text::parse_number).and_then(|n| usize::try_from(n).ok()) {
						Some(number) => {
							position.base = number;
							position.anchor = line + 1;

							if let Some(name) = args.next().map(str::trim).filter(|n| !n.is_empty()) {
								position.file = PathBuf::from(text::unquoted(name));
							}
						},
						None => self.errs.push(error(String::from("#line expects a line number"))),
					}
				},
				_ => self.errs.push(error(format!("unknown directive '#{}'", name))),
			}
		}

		if let Some(c) = conditions.last() {
			self.errs.push(Error::new(file.to_path_buf(), Some(c.line), ErrorKind::Preprocess(String::from("unterminated #ifdef or #ifndef"))));
		}
	}

	fn include(&mut self, target: &str, from: &Path, depth: usize) -> std::result::Result<(), String> {
		let (name, local) = if let Some(name) = target.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
			(name, true)
		} else if let Some(name) = target.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
			(name, false)
		} else {
			return Err(String::from("#include expects \"file\" or <file>"));
		};

		let here = from.parent().map(|dir| dir.join(name)).filter(|_| local);
		let candidates = here.into_iter().chain(self.include_dirs.iter().map(|dir| dir.join(name))).collect::<Vec<PathBuf>>();
		let loader = self.loader;

		for candidate in candidates {
			if let Ok(source) = loader.load(&candidate) {
				log::debug!("Including '{}'.", candidate.display());
				self.file(&source, &candidate, depth + 1);
				return Ok(());
			}
		}

		Err(format!("couldn't find included file '{}'", name))
	}

	fn source_line(&mut self, raw: &str, file: &Path, line: usize, reported_file: &Path, reported: usize) {
		let expanded = match self.expand(raw) {
			Ok(expanded) => expanded,
			Err(message) => {
				self.errs.push(Error::new(file.to_path_buf(), Some(line), ErrorKind::Preprocess(message)));
				return;
			}
		};

		let in_sync = matches!(&self.next, Some((f, l)) if f == reported_file && *l == reported);

		if !in_sync {
			self.out.push_str(&format!("#line {} \"{}\"\n", reported, reported_file.display()));
		}

		self.out.push_str(&expanded);
		self.out.push('\n');
		self.next = Some((reported_file.to_path_buf(), reported + 1));
	}

	fn expand(&self, raw: &str) -> std::result::Result<String, String> {
		let mut out = String::with_capacity(raw.len());
		let mut expanding = Vec::new();

		self.substitute(raw, &mut expanding, &mut out)?;
		Ok(out)
	}

	// Replaces whole words naming a macro, leaving string literals and comments alone. A replacement is
	// expanded in turn, except for the macros already being expanded, which stay as they are.
	fn substitute<'m>(&'m self, line: &str, expanding: &mut Vec<&'m str>, out: &mut String) -> std::result::Result<(), String> {
		let mut rest = line;
		let mut in_string = false;

		while let Some(c) = rest.chars().next() {
			if !in_string && c == ';' {
				out.push_str(rest);
				break;
			}

			if !in_string && is_word_char(c) {
				let end = rest.find(|ch: char| !is_word_char(ch)).unwrap_or(rest.len());
				let word = &rest[..end];

				match self.macros.get_key_value(word) {
					Some((name, value)) if text::is_identifier(word) && !expanding.contains(&name.as_str()) => {
						if expanding.len() >= MAX_NESTING {
							return Err(format!("macro expansion nested more than {} levels deep", MAX_NESTING));
						}

						expanding.push(name);
						self.substitute(value, expanding, out)?;
						expanding.pop();
					},
					_ => out.push_str(word),
				}

				if out.len() > MAX_EXPANSION {
					return Err(format!("macro expansion grows past {} bytes", MAX_EXPANSION));
				}

				rest = &rest[end..];
				continue;
			}

			if c == '"' { in_string = !in_string; }

			out.push(c);
			rest = &rest[c.len_utf8()..];
		}

		Ok(())
	}
}

fn is_word_char(c: char) -> bool {
	c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

fn strip_comment(s: &str) -> &str {
	let mut in_string = false;

	for (i, c) in s.char_indices() {
		match c {
			'"' => in_string = !in_string,
			';' if !in_string => return s[..i].trim_end(),
			_ => {}
		}
	}

	s.trim_end()
}

//--> Tests <--

#[cfg(test)]
mod tests {
	use super::*;

	// Serves files out of a map instead of the disk.
	struct MemoryLoader(HashMap<PathBuf, String>);

	impl SourceLoader for MemoryLoader {
		fn load(&self, path: &Path) -> io::Result<String> {
			self.0.get(path).cloned().ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
		}
	}

	fn loader(files: &[(&str, &str)]) -> MemoryLoader {
		MemoryLoader(files.iter().map(|(p, s)| (PathBuf::from(*p), s.to_string())).collect())
	}

	fn run(source: &str, files: &[(&str, &str)]) -> Result {
		let loader = loader(files);
		Preprocessor::new(&loader).process(source, Path::new("main.asm"))
	}

	fn ok(source: &str, files: &[(&str, &str)]) -> String {
		match run(source, files) {
			Ok(out) => out,
			Err(errs) => panic!("{:?}", errs),
		}
	}

	#[test]
	fn plain_source_passes_through() {
		assert_eq!(ok("NOP\nCLS", &[]), "NOP\nCLS\n");
	}

	#[test]
	fn object_macros_expand_whole_words() {
		let out = ok("#define SPEED 0x10\nLD N1, SPEED\nLD N1, SPEEDY\nDS \"SPEED\" ; SPEED", &[]);
		assert_eq!(out, "#line 2 \"main.asm\"\nLD N1, 0x10\nLD N1, SPEEDY\nDS \"SPEED\" ; SPEED\n");
	}

	#[test]
	fn macros_rescan_and_undefine() {
		let out = ok("#define A B\n#define B 7\nDB A\n#undef B\nDB A", &[]);
		assert_eq!(out, "#line 3 \"main.asm\"\nDB 7\n#line 5 \"main.asm\"\nDB B\n");
	}

	#[test]
	fn macros_never_expand_inside_themselves() {
		assert_eq!(ok("#define A B\n#define B A\nDB A, B", &[]), "#line 3 \"main.asm\"\nDB A, B\n");
		assert_eq!(ok("#define X X+1\nDB X", &[]), "#line 2 \"main.asm\"\nDB X+1\n");
		assert_eq!(ok("#define A A A\nDB A", &[]), "#line 2 \"main.asm\"\nDB A A\n");
		assert_eq!(ok("#define TWO ONE+ONE\n#define ONE 1\nDB TWO", &[]), "#line 3 \"main.asm\"\nDB 1+1\n");
	}

	#[test]
	fn runaway_expansion_is_reported() {
		let mut source = (0..24).map(|i| format!("#define M{} M{} M{}\n", i, i + 1, i + 1)).collect::<String>();
		source.push_str("DB M0");

		let errs = run(&source, &[]).unwrap_err();
		assert_eq!(errs.len(), 1);
		assert_eq!(errs[0].line, Some(25));
	}

	#[test]
	fn conditionals_nest() {
		let source = "#define DEBUG\n#ifdef DEBUG\nA\n#ifndef DEBUG\nB\n#else\nC\n#endif\n#else\nD\n#endif\nE";
		let out = ok(source, &[]);
		let lines = out.lines().filter(|l| !l.starts_with("#line")).collect::<Vec<&str>>();

		assert_eq!(lines, vec!["A", "C", "E"]);
	}

	#[test]
	fn unbalanced_conditionals() {
		assert!(run("#ifdef X\nNOP", &[]).is_err());
		assert!(run("#endif", &[]).is_err());
		assert!(run("#else", &[]).is_err());
		assert!(run("#ifdef X\n#else\n#else\n#endif", &[]).is_err());
	}

	#[test]
	fn includes_are_marked_with_their_file() {
		let out = ok("NOP\n#include \"lib.asm\"\nRET", &[("lib.asm", "CLS\nHLT")]);
		assert_eq!(out, "NOP\n#line 1 \"lib.asm\"\nCLS\nHLT\n#line 3 \"main.asm\"\nRET\n");
	}

	#[test]
	fn include_dirs_are_searched() {
		let loader = loader(&[("inc/defs.asm", "#define ONE 1")]);
		let mut pre = Preprocessor::new(&loader);
		pre.include_dir(PathBuf::from("inc"));

		let out = pre.process("#include <defs.asm>\nDB ONE", Path::new("main.asm"));
		assert_eq!(out.ok().as_deref(), Some("#line 2 \"main.asm\"\nDB 1\n"));
	}

	#[test]
	fn include_guards_work() {
		let guarded = "#ifndef GUARD\n#define GUARD\nNOP\n#endif";
		let out = ok("#include \"g.asm\"\n#include \"g.asm\"", &[("g.asm", guarded)]);
		assert_eq!(out.matches("NOP").count(), 1);
	}

	#[test]
	fn include_errors() {
		assert!(run("#include \"missing.asm\"", &[]).is_err());
		assert!(run("#include missing.asm", &[]).is_err());

		let errs = run("#include \"self.asm\"", &[("self.asm", "#include \"self.asm\"")]).unwrap_err();
		assert_eq!(errs.len(), 1);
	}

	#[test]
	fn bad_directives() {
		assert!(run("#pragma once", &[]).is_err());
		assert!(run("#define F(x) x", &[]).is_err());
		assert!(run("#define 9lives", &[]).is_err());
		assert!(run("#line", &[]).is_err());
	}

	#[test]
	fn predefined_macros_and_comments_on_defines() {
		let loader = loader(&[]);
		let mut pre = Preprocessor::new(&loader);
		pre.define("MODEL", "2");

		let out = pre.process("#define LIMIT 9 ; upper bound\nDB MODEL, LIMIT", Path::new("main.asm"));
		assert_eq!(out.ok().as_deref(), Some("#line 2 \"main.asm\"\nDB 2, 9\n"));
	}

	#[test]
	fn line_directives_move_reported_positions() {
		let out = ok("#line 40 \"gen.asm\"\nNOP\nCLS", &[]);
		assert_eq!(out, "#line 40 \"gen.asm\"\nNOP\nCLS\n");
	}
}
