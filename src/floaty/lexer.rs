//--> Imports <--

use std::{
	fmt,
	ops::Range,
	path::Path,
};

use crate::{
	Error,
	ErrorKind,
	ErrorList,
};

use logos::Logos;

//--> Type Aliases <--

pub type TokenStream = Vec<Token>;

pub(crate) type Result = std::result::Result<TokenStream, ErrorList>;

//--> Structs <--

#[derive(Clone, Debug)]
pub struct Token {
	pub inner: TokenInner,
	pub span: Range<usize>,
	pub source: String
}

//--> Enums <--

// Commas and blanks both separate arguments, so everything else is either a quoted string or a word.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Logos)]
pub enum TokenInner {
	#[token(",")]
	Comma,

	#[regex(r#""[^"\n]*""#)]
	String,

	#[regex(r#"[^ \t\r\n\f,";]+"#)]
	Word,

	#[error]
	#[regex(r"[ \t\r\n\f]+", logos::skip)]
	#[regex(r";[^\n]*", logos::skip)]
	Error
}

//--> Functions <--

pub(crate) fn lex(text: &str, line: usize, file: &Path) -> Result {
	let mut tokens: TokenStream = Vec::new();
	let mut errs: ErrorList = Vec::new();

	for (token, span) in TokenInner::lexer(text).spanned() {
		if let TokenInner::Error = token {
			let message = if text[span.clone()].starts_with('"') {
				format!("unterminated string literal at column {}", span.start + 1)
			} else {
				format!("couldn't lex '{}' at column {}", &text[span.clone()], span.start + 1)
			};

			errs.push(Error::new(file.to_path_buf(), Some(line), ErrorKind::Syntax(message)));
		} else {
			tokens.push(Token::new(token, span.clone(), &text[span]));
		}
	}

	if errs.is_empty() { Ok(tokens) } else { Err(errs) }
}

impl Token {
	pub fn new(inner: TokenInner, span: Range<usize>, slice: &str) -> Token {
		Token { inner, span, source: String::from(slice) }
	}

	pub fn column(&self) -> usize { self.span.start + 1 }

	pub fn is_label(&self) -> bool {
		self.inner == TokenInner::Word && self.source.len() > 1 && self.source.ends_with(':')
	}
}

impl fmt::Display for Token {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self.inner {
			TokenInner::Comma => write!(f, "a comma"),
			TokenInner::String => write!(f, "a string literal {}", self.source),
			TokenInner::Word => write!(f, "'{}'", self.source),
			TokenInner::Error => write!(f, "an error"),
		}
	}
}

//--> Tests <--
