//--> Imports <--

use byteorder::{
	ByteOrder,
	LittleEndian,
};

use crate::{
	text,
	Error,
	ErrorKind,
};

use super::parser::Instruction;

//--> Type Aliases <--

type Result = std::result::Result<(), Error>;

//--> Constants <--

// Addresses are 16 bits wide, so nothing is ever placed at or past this offset.
pub const IMAGE_LIMIT: usize = 0x10000;

//--> Traits <--

// What a pass does with the effects of a directive. Counting offsets and writing bytes are both sinks,
// which is what keeps the two passes in step.
pub trait Sink {
	fn position(&self) -> usize;

	fn seek(&mut self, to: usize);

	fn emit(&mut self, bytes: &[u8]) -> std::result::Result<(), ErrorKind>;

	// An ordinary instruction, one machine word.
	fn instruction(&mut self, ins: &Instruction) -> Result;
}

//--> Functions <--

pub fn process<S: Sink>(ins: &Instruction, sink: &mut S) -> Result {
	match ins.mnemonic.as_str() {
		"SEEK" => seek(ins, sink)?,
		"DUP" => dup(ins, sink)?,
		"DB" | "DW" | "DD" | "DS" => {
			let bytes = data_bytes(ins)?;
			sink.emit(&bytes).map_err(|kind| ins.error(kind))?;
		},
		_ => sink.instruction(ins)?,
	}

	let end = sink.position();

	if end > IMAGE_LIMIT {
		return Err(ins.error(ErrorKind::OutOfRange { what: String::from("output offset"), value: end as i64, min: 0, max: IMAGE_LIMIT as i64 }));
	}

	Ok(())
}

fn malformed(ins: &Instruction, reason: &str) -> Error {
	ins.error(ErrorKind::MalformedDirective { directive: ins.mnemonic.clone(), reason: String::from(reason) })
}

fn count(arg: &str) -> Option<usize> {
	text::parse_number(arg).and_then(|n| usize::try_from(n).ok())
}

fn seek<S: Sink>(ins: &Instruction, sink: &mut S) -> Result {
	let to = match ins.arguments.as_slice() {
		[target] => count(target).ok_or_else(|| malformed(ins, "the target must be a non-negative number"))?,
		_ => return Err(malformed(ins, "expected exactly one target address")),
	};

	let from = sink.position();

	if to > IMAGE_LIMIT {
		return Err(ins.error(ErrorKind::OutOfRange { what: String::from("SEEK target"), value: to as i64, min: from as i64, max: IMAGE_LIMIT as i64 }));
	}

	if to < from {
		return Err(ins.error(ErrorKind::BackwardSeek { from, to }));
	}

	sink.seek(to);
	Ok(())
}

fn dup<S: Sink>(ins: &Instruction, sink: &mut S) -> Result {
	let (times, inner) = match ins.arguments.as_slice() {
		[times, mnemonic, arguments @ ..] => {
			let times = count(times).ok_or_else(|| malformed(ins, "the count must be a non-negative number"))?;
			(times, ins.synthesize(mnemonic, arguments))
		},
		_ => return Err(malformed(ins, "expected a count and an instruction")),
	};

	for _ in 0..times {
		let before = sink.position();

		process(&inner, sink)?;

		// Once a repeat leaves the position alone, so will every later one.
		if sink.position() == before { break }
	}

	Ok(())
}

// The bytes a DB, DW, DD or DS directive inserts.
pub fn data_bytes(ins: &Instruction) -> std::result::Result<Vec<u8>, Error> {
	let width = match ins.mnemonic.as_str() {
		"DS" => return match ins.arguments.as_slice() {
			[string] if text::is_string(string) => Ok(text::unquoted(string).as_bytes().to_vec()),
			_ => Err(malformed(ins, "expected exactly one string literal")),
		},
		"DB" => 1,
		"DW" => 2,
		"DD" => 4,
		_ => return Err(malformed(ins, "not a data directive")),
	};

	let min = -(1i64 << (8 * width - 1));
	let max = (1i64 << (8 * width)) - 1;
	let mut bytes = vec![0u8; ins.arguments.len() * width];

	for (i, (arg, chunk)) in ins.arguments.iter().zip(bytes.chunks_mut(width)).enumerate() {
		let value = text::parse_number(arg).ok_or_else(|| malformed(ins, &format!("argument {} is not a number", i)))?;

		if value < min || value > max {
			return Err(ins.error(ErrorKind::OutOfRange { what: format!("{} value", ins.mnemonic), value, min, max }));
		}

		match width {
			1 => chunk[0] = value as u8,
			2 => LittleEndian::write_u16(chunk, value as u16),
			_ => LittleEndian::write_u32(chunk, value as u32),
		}
	}

	Ok(bytes)
}

//--> Tests <--

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use super::*;

	// Records everything it is asked to do.
	#[derive(Default)]
	struct Recorder {
		position: usize,
		events: Vec<String>,
	}

	impl Sink for Recorder {
		fn position(&self) -> usize { self.position }

		fn seek(&mut self, to: usize) {
			self.events.push(format!("seek {}", to));
			self.position = to;
		}

		fn emit(&mut self, bytes: &[u8]) -> std::result::Result<(), ErrorKind> {
			self.events.push(format!("emit {:02X?}", bytes));
			self.position += bytes.len();
			Ok(())
		}

		fn instruction(&mut self, ins: &Instruction) -> Result {
			self.events.push(format!("ins {}", ins));
			self.position += 3;
			Ok(())
		}
	}

	fn ins(mnemonic: &str, arguments: &[&str]) -> Instruction {
		Instruction {
			label: None,
			mnemonic: String::from(mnemonic),
			arguments: arguments.iter().map(|a| a.to_string()).collect(),
			line: 5,
			file: PathBuf::from("data.asm"),
		}
	}

	fn run(instructions: &[Instruction]) -> std::result::Result<Recorder, Error> {
		let mut recorder = Recorder::default();

		for i in instructions {
			process(i, &mut recorder)?;
		}

		Ok(recorder)
	}

	#[test]
	fn data_is_little_endian() {
		assert_eq!(data_bytes(&ins("DB", &["1", "0xFF", "-1"])).ok(), Some(vec![0x01, 0xFF, 0xFF]));
		assert_eq!(data_bytes(&ins("DW", &["0x1234"])).ok(), Some(vec![0x34, 0x12]));
		assert_eq!(data_bytes(&ins("DD", &["0x12345678", "-2"])).ok(), Some(vec![0x78, 0x56, 0x34, 0x12, 0xFE, 0xFF, 0xFF, 0xFF]));
		assert_eq!(data_bytes(&ins("DB", &[])).ok(), Some(vec![]));
	}

	#[test]
	fn strings_are_copied_verbatim() {
		assert_eq!(data_bytes(&ins("DS", &["\"Hi\\n\""])).ok(), Some(b"Hi\\n".to_vec()));
		assert!(data_bytes(&ins("DS", &["Hi"])).is_err());
		assert!(data_bytes(&ins("DS", &["\"a\"", "\"b\""])).is_err());
	}

	#[test]
	fn data_out_of_range() {
		let err = data_bytes(&ins("DB", &["256"])).unwrap_err();
		assert!(matches!(err.kind, ErrorKind::OutOfRange { value: 256, .. }));
		assert_eq!(err.line, Some(5));

		assert!(data_bytes(&ins("DB", &["-129"])).is_err());
		assert!(data_bytes(&ins("DW", &["65536"])).is_err());
		assert!(data_bytes(&ins("DW", &["65535"])).is_ok());
		assert!(matches!(data_bytes(&ins("DB", &["1", "x"])).map_err(|e| e.kind), Err(ErrorKind::MalformedDirective { .. })));
	}

	#[test]
	fn seek_moves_forward_only() {
		let recorder = run(&[ins("SEEK", &["4"]), ins("SEEK", &["4"]), ins("NOP", &[])]).ok();
		assert_eq!(recorder.map(|r| r.position), Some(7));

		let err = run(&[ins("SEEK", &["4"]), ins("SEEK", &["2"])]).err().map(|e| e.kind);
		assert_eq!(err, Some(ErrorKind::BackwardSeek { from: 4, to: 2 }));
	}

	#[test]
	fn seek_stays_inside_the_address_space() {
		let recorder = run(&[ins("SEEK", &["0x10000"])]).ok();
		assert_eq!(recorder.map(|r| r.position), Some(IMAGE_LIMIT));

		let err = run(&[ins("SEEK", &["0x7FFFFFFFFFFF"])]).err().map(|e| e.kind);
		assert!(matches!(err, Some(ErrorKind::OutOfRange { value: 0x7FFFFFFFFFFF, .. })));
	}

	#[test]
	fn output_past_the_address_space_fails() {
		let err = run(&[ins("SEEK", &["0xFFFF"]), ins("DW", &["1"])]).err().map(|e| e.kind);
		assert!(matches!(err, Some(ErrorKind::OutOfRange { value: 0x10001, .. })));

		assert!(run(&[ins("SEEK", &["0xFFFF"]), ins("DB", &["1"])]).is_ok());
	}

	#[test]
	fn malformed_seek() {
		for args in [&[][..], &["1", "2"][..], &["-1"][..], &["there"][..]] {
			let err = run(&[ins("SEEK", args)]).err().map(|e| e.kind);
			assert!(matches!(err, Some(ErrorKind::MalformedDirective { .. })), "{:?}", args);
		}
	}

	#[test]
	fn dup_replays_the_inner_directive() {
		let recorder = run(&[ins("DUP", &["3", "add", "N1", "B2"])]).ok();
		let events = recorder.map(|r| r.events);

		assert_eq!(events, Some(vec!["ins ADD N1, B2".to_string(); 3]));
	}

	#[test]
	fn dup_nests_pseudo_instructions() {
		let recorder = run(&[ins("DUP", &["2", "DB", "7", "8"])]).ok();
		assert_eq!(recorder.map(|r| r.events), Some(vec!["emit [07, 08]".to_string(); 2]));

		let recorder = run(&[ins("DUP", &["0", "NOP"])]).ok();
		assert_eq!(recorder.map(|r| r.position), Some(0));
	}

	#[test]
	fn huge_dup_counts_stop_early() {
		let err = run(&[ins("DUP", &["0xFFFFFFFFFFFF", "NOP"])]).err().map(|e| e.kind);
		assert!(matches!(err, Some(ErrorKind::OutOfRange { value: 0x10002, .. })));

		let recorder = run(&[ins("DUP", &["0xFFFFFFFFFFFF", "DUP", "0xFFFFFFFFFFFF", "SEEK", "6"])]).ok();
		assert_eq!(recorder.map(|r| r.events), Some(vec!["seek 6".to_string(); 3]));
	}

	#[test]
	fn malformed_dup() {
		for args in [&["3"][..], &["-1", "NOP"][..], &["many", "NOP"][..]] {
			let err = run(&[ins("DUP", args)]).err().map(|e| e.kind);
			assert!(matches!(err, Some(ErrorKind::MalformedDirective { .. })), "{:?}", args);
		}
	}
}
