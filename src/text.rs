//--> Functions <--

// Parses an integer literal the way the C library does with base 0: an optional sign, then `0x`/`0X` for hex,
// a leading `0` for octal, decimal otherwise. The whole string has to be consumed.
pub fn parse_number(s: &str) -> Option<i64> {
	let (negative, digits) = if let Some(rest) = s.strip_prefix('-') {
		(true, rest)
	} else if let Some(rest) = s.strip_prefix('+') {
		(false, rest)
	} else { (false, s) };

	let (radix, digits) = if let Some(rest) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
		(16, rest)
	} else if digits.len() > 1 && digits.starts_with('0') {
		(8, &digits[1..])
	} else { (10, digits) };

	// from_str_radix would accept a second sign here, we don't.
	if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) { return None }

	let magnitude = i64::from_str_radix(digits, radix).ok()?;

	Some(if negative { -magnitude } else { magnitude })
}

pub fn is_number(s: &str) -> bool { parse_number(s).is_some() }

pub fn is_identifier(s: &str) -> bool {
	match s.chars().next() {
		Some(first) if !first.is_ascii_digit() => s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.'),
		_ => false
	}
}

pub fn is_string(s: &str) -> bool {
	s.len() >= 2 && s.starts_with('"') && s.ends_with('"')
}

pub fn unquoted(s: &str) -> &str {
	if is_string(s) { &s[1..s.len() - 1] } else { s }
}

pub fn hex_digit(c: char) -> Option<u8> {
	c.to_digit(16).map(|d| d as u8)
}

//--> Tests <--
