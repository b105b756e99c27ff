//! Code page encoding for western thermal printers
//!
//! Receipts are printed with code page 16 (Windows-1252), which covers the
//! Latin alphabets and the euro sign. Characters outside the code page are
//! printed as `?`.

use std::borrow::Cow;

use encoding_rs::WINDOWS_1252;

/// ESC t 16 - select Windows-1252
pub const SELECT_CP1252: [u8; 3] = [0x1B, 0x74, 16];

/// Encode UTF-8 text for the printer
pub fn encode_text(s: &str) -> Cow<'_, [u8]> {
    if s.is_ascii() {
        return Cow::Borrowed(s.as_bytes());
    }

    let (cow, _, had_errors) = WINDOWS_1252.encode(s);
    if !had_errors {
        return Cow::Owned(cow.into_owned());
    }

    // encoding_rs substitutes HTML numeric references for unmappable
    // characters; printers want a single placeholder instead.
    let mut out = Vec::with_capacity(s.len());
    let mut tmp = [0u8; 4];
    for c in s.chars() {
        let (bytes, _, unmappable) = WINDOWS_1252.encode(c.encode_utf8(&mut tmp));
        if unmappable {
            out.push(b'?');
        } else {
            out.extend_from_slice(&bytes);
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_is_borrowed() {
        assert!(matches!(encode_text("hello"), Cow::Borrowed(b"hello")));
    }

    #[test]
    fn test_latin_and_euro() {
        assert_eq!(encode_text("Caffè 1,50€").as_ref(), b"Caff\xe8 1,50\x80");
    }

    #[test]
    fn test_unmappable_becomes_placeholder() {
        assert_eq!(encode_text("a你b").as_ref(), b"a?b");
    }
}
