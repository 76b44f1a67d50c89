//! Decoder for the btrfs-progs backslash-escape convention.
//!
//! `btrfs receive --dump` renders paths and argument values as text, hiding
//! whitespace and control bytes behind backslash escapes. This module
//! reverses that rendering into raw bytes in a single left-to-right pass.
//!
//! The dump format leaves truncated escapes near the end of a field
//! under-specified. Rather than failing, the decoder degrades gracefully:
//! a trailing lone backslash or an octal escape with fewer than three digits
//! is consumed literally. Malformed input therefore never aborts a replay at
//! the decoding stage; structural problems are caught by the record grammar
//! instead.

/// Reverses the dump-stream escape convention into raw bytes.
///
/// Rules, applied in one pass:
///
/// - `\a \b \e \f \n \r \t \v` decode to the corresponding control byte.
/// - `\` followed by exactly three octal digits decodes to the byte with
///   that octal value (`\061` is `0x31`).
/// - `\` followed by any other single character yields that character.
/// - Any unescaped character yields itself.
#[must_use]
pub fn unescape(input: &str) -> Vec<u8> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'\\' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }

        i += 1;
        let Some(&next) = bytes.get(i) else {
            // Lone trailing backslash: consume it literally.
            out.push(b'\\');
            break;
        };

        if let Some(control) = control_escape(next) {
            out.push(control);
            i += 1;
        } else if next.is_ascii_digit() {
            match octal_escape(&bytes[i..]) {
                Some(value) => {
                    out.push(value);
                    i += 3;
                }
                None => {
                    // Truncated or non-octal sequence: fall back to taking
                    // the character literally.
                    out.push(next);
                    i += 1;
                }
            }
        } else {
            out.push(next);
            i += 1;
        }
    }

    out
}

/// Maps the single-letter escapes to their control bytes.
const fn control_escape(byte: u8) -> Option<u8> {
    match byte {
        b'a' => Some(0x07),
        b'b' => Some(0x08),
        b'e' => Some(0x1b),
        b'f' => Some(0x0c),
        b'n' => Some(b'\n'),
        b'r' => Some(b'\r'),
        b't' => Some(b'\t'),
        b'v' => Some(0x0b),
        _ => None,
    }
}

/// Decodes exactly three octal digits at the start of `rest`, if present.
fn octal_escape(rest: &[u8]) -> Option<u8> {
    if rest.len() < 3 {
        return None;
    }
    let mut value: u16 = 0;
    for &digit in &rest[..3] {
        if !(b'0'..=b'7').contains(&digit) {
            return None;
        }
        value = value * 8 + u16::from(digit - b'0');
    }
    u8::try_from(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(unescape("hello"), b"hello");
    }

    #[test]
    fn control_escapes_decode() {
        assert_eq!(
            unescape(r"\a\b\e\f\n\r\t\v"),
            &[0x07, 0x08, 0x1b, 0x0c, 0x0a, 0x0d, 0x09, 0x0b]
        );
    }

    #[test]
    fn octal_escape_decodes_to_byte() {
        assert_eq!(unescape(r"\061"), b"1");
        assert_eq!(unescape(r"\134"), b"\\");
        assert_eq!(unescape(r"a\040b"), b"a b");
    }

    #[test]
    fn escaped_space_and_backslash() {
        assert_eq!(unescape(r"with\ space"), b"with space");
        assert_eq!(unescape(r"back\\slash"), b"back\\slash");
    }

    #[test]
    fn truncated_octal_is_literal() {
        assert_eq!(unescape(r"\06"), b"06");
        assert_eq!(unescape(r"end\1"), b"end1");
    }

    #[test]
    fn non_octal_digits_are_literal() {
        // 8 and 9 can never start a valid octal escape.
        assert_eq!(unescape(r"\89"), b"89");
        assert_eq!(unescape(r"\091"), b"091");
    }

    #[test]
    fn lone_trailing_backslash_is_literal() {
        assert_eq!(unescape("tail\\"), b"tail\\");
    }

    #[test]
    fn octal_overflow_falls_back() {
        // \777 is 511, out of byte range; the digits are taken literally.
        assert_eq!(unescape(r"\777"), b"777");
    }

    proptest! {
        // The decoder is total: it never panics and never grows the input.
        #[test]
        fn decoding_is_total(input in ".*") {
            let decoded = unescape(&input);
            prop_assert!(decoded.len() <= input.len());
        }

        #[test]
        fn unescaped_ascii_is_identity(input in "[a-z0-9./_-]*") {
            prop_assert_eq!(unescape(&input), input.as_bytes());
        }
    }
}
