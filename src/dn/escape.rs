//! RFC 4514 attribute value escaping.

use thiserror::Error;

/// Errors raised while decoding an escaped attribute value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EscapeError {
    #[error("value ends with a lone backslash")]
    TrailingBackslash,
    #[error("escaped bytes do not form valid UTF-8")]
    InvalidUtf8,
}

/// Characters that must always be escaped inside a value
const SPECIAL: &[char] = &['"', '+', ',', ';', '<', '>', '\\', '='];

/// Escape a raw value for use in a distinguished name
pub fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 4);
    let last = value.chars().count().saturating_sub(1);

    for (i, c) in value.chars().enumerate() {
        match c {
            '\0' => out.push_str("\\00"),
            c if SPECIAL.contains(&c) => {
                out.push('\\');
                out.push(c);
            }
            '#' | ' ' if i == 0 => {
                out.push('\\');
                out.push(c);
            }
            ' ' if i == last => out.push_str("\\ "),
            c => out.push(c),
        }
    }
    out
}

/// Decode backslash escapes (`\,` and `\2C` forms) in a value
pub fn unescape_value(value: &str) -> Result<String, EscapeError> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'\\' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }

        let rest = &bytes[i + 1..];
        match rest {
            [] => return Err(EscapeError::TrailingBackslash),
            [hi, lo, ..] if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => {
                out.push(hex_pair(*hi, *lo));
                i += 3;
            }
            _ => {
                // The escaped character may be multi-byte; copy it whole.
                let ch_len = value[i + 1..].chars().next().map_or(1, char::len_utf8);
                out.extend_from_slice(&rest[..ch_len]);
                i += 1 + ch_len;
            }
        }
    }

    String::from_utf8(out).map_err(|_| EscapeError::InvalidUtf8)
}

fn hex_pair(hi: u8, lo: u8) -> u8 {
    fn nibble(b: u8) -> u8 {
        match b {
            b'0'..=b'9' => b - b'0',
            b'a'..=b'f' => b - b'a' + 10,
            _ => b - b'A' + 10,
        }
    }
    (nibble(hi) << 4) | nibble(lo)
}
