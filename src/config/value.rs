//! Typed interpretation of raw config values.

use super::model::ConfigFile;
use crate::error::{BorpError, Result};
use data_encoding::{BASE64, HEXLOWER_PERMISSIVE};
use serde::Serialize;
use std::fmt;

/// A config value classified by its shape.
///
/// Borg's config files carry no type information, so this is a best guess
/// from the text alone. Use the typed getters on [`ConfigFile`] when the
/// expected type of a key is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Int(u64),
    Hex(String),
    Base64(Vec<u8>),
    Text(String),
}

impl Value {
    /// Classify a raw value.
    ///
    /// All digits is an integer, all hex digits is hex, a multi-line value
    /// that decodes as base64 is binary, and anything else is text.
    pub fn classify(raw: &str) -> Self {
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit())
            && let Ok(n) = raw.parse()
        {
            return Value::Int(n);
        }
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Value::Hex(raw.to_string());
        }
        if raw.contains('\n')
            && let Ok(bytes) = decode_base64(raw)
        {
            return Value::Base64(bytes);
        }
        Value::Text(raw.to_string())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Hex(_) => "hex",
            Value::Base64(_) => "base64",
            Value::Text(_) => "text",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Hex(s) | Value::Text(s) => f.write_str(s),
            Value::Base64(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

/// Decode a possibly multi-line base64 value.
pub fn decode_base64(raw: &str) -> std::result::Result<Vec<u8>, data_encoding::DecodeError> {
    let joined: String = raw.split_whitespace().collect();
    BASE64.decode(joined.as_bytes())
}

/// Decode a hex value (either case).
pub fn decode_hex(raw: &str) -> std::result::Result<Vec<u8>, data_encoding::DecodeError> {
    HEXLOWER_PERMISSIVE.decode(raw.trim().as_bytes())
}

/// Parse a size with an optional decimal suffix (`K`, `M`, `G`, `T`, `P`).
///
/// `"10G"` is 10_000_000_000 and `"1.5M"` is 1_500_000, as in Borg.
pub fn parse_file_size(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    let (number, factor) = match raw.chars().last()? {
        'K' => (&raw[..raw.len() - 1], 1e3),
        'M' => (&raw[..raw.len() - 1], 1e6),
        'G' => (&raw[..raw.len() - 1], 1e9),
        'T' => (&raw[..raw.len() - 1], 1e12),
        'P' => (&raw[..raw.len() - 1], 1e15),
        _ => (raw, 1.0),
    };

    if let Ok(n) = number.parse::<u64>() {
        return n.checked_mul(factor as u64);
    }
    let n: f64 = number.parse().ok()?;
    let size = n * factor;
    if !size.is_finite() || size < 0.0 || size > u64::MAX as f64 {
        return None;
    }
    Some(size as u64)
}

/// Parse a configparser-style boolean.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Some(true),
        "0" | "no" | "false" | "off" => Some(false),
        _ => None,
    }
}

fn invalid(section: &str, key: &str, expected: &str, raw: &str) -> BorpError {
    BorpError::ConfigError(format!(
        "{}.{}: expected {}, got '{}'",
        section, key, expected, raw
    ))
}

impl ConfigFile {
    /// Classified value of `section.key`.
    pub fn value(&self, section: &str, key: &str) -> Option<Value> {
        self.get(section, key).map(Value::classify)
    }

    pub fn get_int(&self, section: &str, key: &str) -> Result<Option<u64>> {
        self.get(section, key)
            .map(|raw| {
                raw.trim()
                    .parse()
                    .map_err(|_| invalid(section, key, "an integer", raw))
            })
            .transpose()
    }

    pub fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>> {
        self.get(section, key)
            .map(|raw| parse_bool(raw).ok_or_else(|| invalid(section, key, "a boolean", raw)))
            .transpose()
    }

    pub fn get_file_size(&self, section: &str, key: &str) -> Result<Option<u64>> {
        self.get(section, key)
            .map(|raw| parse_file_size(raw).ok_or_else(|| invalid(section, key, "a size", raw)))
            .transpose()
    }

    pub fn get_hex(&self, section: &str, key: &str) -> Result<Option<Vec<u8>>> {
        self.get(section, key)
            .map(|raw| decode_hex(raw).map_err(|_| invalid(section, key, "hex", raw)))
            .transpose()
    }

    pub fn get_base64(&self, section: &str, key: &str) -> Result<Option<Vec<u8>>> {
        self.get(section, key)
            .map(|raw| decode_base64(raw).map_err(|_| invalid(section, key, "base64", raw)))
            .transpose()
    }

    /// Non-empty text value of `section.key`.
    pub fn get_text(&self, section: &str, key: &str) -> Option<&str> {
        self.get(section, key).filter(|raw| !raw.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_values() {
        assert_eq!(Value::classify("1000"), Value::Int(1000));
        assert_eq!(
            Value::classify("57dc2bd1ff"),
            Value::Hex("57dc2bd1ff".to_string())
        );
        assert_eq!(
            Value::classify("/home/user/repo"),
            Value::Text("/home/user/repo".to_string())
        );
        assert_eq!(
            Value::classify("2017-08-01T12:00:00.000000"),
            Value::Text("2017-08-01T12:00:00.000000".to_string())
        );
        assert_eq!(Value::classify(""), Value::Text(String::new()));
        assert_eq!(Value::classify("aGVsbG8g\nd29ybGQ="), Value::Base64(b"hello world".to_vec()));
    }

    #[test]
    fn single_line_base64_is_text() {
        assert_eq!(
            Value::classify("aGVsbG8gd29ybGQ="),
            Value::Text("aGVsbG8gd29ybGQ=".to_string())
        );
    }

    #[test]
    fn integer_overflow_falls_back_to_hex() {
        let huge = "99999999999999999999999";
        assert_eq!(Value::classify(huge), Value::Hex(huge.to_string()));
    }

    #[test]
    fn file_sizes() {
        assert_eq!(parse_file_size("524288000"), Some(524_288_000));
        assert_eq!(parse_file_size("10G"), Some(10_000_000_000));
        assert_eq!(parse_file_size("1.5M"), Some(1_500_000));
        assert_eq!(parse_file_size("2K"), Some(2_000));
        assert_eq!(parse_file_size("0"), Some(0));
        assert_eq!(parse_file_size("10X"), None);
        assert_eq!(parse_file_size(""), None);
        assert_eq!(parse_file_size("-1"), None);
    }

    #[test]
    fn booleans() {
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("Yes"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn hex_accepts_either_case() {
        assert_eq!(decode_hex("00ff").unwrap(), vec![0x00, 0xff]);
        assert_eq!(decode_hex("00FF").unwrap(), vec![0x00, 0xff]);
        assert!(decode_hex("0g").is_err());
        assert!(decode_hex("abc").is_err());
    }

    #[test]
    fn value_display() {
        assert_eq!(Value::Int(5).to_string(), "5");
        assert_eq!(Value::Base64(vec![1, 2, 3]).to_string(), "<3 bytes>");
    }
}
