//! Text encodings for stored values
//!
//! Values are strings; the encoding decides how they become file bytes.
//! Changing the encoding only affects later reads and writes, existing files
//! are never re-encoded.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Codec used between stored strings and file contents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// Value is written as UTF-8 bytes
    #[default]
    #[serde(alias = "utf-8")]
    Utf8,
    /// Value must be 7-bit ASCII
    Ascii,
    /// Value is base64 text; the decoded bytes are written
    Base64,
}

impl Encoding {
    /// Convert a value to the bytes written to disk
    pub fn encode(&self, value: &str) -> Result<Vec<u8>, String> {
        match self {
            Encoding::Utf8 => Ok(value.as_bytes().to_vec()),
            Encoding::Ascii => {
                if value.is_ascii() {
                    Ok(value.as_bytes().to_vec())
                } else {
                    Err("value contains non-ASCII characters".to_string())
                }
            }
            Encoding::Base64 => STANDARD
                .decode(value)
                .map_err(|e| format!("value is not valid base64: {}", e)),
        }
    }

    /// Convert file bytes back to a value
    pub fn decode(&self, bytes: Vec<u8>) -> Result<String, String> {
        match self {
            Encoding::Utf8 => {
                String::from_utf8(bytes).map_err(|e| format!("file is not valid UTF-8: {}", e))
            }
            Encoding::Ascii => {
                if bytes.is_ascii() {
                    // ASCII is a subset of UTF-8
                    String::from_utf8(bytes).map_err(|e| e.to_string())
                } else {
                    Err("file contains non-ASCII bytes".to_string())
                }
            }
            Encoding::Base64 => Ok(STANDARD.encode(bytes)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf8",
            Encoding::Ascii => "ascii",
            Encoding::Base64 => "base64",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(Encoding::Utf8),
            "ascii" => Ok(Encoding::Ascii),
            "base64" => Ok(Encoding::Base64),
            other => Err(format!(
                "Unknown encoding: '{}'. Valid encodings: utf8, ascii, base64",
                other
            )),
        }
    }
}
