//! Keyboard-layout transcoding for `KEY -61` payloads.
//!
//! Clients send characters outside ASCII as raw UTF-8 under the `-61` code.
//! The server converts the character into a single byte of the configured
//! layout charset and types that byte as a KeySym.

use std::fmt;

use thiserror::Error;

/// Errors produced while transcoding a raw UTF-8 key payload.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversionError {
    /// The configured layout label names no supported charset.
    #[error("unsupported keyboard layout: {0}")]
    UnsupportedLayout(String),

    /// The payload was empty or held more than one character.
    #[error("expected exactly one character, got {0}")]
    NotSingleCharacter(usize),

    /// The character has no single-byte encoding in the charset.
    #[error("character {ch:?} cannot be encoded in {charset}")]
    Unencodable { ch: char, charset: Charset },
}

/// Single-byte charsets a keyboard layout can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    /// ISO-8859-1.
    Latin1,
    /// ISO-8859-15: Latin-1 with the euro sign and a few French/Finnish letters.
    Latin9,
    /// US-ASCII.
    Ascii,
}

/// Code points ISO-8859-15 places differently from ISO-8859-1.
const LATIN9_OVERRIDES: [(u8, char); 8] = [
    (0xA4, '\u{20AC}'),
    (0xA6, '\u{0160}'),
    (0xA8, '\u{0161}'),
    (0xB4, '\u{017D}'),
    (0xB8, '\u{017E}'),
    (0xBC, '\u{0152}'),
    (0xBD, '\u{0153}'),
    (0xBE, '\u{0178}'),
];

impl Charset {
    /// Looks up a charset by its layout label, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::UnsupportedLayout`] for unknown labels.
    pub fn from_label(label: &str) -> Result<Self, ConversionError> {
        match label.trim().to_ascii_lowercase().as_str() {
            "iso-8859-1" | "iso8859-1" | "iso_8859-1" | "latin1" | "l1" => Ok(Self::Latin1),
            "iso-8859-15" | "iso8859-15" | "iso_8859-15" | "latin9" | "latin-9" => {
                Ok(Self::Latin9)
            }
            "us-ascii" | "ascii" => Ok(Self::Ascii),
            _ => Err(ConversionError::UnsupportedLayout(label.to_string())),
        }
    }

    /// Encodes one character as a single byte, if the charset has it.
    pub fn encode_char(self, ch: char) -> Option<u8> {
        let cp = u32::from(ch);
        match self {
            Self::Ascii => u8::try_from(cp).ok().filter(u8::is_ascii),
            Self::Latin1 => u8::try_from(cp).ok(),
            Self::Latin9 => {
                if let Some(&(byte, _)) = LATIN9_OVERRIDES.iter().find(|(_, c)| *c == ch) {
                    return Some(byte);
                }
                let byte = u8::try_from(cp).ok()?;
                if LATIN9_OVERRIDES.iter().any(|(b, _)| *b == byte) {
                    None
                } else {
                    Some(byte)
                }
            }
        }
    }

    /// Converts a payload that must hold exactly one character into its
    /// single-byte encoding.
    ///
    /// # Errors
    ///
    /// [`ConversionError::NotSingleCharacter`] or
    /// [`ConversionError::Unencodable`].
    pub fn transcode_single(self, text: &str) -> Result<u8, ConversionError> {
        let mut chars = text.chars();
        let (Some(ch), None) = (chars.next(), chars.next()) else {
            return Err(ConversionError::NotSingleCharacter(text.chars().count()));
        };
        self.encode_char(ch)
            .ok_or(ConversionError::Unencodable { ch, charset: self })
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Latin1 => "ISO-8859-1",
            Self::Latin9 => "ISO-8859-15",
            Self::Ascii => "US-ASCII",
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
