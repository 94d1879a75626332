//! Decoding of raw chunk strings for display.
//!
//! Lua strings are byte strings; chunks compiled for legacy games often carry
//! Shift-JIS or GBK text. The printer picks one [`Encoding`] per run.

use anyhow::{bail, Result};
use encoding_rs::{Encoding as RsEncoding, GB18030, SHIFT_JIS, UTF_8};
use std::borrow::Cow;
use std::fmt::Write;
use std::str::FromStr;

pub trait TextDecoder {
    fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str>;

    /// Decode and render as a double-quoted literal with control characters
    /// escaped, the way `luac -l` prints string constants.
    fn quote(&self, bytes: &[u8]) -> String {
        let text = self.decode(bytes);
        let mut out = String::with_capacity(text.len() + 2);
        out.push('"');
        for c in text.chars() {
            match c {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                '\u{7}' => out.push_str("\\a"),
                '\u{8}' => out.push_str("\\b"),
                '\u{b}' => out.push_str("\\v"),
                '\u{c}' => out.push_str("\\f"),
                c if c.is_control() => {
                    let _ = write!(out, "\\{:03}", c as u32);
                }
                c => out.push(c),
            }
        }
        out.push('"');
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    ShiftJis,
    /// Treat GBK as GB18030 (superset). This is robust for legacy CN game assets.
    Gbk,
    Gb18030,
}

impl Encoding {
    #[inline]
    pub fn as_encoding_rs(self) -> &'static RsEncoding {
        match self {
            Encoding::Utf8 => UTF_8,
            Encoding::ShiftJis => SHIFT_JIS,
            Encoding::Gbk => GB18030,
            Encoding::Gb18030 => GB18030,
        }
    }
}

impl FromStr for Encoding {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Encoding::Utf8,
            "sjis" | "shift-jis" | "shift_jis" => Encoding::ShiftJis,
            "gbk" => Encoding::Gbk,
            "gb18030" => Encoding::Gb18030,
            other => bail!("unknown encoding: {}", other),
        })
    }
}

/// A simple decoder bound to one encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decoder {
    enc: Encoding,
}

impl Decoder {
    #[inline]
    pub fn new(enc: Encoding) -> Self {
        Self { enc }
    }
}

impl TextDecoder for Decoder {
    fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        match self.enc {
            Encoding::Utf8 => String::from_utf8_lossy(bytes),
            Encoding::ShiftJis | Encoding::Gbk | Encoding::Gb18030 => {
                let enc = self.enc.as_encoding_rs();
                let (cow, _had_errors) = enc.decode_without_bom_handling(bytes);
                cow
            }
        }
    }
}
