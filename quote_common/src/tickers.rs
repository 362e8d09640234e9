//! Ticker symbols and helpers shared between client and server.
//!
//! A `Symbol` is always normalized: surrounding whitespace trimmed and
//! ASCII-uppercased. Construction fails for empty or malformed input, so any
//! code holding a `Symbol` can skip re-validation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::BufRead;
use std::str::FromStr;

use crate::error::{ParserError, SymbolError};

/// Longest accepted ticker, in characters.
pub const MAX_SYMBOL_LEN: usize = 16;

/// Normalized ticker symbol, e.g. `AAPL`, `BRK.B`, `^GSPC`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Trim, uppercase and validate a raw ticker.
    pub fn parse(raw: &str) -> Result<Self, SymbolError> {
        let normalized = raw.trim().to_ascii_uppercase();
        if normalized.is_empty() {
            return Err(SymbolError::Empty);
        }
        if normalized.chars().count() > MAX_SYMBOL_LEN {
            return Err(SymbolError::TooLong(normalized));
        }
        if let Some(ch) = normalized
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=')))
        {
            return Err(SymbolError::InvalidChar {
                symbol: normalized,
                ch,
            });
        }
        // Symbols end up as a URL path segment; `.` and `..` must never get there.
        let leads_ok = normalized
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '^');
        if !leads_ok || !normalized.chars().any(|c| c.is_ascii_alphanumeric()) {
            return Err(SymbolError::Malformed(normalized));
        }
        Ok(Symbol(normalized))
    }

    /// Borrow the normalized ticker.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Symbol {
    type Err = SymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Symbol::parse(s)
    }
}

impl TryFrom<String> for Symbol {
    type Error = SymbolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Symbol::parse(&value)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Trait providing file parsing for symbols.
pub trait SymbolParser {
    /// Parses symbols from a buffered reader.
    ///
    /// Symbols may be separated by commas, whitespace or new lines; blank
    /// entries are skipped and duplicates keep their first position.
    /// Returns an error if any entry is not a valid symbol.
    fn parse_from_file<R: BufRead>(reader: R) -> Result<Vec<Symbol>, ParserError>;
}

impl SymbolParser for Symbol {
    fn parse_from_file<R: BufRead>(reader: R) -> Result<Vec<Self>, ParserError> {
        let mut symbols: Vec<Symbol> = Vec::new();

        for line_result in reader.lines() {
            let line = line_result.map_err(ParserError::Io)?;
            for token in line.split(|c: char| c == ',' || c.is_whitespace()) {
                if token.is_empty() {
                    continue;
                }
                let symbol = Symbol::parse(token)
                    .map_err(|e| ParserError::ParseSymbolsFile(e.to_string()))?;
                if !symbols.contains(&symbol) {
                    symbols.push(symbol);
                }
            }
        }
        Ok(symbols)
    }
}
