use crate::error::{GeneratorError, Result};

/// A fixed, ordered set of code symbols.
///
/// The position of a symbol is its digit value, so the same alphabet
/// both encodes counters and draws random symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alphabet {
    symbols: &'static [u8],
}

impl Alphabet {
    /// Bitcoin-style base58: alphanumerics without `0`, `O`, `I` and `l`.
    pub const BASE58: Alphabet = Alphabet {
        symbols: b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz",
    };

    /// All ASCII alphanumerics.
    pub const BASE62: Alphabet = Alphabet {
        symbols: b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz",
    };

    /// Creates an alphabet from unique ASCII alphanumeric symbols.
    pub fn new(symbols: &'static [u8]) -> Result<Self> {
        if symbols.len() < 2 {
            return Err(GeneratorError::InvalidAlphabet(
                "at least two symbols are required".to_string(),
            ));
        }
        if let Some(bad) = symbols.iter().find(|b| !b.is_ascii_alphanumeric()) {
            return Err(GeneratorError::InvalidAlphabet(format!(
                "symbol '{}' is not ASCII alphanumeric",
                *bad as char
            )));
        }
        for (i, symbol) in symbols.iter().enumerate() {
            if symbols[i + 1..].contains(symbol) {
                return Err(GeneratorError::InvalidAlphabet(format!(
                    "symbol '{}' appears more than once",
                    *symbol as char
                )));
            }
        }
        Ok(Self { symbols })
    }

    /// Number of symbols, i.e. the numeric base.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Returns the symbol for digit value `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn symbol(&self, index: usize) -> char {
        self.symbols[index] as char
    }

    pub fn contains(&self, symbol: char) -> bool {
        symbol.is_ascii() && self.symbols.contains(&(symbol as u8))
    }

    /// Encodes `value` most significant digit first, without padding.
    pub fn encode(&self, value: u64) -> String {
        self.encode_padded(value, 1)
    }

    /// Encodes `value`, left-padding with the zero symbol to `width`.
    pub fn encode_padded(&self, mut value: u64, width: usize) -> String {
        let base = self.len() as u64;
        let mut digits = Vec::with_capacity(width.max(11));
        while value > 0 {
            digits.push(self.symbols[(value % base) as usize]);
            value /= base;
        }
        while digits.len() < width.max(1) {
            digits.push(self.symbols[0]);
        }
        digits.iter().rev().map(|&b| b as char).collect()
    }

    /// Decodes a string produced by [`Alphabet::encode`].
    ///
    /// Leading zero symbols are accepted, so padded codes decode to the
    /// same value as unpadded ones.
    pub fn decode(&self, encoded: &str) -> Result<u64> {
        if encoded.is_empty() {
            return Err(GeneratorError::Empty);
        }
        let base = self.len() as u64;
        encoded.chars().try_fold(0_u64, |acc, c| {
            let digit = self.digit(c).ok_or(GeneratorError::UnknownSymbol(c))?;
            acc.checked_mul(base)
                .and_then(|v| v.checked_add(digit))
                .ok_or(GeneratorError::Overflow)
        })
    }

    fn digit(&self, symbol: char) -> Option<u64> {
        if !symbol.is_ascii() {
            return None;
        }
        self.symbols
            .iter()
            .position(|&b| b == symbol as u8)
            .map(|p| p as u64)
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Alphabet::BASE62
    }
}
