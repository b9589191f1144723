use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Commitment digest of an expression. `Hidden` nodes carry only this.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cmr(pub [u8; 32]);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CmrParseError {
    #[error("expected 64 hex digits, found {0}")]
    BadLength(usize),
    #[error("invalid hex digit {0:?}")]
    BadDigit(char),
}

impl Cmr {
    pub fn from_byte_array(bytes: [u8; 32]) -> Self {
        Cmr(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Cmr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Cmr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cmr({self})")
    }
}

impl FromStr for Cmr {
    type Err = CmrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: Vec<char> = s.chars().collect();
        if digits.len() != 64 {
            return Err(CmrParseError::BadLength(digits.len()));
        }

        let mut bytes = [0u8; 32];
        for (byte, pair) in bytes.iter_mut().zip(digits.chunks(2)) {
            let hi = hex_digit(pair[0])?;
            let lo = hex_digit(pair[1])?;
            *byte = (hi << 4) | lo;
        }
        Ok(Cmr(bytes))
    }
}

fn hex_digit(c: char) -> Result<u8, CmrParseError> {
    c.to_digit(16)
        .map(|d| d as u8)
        .ok_or(CmrParseError::BadDigit(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0xde;
        bytes[31] = 0x0f;
        let cmr = Cmr(bytes);

        let text = cmr.to_string();
        assert_eq!(text.len(), 64);
        assert!(text.starts_with("de00"));
        assert!(text.ends_with("0f"));
        assert_eq!(text.parse::<Cmr>(), Ok(cmr));
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!("abc".parse::<Cmr>(), Err(CmrParseError::BadLength(3)));
        let bad = format!("{}zz", "0".repeat(62));
        assert_eq!(bad.parse::<Cmr>(), Err(CmrParseError::BadDigit('z')));
    }
}
