use std::fmt;

use chrona_types::Identity;
use serde::{Deserialize, Serialize};

/// A cleartext value as known to the encryption service.
///
/// Payload content is encrypted one byte per handle; the access field is a
/// single encrypted address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClearValue {
    Address(Identity),
    Byte(u8),
}

impl ClearValue {
    pub fn as_byte(&self) -> Option<u8> {
        match self {
            Self::Byte(b) => Some(*b),
            Self::Address(_) => None,
        }
    }

    pub fn as_address(&self) -> Option<Identity> {
        match self {
            Self::Address(id) => Some(*id),
            Self::Byte(_) => None,
        }
    }

    /// Canonical bytes: a one-byte tag followed by the value.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        match self {
            Self::Address(id) => {
                let mut out = Vec::with_capacity(21);
                out.push(0xad);
                out.extend_from_slice(id.as_bytes());
                out
            }
            Self::Byte(b) => vec![0xb1, *b],
        }
    }
}

impl fmt::Display for ClearValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(id) => write!(f, "{id}"),
            Self::Byte(b) => write!(f, "{b}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_match_variant() {
        let addr = ClearValue::Address(Identity::from_bytes([1; 20]));
        assert_eq!(addr.as_address(), Some(Identity::from_bytes([1; 20])));
        assert_eq!(addr.as_byte(), None);
        assert_eq!(ClearValue::Byte(7).as_byte(), Some(7));
    }

    #[test]
    fn canonical_bytes_are_tagged() {
        assert_eq!(ClearValue::Byte(0xad).canonical_bytes(), vec![0xb1, 0xad]);
        assert_eq!(
            ClearValue::Address(Identity::NULL).canonical_bytes().len(),
            21
        );
    }
}
