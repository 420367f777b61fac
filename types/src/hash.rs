//! Fixed-size 32-byte identifiers for transactions and coin outputs.
//!
//! Every identifier type in the workspace is generated by [`hash_type!`] so
//! they share one encoding: lowercase hex in human-readable formats (JSON,
//! TOML) and the raw 32 bytes in binary formats (bincode).

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};

/// Domain tag mixed into [`OutputId::derive`] so output ids never collide
/// with other hashes over the same bytes.
const COIN_OUTPUT_TAG: &[u8] = b"cirrus/coin-output";

macro_rules! hash_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name([u8; 32]);

        impl $name {
            pub const ZERO: Self = Self([0u8; 32]);

            pub fn new(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; 32]
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(
                    f,
                    "{}({}\u{2026})",
                    stringify!($name),
                    $crate::hash::hex::encode(&self.0[..4])
                )
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(&$crate::hash::hex::encode(&self.0))
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::TypesError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $crate::hash::hex::decode_32(s).map(Self)
            }
        }

        impl ::serde::Serialize for $name {
            fn serialize<S: ::serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                if serializer.is_human_readable() {
                    serializer.serialize_str(&self.to_string())
                } else {
                    ::serde::Serialize::serialize(&self.0, serializer)
                }
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D: ::serde::Deserializer<'de>>(
                deserializer: D,
            ) -> Result<Self, D::Error> {
                if deserializer.is_human_readable() {
                    let s = <String as ::serde::Deserialize>::deserialize(deserializer)?;
                    s.parse().map_err(::serde::de::Error::custom)
                } else {
                    <[u8; 32] as ::serde::Deserialize>::deserialize(deserializer).map(Self)
                }
            }
        }
    };
}

pub(crate) use hash_type;

hash_type! {
    /// Identifier of a transaction.
    TransactionId
}

hash_type! {
    /// Identifier of a coin output, unique across the chain.
    OutputId
}

impl OutputId {
    /// Derive the id of the `index`-th coin output created by transaction `txid`.
    pub fn derive(txid: &TransactionId, index: u64) -> Self {
        let mut hasher = Blake2b::<U32>::new();
        hasher.update(COIN_OUTPUT_TAG);
        hasher.update(txid.as_bytes());
        hasher.update(index.to_le_bytes());

        let result = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&result);
        Self(out)
    }
}

// Inline hex encoding to avoid adding the `hex` crate as a dependency of types.
pub(crate) mod hex {
    use crate::TypesError;

    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    pub fn decode_32(s: &str) -> Result<[u8; 32], TypesError> {
        if s.len() != 64 {
            return Err(TypesError::InvalidLength {
                expected: 64,
                actual: s.len(),
            });
        }
        let mut out = [0u8; 32];
        for (i, pair) in s.as_bytes().chunks_exact(2).enumerate() {
            let hi = nibble(pair[0])?;
            let lo = nibble(pair[1])?;
            out[i] = (hi << 4) | lo;
        }
        Ok(out)
    }

    fn nibble(c: u8) -> Result<u8, TypesError> {
        (c as char)
            .to_digit(16)
            .map(|d| d as u8)
            .ok_or(TypesError::InvalidHex(c as char))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TypesError;

    #[test]
    fn derive_is_deterministic_and_index_sensitive() {
        let txid = TransactionId::new([7u8; 32]);
        assert_eq!(OutputId::derive(&txid, 0), OutputId::derive(&txid, 0));
        assert_ne!(OutputId::derive(&txid, 0), OutputId::derive(&txid, 1));
        assert_ne!(
            OutputId::derive(&txid, 0),
            OutputId::derive(&TransactionId::new([8u8; 32]), 0)
        );
    }

    #[test]
    fn display_parses_back() {
        let id = OutputId::new([0xab; 32]);
        let text = id.to_string();
        assert_eq!(text.len(), 64);
        assert!(text.starts_with("abab"));
        assert_eq!(text.parse::<OutputId>().unwrap(), id);
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(matches!(
            "abcd".parse::<TransactionId>(),
            Err(TypesError::InvalidLength { expected: 64, actual: 4 })
        ));
        let bad = "zz".repeat(32);
        assert!(matches!(
            bad.parse::<TransactionId>(),
            Err(TypesError::InvalidHex('z'))
        ));
    }

    #[test]
    fn json_uses_hex_and_bincode_uses_bytes() {
        let id = OutputId::new([1u8; 32]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", "01".repeat(32)));
        assert_eq!(serde_json::from_str::<OutputId>(&json).unwrap(), id);

        let bytes = bincode::serialize(&id).unwrap();
        assert_eq!(bytes.len(), 32);
        assert_eq!(bincode::deserialize::<OutputId>(&bytes).unwrap(), id);
    }

    #[test]
    fn debug_is_abbreviated() {
        let id = TransactionId::new([0xff; 32]);
        assert_eq!(format!("{id:?}"), "TransactionId(ffffffff\u{2026})");
    }
}
