//! Cryptographic identity primitives.
//!
//! Signing and key generation live in the consensus layer. Here a public
//! key is an opaque 32-byte identity, and an address is the 20-byte
//! prefix of its blake3 digest. Addresses order lexicographically by
//! their bytes; that ordering is the canonical enumeration order for
//! committee members.

use sbor::prelude::*;
use std::fmt;

/// Length of a public key in bytes.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Length of a derived address in bytes.
pub const ADDRESS_LEN: usize = 20;

/// Opaque public key identifying a committee member.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, BasicSbor)]
#[sbor(transparent)]
pub struct PublicKey(pub [u8; PUBLIC_KEY_LEN]);

impl PublicKey {
    /// Create a public key from raw bytes.
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_LEN]) -> Self {
        PublicKey(bytes)
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.0
    }

    /// Derive the address for this key.
    pub fn address(&self) -> Address {
        Address::from_public_key(self)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({self})")
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form: first four bytes are enough to tell members apart in logs.
        for b in &self.0[..4] {
            write!(f, "{b:02x}")?;
        }
        write!(f, "..")
    }
}

/// Address derived from a public key.
///
/// Derives `Ord` so a slice of addresses sorts into the canonical
/// enumeration order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, BasicSbor)]
#[sbor(transparent)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    /// Derive an address: the truncated blake3 digest of the key bytes.
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        let digest = blake3::hash(public_key.as_bytes());
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes.copy_from_slice(&digest.as_bytes()[..ADDRESS_LEN]);
        Address(bytes)
    }

    /// Raw address bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_derivation_is_deterministic() {
        let bytes: [u8; PUBLIC_KEY_LEN] = rand::random();
        let pk = PublicKey::from_bytes(bytes);
        assert_eq!(pk.address(), pk.address());
        assert_ne!(
            pk.address(),
            PublicKey::from_bytes([8u8; PUBLIC_KEY_LEN]).address()
        );
    }

    #[test]
    fn address_ordering_is_lexicographic() {
        let lo = Address([0u8; ADDRESS_LEN]);
        let mut hi_bytes = [0u8; ADDRESS_LEN];
        hi_bytes[0] = 1;
        let hi = Address(hi_bytes);
        assert!(lo < hi);
    }
}
