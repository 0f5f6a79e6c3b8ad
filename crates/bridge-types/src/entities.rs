//! # Core Primitives
//!
//! Addresses, hashes and chain identifiers used across the bridge.

// Re-export U256 from primitive-types for amounts and fees across all crates
pub use primitive_types::U256;

/// A 32-byte hash (Keccak-256).
pub type Hash = [u8; 32];

/// A 20-byte EVM-style address.
pub type Address = [u8; 20];

/// Protocol-level chain identifier (EIP-155 style, e.g. 1, 10, 42161).
///
/// This is NOT the transport's own namespace; adapters translate it.
pub type ChainId = u64;

/// The zero address. Never a valid recipient, asset, adapter or originator.
pub const ZERO_ADDRESS: Address = [0u8; 20];

/// Check whether an address is the zero address.
#[must_use]
pub fn is_zero_address(address: &Address) -> bool {
    *address == ZERO_ADDRESS
}

/// Render an address as `0x`-prefixed lowercase hex.
#[must_use]
pub fn address_hex(address: &Address) -> String {
    format!("0x{}", hex::encode(address))
}

/// Build an address whose last byte is `tag`, e.g. `address_from_tag(0xA1)`.
///
/// Convenient for fixtures and devnet wiring.
#[must_use]
pub fn address_from_tag(tag: u8) -> Address {
    let mut address = ZERO_ADDRESS;
    address[19] = tag;
    address
}

/// Encode a `U256` as 32 big-endian bytes.
#[must_use]
pub fn u256_to_be_bytes(value: U256) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_address() {
        assert!(is_zero_address(&ZERO_ADDRESS));
        assert!(!is_zero_address(&address_from_tag(1)));
    }

    #[test]
    fn test_address_hex() {
        let addr = address_from_tag(0xAB);
        assert_eq!(
            address_hex(&addr),
            "0x00000000000000000000000000000000000000ab"
        );
    }

    #[test]
    fn test_u256_be_bytes() {
        let bytes = u256_to_be_bytes(U256::from(0x0102u64));
        assert_eq!(bytes[30], 0x01);
        assert_eq!(bytes[31], 0x02);
        assert!(bytes[..30].iter().all(|b| *b == 0));
    }
}
