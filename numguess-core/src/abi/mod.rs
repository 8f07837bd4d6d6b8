//! Minimal Solidity ABI codec for the lottery contract surface.
//!
//! Only static 32-byte words are needed: every argument and every event
//! field of the contract is a `uint256` or an `address`.

pub mod lottery;

pub use lottery::{JackpotEvent, LotteryCall, LotteryEvent, PlayedEvent};

use crate::error::{LotteryError, Result};
use crate::types::Address;
use sha3::{Digest, Keccak256};

pub type Word = [u8; 32];

pub fn keccak256(data: &[u8]) -> Word {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// First four bytes of the keccak hash of a canonical function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Topic 0 of an event with the given canonical signature.
pub fn event_topic(signature: &str) -> Word {
    keccak256(signature.as_bytes())
}

pub fn encode_uint(value: u128) -> Word {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

pub fn encode_address(address: &Address) -> Word {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

pub fn encode_call(selector: [u8; 4], args: &[Word]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + args.len() * 32);
    data.extend_from_slice(&selector);
    for arg in args {
        data.extend_from_slice(arg);
    }
    data
}

/// The `index`-th 32-byte word of ABI encoded data.
pub fn word_at(data: &[u8], index: usize) -> Result<Word> {
    let start = index * 32;
    let end = start + 32;
    if data.len() < end {
        return Err(LotteryError::abi(format!(
            "Expected at least {} bytes, got {}",
            end,
            data.len()
        )));
    }
    let mut word = [0u8; 32];
    word.copy_from_slice(&data[start..end]);
    Ok(word)
}

pub fn decode_u128(word: &Word) -> Result<u128> {
    if word[..16].iter().any(|b| *b != 0) {
        return Err(LotteryError::abi("uint256 value does not fit in 128 bits"));
    }
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(bytes))
}

pub fn decode_u64(word: &Word) -> Result<u64> {
    let value = decode_u128(word)?;
    u64::try_from(value).map_err(|_| LotteryError::abi("uint256 value does not fit in 64 bits"))
}

pub fn decode_address(word: &Word) -> Result<Address> {
    if word[..12].iter().any(|b| *b != 0) {
        return Err(LotteryError::abi("Address word has dirty upper bytes"));
    }
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&word[12..]);
    Ok(Address::from_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak_empty() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_well_known_selectors() {
        assert_eq!(hex::encode(selector("owner()")), "8da5cb5b");
        assert_eq!(hex::encode(selector("withdraw()")), "3ccfd60b");
        assert_eq!(hex::encode(selector("transfer(address,uint256)")), "a9059cbb");
        assert_eq!(
            hex::encode(event_topic("Transfer(address,address,uint256)")),
            "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
    }

    #[test]
    fn test_uint_words() {
        let word = encode_uint(42);
        assert_eq!(word[31], 42);
        assert!(word[..31].iter().all(|b| *b == 0));
        assert_eq!(decode_u64(&word).unwrap(), 42);

        let mut big = [0u8; 32];
        big[0] = 1;
        assert!(decode_u128(&big).is_err());
        assert!(decode_u64(&encode_uint(u128::from(u64::MAX) + 1)).is_err());
    }

    #[test]
    fn test_address_word() {
        let address: Address = "0xcad3fcd3eff63f44384f4ee79256b028eabffe46".parse().unwrap();
        let word = encode_address(&address);
        assert_eq!(decode_address(&word).unwrap(), address);

        let mut dirty = word;
        dirty[0] = 0xff;
        assert!(decode_address(&dirty).is_err());
    }

    #[test]
    fn test_word_at_bounds() {
        let data = [0u8; 40];
        assert!(word_at(&data, 0).is_ok());
        assert!(word_at(&data, 1).is_err());
    }
}
