//! Solidity ABI codec for the WavePortal contract
//!
//! Only the shapes the portal exchanges with the contract are supported:
//!
//! - `getAllWaves() returns ((address,string,uint256)[])`
//! - `getTotalWaves() returns (uint256)`
//! - `wave(string)`
//! - `event NewWave(address indexed from, uint256 timestamp, string message)`
//!
//! Encoders for return data and logs are provided alongside the decoders so
//! local nodes and test doubles can produce byte-exact contract output.

use chrono::{DateTime, Utc};
use sha3::{Digest, Keccak256};

use crate::error::WavePortalError;
use crate::types::{Address, WaveRecord};
use crate::Result;

pub const GET_ALL_WAVES: &str = "getAllWaves()";
pub const GET_TOTAL_WAVES: &str = "getTotalWaves()";
pub const WAVE: &str = "wave(string)";
pub const NEW_WAVE_EVENT: &str = "NewWave(address,uint256,string)";

const WORD: usize = 32;

/// Keccak-256 digest (pre-NIST padding, as used by Ethereum)
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let hash = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&hash);
    out
}

/// 4-byte function selector for a canonical signature
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// topic0 of an event with the given canonical signature
pub fn event_topic(signature: &str) -> [u8; 32] {
    keccak256(signature.as_bytes())
}

pub fn encode_get_all_waves() -> Vec<u8> {
    selector(GET_ALL_WAVES).to_vec()
}

pub fn encode_get_total_waves() -> Vec<u8> {
    selector(GET_TOTAL_WAVES).to_vec()
}

/// Calldata for `wave(message)`
pub fn encode_wave(message: &str) -> Vec<u8> {
    let mut out = selector(WAVE).to_vec();
    out.extend_from_slice(&uint_word(WORD as u64));
    out.extend_from_slice(&string_tail(message));
    out
}

/// Extract the message argument from `wave(string)` calldata
pub fn decode_wave_call(calldata: &[u8]) -> Result<String> {
    if calldata.len() < 4 || calldata[..4] != selector(WAVE) {
        return Err(WavePortalError::abi("calldata is not a wave(string) call"));
    }
    let args = &calldata[4..];
    let offset = read_usize(args, 0)?;
    read_string(args, offset)
}

pub fn encode_uint(value: u64) -> Vec<u8> {
    uint_word(value).to_vec()
}

/// Decode a single `uint256` return value
pub fn decode_uint(data: &[u8]) -> Result<u64> {
    read_u64(data, 0)
}

/// Return data of `getAllWaves()`
pub fn encode_wave_list(waves: &[WaveRecord]) -> Vec<u8> {
    let tuples: Vec<Vec<u8>> = waves.iter().map(encode_wave_tuple).collect();

    let mut out = Vec::new();
    out.extend_from_slice(&uint_word(WORD as u64));
    out.extend_from_slice(&uint_word(waves.len() as u64));

    // Tuple offsets are relative to the first offset word
    let mut offset = WORD * waves.len();
    for tuple in &tuples {
        out.extend_from_slice(&uint_word(offset as u64));
        offset += tuple.len();
    }
    for tuple in tuples {
        out.extend(tuple);
    }
    out
}

/// Decode the return data of `getAllWaves()`
pub fn decode_wave_list(data: &[u8]) -> Result<Vec<WaveRecord>> {
    let array = read_usize(data, 0)?;
    let count = read_usize(data, array)?;
    let items = checked(array, WORD)?;

    // Each element needs at least its offset word
    if count > data.len().saturating_sub(items) / WORD {
        return Err(WavePortalError::abi(format!(
            "array length {} exceeds payload",
            count
        )));
    }

    let mut waves = Vec::with_capacity(count);
    for i in 0..count {
        let relative = read_usize(data, checked(items, i * WORD)?)?;
        let tuple = checked(items, relative)?;

        let sender = read_address(data, tuple)?;
        let message_offset = read_usize(data, checked(tuple, WORD)?)?;
        let message = read_string(data, checked(tuple, message_offset)?)?;
        let timestamp = read_u64(data, checked(tuple, 2 * WORD)?)?;

        waves.push(WaveRecord {
            sender,
            sent_at: to_datetime(timestamp)?,
            message,
        });
    }
    Ok(waves)
}

/// Topics and data of a `NewWave` log for the given wave
pub fn encode_new_wave_log(wave: &WaveRecord) -> (Vec<[u8; 32]>, Vec<u8>) {
    let topics = vec![event_topic(NEW_WAVE_EVENT), address_word(&wave.sender)];

    let mut data = Vec::new();
    data.extend_from_slice(&uint_word(from_datetime(&wave.sent_at)));
    data.extend_from_slice(&uint_word(2 * WORD as u64));
    data.extend_from_slice(&string_tail(&wave.message));
    (topics, data)
}

/// Decode a `NewWave` log
pub fn decode_new_wave_log(topics: &[[u8; 32]], data: &[u8]) -> Result<WaveRecord> {
    match topics.first() {
        Some(topic) if *topic == event_topic(NEW_WAVE_EVENT) => {}
        _ => return Err(WavePortalError::abi("log is not a NewWave event")),
    }
    let sender = topics
        .get(1)
        .ok_or_else(|| WavePortalError::abi("NewWave log is missing the sender topic"))?;

    let timestamp = read_u64(data, 0)?;
    let message_offset = read_usize(data, WORD)?;
    let message = read_string(data, message_offset)?;

    Ok(WaveRecord {
        sender: read_address(sender, 0)?,
        sent_at: to_datetime(timestamp)?,
        message,
    })
}

/// `0x`-prefixed hex for JSON-RPC data fields
pub fn to_hex_data(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub fn from_hex_data(value: &str) -> Result<Vec<u8>> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(digits).map_err(|e| WavePortalError::abi(format!("invalid hex data: {}", e)))
}

/// Parse a JSON-RPC `DATA` value that must be exactly 32 bytes
pub fn parse_word(value: &str) -> Result<[u8; 32]> {
    let bytes = from_hex_data(value)?;
    if bytes.len() != WORD {
        return Err(WavePortalError::abi(format!(
            "expected 32-byte word, got {} bytes",
            bytes.len()
        )));
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Parse a JSON-RPC `QUANTITY` (`0x`-prefixed, no leading zeros)
pub fn parse_quantity(value: &str) -> Result<u64> {
    let digits = value
        .strip_prefix("0x")
        .ok_or_else(|| WavePortalError::abi(format!("quantity without 0x prefix: {}", value)))?;
    u64::from_str_radix(digits, 16)
        .map_err(|e| WavePortalError::abi(format!("invalid quantity {}: {}", value, e)))
}

pub fn to_quantity(value: u64) -> String {
    format!("0x{:x}", value)
}

fn encode_wave_tuple(wave: &WaveRecord) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&address_word(&wave.sender));
    out.extend_from_slice(&uint_word(3 * WORD as u64));
    out.extend_from_slice(&uint_word(from_datetime(&wave.sent_at)));
    out.extend_from_slice(&string_tail(&wave.message));
    out
}

fn uint_word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

fn address_word(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(&address.0);
    word
}

/// Length word followed by the bytes, right-padded to a word boundary
fn string_tail(value: &str) -> Vec<u8> {
    let bytes = value.as_bytes();
    let mut out = uint_word(bytes.len() as u64).to_vec();
    out.extend_from_slice(bytes);
    let padding = (WORD - bytes.len() % WORD) % WORD;
    out.resize(out.len() + padding, 0);
    out
}

fn checked(base: usize, add: usize) -> Result<usize> {
    base.checked_add(add)
        .ok_or_else(|| WavePortalError::abi("offset overflow"))
}

fn word_at(data: &[u8], offset: usize) -> Result<&[u8]> {
    let end = checked(offset, WORD)?;
    data.get(offset..end).ok_or_else(|| {
        WavePortalError::abi(format!(
            "payload too short: need {} bytes, have {}",
            end,
            data.len()
        ))
    })
}

fn read_u64(data: &[u8], offset: usize) -> Result<u64> {
    let word = word_at(data, offset)?;
    if word[..24].iter().any(|b| *b != 0) {
        return Err(WavePortalError::remote_call(
            "uint256 value does not fit in 64 bits",
        ));
    }
    let mut be = [0u8; 8];
    be.copy_from_slice(&word[24..]);
    Ok(u64::from_be_bytes(be))
}

fn read_usize(data: &[u8], offset: usize) -> Result<usize> {
    let value = read_u64(data, offset)?;
    usize::try_from(value).map_err(|_| WavePortalError::abi("offset exceeds address space"))
}

fn read_address(data: &[u8], offset: usize) -> Result<Address> {
    let word = word_at(data, offset)?;
    if word[..12].iter().any(|b| *b != 0) {
        return Err(WavePortalError::abi("address word has non-zero padding"));
    }
    let mut out = [0u8; 20];
    out.copy_from_slice(&word[12..]);
    Ok(Address(out))
}

fn read_string(data: &[u8], offset: usize) -> Result<String> {
    let len = read_usize(data, offset)?;
    let start = checked(offset, WORD)?;
    let end = checked(start, len)?;
    let bytes = data
        .get(start..end)
        .ok_or_else(|| WavePortalError::abi("string runs past end of payload"))?;
    String::from_utf8(bytes.to_vec())
        .map_err(|e| WavePortalError::abi(format!("string is not UTF-8: {}", e)))
}

fn to_datetime(timestamp: u64) -> Result<DateTime<Utc>> {
    i64::try_from(timestamp)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or_else(|| WavePortalError::abi(format!("timestamp out of range: {}", timestamp)))
}

fn from_datetime(at: &DateTime<Utc>) -> u64 {
    at.timestamp().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wave(byte: u8, secs: i64, message: &str) -> WaveRecord {
        WaveRecord {
            sender: Address([byte; 20]),
            sent_at: DateTime::from_timestamp(secs, 0).unwrap(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_selector_matches_known_erc20_values() {
        assert_eq!(hex::encode(selector("transfer(address,uint256)")), "a9059cbb");
        assert_eq!(hex::encode(selector("balanceOf(address)")), "70a08231");
        assert_eq!(
            hex::encode(event_topic("Transfer(address,address,uint256)")),
            "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
    }

    #[test]
    fn test_encode_wave_layout() {
        let data = encode_wave("hello");
        assert_eq!(data.len(), 4 + 3 * WORD);
        assert_eq!(data[..4], selector(WAVE));
        // head: offset to the string
        assert_eq!(data[4 + 31], 0x20);
        // tail: length then right-padded bytes
        assert_eq!(data[4 + WORD + 31], 5);
        assert_eq!(&data[4 + 2 * WORD..4 + 2 * WORD + 5], b"hello");
        assert!(data[4 + 2 * WORD + 5..].iter().all(|b| *b == 0));

        assert_eq!(decode_wave_call(&data).unwrap(), "hello");
    }

    #[test]
    fn test_decode_wave_call_rejects_other_selectors() {
        let err = decode_wave_call(&encode_get_total_waves()).unwrap_err();
        assert!(matches!(err, WavePortalError::Abi(_)));
    }

    #[test]
    fn test_decode_uint_rejects_values_above_u64() {
        let mut word = [0u8; 32];
        word[23] = 1;
        assert!(matches!(
            decode_uint(&word),
            Err(WavePortalError::RemoteCall(_))
        ));

        word[23] = 0;
        word[31] = 42;
        assert_eq!(decode_uint(&word).unwrap(), 42);
    }

    #[test]
    fn test_decode_wave_list_handcrafted_payload() {
        // One element: (0x11..11, "gm", 1700000000)
        let mut data = Vec::new();
        data.extend_from_slice(&uint_word(0x20)); // array offset
        data.extend_from_slice(&uint_word(1)); // length
        data.extend_from_slice(&uint_word(0x20)); // tuple offset
        data.extend_from_slice(&address_word(&Address([0x11; 20])));
        data.extend_from_slice(&uint_word(0x60)); // string offset in tuple
        data.extend_from_slice(&uint_word(1_700_000_000));
        data.extend_from_slice(&uint_word(2));
        let mut text = [0u8; 32];
        text[..2].copy_from_slice(b"gm");
        data.extend_from_slice(&text);

        let waves = decode_wave_list(&data).unwrap();
        assert_eq!(waves, vec![wave(0x11, 1_700_000_000, "gm")]);
        assert_eq!(encode_wave_list(&waves), data);
    }

    #[test]
    fn test_decode_wave_list_preserves_order() {
        let waves = vec![
            wave(1, 1_600_000_000, "first"),
            wave(2, 1_600_000_100, ""),
            wave(3, 1_600_000_200, &"long message ".repeat(10)),
        ];
        let decoded = decode_wave_list(&encode_wave_list(&waves)).unwrap();
        assert_eq!(decoded, waves);
    }

    #[test]
    fn test_decode_wave_list_empty() {
        assert!(decode_wave_list(&encode_wave_list(&[])).unwrap().is_empty());
    }

    #[test]
    fn test_decode_wave_list_rejects_truncated_payload() {
        let mut data = encode_wave_list(&[wave(1, 1, "truncated")]);
        data.truncate(data.len() - WORD);
        assert!(decode_wave_list(&data).is_err());

        let mut bogus = Vec::new();
        bogus.extend_from_slice(&uint_word(0x20));
        bogus.extend_from_slice(&uint_word(u32::MAX as u64));
        assert!(decode_wave_list(&bogus).is_err());
    }

    #[test]
    fn test_new_wave_log_decodes_sender_from_topic() {
        let original = wave(0xcd, 1_650_000_000, "waving 👋");
        let (topics, data) = encode_new_wave_log(&original);
        assert_eq!(topics.len(), 2);
        assert_eq!(topics[0], event_topic(NEW_WAVE_EVENT));

        assert_eq!(decode_new_wave_log(&topics, &data).unwrap(), original);
    }

    #[test]
    fn test_new_wave_log_rejects_foreign_event() {
        let (mut topics, data) = encode_new_wave_log(&wave(1, 1, "x"));
        topics[0] = event_topic("Transfer(address,address,uint256)");
        assert!(decode_new_wave_log(&topics, &data).is_err());
        assert!(decode_new_wave_log(&topics[..0], &data).is_err());
    }

    #[test]
    fn test_quantity_helpers() {
        assert_eq!(to_quantity(300_000), "0x493e0");
        assert_eq!(parse_quantity("0x493e0").unwrap(), 300_000);
        assert!(parse_quantity("493e0").is_err());
        assert_eq!(from_hex_data("0x").unwrap(), Vec::<u8>::new());
        assert!(parse_word("0x00").is_err());
    }
}
