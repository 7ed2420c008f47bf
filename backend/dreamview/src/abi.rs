//! Just enough of the Solidity ABI to talk to the dream contract: calldata
//! for `fn(uint256...)` calls and decoding of single return values.

use alloy_primitives::{keccak256, Address, U256};

use crate::errors::{DreamError, Result};
use crate::snapshot::Field;
use crate::source::{Action, FieldValue};

const WORD: usize = 32;

/// Signature of the write behind each action.
pub fn write_signature(action: Action) -> &'static str {
    match action {
        Action::Fund => "fundDream(uint256)",
        Action::Withdraw => "withdraw(uint256,uint256)",
    }
}

/// First four bytes of the keccak hash of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Calldata for a function whose arguments are all `uint256`.
pub fn encode_call(signature: &str, args: &[U256]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + args.len() * WORD);
    data.extend_from_slice(&selector(signature));
    for arg in args {
        data.extend_from_slice(&arg.to_be_bytes::<WORD>());
    }
    data
}

fn word(data: &[u8], offset: usize) -> Result<&[u8]> {
    offset
        .checked_add(WORD)
        .and_then(|end| data.get(offset..end))
        .ok_or_else(|| {
            DreamError::Decode(format!(
                "return data too short: need a word at {offset}, have {} bytes",
                data.len()
            ))
        })
}

pub fn decode_uint(data: &[u8]) -> Result<U256> {
    Ok(U256::from_be_slice(word(data, 0)?))
}

pub fn decode_address(data: &[u8]) -> Result<Address> {
    let w = word(data, 0)?;
    if w[..12].iter().any(|b| *b != 0) {
        return Err(DreamError::Decode("address word has dirty high bytes".into()));
    }
    Ok(Address::from_slice(&w[12..]))
}

pub fn decode_bool(data: &[u8]) -> Result<bool> {
    match decode_uint(data)? {
        v if v.is_zero() => Ok(false),
        v if v == U256::from(1u8) => Ok(true),
        v => Err(DreamError::Decode(format!("{v} is not a bool"))),
    }
}

fn to_usize(value: U256, what: &str) -> Result<usize> {
    usize::try_from(value).map_err(|_| DreamError::Decode(format!("{what} {value} out of range")))
}

/// Decode a single dynamic `string` return value (head offset + length + bytes).
pub fn decode_string(data: &[u8]) -> Result<String> {
    let offset = to_usize(decode_uint(data)?, "string offset")?;
    let len = to_usize(U256::from_be_slice(word(data, offset)?), "string length")?;
    let start = offset + WORD;
    let bytes = start
        .checked_add(len)
        .and_then(|end| data.get(start..end))
        .ok_or_else(|| DreamError::Decode(format!("string of {len} bytes overruns return data")))?;
    String::from_utf8(bytes.to_vec()).map_err(|e| DreamError::Decode(e.to_string()))
}

/// Decode the return data of `field`'s getter.
pub fn decode_field(field: Field, data: &[u8]) -> Result<FieldValue> {
    match field {
        Field::Creator | Field::Wallet => decode_address(data).map(FieldValue::Address),
        Field::IsActive | Field::IsPromoted => decode_bool(data).map(FieldValue::Flag),
        Field::Description => decode_string(data).map(FieldValue::Text),
        Field::TotalGathered | Field::Goal => decode_uint(data).map(FieldValue::Amount),
        Field::TimeLeft => {
            let days = decode_uint(data)?;
            u64::try_from(days)
                .map(FieldValue::Days)
                .map_err(|_| DreamError::Decode(format!("time left {days} out of range")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uint_word(v: u64) -> Vec<u8> {
        U256::from(v).to_be_bytes::<32>().to_vec()
    }

    #[test]
    fn well_known_selectors() {
        assert_eq!(hex::encode(selector("transfer(address,uint256)")), "a9059cbb");
        assert_eq!(hex::encode(selector("balanceOf(address)")), "70a08231");
    }

    #[test]
    fn call_encodes_selector_and_words() {
        let data = encode_call("getGoal(uint256)", &[U256::from(7u8)]);
        assert_eq!(data.len(), 36);
        assert_eq!(&data[..4], &selector("getGoal(uint256)")[..]);
        assert_eq!(data[35], 7);
        assert!(data[4..35].iter().all(|b| *b == 0));

        let data = encode_call(write_signature(Action::Withdraw), &[U256::from(1u8), U256::from(2u8)]);
        assert_eq!(data.len(), 68);
        assert_eq!(data[67], 2);
    }

    #[test]
    fn decodes_address() {
        let mut w = vec![0u8; 12];
        w.extend_from_slice(&[0xab; 20]);
        let addr = decode_address(&w).unwrap();
        assert_eq!(addr, Address::from([0xab; 20]));

        w[0] = 1;
        assert!(decode_address(&w).is_err());
    }

    #[test]
    fn decodes_bool_strictly() {
        assert!(!decode_bool(&uint_word(0)).unwrap());
        assert!(decode_bool(&uint_word(1)).unwrap());
        assert!(decode_bool(&uint_word(2)).is_err());
        assert!(decode_bool(&[0u8; 31]).is_err());
    }

    #[test]
    fn decodes_string() {
        let text = "Build a treehouse";
        let mut data = uint_word(32);
        data.extend(uint_word(text.len() as u64));
        let mut body = text.as_bytes().to_vec();
        body.resize(32, 0);
        data.extend(body);

        assert_eq!(decode_string(&data).unwrap(), text);
    }

    #[test]
    fn rejects_truncated_string() {
        let mut data = uint_word(32);
        data.extend(uint_word(100));
        data.extend(vec![b'a'; 32]);
        assert!(matches!(decode_string(&data), Err(DreamError::Decode(_))));
    }

    #[test]
    fn time_left_must_fit_u64() {
        assert_eq!(
            decode_field(Field::TimeLeft, &uint_word(12)).unwrap(),
            FieldValue::Days(12)
        );
        let huge = U256::MAX.to_be_bytes::<32>();
        assert!(decode_field(Field::TimeLeft, &huge).is_err());
        assert_eq!(
            decode_field(Field::Goal, &huge).unwrap(),
            FieldValue::Amount(U256::MAX)
        );
    }
}
