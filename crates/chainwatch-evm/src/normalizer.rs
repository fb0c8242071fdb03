//! Converts alloy-core `DynSolValue` → `serde_json::Value` event arguments.
//!
//! Integers that fit in 64 bits become JSON numbers; wider values are decimal
//! strings so no precision is lost. Byte values are `0x`-prefixed hex and
//! addresses use EIP-55 checksum casing.

use alloy_core::dyn_abi::DynSolValue;
use serde_json::{Number, Value};

/// Convert a decoded `DynSolValue` into a JSON value.
pub fn normalize(val: DynSolValue) -> Value {
    match val {
        DynSolValue::Bool(b) => Value::Bool(b),

        DynSolValue::Int(i, _bits) => match i64::try_from(i) {
            Ok(v) => Value::Number(Number::from(v)),
            Err(_) => Value::String(i.to_string()),
        },

        DynSolValue::Uint(u, _bits) => match u64::try_from(u) {
            Ok(v) => Value::Number(Number::from(v)),
            Err(_) => Value::String(u.to_string()),
        },

        DynSolValue::FixedBytes(word, size) => hex_value(&word[..size]),

        DynSolValue::Bytes(b) => hex_value(&b),

        DynSolValue::String(s) => Value::String(s),

        DynSolValue::Address(a) => Value::String(a.to_checksum(None)),

        DynSolValue::Array(vals) | DynSolValue::FixedArray(vals) => {
            Value::Array(vals.into_iter().map(normalize).collect())
        }

        // Struct fields are positional
        DynSolValue::Tuple(fields) => Value::Array(fields.into_iter().map(normalize).collect()),

        DynSolValue::Function(f) => hex_value(f.as_slice()),
    }
}

/// `0x`-prefixed lowercase hex.
pub fn hex_value(bytes: &[u8]) -> Value {
    Value::String(format!("0x{}", hex::encode(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, B256, I256, U256};
    use serde_json::json;

    #[test]
    fn normalize_bool() {
        assert_eq!(normalize(DynSolValue::Bool(true)), json!(true));
    }

    #[test]
    fn normalize_uint_small_and_wide() {
        assert_eq!(normalize(DynSolValue::Uint(U256::from(42u64), 256)), json!(42));

        let wide = U256::from(u64::MAX) + U256::from(1u64);
        assert_eq!(
            normalize(DynSolValue::Uint(wide, 256)),
            json!("18446744073709551616")
        );
    }

    #[test]
    fn normalize_negative_int() {
        let v = I256::try_from(-7i64).unwrap();
        assert_eq!(normalize(DynSolValue::Int(v, 256)), json!(-7));
    }

    #[test]
    fn normalize_address_checksummed() {
        let addr: Address = "0xd8da6bf26964af9d7eed9e03e53415d37aa96045".parse().unwrap();
        assert_eq!(
            normalize(DynSolValue::Address(addr)),
            json!("0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045")
        );
    }

    #[test]
    fn normalize_fixed_bytes_truncates_to_width() {
        let mut word = B256::ZERO;
        word[0] = 0xab;
        word[1] = 0xcd;
        assert_eq!(normalize(DynSolValue::FixedBytes(word, 2)), json!("0xabcd"));
    }

    #[test]
    fn normalize_nested() {
        let v = DynSolValue::Tuple(vec![
            DynSolValue::String("hi".into()),
            DynSolValue::Array(vec![DynSolValue::Bool(false)]),
        ]);
        assert_eq!(normalize(v), json!(["hi", [false]]));
    }
}
