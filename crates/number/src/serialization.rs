//! `serde_with` adapters for `U256` values.

use {
    primitive_types::U256,
    serde::{Deserialize, Deserializer, Serializer, de},
    serde_with::{DeserializeAs, SerializeAs},
    std::borrow::Cow,
};

/// Serializes a `U256` as a decimal string and deserializes it from either a
/// decimal string or a `0x`-prefixed hex string.
pub struct HexOrDecimalU256;

impl<'de> DeserializeAs<'de, U256> for HexOrDecimalU256 {
    fn deserialize_as<D>(deserializer: D) -> Result<U256, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = Cow::<str>::deserialize(deserializer)?;
        let result = match s.strip_prefix("0x") {
            Some(hex) => U256::from_str_radix(hex, 16).map_err(|err| err.to_string()),
            None => U256::from_dec_str(&s).map_err(|err| err.to_string()),
        };
        result.map_err(|err| de::Error::custom(format!("failed to decode {s:?}: {err}")))
    }
}

impl SerializeAs<U256> for HexOrDecimalU256 {
    fn serialize_as<S>(source: &U256, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&source.to_string())
    }
}

#[cfg(test)]
mod tests {
    use {super::*, serde::Serialize, serde_with::serde_as};

    #[serde_as]
    #[derive(Debug, Deserialize, Serialize, PartialEq)]
    struct Amount(#[serde_as(as = "HexOrDecimalU256")] U256);

    #[test]
    fn deserializes_hex_and_decimal() {
        let decimal: Amount = serde_json::from_str("\"1000\"").unwrap();
        let hex: Amount = serde_json::from_str("\"0x3e8\"").unwrap();
        assert_eq!(decimal, Amount(1000.into()));
        assert_eq!(hex, Amount(1000.into()));
        assert!(serde_json::from_str::<Amount>("\"0xzz\"").is_err());
    }

    #[test]
    fn serializes_decimal() {
        assert_eq!(
            serde_json::to_string(&Amount(U256::exp10(18))).unwrap(),
            "\"1000000000000000000\""
        );
    }
}
