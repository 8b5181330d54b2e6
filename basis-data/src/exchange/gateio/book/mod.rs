use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

/// Book ticker (best bid/ask) types.
pub mod l1;

/// Incremental order book update types and the stateful transformer sequencing them.
pub mod l2;

/// Deserialize a [`Decimal`] from either a JSON string or a JSON number.
///
/// Gate.io futures channels quote prices as strings but contract sizes as plain numbers.
pub fn de_decimal_flexible<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(f64),
    }

    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(value) => value.parse::<Decimal>().map_err(serde::de::Error::custom),
        StringOrNumber::Number(value) => {
            Decimal::try_from(value).map_err(serde::de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Wrapper {
        #[serde(deserialize_with = "de_decimal_flexible")]
        value: Decimal,
    }

    #[test]
    fn test_de_decimal_flexible() {
        assert_eq!(
            serde_json::from_str::<Wrapper>(r#"{"value":"54696.6"}"#).unwrap(),
            Wrapper {
                value: dec!(54696.6)
            }
        );
        assert_eq!(
            serde_json::from_str::<Wrapper>(r#"{"value":1223}"#).unwrap(),
            Wrapper { value: dec!(1223) }
        );
    }
}
