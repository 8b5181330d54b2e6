use super::{RECV_WINDOW_MS, request_timestamp};
use crate::balance::{AssetBalance, Balance};
use basis_instrument::asset::AssetNameExchange;
use basis_integration::protocol::http::rest::RestRequest;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Fetch account balances.
///
/// See docs: <https://mexcdevelop.github.io/apidocs/spot_v3_en/#account-information>
#[derive(Debug, Clone)]
pub struct AccountRequest {
    query: AccountQuery,
}

impl AccountRequest {
    pub fn new() -> Self {
        Self {
            query: AccountQuery {
                timestamp: request_timestamp(),
                recv_window: RECV_WINDOW_MS,
            },
        }
    }
}

impl Default for AccountRequest {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountQuery {
    timestamp: u64,
    #[serde(rename = "recvWindow")]
    recv_window: u64,
}

/// ### Raw Payload Example
/// ```json
/// {
///     "balances": [
///         { "asset": "USDT", "free": "100.5", "locked": "20.0" }
///     ]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct AccountResponse {
    pub balances: Vec<MexcBalance>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MexcBalance {
    pub asset: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub free: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub locked: Decimal,
}

impl From<MexcBalance> for AssetBalance {
    fn from(balance: MexcBalance) -> Self {
        AssetBalance::new(
            AssetNameExchange::new(balance.asset),
            Balance::new(balance.free + balance.locked, balance.free),
            Utc::now(),
        )
    }
}

impl RestRequest for AccountRequest {
    type Response = AccountResponse;
    type QueryParams = AccountQuery;
    type Body = ();

    fn path(&self) -> Cow<'static, str> {
        Cow::Borrowed("/api/v3/account")
    }

    fn method() -> reqwest::Method {
        reqwest::Method::GET
    }

    fn query_params(&self) -> Option<&Self::QueryParams> {
        Some(&self.query)
    }

    fn max_attempts() -> u8 {
        3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_de_account_response_and_balance_mapping() {
        let input = r#"
        {
            "balances": [
                { "asset": "USDT", "free": "100.5", "locked": "20.0" },
                { "asset": "BTC", "free": "0.2", "locked": "0" }
            ]
        }
        "#;

        let response = serde_json::from_str::<AccountResponse>(input).unwrap();
        let usdt = AssetBalance::from(response.balances[0].clone());
        assert_eq!(usdt.asset, AssetNameExchange::new("USDT"));
        assert_eq!(usdt.balance.total, dec!(120.5));
        assert_eq!(usdt.balance.free, dec!(100.5));
        assert_eq!(usdt.balance.used(), dec!(20.0));
    }
}
