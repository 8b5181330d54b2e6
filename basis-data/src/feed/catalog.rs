use super::snapshot::PublicHttpParser;
use crate::error::DataError;
use basis_instrument::{exchange::ExchangeId, spec::SymbolSpec, symbol::Symbol};
use basis_integration::protocol::http::{
    public::PublicNoHeaders,
    rest::{RestRequest, client::RestClient},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Gate.io publishes no explicit minimum notional for perpetual contracts - this floor keeps
/// dust orders from reaching the venue.
const GATEIO_DEFAULT_MIN_NOTIONAL: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// Fetch the trading rules for a MEXC spot symbol.
///
/// See docs: <https://mexcdevelop.github.io/apidocs/spot_v3_en/#exchange-information>
pub async fn fetch_mexc_symbol_spec(
    client: &RestClient<'static, PublicNoHeaders, PublicHttpParser>,
    symbol: &Symbol,
) -> Result<SymbolSpec, DataError> {
    let market = symbol.market_name(ExchangeId::MexcSpot).to_string();
    let request = MexcExchangeInfoRequest {
        query: MexcExchangeInfoQuery {
            symbol: market.clone(),
        },
    };

    let (response, _) = client.execute(request).await?;

    let info = response
        .symbols
        .into_iter()
        .find(|info| info.symbol == market)
        .ok_or_else(|| {
            DataError::Socket(format!("MEXC exchangeInfo missing symbol: {market}"))
        })?;

    Ok(SymbolSpec {
        symbol: symbol.clone(),
        base_precision: info.base_asset_precision,
        quote_precision: info.quote_asset_precision,
        min_base_quantity: info.base_size_precision,
        min_quote_notional: info.quote_amount_precision,
        maker_fee: info.maker_commission,
        taker_fee: info.taker_commission,
        active: info.status == "ENABLED" || info.status == "1",
        contract_size: None,
    })
}

#[derive(Debug, Clone)]
struct MexcExchangeInfoRequest {
    query: MexcExchangeInfoQuery,
}

#[derive(Debug, Clone, Serialize)]
struct MexcExchangeInfoQuery {
    symbol: String,
}

#[derive(Debug, Clone, Deserialize)]
struct MexcExchangeInfoResponse {
    symbols: Vec<MexcSymbolInfo>,
}

/// ### Raw Payload Example
/// ```json
/// {
///     "symbol": "BTCUSDT",
///     "status": "ENABLED",
///     "baseAssetPrecision": 8,
///     "quoteAssetPrecision": 8,
///     "baseSizePrecision": "0.0001",
///     "quoteAmountPrecision": "5",
///     "makerCommission": "0.002",
///     "takerCommission": "0.002"
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
struct MexcSymbolInfo {
    symbol: String,
    status: String,
    #[serde(rename = "baseAssetPrecision")]
    base_asset_precision: u32,
    #[serde(rename = "quoteAssetPrecision")]
    quote_asset_precision: u32,
    #[serde(rename = "baseSizePrecision")]
    base_size_precision: Decimal,
    #[serde(rename = "quoteAmountPrecision")]
    quote_amount_precision: Decimal,
    #[serde(rename = "makerCommission")]
    maker_commission: Decimal,
    #[serde(rename = "takerCommission")]
    taker_commission: Decimal,
}

impl RestRequest for MexcExchangeInfoRequest {
    type Response = MexcExchangeInfoResponse;
    type QueryParams = MexcExchangeInfoQuery;
    type Body = ();

    fn path(&self) -> Cow<'static, str> {
        Cow::Borrowed("/api/v3/exchangeInfo")
    }

    fn method() -> reqwest::Method {
        reqwest::Method::GET
    }

    fn query_params(&self) -> Option<&Self::QueryParams> {
        Some(&self.query)
    }
}

/// Fetch the trading rules for a Gate.io USDT perpetual contract.
///
/// See docs: <https://www.gate.io/docs/developers/apiv4/en/#get-a-single-contract>
pub async fn fetch_gateio_contract_spec(
    client: &RestClient<'static, PublicNoHeaders, PublicHttpParser>,
    symbol: &Symbol,
) -> Result<SymbolSpec, DataError> {
    let request = GateioContractRequest {
        contract: symbol
            .market_name(ExchangeId::GateioPerpetualsUsd)
            .to_string(),
    };

    let (contract, _) = client.execute(request).await?;

    Ok(SymbolSpec {
        symbol: symbol.clone(),
        base_precision: contract.quanto_multiplier.scale(),
        quote_precision: contract.order_price_round.scale(),
        min_base_quantity: contract.order_size_min * contract.quanto_multiplier,
        min_quote_notional: GATEIO_DEFAULT_MIN_NOTIONAL,
        maker_fee: contract.maker_fee_rate,
        taker_fee: contract.taker_fee_rate,
        active: !contract.in_delisting,
        contract_size: Some(contract.quanto_multiplier),
    })
}

#[derive(Debug, Clone)]
struct GateioContractRequest {
    contract: String,
}

/// ### Raw Payload Example
/// ```json
/// {
///     "name": "BTC_USDT",
///     "quanto_multiplier": "0.0001",
///     "order_size_min": 1,
///     "order_price_round": "0.1",
///     "maker_fee_rate": "-0.00025",
///     "taker_fee_rate": "0.00075",
///     "in_delisting": false
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
struct GateioContractResponse {
    #[allow(dead_code)]
    name: String,
    quanto_multiplier: Decimal,
    order_size_min: Decimal,
    order_price_round: Decimal,
    maker_fee_rate: Decimal,
    taker_fee_rate: Decimal,
    in_delisting: bool,
}

impl RestRequest for GateioContractRequest {
    type Response = GateioContractResponse;
    type QueryParams = ();
    type Body = ();

    fn path(&self) -> Cow<'static, str> {
        Cow::Owned(format!("/api/v4/futures/usdt/contracts/{}", self.contract))
    }

    fn method() -> reqwest::Method {
        reqwest::Method::GET
    }
}
