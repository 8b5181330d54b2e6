use self::{
    http::{
        HTTP_BASE_URL_GATEIO,
        parser::GateioHttpParser,
        requests::{
            AccountsRequest, CancelAllOrdersRequest, CancelOrderRequest, ContractQuery,
            OpenOrdersRequest, PlaceOrderBody, PlaceOrderRequest, QueryOrderRequest,
        },
        signer::{GateioRequestSigner, GateioSigner},
    },
    websocket::{
        GateioAccountStream, GateioAccountStreamTransformer, PRIVATE_CHANNELS,
        generate_signed_subscription, send_validate,
    },
};
use crate::{
    AccountSnapshot,
    balance::{AssetBalance, Balance},
    client::{ApiCredentials, ExecutionClient},
    error::{ApiError, ClientError, OrderError},
    order::{Order, OrderKind, id::OrderId, request::OrderRequestOpen},
};
use basis_instrument::{
    Side, asset::AssetNameExchange, exchange::ExchangeId, spec::SymbolSpec, symbol::Symbol,
};
use basis_integration::{
    protocol::{http::rest::client::RestClient, websocket::connect},
    rate_limit::{RateLimiter, RequestClass},
};
use chrono::Utc;
use fnv::FnvHashMap;
use futures::StreamExt;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use sha2::Sha512;
use smol_str::SmolStr;
use std::{collections::VecDeque, sync::Arc, time::Duration};
use tracing::info;

/// Signed REST layer.
pub mod http;

/// Wire payload types shared by REST endpoints and the private stream.
pub mod types;

/// In-band authenticated private stream.
pub mod websocket;

/// Gate.io USDT perpetuals private WebSocket base url.
pub const WEBSOCKET_BASE_URL_GATEIO_PERPETUALS_USD: &str = "wss://fx-ws.gateio.ws/v4/ws/usdt";

/// Backoff between transient REST retries.
const REST_RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// Venue maximum signed request rate.
const REQUESTS_PER_SECOND: usize = 10;

/// Request slots per window withheld for order placement and cancellation.
const TRADING_RESERVE: usize = 3;

/// Gate.io USDT perpetuals [`ExecutionClient`].
///
/// Private streaming authenticates in-band: every subscription payload carries an
/// HMAC-SHA512 signature, so no token refresh schedule is needed.
#[derive(Debug, Clone)]
pub struct GateioFuturesExecutionClient {
    credentials: ApiCredentials,
    rest_client: Arc<RestClient<'static, GateioRequestSigner, GateioHttpParser>>,
    rate_limiter: RateLimiter,
    markets: Arc<FnvHashMap<SmolStr, (Symbol, Decimal)>>,
}

/// Configuration for a [`GateioFuturesExecutionClient`].
#[derive(Debug, Clone)]
pub struct GateioFuturesConfig {
    pub credentials: ApiCredentials,
    /// Trading rules for the contracts this account trades - contract sizes drive the
    /// conversion between venue contract counts and base quantities.
    pub specs: Vec<SymbolSpec>,
}

impl GateioFuturesExecutionClient {
    /// Track the outcome of a signed call against the adaptive rate limiter.
    async fn track<T>(&self, result: Result<T, ClientError>) -> Result<T, ClientError> {
        match &result {
            Err(ClientError::Api(ApiError::RateLimit)) => {
                self.rate_limiter.report_violation().await
            }
            Ok(_) => self.rate_limiter.reset_backoff().await,
            Err(_) => {}
        }
        result
    }

    fn market(&self, symbol: &Symbol) -> String {
        symbol
            .market_name(ExchangeId::GateioPerpetualsUsd)
            .to_string()
    }

    fn contract_size(&self, symbol: &Symbol) -> Result<Decimal, ClientError> {
        let market = symbol.market_name(ExchangeId::GateioPerpetualsUsd);
        self.markets
            .get(market.as_str())
            .map(|(_, contract_size)| *contract_size)
            .ok_or_else(|| {
                ClientError::Api(ApiError::SymbolInvalid(
                    symbol.to_string(),
                    "not configured on this client".to_string(),
                ))
            })
    }

    fn settle_asset() -> AssetNameExchange {
        AssetNameExchange::new("USDT")
    }
}

impl ExecutionClient for GateioFuturesExecutionClient {
    const EXCHANGE: ExchangeId = ExchangeId::GateioPerpetualsUsd;

    type Config = GateioFuturesConfig;
    type AccountStream = GateioAccountStream;

    fn new(config: Self::Config) -> Self {
        let hmac: Hmac<Sha512> = Hmac::new_from_slice(config.credentials.secret.as_bytes())
            .expect("ApiCredentials secret invalid length");

        let markets = config
            .specs
            .iter()
            .map(|spec| {
                (
                    spec.symbol.market_name(ExchangeId::GateioPerpetualsUsd),
                    (
                        spec.symbol.clone(),
                        spec.contract_size.unwrap_or(Decimal::ONE),
                    ),
                )
            })
            .collect();

        Self {
            rest_client: Arc::new(RestClient::new(
                HTTP_BASE_URL_GATEIO,
                GateioRequestSigner::new(
                    GateioSigner::new(config.credentials.key.clone()),
                    hmac,
                    basis_integration::protocol::http::private::encoder::HexEncoder,
                ),
                GateioHttpParser,
            )),
            credentials: config.credentials,
            rate_limiter: RateLimiter::new(REQUESTS_PER_SECOND, TRADING_RESERVE, Duration::from_secs(1)),
            markets: Arc::new(markets),
        }
    }

    async fn account_snapshot(&self, symbols: &[Symbol]) -> Result<AccountSnapshot, ClientError> {
        let balances = self.fetch_balances().await?;

        let mut orders = Vec::new();
        for symbol in symbols {
            let contract_size = self.contract_size(symbol)?;
            self.rate_limiter.acquire(RequestClass::Account).await;
            let (venue_orders, _) = self
                .rest_client
                .execute_with_retry(
                    OpenOrdersRequest::new(self.market(symbol)),
                    REST_RETRY_BACKOFF,
                )
                .await?;
            orders.extend(
                venue_orders
                    .into_iter()
                    .map(|order| order.into_order(symbol.clone(), contract_size)),
            );
        }

        Ok(AccountSnapshot::new(Self::EXCHANGE, balances, orders))
    }

    async fn account_stream(&self, symbols: &[Symbol]) -> Result<Self::AccountStream, ClientError> {
        let mut websocket = connect(WEBSOCKET_BASE_URL_GATEIO_PERPETUALS_USD)
            .await
            .map_err(ClientError::from)?;

        // Authentication is in-band: each private channel subscription carries its own
        // signature, sent as the first messages on the connection
        let contracts = symbols
            .iter()
            .map(|symbol| self.market(symbol))
            .collect::<Vec<_>>();
        let contract_refs = contracts
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>();

        for channel in PRIVATE_CHANNELS {
            let subscription = generate_signed_subscription(
                &self.credentials.key,
                &self.credentials.secret,
                channel,
                &contract_refs,
            );
            send_validate(&mut websocket, subscription).await?;
        }
        info!(exchange = %Self::EXCHANGE, "subscribed private futures channels");

        let (_, ws_stream) = websocket.split();

        let transformer = GateioAccountStreamTransformer::new(
            (*self.markets).clone(),
            Self::settle_asset(),
        );

        Ok(GateioAccountStream::new(
            basis_integration::stream::ExchangeStream::new(
                ws_stream,
                transformer,
                VecDeque::new(),
            ),
        ))
    }

    async fn open_order(&self, request: OrderRequestOpen) -> Result<Order, OrderError> {
        let cid = request.cid.clone();
        let contract_size = self.contract_size(&request.symbol).map_err(|error| {
            OrderError {
                client_order_id: Some(cid.clone()),
                error,
            }
        })?;

        // Convert the base quantity into signed contract counts
        let contracts = (request.quantity / contract_size).trunc();
        let size = match request.side {
            Side::Buy => contracts,
            Side::Sell => -contracts,
        };
        let size = rust_decimal::prelude::ToPrimitive::to_i64(&size).ok_or_else(|| OrderError {
            client_order_id: Some(cid.clone()),
            error: ClientError::Api(ApiError::OrderRejected(format!(
                "quantity {} exceeds contract count range",
                request.quantity
            ))),
        })?;

        let body = match request.kind {
            OrderKind::Limit => PlaceOrderBody {
                contract: self.market(&request.symbol),
                size,
                price: request.price,
                tif: "gtc",
                text: format!("t-{}", cid.0),
            },
            // Market orders carry a zero price with tif "ioc"
            OrderKind::Market => PlaceOrderBody {
                contract: self.market(&request.symbol),
                size,
                price: Decimal::ZERO,
                tif: "ioc",
                text: format!("t-{}", cid.0),
            },
        };

        self.rate_limiter.acquire(RequestClass::Trading).await;
        let (data, _) = self
            .rest_client
            .execute(PlaceOrderRequest { body })
            .await
            .map_err(|error| OrderError {
                client_order_id: Some(cid.clone()),
                error,
            })?;

        Ok(data.into_order(request.symbol, contract_size))
    }

    async fn cancel_order(&self, symbol: &Symbol, id: &OrderId) -> Result<Order, OrderError> {
        let contract_size = self.contract_size(symbol).map_err(|error| OrderError {
            client_order_id: None,
            error,
        })?;

        self.rate_limiter.acquire(RequestClass::Trading).await;
        let (data, _) = self
            .rest_client
            .execute(CancelOrderRequest {
                order_id: id.0.to_string(),
            })
            .await
            .map_err(|error| OrderError {
                client_order_id: None,
                error,
            })?;

        Ok(data.into_order(symbol.clone(), contract_size))
    }

    async fn cancel_all(&self, symbol: Option<&Symbol>) -> Result<Vec<Order>, ClientError> {
        let symbols = match symbol {
            Some(symbol) => vec![symbol.clone()],
            None => self
                .markets
                .values()
                .map(|(symbol, _)| symbol.clone())
                .collect(),
        };

        let mut cancelled = Vec::new();
        for symbol in symbols {
            let contract_size = self.contract_size(&symbol)?;
            self.rate_limiter.acquire(RequestClass::Trading).await;
            let (orders, _) = self
                .rest_client
                .execute(CancelAllOrdersRequest {
                    query: ContractQuery {
                        contract: self.market(&symbol),
                    },
                })
                .await?;
            cancelled.extend(
                orders
                    .into_iter()
                    .map(|order| order.into_order(symbol.clone(), contract_size)),
            );
        }
        Ok(cancelled)
    }

    async fn fetch_order(&self, symbol: &Symbol, id: &OrderId) -> Result<Order, ClientError> {
        let contract_size = self.contract_size(symbol)?;
        self.rate_limiter.acquire(RequestClass::Account).await;
        let result = self
            .rest_client
            .execute_with_retry(
                QueryOrderRequest {
                    order_id: id.0.to_string(),
                },
                REST_RETRY_BACKOFF,
            )
            .await
            .map(|(data, _)| data.into_order(symbol.clone(), contract_size));
        self.track(result).await
    }

    async fn fetch_open_orders(&self, symbol: Option<&Symbol>) -> Result<Vec<Order>, ClientError> {
        let symbols = match symbol {
            Some(symbol) => vec![symbol.clone()],
            None => self
                .markets
                .values()
                .map(|(symbol, _)| symbol.clone())
                .collect(),
        };

        let mut orders = Vec::new();
        for symbol in symbols {
            let contract_size = self.contract_size(&symbol)?;
            self.rate_limiter.acquire(RequestClass::Account).await;
            let result = self
                .rest_client
                .execute_with_retry(
                    OpenOrdersRequest::new(self.market(&symbol)),
                    REST_RETRY_BACKOFF,
                )
                .await
                .map(|(venue_orders, _)| venue_orders);
            let venue_orders = self.track(result).await?;
            orders.extend(
                venue_orders
                    .into_iter()
                    .map(|order| order.into_order(symbol.clone(), contract_size)),
            );
        }
        Ok(orders)
    }

    async fn fetch_balances(&self) -> Result<Vec<AssetBalance>, ClientError> {
        self.rate_limiter.acquire(RequestClass::Account).await;
        let result = self
            .rest_client
            .execute_with_retry(AccountsRequest, REST_RETRY_BACKOFF)
            .await
            .map(|(account, _)| account);
        let account = self.track(result).await?;

        Ok(vec![AssetBalance::new(
            AssetNameExchange::new(account.currency),
            Balance::new(account.total, account.available),
            Utc::now(),
        )])
    }
}
