use self::{
    http::{
        HTTP_BASE_URL_MEXC,
        parser::MexcHttpParser,
        requests::{
            account::AccountRequest,
            cancel_order::{CancelAllOrdersRequest, CancelOrderRequest},
            listen_key::{
                CreateListenKeyRequest, DeleteListenKeyRequest, KeepAliveListenKeyRequest,
                LISTEN_KEY_KEEPALIVE_INTERVAL,
            },
            open_orders::OpenOrdersRequest,
            place_order::PlaceOrderRequest,
            query_order::QueryOrderRequest,
            withdraw::WithdrawApplyRequest,
        },
        signer::{MexcRequestSigner, MexcSigner},
    },
    websocket::{
        MexcAccountStream, MexcAccountStreamTransformer, PRIVATE_TOPICS,
        distribute_messages_to_exchange, send_validate,
    },
};
use crate::{
    AccountSnapshot,
    balance::AssetBalance,
    client::{ApiCredentials, ExecutionClient, WithdrawRequest, WithdrawalId},
    error::{ClientError, OrderError},
    order::{Order, id::OrderId, request::OrderRequestOpen},
};
use basis_instrument::{exchange::ExchangeId, symbol::Symbol};
use basis_integration::{
    protocol::{
        http::rest::client::RestClient,
        websocket::{WsMessage, connect},
    },
    rate_limit::{RateLimiter, RequestClass},
};
use fnv::FnvHashMap;
use futures::StreamExt;
use hmac::{Hmac, Mac};
use smol_str::SmolStr;
use std::{collections::VecDeque, sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Signed REST layer.
pub mod http;

/// Wire payload types shared by REST endpoints.
pub mod types;

/// Listen-key authenticated private stream.
pub mod websocket;

/// MEXC private WebSocket base url - the listen key is appended as a query parameter.
pub const WEBSOCKET_BASE_URL_MEXC: &str = "wss://wbs-api.mexc.com/ws";

/// Backoff between transient REST retries.
const REST_RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// Venue maximum signed request rate.
const REQUESTS_PER_SECOND: usize = 20;

/// Request slots per window withheld for order placement and cancellation.
const TRADING_RESERVE: usize = 5;

/// MEXC spot [`ExecutionClient`].
///
/// Private streaming requires a listen key obtained over REST with a ~60 minute TTL - a
/// keep-alive task extends it every 30 minutes, and on keep-alive failure the stream is
/// closed so the supervisor re-initialises with a fresh key (the stale key is deleted
/// best-effort).
#[derive(Debug, Clone)]
pub struct MexcExecutionClient {
    rest_client: Arc<RestClient<'static, MexcRequestSigner, MexcHttpParser>>,
    rate_limiter: RateLimiter,
    symbols_by_market: Arc<FnvHashMap<SmolStr, Symbol>>,
}

/// Configuration for a [`MexcExecutionClient`].
#[derive(Debug, Clone)]
pub struct MexcConfig {
    pub credentials: ApiCredentials,
    /// Symbols this account trades - used to map venue market names back to [`Symbol`]s.
    pub symbols: Vec<Symbol>,
}

impl MexcExecutionClient {
    /// Track the outcome of a signed call against the adaptive rate limiter.
    async fn track<T>(&self, result: Result<T, ClientError>) -> Result<T, ClientError> {
        match &result {
            Err(ClientError::Api(crate::error::ApiError::RateLimit)) => {
                self.rate_limiter.report_violation().await
            }
            Ok(_) => self.rate_limiter.reset_backoff().await,
            Err(_) => {}
        }
        result
    }

    fn market(&self, symbol: &Symbol) -> String {
        symbol.market_name(ExchangeId::MexcSpot).to_string()
    }
}

impl ExecutionClient for MexcExecutionClient {
    const EXCHANGE: ExchangeId = ExchangeId::MexcSpot;

    type Config = MexcConfig;
    type AccountStream = MexcAccountStream;

    fn new(config: Self::Config) -> Self {
        let hmac = Hmac::new_from_slice(config.credentials.secret.as_bytes())
            .expect("ApiCredentials secret invalid length");

        let symbols_by_market = config
            .symbols
            .iter()
            .map(|symbol| (symbol.market_name(ExchangeId::MexcSpot), symbol.clone()))
            .collect();

        Self {
            rest_client: Arc::new(RestClient::new(
                HTTP_BASE_URL_MEXC,
                MexcRequestSigner::new(
                    MexcSigner::new(config.credentials.key.clone()),
                    hmac,
                    basis_integration::protocol::http::private::encoder::HexEncoder,
                ),
                MexcHttpParser,
            )),
            rate_limiter: RateLimiter::new(REQUESTS_PER_SECOND, TRADING_RESERVE, Duration::from_secs(1)),
            symbols_by_market: Arc::new(symbols_by_market),
        }
    }

    async fn account_snapshot(&self, symbols: &[Symbol]) -> Result<AccountSnapshot, ClientError> {
        let balances = self.fetch_balances().await?;

        let mut orders = Vec::new();
        for symbol in symbols {
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
                    .map(|data| data.into_order(symbol.clone())),
            );
        }

        Ok(AccountSnapshot::new(Self::EXCHANGE, balances, orders))
    }

    async fn account_stream(&self, _: &[Symbol]) -> Result<Self::AccountStream, ClientError> {
        // Obtain a fresh listen key for this connection
        self.rate_limiter.acquire(RequestClass::Account).await;
        let (listen_key, _) = self
            .rest_client
            .execute_with_retry(CreateListenKeyRequest::new(), REST_RETRY_BACKOFF)
            .await?;
        let listen_key = listen_key.listen_key;
        info!(exchange = %Self::EXCHANGE, "obtained private stream listen key");

        // Connect and subscribe the private topics in one batched message
        let url = format!("{WEBSOCKET_BASE_URL_MEXC}?listenKey={listen_key}");
        let mut websocket = connect(url).await.map_err(ClientError::from)?;

        let subscription = serde_json::json!({
            "method": "SUBSCRIPTION",
            "params": PRIVATE_TOPICS,
        });
        send_validate(&mut websocket, WsMessage::text(subscription.to_string())).await?;

        let (ws_sink, ws_stream) = websocket.split();
        let (ws_sink_tx, ws_sink_rx) = mpsc::unbounded_channel();
        tokio::spawn(distribute_messages_to_exchange(ws_sink, ws_sink_rx));

        // Schedule keep-alives; on failure rotate by closing the stream - the supervisor
        // re-initialises with a new key and the stale one is deleted
        tokio::spawn(run_listen_key_keepalive(
            Arc::clone(&self.rest_client),
            listen_key,
            ws_sink_tx,
        ));

        let transformer =
            MexcAccountStreamTransformer::new((*self.symbols_by_market).clone());

        Ok(MexcAccountStream::new(
            basis_integration::stream::ExchangeStream::new(
                ws_stream,
                transformer,
                VecDeque::new(),
            ),
        ))
    }

    async fn open_order(&self, request: OrderRequestOpen) -> Result<Order, OrderError> {
        self.rate_limiter.acquire(RequestClass::Trading).await;
        let cid = request.cid.clone();
        let symbol = request.symbol.clone();

        let (data, _) = self
            .rest_client
            .execute(PlaceOrderRequest::new(&request))
            .await
            .map_err(|error| OrderError {
                client_order_id: Some(cid.clone()),
                error,
            })?;

        let mut order = data.into_order(symbol);
        // Place acks omit the cid on some endpoints - preserve the one we sent
        order.cid.get_or_insert(cid);
        Ok(order)
    }

    async fn cancel_order(&self, symbol: &Symbol, id: &OrderId) -> Result<Order, OrderError> {
        self.rate_limiter.acquire(RequestClass::Trading).await;
        let (data, _) = self
            .rest_client
            .execute(CancelOrderRequest::new(
                self.market(symbol),
                id.0.to_string(),
            ))
            .await
            .map_err(|error| OrderError {
                client_order_id: None,
                error,
            })?;

        Ok(data.into_order(symbol.clone()))
    }

    async fn cancel_all(&self, symbol: Option<&Symbol>) -> Result<Vec<Order>, ClientError> {
        let symbols = match symbol {
            Some(symbol) => vec![symbol.clone()],
            None => self.symbols_by_market.values().cloned().collect(),
        };

        let mut cancelled = Vec::new();
        for symbol in symbols {
            self.rate_limiter.acquire(RequestClass::Trading).await;
            let (orders, _) = self
                .rest_client
                .execute(CancelAllOrdersRequest::new(self.market(&symbol)))
                .await?;
            cancelled.extend(
                orders
                    .into_iter()
                    .map(|data| data.into_order(symbol.clone())),
            );
        }
        Ok(cancelled)
    }

    async fn fetch_order(&self, symbol: &Symbol, id: &OrderId) -> Result<Order, ClientError> {
        self.rate_limiter.acquire(RequestClass::Account).await;
        let result = self
            .rest_client
            .execute_with_retry(
                QueryOrderRequest::new(self.market(symbol), id.0.to_string()),
                REST_RETRY_BACKOFF,
            )
            .await
            .map(|(data, _)| data.into_order(symbol.clone()));
        self.track(result).await
    }

    async fn fetch_open_orders(&self, symbol: Option<&Symbol>) -> Result<Vec<Order>, ClientError> {
        let symbols = match symbol {
            Some(symbol) => vec![symbol.clone()],
            None => self.symbols_by_market.values().cloned().collect(),
        };

        let mut orders = Vec::new();
        for symbol in symbols {
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
                    .map(|data| data.into_order(symbol.clone())),
            );
        }
        Ok(orders)
    }

    async fn fetch_balances(&self) -> Result<Vec<AssetBalance>, ClientError> {
        self.rate_limiter.acquire(RequestClass::Account).await;
        let result = self
            .rest_client
            .execute_with_retry(AccountRequest::new(), REST_RETRY_BACKOFF)
            .await
            .map(|(response, _)| response);
        let response = self.track(result).await?;
        Ok(response
            .balances
            .into_iter()
            .map(AssetBalance::from)
            .collect())
    }

    async fn withdraw(&self, request: WithdrawRequest) -> Result<WithdrawalId, ClientError> {
        self.rate_limiter.acquire(RequestClass::Account).await;
        let (response, _) = self
            .rest_client
            .execute(WithdrawApplyRequest::new(
                request.asset.name().to_string(),
                request.chain,
                request.address,
                request.amount,
            ))
            .await?;
        Ok(WithdrawalId(response.id))
    }
}

/// Extend the listen key every 30 minutes.
///
/// On keep-alive failure the key may already be void: the stale key is deleted best-effort
/// and the stream closed, prompting the supervisor to re-initialise with a fresh key and
/// re-subscribe.
async fn run_listen_key_keepalive(
    rest_client: Arc<RestClient<'static, MexcRequestSigner, MexcHttpParser>>,
    listen_key: String,
    ws_sink_tx: mpsc::UnboundedSender<WsMessage>,
) {
    let mut interval = tokio::time::interval(LISTEN_KEY_KEEPALIVE_INTERVAL);
    // The first tick completes immediately
    interval.tick().await;

    loop {
        interval.tick().await;

        match rest_client
            .execute(KeepAliveListenKeyRequest::new(listen_key.clone()))
            .await
        {
            Ok(_) => {
                info!(exchange = %ExchangeId::MexcSpot, "extended private stream listen key");
            }
            Err(error) => {
                warn!(
                    exchange = %ExchangeId::MexcSpot,
                    %error,
                    "listen key keep-alive failed - rotating key via stream restart"
                );

                if let Err(error) = rest_client
                    .execute(DeleteListenKeyRequest::new(listen_key.clone()))
                    .await
                {
                    warn!(
                        exchange = %ExchangeId::MexcSpot,
                        %error,
                        "failed to delete stale listen key"
                    );
                }

                // Close the stream - the account stream supervisor creates a new key
                let _ = ws_sink_tx.send(WsMessage::Close(None));
                break;
            }
        }
    }
}
