/// Place order.
pub mod place_order;

/// Cancel one order / all open orders.
pub mod cancel_order;

/// Fetch open orders.
pub mod open_orders;

/// Fetch a single order.
pub mod query_order;

/// Fetch account balances.
pub mod account;

/// Listen-key lifecycle for the private data stream.
pub mod listen_key;

/// On-chain withdrawals.
pub mod withdraw;

/// Milliseconds the venue will accept a signed request after its `timestamp`.
pub const RECV_WINDOW_MS: u64 = 5000;

/// Current timestamp in the form MEXC expects on signed requests.
pub fn request_timestamp() -> u64 {
    chrono::Utc::now().timestamp_millis() as u64
}
