use basis_data::streams::reconnect::stream::ReconnectionBackoffPolicy;
use basis_instrument::symbol::Symbol;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Engine configuration for one traded symbol.
///
/// Credentials and venue urls are supplied by the embedding application - the engine core
/// performs no config file loading.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Stable identifier keying snapshots on disk. Re-using a task id across restarts is
    /// what allows in-flight orders to be recovered.
    pub task_id: String,

    /// Traded pair (base/quote) - the engine derives the spot and perpetual symbols.
    pub symbol: Symbol,

    /// Base position size per cycle, denominated in the quote asset.
    pub base_position_size_quote: Decimal,

    /// Upper bound on position size as a multiple of `base_position_size_quote`.
    pub max_position_multiplier: Decimal,

    /// Leverage configured on the futures venue.
    pub futures_leverage: Decimal,

    /// Trading thresholds.
    pub params: TradingParams,

    /// Root directory for context snapshots.
    pub snapshot_root: PathBuf,

    /// Reconnection backoff applied to venue streams.
    #[serde(default = "default_backoff_policy")]
    pub stream_backoff: ReconnectionBackoffPolicy,
}

fn default_backoff_policy() -> ReconnectionBackoffPolicy {
    basis_data::streams::consumer::STREAM_RECONNECTION_POLICY
}

/// Trading thresholds and limits.
///
/// The entry cost convention follows the executable prices: for a `spot -> futures` entry,
/// `entry_cost_pct = (spot_ask - futures_bid) / spot_ask * 100`. Profitable entries are
/// negative, so `max_entry_cost_pct` is typically negative (eg/ -0.10 requires the futures
/// bid to exceed the spot ask by at least 0.10%).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TradingParams {
    /// Enter only while the entry cost is strictly below this bound.
    pub max_entry_cost_pct: Decimal,

    /// Exit once the cost of unwinding the pair falls strictly below this bound.
    /// Always tighter than entry.
    pub exit_threshold_pct: Decimal,

    /// Maximum tolerated delta imbalance, as a percentage of gross exposure.
    pub delta_tolerance_pct: Decimal,

    /// Force-exit a pair held longer than this many seconds. Recognised policy,
    /// disabled by default.
    #[serde(default)]
    pub position_age_limit_secs: Option<u64>,

    /// Reject opportunities whose executable volume is below this quote notional.
    /// Recognised policy, disabled by default.
    #[serde(default)]
    pub min_volume_quote: Option<Decimal>,

    /// Reject opportunities whose estimated profit is below this quote amount.
    /// Recognised policy, disabled by default.
    #[serde(default)]
    pub min_profit_quote: Option<Decimal>,
}

impl Default for TradingParams {
    fn default() -> Self {
        Self {
            max_entry_cost_pct: Decimal::new(-10, 2), // -0.10
            exit_threshold_pct: Decimal::new(3, 2),   // 0.03
            delta_tolerance_pct: Decimal::TWO,
            position_age_limit_secs: None,
            min_volume_quote: None,
            min_profit_quote: None,
        }
    }
}
