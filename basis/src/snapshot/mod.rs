use crate::engine::context::EngineContext;
use basis_execution::order::{Order, OrderKind, OrderStatus, id::{ClientOrderId, OrderId}};
use basis_instrument::{Side, symbol::Symbol};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, warn};

/// Snapshots retained per task - older files are deleted after a successful write.
pub const DEFAULT_MAX_SNAPSHOTS_PER_TASK: usize = 10;

/// All errors generated by the [`SnapshotManager`].
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot serialisation error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("snapshot validation failed: {0}")]
    Validation(String),
}

/// Complete snapshot of an engine context with restore-validation metadata.
///
/// Active orders are carried twice: inside the serialized context, and as denormalised
/// [`OrderRecord`]s that stay readable even if the context shape evolves.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ContextSnapshot {
    pub snapshot_id: String,
    pub time: DateTime<Utc>,
    pub task_id: String,
    pub symbol: String,
    pub context: EngineContext,
    pub order_records: Vec<OrderRecord>,
    pub order_count: usize,
    pub position_checksum: String,
    /// Higher values restore first when multiple tasks recover together.
    pub recovery_priority: u8,
}

/// Denormalised record of one active order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OrderRecord {
    pub order_id: OrderId,
    pub client_order_id: Option<ClientOrderId>,
    pub symbol: Symbol,
    pub side: Side,
    pub kind: OrderKind,
    pub price: Decimal,
    pub quantity: Decimal,
    pub filled_quantity: Decimal,
    pub status: OrderStatus,
    pub time_exchange: DateTime<Utc>,
}

impl From<&Order> for OrderRecord {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id.clone(),
            client_order_id: order.cid.clone(),
            symbol: order.symbol.clone(),
            side: order.side,
            kind: order.kind,
            price: order.price,
            quantity: order.quantity,
            filled_quantity: order.filled_quantity,
            status: order.status,
            time_exchange: order.time_exchange,
        }
    }
}

impl From<OrderRecord> for Order {
    fn from(record: OrderRecord) -> Self {
        Self {
            id: record.order_id,
            cid: record.client_order_id,
            symbol: record.symbol,
            side: record.side,
            kind: record.kind,
            price: record.price,
            quantity: record.quantity,
            filled_quantity: record.filled_quantity,
            status: record.status,
            time_exchange: record.time_exchange,
        }
    }
}

/// Durable per-task engine context persistence.
///
/// Writes are atomic (`snap-<ms>.tmp` + fsync + rename to `snap-<ms>.json`), the latest
/// valid snapshot wins on restore, and restores are rejected unless order counts, the
/// position checksum, and the task id all match.
#[derive(Debug)]
pub struct SnapshotManager {
    storage_root: PathBuf,
    max_snapshots_per_task: usize,
}

impl SnapshotManager {
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
            max_snapshots_per_task: DEFAULT_MAX_SNAPSHOTS_PER_TASK,
        }
    }

    pub fn with_max_snapshots(mut self, max_snapshots_per_task: usize) -> Self {
        self.max_snapshots_per_task = max_snapshots_per_task;
        self
    }

    /// Build a [`ContextSnapshot`] of the provided context.
    pub fn create_snapshot(&self, context: &EngineContext) -> ContextSnapshot {
        let time = Utc::now();
        let order_records = context
            .active_orders
            .iter()
            .map(|(_, order)| OrderRecord::from(order))
            .collect::<Vec<_>>();

        ContextSnapshot {
            snapshot_id: format!("snap-{}", time.timestamp_millis()),
            time,
            task_id: context.task_id.clone(),
            symbol: context.symbol.to_string(),
            order_count: order_records.len(),
            order_records,
            position_checksum: position_checksum(context),
            recovery_priority: recovery_priority(context),
            context: context.clone(),
        }
    }

    /// Persist a snapshot atomically, then prune history beyond the retention limit.
    ///
    /// Blocking file IO - callers on the engine tick path schedule this on a separate task.
    pub fn save(&self, snapshot: &ContextSnapshot) -> Result<PathBuf, SnapshotError> {
        let task_dir = self.storage_root.join(&snapshot.task_id);
        fs::create_dir_all(&task_dir)?;

        let final_path = task_dir.join(format!("{}.json", snapshot.snapshot_id));
        let tmp_path = task_dir.join(format!("{}.tmp", snapshot.snapshot_id));

        // Atomic write: tmp + fsync + rename
        {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(serde_json::to_vec(snapshot)?.as_slice())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &final_path)?;

        debug!(
            snapshot_id = %snapshot.snapshot_id,
            orders = snapshot.order_count,
            "saved context snapshot"
        );

        self.prune(&task_dir)?;
        Ok(final_path)
    }

    /// Load the latest valid snapshot for a task.
    ///
    /// Unreadable files are skipped with a warning; a validation failure on the newest
    /// readable snapshot is an error - restoring stale state silently would risk duplicate
    /// submissions.
    pub fn load_latest(&self, task_id: &str) -> Result<Option<ContextSnapshot>, SnapshotError> {
        let task_dir = self.storage_root.join(task_id);
        if !task_dir.exists() {
            return Ok(None);
        }

        let mut snapshots = Vec::new();
        for entry in fs::read_dir(&task_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match fs::read_to_string(&path)
                .map_err(SnapshotError::from)
                .and_then(|data| {
                    serde_json::from_str::<ContextSnapshot>(&data).map_err(SnapshotError::from)
                }) {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(error) => {
                    warn!(?path, %error, "skipping unreadable snapshot file");
                }
            }
        }

        snapshots.sort_by_key(|snapshot| snapshot.time);
        let Some(latest) = snapshots.pop() else {
            return Ok(None);
        };

        self.validate(task_id, &latest)?;
        Ok(Some(latest))
    }

    /// Validate a snapshot before accepting a restore.
    pub fn validate(&self, task_id: &str, snapshot: &ContextSnapshot) -> Result<(), SnapshotError> {
        if snapshot.task_id != task_id {
            return Err(SnapshotError::Validation(format!(
                "task id mismatch: expected {task_id}, got {}",
                snapshot.task_id
            )));
        }

        if snapshot.order_count != snapshot.order_records.len()
            || snapshot.order_count != snapshot.context.active_orders.count()
        {
            return Err(SnapshotError::Validation(format!(
                "order count mismatch: recorded {}, records {}, context {}",
                snapshot.order_count,
                snapshot.order_records.len(),
                snapshot.context.active_orders.count()
            )));
        }

        let expected = position_checksum(&snapshot.context);
        if snapshot.position_checksum != expected {
            return Err(SnapshotError::Validation(format!(
                "position checksum mismatch: expected {expected}, got {}",
                snapshot.position_checksum
            )));
        }

        Ok(())
    }

    /// Delete snapshot files beyond the newest `max_snapshots_per_task`.
    fn prune(&self, task_dir: &Path) -> Result<(), SnapshotError> {
        let mut files = fs::read_dir(task_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("json"))
            .collect::<Vec<_>>();

        if files.len() <= self.max_snapshots_per_task {
            return Ok(());
        }

        // snap-<ms> filenames sort chronologically
        files.sort();
        let excess = files.len() - self.max_snapshots_per_task;
        for path in files.into_iter().take(excess) {
            if let Err(error) = fs::remove_file(&path) {
                warn!(?path, %error, "failed to remove pruned snapshot");
            }
        }

        Ok(())
    }
}

/// Checksum over the signed positions, binding a snapshot to the exposure it was taken at.
fn position_checksum(context: &EngineContext) -> String {
    let data = format!(
        "{}:{}",
        context.positions.spot.signed_quantity, context.positions.futures.signed_quantity
    );
    hex::encode(Sha256::digest(data.as_bytes()))
}

/// Restore priority - contexts with in-flight orders or open positions recover first.
fn recovery_priority(context: &EngineContext) -> u8 {
    let mut priority = 1u8;
    if !context.active_orders.is_empty() {
        priority += 3;
    }
    if context.positions.has_positions() {
        priority += 2;
    }
    if context.state == crate::engine::context::EngineState::Executing {
        priority += 4;
    }
    priority
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::TradingParams, engine::context::EngineState, manager::VenueRole};
    use rust_decimal_macros::dec;

    fn context(task_id: &str) -> EngineContext {
        let mut context = EngineContext::new(
            task_id.to_string(),
            Symbol::spot("btc", "usdt"),
            dec!(20),
            dec!(2),
            dec!(1),
            TradingParams::default(),
        );
        context.state = EngineState::Executing;
        context
            .positions
            .spot
            .apply_fill(Side::Buy, dec!(0.2), dec!(100.01));
        context.active_orders.insert(
            VenueRole::Spot,
            Order {
                id: OrderId::new("a-1"),
                cid: Some(ClientOrderId::new("cid-1")),
                symbol: Symbol::spot("btc", "usdt"),
                side: Side::Buy,
                kind: OrderKind::Limit,
                price: dec!(100.01),
                quantity: dec!(0.2),
                filled_quantity: dec!(0.2),
                status: OrderStatus::PartiallyFilled,
                time_exchange: Utc::now(),
            },
        );
        context
    }

    fn manager() -> (SnapshotManager, PathBuf) {
        let root = std::env::temp_dir().join(format!(
            "basis_snapshots_{}_{}",
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or_default(),
        ));
        (SnapshotManager::new(root.clone()), root)
    }

    #[test]
    fn test_snapshot_save_load_round_trip() {
        let (manager, root) = manager();
        let context = context("task-1");

        let snapshot = manager.create_snapshot(&context);
        let path = manager.save(&snapshot).unwrap();
        assert!(path.exists());
        assert!(path.to_string_lossy().ends_with(".json"));

        // Restore yields a context with identical active order ids and checksum
        let restored = manager.load_latest("task-1").unwrap().unwrap();
        assert_eq!(restored.context, context);
        assert_eq!(restored.order_count, 1);
        assert_eq!(
            restored.position_checksum,
            position_checksum(&context)
        );

        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn test_latest_snapshot_wins() {
        let (manager, root) = manager();
        let mut context = context("task-2");

        let first = manager.create_snapshot(&context);
        manager.save(&first).unwrap();

        context.arbitrage_cycles = 5;
        let mut second = manager.create_snapshot(&context);
        // Guarantee distinct ids even when created within the same millisecond
        second.snapshot_id = format!("{}b", second.snapshot_id);
        second.time += chrono::TimeDelta::milliseconds(1);
        manager.save(&second).unwrap();

        let restored = manager.load_latest("task-2").unwrap().unwrap();
        assert_eq!(restored.context.arbitrage_cycles, 5);

        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn test_validation_rejects_tampered_counts() {
        let (manager, _root) = manager();
        let context = context("task-3");

        let mut snapshot = manager.create_snapshot(&context);
        snapshot.order_count = 7;

        assert!(matches!(
            manager.validate("task-3", &snapshot),
            Err(SnapshotError::Validation(_))
        ));
    }

    #[test]
    fn test_validation_rejects_task_id_mismatch() {
        let (manager, _root) = manager();
        let snapshot = manager.create_snapshot(&context("task-4"));

        assert!(matches!(
            manager.validate("other-task", &snapshot),
            Err(SnapshotError::Validation(_))
        ));
    }

    #[test]
    fn test_retention_prunes_oldest() {
        let (manager, root) = manager();
        let manager = manager.with_max_snapshots(3);
        let context = context("task-5");

        for sequence in 0..5 {
            let mut snapshot = manager.create_snapshot(&context);
            snapshot.snapshot_id = format!("snap-{:013}", sequence);
            manager.save(&snapshot).unwrap();
        }

        let files = fs::read_dir(root.join("task-5"))
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "json"))
            .count();
        assert_eq!(files, 3);

        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn test_order_record_round_trip() {
        let order = Order {
            id: OrderId::new("a-1"),
            cid: Some(ClientOrderId::new("cid-1")),
            symbol: Symbol::perpetual("btc", "usdt"),
            side: Side::Sell,
            kind: OrderKind::Limit,
            price: dec!(100.15),
            quantity: dec!(0.2),
            filled_quantity: dec!(0.05),
            status: OrderStatus::PartiallyFilled,
            time_exchange: Utc::now(),
        };

        let record = OrderRecord::from(&order);
        assert_eq!(Order::from(record), order);
    }
}
