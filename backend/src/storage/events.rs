//! Change notification for live queries.
//!
//! Every repository write publishes the tables it touched; each live query
//! listens for the tables its SQL reads and re-runs itself when one of
//! them changes. Cascade deletes publish every table the cascade reaches,
//! so a merchant delete invalidates stall and payment queries too.

use tokio::sync::broadcast;

/// Capacity of the notification channel. Lagged receivers simply re-run
/// their query, so overflow costs a redundant requery, never a lost write.
const CHANNEL_CAPACITY: usize = 64;

/// Tag for a persisted table, published after a write touches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Usuarios,
    Comerciantes,
    Puestos,
    Cobros,
}

/// Broadcast fan-out of table changes.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<Table>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Publish a change. A send error only means no live query is
    /// currently subscribed, which is fine.
    pub fn publish(&self, table: Table) {
        let _ = self.tx.send(table);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Table> {
        self.tx.subscribe()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}
