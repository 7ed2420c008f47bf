//! Merges the eight independent field reads of a dream into one snapshot.
//!
//! Reads are issued in batches called *activations*. A new activation starts
//! when the source becomes reachable or when the dream id changes while it is
//! reachable. Every result carries the activation it was issued for and is
//! committed only if that activation is still current; anything older is
//! dropped.
//!
//! ```text
//!  set_connected(true) ─┐
//!  set_dream_id(new)  ──┴─► Activation ─► dispatch_reads ─► 8 × SlotUpdate ─► apply
//! ```

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use crate::errors::Result;
use crate::snapshot::{DerivedView, Field, RemoteSnapshot};
use crate::source::{DreamSource, FieldValue};

/// Identifies one batch of reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Activation {
    pub dream_id: u64,
    pub generation: u64,
}

/// Result of one field read, tagged with the activation that issued it.
#[derive(Debug)]
pub struct SlotUpdate {
    pub activation: Activation,
    pub field: Field,
    pub result: Result<FieldValue>,
}

#[derive(Debug)]
pub struct DreamAggregator {
    dream_id: u64,
    connected: bool,
    generation: u64,
    snapshot: RemoteSnapshot,
}

impl DreamAggregator {
    pub fn new(dream_id: u64) -> Self {
        Self {
            dream_id,
            connected: false,
            generation: 0,
            snapshot: RemoteSnapshot::default(),
        }
    }

    pub fn dream_id(&self) -> u64 {
        self.dream_id
    }

    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn snapshot(&self) -> &RemoteSnapshot {
        &self.snapshot
    }

    pub fn view(&self) -> DerivedView {
        self.snapshot.derive()
    }

    pub fn current(&self) -> Activation {
        Activation {
            dream_id: self.dream_id,
            generation: self.generation,
        }
    }

    /// Returns a new activation on a disconnected → connected transition.
    pub fn set_connected(&mut self, connected: bool) -> Option<Activation> {
        let was = std::mem::replace(&mut self.connected, connected);
        if connected && !was {
            Some(self.activate())
        } else {
            None
        }
    }

    /// Point the aggregator at another dream. Returns a new activation when
    /// connected; otherwise the old snapshot is dropped and reads wait for the
    /// next connection.
    pub fn set_dream_id(&mut self, dream_id: u64) -> Option<Activation> {
        if dream_id == self.dream_id {
            return None;
        }
        self.dream_id = dream_id;
        if self.connected {
            Some(self.activate())
        } else {
            self.supersede();
            None
        }
    }

    fn supersede(&mut self) {
        self.generation += 1;
        self.snapshot = RemoteSnapshot::default();
    }

    fn activate(&mut self) -> Activation {
        self.supersede();
        let activation = self.current();
        info!(
            "Activating dream {} (generation {})",
            activation.dream_id, activation.generation
        );
        activation
    }

    /// Commit a read result. Returns `false` when the update belongs to a
    /// superseded activation and was discarded.
    pub fn apply(&mut self, update: SlotUpdate) -> bool {
        if update.activation != self.current() {
            debug!(
                "Discarding stale {} read for dream {} (generation {}, current {})",
                update.field.as_str(),
                update.activation.dream_id,
                update.activation.generation,
                self.generation
            );
            return false;
        }
        if let Err(e) = &update.result {
            debug!("Read of {} failed: {e}", update.field.as_str());
        }
        self.snapshot.commit(update.field, update.result);
        true
    }
}

/// Issue the eight reads of `activation`, one task each. Results are sent on
/// `updates` in completion order.
pub fn dispatch_reads<S: DreamSource>(
    source: &Arc<S>,
    activation: Activation,
    updates: &UnboundedSender<SlotUpdate>,
) {
    for field in Field::ALL {
        let source = Arc::clone(source);
        let updates = updates.clone();
        tokio::spawn(async move {
            let result = source.read(activation.dream_id, field).await;
            // The receiver is gone only when the card has shut down.
            let _ = updates.send(SlotUpdate {
                activation,
                field,
                result,
            });
        });
    }
}
