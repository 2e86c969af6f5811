use std::ops::ControlFlow;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use super::{Command, OPS};
use crate::observability::{LIVE_STORES, SNAPSHOT_FAILURES_TOTAL, STORE_OPERATIONS_TOTAL};
use crate::storage::{snapshot, StoreKey, StoreValue, Table};

/// The single consumer behind a store instance. Owns the table outright.
pub(crate) struct StoreWorker<K, V> {
    name: Arc<str>,
    table: Table<K, V>,
    rx: mpsc::UnboundedReceiver<Command<K, V>>,
}

impl<K: StoreKey, V: StoreValue> StoreWorker<K, V> {
    pub(crate) fn new(name: Arc<str>, rx: mpsc::UnboundedReceiver<Command<K, V>>) -> Self {
        Self { name, table: Table::new(), rx }
    }

    /// Drain the queue until a `Stop` arrives or every handle is dropped.
    pub(crate) async fn run(mut self) {
        LIVE_STORES.inc();
        info!(service = "kvstore", event = "store_start", store = %self.name, "store instance running");

        while let Some(cmd) = self.rx.recv().await {
            STORE_OPERATIONS_TOTAL.with_label_values(&[&*self.name, cmd.op()]).inc();
            if self.apply(cmd).await.is_break() {
                break;
            }
        }

        // Metrics settle before the receiver closes: `terminate` returns on close.
        LIVE_STORES.dec();
        self.forget_metrics();
        info!(
            service = "kvstore",
            event = "store_stop",
            store = %self.name,
            entries = self.table.len(),
            "store instance terminated"
        );

        // Anything still queued behind a Stop is dropped with its reply
        // channel, which the waiting caller sees as a terminated instance.
        self.rx.close();
    }

    /// Drop this instance's label sets so terminated names do not accumulate.
    fn forget_metrics(&self) {
        for op in OPS {
            // absent when the op never ran on this instance
            let _ = STORE_OPERATIONS_TOTAL.remove_label_values(&[&*self.name, op]);
        }
        for op in ["save", "load"] {
            let _ = SNAPSHOT_FAILURES_TOTAL.remove_label_values(&[&*self.name, op]);
        }
    }

    async fn apply(&mut self, cmd: Command<K, V>) -> ControlFlow<()> {
        match cmd {
            Command::Set { key, value } => {
                self.table.insert(key, value);
                trace!(store = %self.name, entries = self.table.len(), "set applied");
            }
            Command::Get { key, reply } => {
                let _ = reply.send(self.table.get(&key).cloned());
            }
            Command::Len { reply } => {
                let _ = reply.send(self.table.len());
            }
            Command::Save { path, reply } => {
                // Encoding happens in this turn, so the image is exactly the table as of now.
                let encoded = snapshot::encode(&self.table);
                let result = match encoded {
                    Ok(bytes) => snapshot::write_file(&path, bytes).await,
                    Err(e) => Err(e),
                };
                match &result {
                    Ok(bytes) => info!(
                        service = "kvstore",
                        event = "snapshot_saved",
                        store = %self.name,
                        path = %path.display(),
                        entries = self.table.len(),
                        bytes,
                        "snapshot written"
                    ),
                    Err(e) => {
                        SNAPSHOT_FAILURES_TOTAL.with_label_values(&[&*self.name, "save"]).inc();
                        warn!(store = %self.name, path = %path.display(), error = %e, code = e.code(), "snapshot save failed");
                    }
                }
                let _ = reply.send(result.map(|_| ()));
            }
            Command::Load { path, reply } => {
                // Decode fully before touching the live table; a failure leaves it as is.
                let result = snapshot::read_file::<K, V>(&path).await.map(|table| {
                    let previous = std::mem::replace(&mut self.table, table);
                    debug!(store = %self.name, discarded = previous.len(), "previous table replaced");
                });
                match &result {
                    Ok(()) => info!(
                        service = "kvstore",
                        event = "snapshot_loaded",
                        store = %self.name,
                        path = %path.display(),
                        entries = self.table.len(),
                        "snapshot loaded"
                    ),
                    Err(e) => {
                        SNAPSHOT_FAILURES_TOTAL.with_label_values(&[&*self.name, "load"]).inc();
                        warn!(store = %self.name, path = %path.display(), error = %e, code = e.code(), "snapshot load failed; table unchanged");
                    }
                }
                let _ = reply.send(result);
            }
            Command::Stop => {
                debug!(store = %self.name, "stop requested");
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }
}
