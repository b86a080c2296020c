//! Mutation-driven discovery.
//!
//! Insertions into a container arrive as [`MutationRecord`]s on a channel. An
//! [`Observer`] owns the [`Loader`] and drives it until its
//! [`ObserverHandle`] stops it, then hands the loader back.
//!
//! The run loop waits on new records, the stop signal and fetch completions
//! at once. A record never waits behind an earlier record's fetches.

use sprig_core::Node;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::loader::Loader;

/// Nodes added under one target element.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRecord {
    /// Tag name of the element the nodes were added to.
    pub target: String,
    pub added_nodes: Vec<Node>,
}

impl MutationRecord {
    pub fn new(target: impl Into<String>, added_nodes: Vec<Node>) -> Self {
        Self {
            target: target.into(),
            added_nodes,
        }
    }
}

/// Sending side of an observation.
#[derive(Debug, Clone)]
pub struct ObserverHandle {
    records: mpsc::UnboundedSender<MutationRecord>,
    stop: watch::Sender<bool>,
}

impl ObserverHandle {
    /// Deliver a mutation. Returns `false` once the observer has finished.
    pub fn notify(&self, record: MutationRecord) -> bool {
        self.records.send(record).is_ok()
    }

    /// End the subscription. Records already delivered are still processed,
    /// and fetches that have already resolved are loaded.
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop.borrow()
    }
}

/// Receiving side of an observation; owns the loader while running.
#[derive(Debug)]
pub struct Observer {
    loader: Loader,
    records: mpsc::UnboundedReceiver<MutationRecord>,
    stop: watch::Receiver<bool>,
}

/// Start observing with `loader`.
pub fn observe(loader: Loader) -> (Observer, ObserverHandle) {
    let (records_tx, records_rx) = mpsc::unbounded_channel();
    let (stop_tx, stop_rx) = watch::channel(false);
    (
        Observer {
            loader,
            records: records_rx,
            stop: stop_rx,
        },
        ObserverHandle {
            records: records_tx,
            stop: stop_tx,
        },
    )
}

impl Observer {
    /// Process records until stopped. Returns the loader with its registry.
    ///
    /// Fetches still unresolved at stop stay queued on the returned loader;
    /// [`Loader::finish_pending`] waits for them.
    ///
    /// With `one_shot` set, no records are taken after the first one whose
    /// target is a container, and observation ends once that batch's fetches
    /// have completed.
    pub async fn run(mut self) -> Loader {
        let one_shot = self.loader.config().one_shot;
        let mut listening = true;
        info!(one_shot, "observing for component definitions");

        loop {
            if *self.stop.borrow() {
                if listening {
                    self.drain(one_shot);
                }
                break;
            }
            if !listening && !self.loader.has_pending() {
                break;
            }
            let fetching = self.loader.has_pending();
            tokio::select! {
                biased;
                changed = self.stop.changed() => {
                    if changed.is_err() {
                        if listening {
                            self.drain(one_shot);
                        }
                        break;
                    }
                }
                record = self.records.recv(), if listening => match record {
                    Some(record) => {
                        if self.process(record) && one_shot {
                            listening = false;
                        }
                    }
                    None => listening = false,
                },
                summary = self.loader.complete_next(), if fetching => {
                    if let Some(summary) = summary {
                        debug!(
                            registered = summary.registered.len(),
                            failed = summary.failed.len(),
                            "external definition loaded"
                        );
                    }
                }
            }
        }

        self.loader.complete_ready();
        self.records.close();
        info!(pending = self.loader.pending_count(), "observation stopped");
        self.loader
    }

    fn drain(&mut self, one_shot: bool) {
        while let Ok(record) = self.records.try_recv() {
            if self.process(record) && one_shot {
                return;
            }
        }
    }

    fn process(&mut self, record: MutationRecord) -> bool {
        let target = record.target.clone();
        match self.loader.handle_mutation(record) {
            Some(summary) => {
                debug!(
                    target = %target,
                    registered = summary.registered.len(),
                    failed = summary.failed.len(),
                    pending = self.loader.pending_count(),
                    "processed container mutation"
                );
                true
            }
            None => false,
        }
    }
}
