//! Dispatcher - the event-processing loop.
//!
//! Classifies each event, hands the resulting operation to the gateway and
//! turns every failure into a logged outcome. One bad event never prevents
//! the next one from being processed, and nothing is retried.

use crate::classifier::EventClassifier;
use crate::error::{DispatchError, GatewayError};
use crate::gateway::{Delivery, SyncGateway};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use vlesync_types::{DomainEvent, OperationName};

/// Result of dispatching a single event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The operation reached the VLE.
    Delivered(OperationName),
    /// The gateway is not configured; the operation was not sent.
    Skipped(OperationName),
    /// The event does not translate to any operation.
    Ignored,
    /// Classification failed; nothing was sent.
    Dropped(String),
    /// Delivery failed or timed out.
    Failed(OperationName, String),
}

/// Running totals kept by a spawned dispatcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub delivered: u64,
    pub skipped: u64,
    pub ignored: u64,
    pub dropped: u64,
    pub failed: u64,
}

impl DispatchStats {
    pub fn record(&mut self, outcome: &DispatchOutcome) {
        match outcome {
            DispatchOutcome::Delivered(_) => self.delivered += 1,
            DispatchOutcome::Skipped(_) => self.skipped += 1,
            DispatchOutcome::Ignored => self.ignored += 1,
            DispatchOutcome::Dropped(_) => self.dropped += 1,
            DispatchOutcome::Failed(..) => self.failed += 1,
        }
    }

    /// Total number of events processed.
    pub fn total(&self) -> u64 {
        self.delivered + self.skipped + self.ignored + self.dropped + self.failed
    }
}

/// Classifies events and delivers the resulting operations.
pub struct SyncDispatcher {
    classifier: Arc<EventClassifier>,
    gateway: Arc<dyn SyncGateway>,
    send_timeout: Duration,
}

impl SyncDispatcher {
    pub fn new(
        classifier: EventClassifier,
        gateway: Arc<dyn SyncGateway>,
        send_timeout: Duration,
    ) -> Self {
        Self {
            classifier: Arc::new(classifier),
            gateway,
            send_timeout,
        }
    }

    /// Processes one event. Never fails; the outcome says what happened.
    pub async fn dispatch(&self, event: &DomainEvent) -> DispatchOutcome {
        let classifier = Arc::clone(&self.classifier);
        let owned = event.clone();
        let classified =
            tokio::task::spawn_blocking(move || classifier.classify(&owned)).await;

        let operation = match classified {
            Ok(Ok(Some(op))) => op,
            Ok(Ok(None)) => {
                debug!(event = %event, "Event ignored");
                return DispatchOutcome::Ignored;
            }
            Ok(Err(e)) => {
                warn!(event = %event, error = %e, "Dropping event");
                return DispatchOutcome::Dropped(e.to_string());
            }
            Err(e) => {
                warn!(event = %event, error = %e, "Classification task failed");
                return DispatchOutcome::Dropped(e.to_string());
            }
        };

        let name = operation.name();
        let sent = tokio::time::timeout(self.send_timeout, self.gateway.send(&operation))
            .await
            .unwrap_or(Err(GatewayError::Timeout(self.send_timeout)));

        match sent {
            Ok(Delivery::Delivered) => {
                info!(event = %event, operation = %name, "Operation delivered");
                DispatchOutcome::Delivered(name)
            }
            Ok(Delivery::Skipped) => DispatchOutcome::Skipped(name),
            Err(e) => {
                warn!(event = %event, operation = %name, error = %e, "Delivery failed");
                DispatchOutcome::Failed(name, e.to_string())
            }
        }
    }

    /// Runs the dispatcher behind a bounded queue.
    ///
    /// Events are processed one at a time in submission order. The loop
    /// ends once every handle has been dropped, yielding the totals.
    pub fn spawn(self, capacity: usize) -> (DispatcherHandle, JoinHandle<DispatchStats>) {
        let (tx, mut rx) = mpsc::channel::<DomainEvent>(capacity.max(1));
        let task = tokio::spawn(async move {
            let mut stats = DispatchStats::default();
            while let Some(event) = rx.recv().await {
                let outcome = self.dispatch(&event).await;
                stats.record(&outcome);
            }
            info!(
                delivered = stats.delivered,
                skipped = stats.skipped,
                ignored = stats.ignored,
                dropped = stats.dropped,
                failed = stats.failed,
                "Dispatcher stopped"
            );
            stats
        });
        (DispatcherHandle { tx }, task)
    }
}

/// Submits events to a spawned dispatcher.
#[derive(Clone)]
pub struct DispatcherHandle {
    tx: mpsc::Sender<DomainEvent>,
}

impl DispatcherHandle {
    /// Queues an event, waiting for room if the queue is full.
    pub async fn submit(&self, event: DomainEvent) -> Result<(), DispatchError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| DispatchError::ChannelClosed)
    }

    /// Queues an event without waiting.
    pub fn try_submit(&self, event: DomainEvent) -> Result<(), DispatchError> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DispatchError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => DispatchError::ChannelClosed,
        })
    }
}
