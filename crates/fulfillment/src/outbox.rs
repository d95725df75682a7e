//! Bounded notification outbox.
//!
//! The orchestrator enqueues notifications after its writes succeed and
//! never waits on delivery. A single worker drains the queue into the
//! [`NotificationSink`] with a per-message timeout; outcomes are counted in
//! [`OutboxStats`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use metrics::counter;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::services::{Notification, NotificationSink};

/// Delivery counters shared by the outbox handle and its worker.
#[derive(Debug, Clone, Default)]
pub struct OutboxStats {
    enqueued: Arc<AtomicU64>,
    delivered: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
    dropped: Arc<AtomicU64>,
}

impl OutboxStats {
    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Messages the sink rejected or did not accept in time.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Messages discarded because the queue was full or closed.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Messages enqueued but not yet delivered or failed.
    pub fn pending(&self) -> u64 {
        self.enqueued()
            .saturating_sub(self.delivered())
            .saturating_sub(self.failed())
    }
}

/// Producer handle. Cheap to clone.
#[derive(Clone)]
pub struct Outbox {
    tx: mpsc::Sender<Notification>,
    stats: OutboxStats,
}

/// Consumer side; drains the queue into the sink.
pub struct OutboxWorker {
    rx: mpsc::Receiver<Notification>,
    sink: Arc<dyn NotificationSink>,
    timeout: Duration,
    stats: OutboxStats,
}

impl Outbox {
    /// Creates a queue of `capacity` messages and its worker.
    pub fn new(
        capacity: usize,
        sink: Arc<dyn NotificationSink>,
        timeout: Duration,
    ) -> (Self, OutboxWorker) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let stats = OutboxStats::default();
        let worker = OutboxWorker {
            rx,
            sink,
            timeout,
            stats: stats.clone(),
        };
        (Self { tx, stats }, worker)
    }

    /// Creates the queue and runs its worker on the current runtime.
    pub fn spawn(
        capacity: usize,
        sink: Arc<dyn NotificationSink>,
        timeout: Duration,
    ) -> (Self, JoinHandle<()>) {
        let (outbox, worker) = Self::new(capacity, sink, timeout);
        let handle = tokio::spawn(worker.run());
        (outbox, handle)
    }

    /// Queues a notification without waiting. Returns false if it was dropped.
    pub fn enqueue(&self, notification: Notification) -> bool {
        let template = notification.template.code();
        match self.tx.try_send(notification) {
            Ok(()) => {
                self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
                counter!("notifications_enqueued_total", "template" => template).increment(1);
                true
            }
            Err(e) => {
                let reason = match e {
                    mpsc::error::TrySendError::Full(_) => "full",
                    mpsc::error::TrySendError::Closed(_) => "closed",
                };
                tracing::warn!(template, reason, "notification dropped");
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                counter!("notifications_dropped_total", "reason" => reason).increment(1);
                false
            }
        }
    }

    pub fn stats(&self) -> &OutboxStats {
        &self.stats
    }
}

impl OutboxWorker {
    /// Delivers messages until every [`Outbox`] handle is dropped.
    pub async fn run(mut self) {
        while let Some(notification) = self.rx.recv().await {
            self.deliver(notification).await;
        }
        tracing::debug!("notification outbox closed");
    }

    /// Delivers whatever is queued right now and returns how many messages
    /// were handled.
    pub async fn drain(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(notification) = self.rx.try_recv() {
            self.deliver(notification).await;
            handled += 1;
        }
        handled
    }

    pub fn stats(&self) -> &OutboxStats {
        &self.stats
    }

    async fn deliver(&self, notification: Notification) {
        let template = notification.template.code();
        let result = tokio::time::timeout(self.timeout, self.sink.notify(&notification)).await;
        match result {
            Ok(Ok(())) => {
                self.stats.delivered.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    recipient = %notification.recipient,
                    template,
                    error = %e,
                    "notification delivery failed"
                );
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                counter!("notifications_failed_total", "template" => template).increment(1);
            }
            Err(_) => {
                tracing::warn!(
                    recipient = %notification.recipient,
                    template,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "notification delivery timed out"
                );
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                counter!("notifications_failed_total", "template" => template).increment(1);
            }
        }
    }
}
