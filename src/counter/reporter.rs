//! Debounced mutation counter.

use super::sink::ReportSink;
use super::DEFAULT_QUIET_PERIOD;
use crate::types::MutationReport;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Which tally a mutation event feeds.
#[derive(Clone, Copy, Debug)]
enum MutationKind {
    Added,
    Changed,
    Removed,
}

/// One mutation event sent to the reporter worker.
struct Event {
    collection: String,
    kind: MutationKind,
    count: u64,
}

/// Per-name accumulation state. Exists only between the first event of a
/// cycle and the report that ends it.
struct Tally {
    added: u64,
    changed: u64,
    removed: u64,
    deadline: Instant,
}

impl Tally {
    fn new(deadline: Instant) -> Self {
        Self {
            added: 0,
            changed: 0,
            removed: 0,
            deadline,
        }
    }

    fn into_report(self, collection: String) -> MutationReport {
        MutationReport {
            collection,
            added: self.added,
            changed: self.changed,
            removed: self.removed,
        }
    }
}

/// Counts added/changed/removed fixture mutations per collection name and
/// emits one aggregated report per name once no event has arrived for the
/// quiet period.
///
/// Recording is non-blocking; the worker thread owns every tally and
/// deadline. Dropping the counter flushes still-pending tallies and joins
/// the worker.
pub struct MutationCounter {
    sender: Option<Sender<Event>>,
    worker: Option<JoinHandle<()>>,
}

impl MutationCounter {
    /// Create a counter with the default quiet period (1000 ms).
    pub fn new(sink: Arc<dyn ReportSink>) -> Self {
        Self::with_quiet_period(sink, DEFAULT_QUIET_PERIOD)
    }

    /// Create a counter with a custom quiet period.
    pub fn with_quiet_period(sink: Arc<dyn ReportSink>, quiet_period: Duration) -> Self {
        let (sender, receiver) = unbounded();
        let worker = thread::spawn(move || run_worker(receiver, sink, quiet_period));

        Self {
            sender: Some(sender),
            worker: Some(worker),
        }
    }

    /// Add to the `added` tally for a collection name. No-op when `count`
    /// is zero.
    pub fn record_added(&self, collection: &str, count: u64) {
        self.record(collection, MutationKind::Added, count);
    }

    /// Add to the `changed` tally for a collection name. No-op when `count`
    /// is zero.
    pub fn record_changed(&self, collection: &str, count: u64) {
        self.record(collection, MutationKind::Changed, count);
    }

    /// Add to the `removed` tally for a collection name. No-op when `count`
    /// is zero.
    pub fn record_removed(&self, collection: &str, count: u64) {
        self.record(collection, MutationKind::Removed, count);
    }

    fn record(&self, collection: &str, kind: MutationKind, count: u64) {
        if count == 0 {
            return;
        }

        if let Some(sender) = &self.sender {
            let _ = sender.send(Event {
                collection: collection.to_string(),
                kind,
                count,
            });
        }
    }
}

impl Drop for MutationCounter {
    fn drop(&mut self) {
        // Disconnect the channel so the worker drains and exits.
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Worker loop: a single-threaded timer wheel over per-name deadlines.
///
/// Sleeps until the nearest deadline, wakes early for new events. Applying
/// an event and moving its name's deadline happen on this thread only, so
/// no event is lost and no name fires twice for one cycle.
fn run_worker(receiver: Receiver<Event>, sink: Arc<dyn ReportSink>, quiet_period: Duration) {
    let mut pending: HashMap<String, Tally> = HashMap::new();

    loop {
        let event = match next_deadline(&pending) {
            Some(deadline) => {
                let timeout = deadline.saturating_duration_since(Instant::now());
                match receiver.recv_timeout(timeout) {
                    Ok(event) => Some(event),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match receiver.recv() {
                Ok(event) => Some(event),
                Err(_) => break,
            },
        };

        if let Some(event) = event {
            apply(&mut pending, event, quiet_period);

            // Drain whatever else is already queued before checking
            // deadlines, so a burst settles as one pass.
            while let Ok(event) = receiver.try_recv() {
                apply(&mut pending, event, quiet_period);
            }
        }

        emit_due(&mut pending, &*sink, Instant::now());
    }

    // Shutdown: emit pending tallies so counts are never silently dropped.
    for (collection, tally) in pending.drain() {
        sink.report(&tally.into_report(collection));
    }
}

fn next_deadline(pending: &HashMap<String, Tally>) -> Option<Instant> {
    pending.values().map(|t| t.deadline).min()
}

/// Add the event's count to its tally and restart the name's quiet period
/// (last-event-wins).
fn apply(pending: &mut HashMap<String, Tally>, event: Event, quiet_period: Duration) {
    let deadline = Instant::now() + quiet_period;
    let tally = pending
        .entry(event.collection)
        .or_insert_with(|| Tally::new(deadline));

    match event.kind {
        MutationKind::Added => tally.added += event.count,
        MutationKind::Changed => tally.changed += event.count,
        MutationKind::Removed => tally.removed += event.count,
    }
    tally.deadline = deadline;
}

/// Emit reports for every name whose quiet period has elapsed, returning
/// those names to idle.
fn emit_due(pending: &mut HashMap<String, Tally>, sink: &dyn ReportSink, now: Instant) {
    let due: Vec<String> = pending
        .iter()
        .filter(|(_, tally)| tally.deadline <= now)
        .map(|(collection, _)| collection.clone())
        .collect();

    for collection in due {
        if let Some(tally) = pending.remove(&collection) {
            sink.report(&tally.into_report(collection));
        }
    }
}
