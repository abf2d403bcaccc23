//! Report sinks.

use crate::types::MutationReport;
use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::info;

/// Receives aggregated mutation reports from the reporter worker.
pub trait ReportSink: Send + Sync {
    fn report(&self, report: &MutationReport);
}

/// Default sink: one structured log event per report.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogReportSink;

impl ReportSink for LogReportSink {
    fn report(&self, report: &MutationReport) {
        info!(
            collection = %report.collection,
            added = report.added,
            changed = report.changed,
            removed = report.removed,
            "fixture mutations"
        );
    }
}

/// Sink that forwards reports to a channel for programmatic consumption.
///
/// Delivery is best-effort: if the buffer is full the report is dropped
/// rather than blocking the reporter worker.
pub struct ChannelReportSink {
    sender: Sender<MutationReport>,
}

impl ChannelReportSink {
    /// Create a sink and the receiver for its reports.
    pub fn new(buffer_size: usize) -> (Self, Receiver<MutationReport>) {
        let (sender, receiver) = bounded(buffer_size);
        (Self { sender }, receiver)
    }
}

impl ReportSink for ChannelReportSink {
    fn report(&self, report: &MutationReport) {
        let _ = self.sender.try_send(report.clone());
    }
}
