//! Mutation counting and debounced reporting.
//!
//! Every facade mutation feeds a per-collection-name tally of added, changed
//! and removed counts. Instead of logging each write, a quiet period follows
//! the last event for a name; when it elapses, one aggregated
//! [`MutationReport`] is emitted and the tally resets.
//!
//! All tallies and debounce deadlines live on a single reporter worker
//! thread, fed over a channel, so incrementing and rescheduling are atomic
//! per name and independent names never interact.
//!
//! # Example
//!
//! ```ignore
//! let (sink, reports) = ChannelReportSink::new(16);
//! let counter = MutationCounter::with_quiet_period(Arc::new(sink), Duration::from_millis(100));
//!
//! counter.record_added("users", 2);
//! counter.record_removed("users", 1);
//!
//! // One aggregated report after the quiet period
//! let report = reports.recv_timeout(Duration::from_secs(1)).unwrap();
//! assert_eq!((report.added, report.removed), (2, 1));
//! ```
//!
//! [`MutationReport`]: crate::types::MutationReport

mod reporter;
mod sink;

pub use reporter::MutationCounter;
pub use sink::{ChannelReportSink, LogReportSink, ReportSink};

use std::time::Duration;

/// Default quiet period before a report is emitted.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(1000);
