//! Abuse reports.
//!
//! Reports are append-only: the relay records them and hands them to
//! whoever reviews them; nothing in the relay edits or acts on one.

use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use tandem_protocol::{IdentityId, ReportId};

/// A participant's report about their partner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub id: ReportId,
    pub reporter: IdentityId,
    pub reported: IdentityId,
    pub reason: String,
    pub details: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: u64,
}

/// In-memory append-only report log.
#[derive(Debug, Default)]
pub struct ReportLog {
    reports: RwLock<Vec<Report>>,
}

impl ReportLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a report and returns it with its assigned id.
    pub fn submit(
        &self,
        reporter: IdentityId,
        reported: IdentityId,
        reason: String,
        details: String,
    ) -> Report {
        let mut reports = self.reports.write();
        let report = Report {
            id: ReportId(reports.len() as u64 + 1),
            reporter,
            reported,
            reason,
            details,
            created_at: now_millis(),
        };
        reports.push(report.clone());
        tracing::info!(
            report_id = %report.id,
            %reporter,
            %reported,
            reason = %report.reason,
            "report submitted"
        );
        report
    }

    /// Every report filed against `reported`, oldest first.
    pub fn against(&self, reported: IdentityId) -> Vec<Report> {
        self.reports
            .read()
            .iter()
            .filter(|report| report.reported == reported)
            .cloned()
            .collect()
    }

    /// A copy of the whole log, oldest first.
    pub fn snapshot(&self) -> Vec<Report> {
        self.reports.read().clone()
    }

    pub fn len(&self) -> usize {
        self.reports.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.read().is_empty()
    }
}

/// Wall-clock milliseconds since the Unix epoch, or 0 if the clock is
/// set before 1970.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
