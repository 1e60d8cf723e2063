//! Run report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::AggregateReport;
use crate::audit::AuditResult;

/// What a run produced: aggregations when rules were configured, the raw
/// audit results otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportBody {
    Aggregations {
        aggregations: AggregateReport,
    },
    AuditResults {
        #[serde(rename = "auditResults")]
        audit_results: Vec<AuditResult>,
    },
}

/// Output of one successful run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub url: String,
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    /// Digest of the scheduled pass layout; equal for equal plans.
    pub plan_digest: String,
    #[serde(flatten)]
    pub body: ReportBody,
}

impl Report {
    pub fn aggregations(&self) -> Option<&AggregateReport> {
        match &self.body {
            ReportBody::Aggregations { aggregations } => Some(aggregations),
            ReportBody::AuditResults { .. } => None,
        }
    }

    pub fn audit_results(&self) -> Option<&[AuditResult]> {
        match &self.body {
            ReportBody::AuditResults { audit_results } => Some(audit_results),
            ReportBody::Aggregations { .. } => None,
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
