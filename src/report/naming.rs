use chrono::Utc;

use crate::error::InvocationError;

pub const DEFAULT_REPORT_PREFIX: &str = "stepwrap_dry_run";

/// Produces `<prefix>_<timestamp>_<index>.json` names.
///
/// The index is a counter owned by the namer, so names from one namer never
/// collide even when several are produced within the same second.
#[derive(Debug, Clone)]
pub struct ReportNamer {
    prefix: String,
    next_index: u64,
}

impl ReportNamer {
    pub fn new(prefix: impl Into<String>) -> Result<Self, InvocationError> {
        let prefix = prefix.into();
        if prefix.is_empty()
            || prefix.contains(|c: char| c == '/' || c == '\\' || c.is_control())
        {
            return Err(InvocationError::Config(format!(
                "report prefix `{prefix}` must be a non-empty plain name"
            )));
        }
        Ok(Self {
            prefix,
            next_index: 0,
        })
    }

    pub fn next_name(&mut self) -> String {
        self.next_name_at(Utc::now().timestamp())
    }

    pub fn next_name_at(&mut self, timestamp: i64) -> String {
        let index = self.next_index;
        self.next_index += 1;
        format!("{}_{}_{}.json", self.prefix, timestamp, index)
    }
}

impl Default for ReportNamer {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_REPORT_PREFIX.to_string(),
            next_index: 0,
        }
    }
}
