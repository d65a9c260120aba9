//! Audit trail of operator commands
//!
//! Two sources feed it: every local dispatch, and the backend's own `/logs`
//! buffer. Records are kept newest-first and bounded.

use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::OnceLock;
use uuid::Uuid;

use crate::models::{Action, CommandResult, Device};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSource {
    Local,
    Backend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub system: String,
    pub operation: String,
    pub component: String,
    pub user: String,
    pub status: AuditStatus,
    pub detail: String,
    /// "<device> <action>" for local records, the bare action for backend lines
    pub command: String,
    pub source: AuditSource,
}

impl AuditRecord {
    /// Record for one dispatch outcome
    pub fn from_dispatch(result: &CommandResult) -> Self {
        let request = &result.original_request;

        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            system: request.device.system_name().to_string(),
            operation: request.action.label().to_string(),
            component: request.component().to_string(),
            user: "Operator".to_string(),
            status: if result.success {
                AuditStatus::Success
            } else {
                AuditStatus::Error
            },
            detail: result.message.clone(),
            command: format!("{} {}", request.device, request.action),
            source: AuditSource::Local,
        }
    }
}

struct LinePatterns {
    timestamp: Regex,
    action: Regex,
    device: Regex,
}

fn patterns() -> &'static LinePatterns {
    static PATTERNS: OnceLock<LinePatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| LinePatterns {
        timestamp: Regex::new(r"\[(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})\]").expect("valid regex"),
        action: Regex::new(r"Action (\w+)").expect("valid regex"),
        device: Regex::new(r"(?i)(sbms|pcs|diesel|skysails)").expect("valid regex"),
    })
}

/// Parse one backend log line such as
/// `[2025-01-01 12:00:00] Action power_on_sbms executed in 2.50 seconds`.
///
/// Lines without a timestamp are stamped with `now`. Backend timestamps are
/// site-local time.
pub fn parse_backend_line(line: &str, now: DateTime<Utc>) -> AuditRecord {
    let p = patterns();

    let timestamp = p
        .timestamp
        .captures(line)
        .and_then(|c| NaiveDateTime::parse_from_str(&c[1], "%Y-%m-%d %H:%M:%S").ok())
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or(now);

    let command = p
        .action
        .captures(line)
        .map(|c| c[1].to_string())
        .unwrap_or_default();

    let operation = if command.is_empty() {
        "Log Entry".to_string()
    } else {
        command
            .parse::<Action>()
            .map(|a| a.label().to_string())
            .unwrap_or_else(|_| command.clone())
    };

    let system = p
        .device
        .captures(line)
        .and_then(|c| c[1].to_lowercase().parse::<Device>().ok())
        .map(|d| d.system_name())
        .unwrap_or("System");

    AuditRecord {
        id: Uuid::new_v4(),
        timestamp,
        system: system.to_string(),
        operation,
        component: "System Log".to_string(),
        user: "System".to_string(),
        status: if line.contains("Error") {
            AuditStatus::Error
        } else {
            AuditStatus::Success
        },
        detail: line.to_string(),
        command,
        source: AuditSource::Backend,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateRange {
    #[default]
    Today,
    Week,
    All,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQuery {
    #[serde(default)]
    pub status: StatusFilter,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub range: DateRange,
}

#[derive(Debug)]
pub struct AuditLog {
    capacity: usize,
    records: VecDeque<AuditRecord>,
    // Last `/logs` window, oldest first
    backend_window: Vec<String>,
}

impl AuditLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            records: VecDeque::with_capacity(capacity),
            backend_window: Vec::new(),
        }
    }

    pub fn record(&mut self, record: AuditRecord) {
        tracing::debug!(
            "Audit: {} / {} -> {:?}",
            record.system,
            record.operation,
            record.status
        );
        self.records.push_front(record);
        self.settle();
    }

    /// Merge the backend's log window (oldest first). Lines already seen in
    /// the previous window are matched by position, so repeated text still
    /// counts as a new event and eviction never causes re-ingestion.
    /// Returns the number of new records.
    pub fn ingest_backend(&mut self, lines: &[String], now: DateTime<Utc>) -> usize {
        let seen = window_overlap(&self.backend_window, lines);

        let fresh: Vec<AuditRecord> = lines[seen..]
            .iter()
            .map(|line| parse_backend_line(line, now))
            .collect();
        self.backend_window = lines.to_vec();

        let added = fresh.len();
        if added > 0 {
            self.records.extend(fresh);
            self.settle();
        }
        added
    }

    // Newest first, oldest dropped past capacity
    fn settle(&mut self) {
        self.records
            .make_contiguous()
            .sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        self.records.truncate(self.capacity);
    }

    pub fn filter(&self, query: &AuditQuery, now: DateTime<Local>) -> Vec<AuditRecord> {
        let needle = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);
        let week_ago = now.with_timezone(&Utc) - Duration::days(7);

        self.records
            .iter()
            .filter(|r| match query.status {
                StatusFilter::All => true,
                StatusFilter::Success => r.status == AuditStatus::Success,
                StatusFilter::Error => r.status == AuditStatus::Error,
            })
            .filter(|r| match &needle {
                None => true,
                Some(needle) => [&r.system, &r.operation, &r.component, &r.detail]
                    .iter()
                    .any(|field| field.to_lowercase().contains(needle.as_str())),
            })
            .filter(|r| match query.range {
                DateRange::All => true,
                DateRange::Today => {
                    r.timestamp.with_timezone(&Local).date_naive() == now.date_naive()
                }
                DateRange::Week => r.timestamp >= week_ago,
            })
            .cloned()
            .collect()
    }

    pub fn records(&self) -> impl Iterator<Item = &AuditRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Longest tail of `previous` that `next` starts with. A backend restart
/// shares no overlap and yields 0.
fn window_overlap(previous: &[String], next: &[String]) -> usize {
    let longest = previous.len().min(next.len());
    (1..=longest)
        .rev()
        .find(|&k| previous[previous.len() - k..] == next[..k])
        .unwrap_or(0)
}
