use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Utc;
use serde::Serialize;

use crate::{errors::Error, Result};

/// RFC3339 timestamp in UTC (for logs and recent-send records).
pub fn iso_timestamp_utc() -> String {
    Utc::now().to_rfc3339()
}

// ============== Activity Log ==============

const ACTIVITY_MAX_TEXT: usize = 500;

/// One structured entry in the activity log: a send, a capture, a registration
/// or a failure of any of them.
#[derive(Clone, Debug, Serialize)]
pub struct ActivityEntry {
    pub timestamp: String,
    pub event: String,
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Page URL the action started from, for diagnosing restricted pages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,
}

impl ActivityEntry {
    fn base(event: &str, success: bool) -> Self {
        Self {
            timestamp: iso_timestamp_utc(),
            event: event.to_string(),
            success,
            destination_id: None,
            destination_name: None,
            payload_kind: None,
            content: None,
            error: None,
            page_url: None,
        }
    }

    pub fn sent(destination_id: &str, destination_name: &str, kind: &str, content: &str) -> Self {
        Self {
            destination_id: Some(destination_id.to_string()),
            destination_name: Some(destination_name.to_string()),
            payload_kind: Some(kind.to_string()),
            content: Some(content.to_string()),
            ..Self::base("send", true)
        }
    }

    pub fn failed(event: &str, destination_id: Option<&str>, error: &str) -> Self {
        Self {
            destination_id: destination_id.map(|s| s.to_string()),
            error: Some(error.to_string()),
            ..Self::base(event, false)
        }
    }

    pub fn registered(destination_id: &str, destination_name: &str) -> Self {
        Self {
            destination_id: Some(destination_id.to_string()),
            destination_name: Some(destination_name.to_string()),
            ..Self::base("register", true)
        }
    }

    pub fn with_page(mut self, page_url: &str) -> Self {
        if !page_url.is_empty() {
            self.page_url = Some(page_url.to_string());
        }
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.destination_name = Some(name.to_string());
        self
    }

    pub fn with_kind(mut self, kind: &str) -> Self {
        self.payload_kind = Some(kind.to_string());
        self
    }
}

#[derive(Clone, Debug)]
pub struct ActivityLog {
    path: PathBuf,
    json: bool,
}

impl ActivityLog {
    pub fn new(path: impl Into<PathBuf>, json: bool) -> Self {
        Self {
            path: path.into(),
            json,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an entry, logging instead of failing the caller.
    pub fn record(&self, entry: ActivityEntry) {
        if let Err(e) = self.write(entry) {
            tracing::warn!(error = %e, path = %self.path.display(), "failed to write activity entry");
        }
    }

    pub fn write(&self, mut entry: ActivityEntry) -> Result<()> {
        // Data URLs from screenshots are huge; only a prefix is useful in the log.
        if let Some(s) = &entry.content {
            entry.content = Some(truncate_text(s, ACTIVITY_MAX_TEXT));
        }
        if let Some(s) = &entry.error {
            entry.error = Some(truncate_text(s, ACTIVITY_MAX_TEXT));
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        if self.json {
            let line = serde_json::to_string(&entry)?;
            writeln!(file, "{line}")?;
            return Ok(());
        }

        // Plain text format for readability.
        let mut out = String::new();
        out.push('\n');
        out.push_str(&"=".repeat(60));

        let value = serde_json::to_value(&entry)?;
        let Some(obj) = value.as_object() else {
            return Err(Error::External(
                "activity entry is not a JSON object".to_string(),
            ));
        };
        for (k, v) in obj {
            out.push('\n');
            out.push_str(k);
            out.push_str(": ");
            out.push_str(&json_value_to_display(v));
        }
        out.push('\n');

        file.write_all(out.as_bytes())?;
        Ok(())
    }
}

pub fn truncate_text(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let mut out = s.chars().take(max_len).collect::<String>();
    out.push_str("...");
    out
}

fn json_value_to_display(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.to_string(),
        other => serde_json::to_string(other).unwrap_or_else(|_| "<unprintable>".to_string()),
    }
}
