//! Report, identity and draft value types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Nickname stamped on reports submitted without a usable identity.
pub const ANONYMOUS_NICKNAME: &str = "anonymous";

/// An ordered report snapshot, newest first.
pub type ReportList = Vec<Report>;

/// Current time in epoch milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A single incident report.
///
/// `id` is absent on candidates and assigned by the collection on append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub report_type: String,
    pub description: String,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub nickname: String,
    pub timestamp: i64,
}

impl Report {
    /// Build an unsubmitted candidate stamped with the current time.
    #[must_use]
    pub fn candidate(
        report_type: impl Into<String>,
        description: impl Into<String>,
        location: impl Into<String>,
        image_url: Option<String>,
    ) -> Self {
        Self {
            id: None,
            report_type: report_type.into(),
            description: description.into(),
            location: location.into(),
            image_url,
            nickname: ANONYMOUS_NICKNAME.to_string(),
            timestamp: now_millis(),
        }
    }

    /// Decode a stored record, defaulting any missing or mistyped field.
    ///
    /// Non-object values decode as records with every field missing.
    #[must_use]
    pub fn from_record(id: &str, record: &Value, now: i64) -> Self {
        let text = |field: &str| record.get(field).and_then(Value::as_str).map(str::to_string);

        let report_type = text("type");
        let description = text("description");
        let location = text("location");
        if report_type.is_none() || description.is_none() || location.is_none() {
            tracing::warn!(id = %id, "Report record is missing required fields, using defaults");
        }

        Self {
            id: Some(id.to_string()),
            report_type: report_type.unwrap_or_default(),
            description: description.unwrap_or_default(),
            location: location.unwrap_or_default(),
            image_url: text("imageUrl"),
            nickname: text("nickname").unwrap_or_else(|| ANONYMOUS_NICKNAME.to_string()),
            timestamp: record
                .get("timestamp")
                .and_then(Value::as_i64)
                .unwrap_or(now),
        }
    }

    /// Wire form of the payload. The key is never part of it.
    #[must_use]
    pub fn to_record(&self) -> Value {
        let mut record = serde_json::json!({
            "type": self.report_type,
            "description": self.description,
            "location": self.location,
            "nickname": self.nickname,
            "timestamp": self.timestamp,
        });
        if let (Some(url), Some(map)) = (&self.image_url, record.as_object_mut()) {
            map.insert("imageUrl".to_string(), Value::String(url.clone()));
        }
        record
    }
}

/// Order a snapshot newest first. Equal timestamps fall back to key order, newest key first.
pub fn sort_newest_first(reports: &mut [Report]) {
    reports.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));
}

/// Decode a whole collection document (a key to record map).
///
/// `null` and non-object documents decode as an empty collection.
#[must_use]
pub fn decode_collection(document: &Value, now: i64) -> ReportList {
    let Some(map) = document.as_object() else {
        return Vec::new();
    };

    let mut reports: ReportList = map
        .iter()
        .map(|(key, record)| Report::from_record(key, record, now))
        .collect();
    sort_newest_first(&mut reports);
    reports
}

/// The submitter's identity preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub nickname: String,
    pub anonymous: bool,
}

impl Default for UserIdentity {
    fn default() -> Self {
        Self {
            nickname: String::new(),
            anonymous: true,
        }
    }
}

impl UserIdentity {
    /// Name stamped on submitted reports.
    #[must_use]
    pub fn display_name(&self) -> String {
        if self.anonymous || self.nickname.trim().is_empty() {
            ANONYMOUS_NICKNAME.to_string()
        } else {
            self.nickname.clone()
        }
    }

    /// A non-anonymous identity needs a non-blank nickname.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.anonymous || !self.nickname.trim().is_empty()
    }
}

/// In-progress report form fields. Every field defaults to empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDraft {
    pub report_type: String,
    pub description: String,
    pub location: String,
    pub image_url: String,
}

impl ReportDraft {
    /// Whether every field is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.report_type.is_empty()
            && self.description.is_empty()
            && self.location.is_empty()
            && self.image_url.is_empty()
    }

    /// Turn the draft into a submittable candidate.
    ///
    /// Type, description and location must be non-blank. A blank image URL is dropped.
    pub fn to_candidate(&self) -> reportline_common::AppResult<Report> {
        let missing: Vec<&str> = [
            ("type", &self.report_type),
            ("description", &self.description),
            ("location", &self.location),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(reportline_common::AppError::BadRequest(format!(
                "missing report fields: {}",
                missing.join(", ")
            )));
        }

        let image_url = Some(self.image_url.trim())
            .filter(|url| !url.is_empty())
            .map(str::to_string);

        Ok(Report::candidate(
            self.report_type.clone(),
            self.description.clone(),
            self.location.clone(),
            image_url,
        ))
    }
}
