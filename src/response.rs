use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponsePayload {
    Success(Value),
    Failure { error: String },
}

impl ResponsePayload {
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
        }
    }

    pub fn from_json(body: Value) -> Self {
        match body.get("error") {
            Some(Value::String(message)) => Self::failure(message.clone()),
            Some(other) => Self::failure(other.to_string()),
            None => Self::Success(body),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failure { error } => Some(error),
            Self::Success(_) => None,
        }
    }

    pub fn answer(&self) -> Option<&str> {
        match self {
            Self::Success(body) => body.pointer("/choices/0/message/content")?.as_str(),
            Self::Failure { .. } => None,
        }
    }

    fn created_secs(&self) -> Option<f64> {
        match self {
            Self::Success(body) => body.get("created")?.as_f64(),
            Self::Failure { .. } => None,
        }
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.created_secs()?.trunc() as i64, 0)
    }

    // No skew allowance.
    pub fn created_in_future(&self, now: DateTime<Utc>) -> bool {
        let now_secs = now.timestamp_millis() as f64 / 1000.0;
        self.created_secs().is_some_and(|secs| secs > now_secs)
    }

    pub fn display_text(&self) -> String {
        match self {
            Self::Failure { error } => format!("Error: {error}"),
            Self::Success(body) => match self.answer() {
                Some(answer) => answer.to_string(),
                None => serde_json::to_string_pretty(body).unwrap_or_else(|_| body.to_string()),
            },
        }
    }
}
