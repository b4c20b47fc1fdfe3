use crate::error::AppError;

use serde::Deserialize;

/// Fields of a batch-calling status reply that are mirrored into `batch_calls`.
/// The rest of the reply is passed through untouched.
#[derive(Deserialize, Debug, Default, PartialEq)]
pub struct BatchStatus {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub total_calls_dispatched: Option<i64>,
    #[serde(default)]
    pub last_updated_at_unix: Option<i64>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BatchStatusRequest {
    #[serde(default)]
    pub batch_id: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ConversationAudioRequest {
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// Required, non-blank identifier from a proxy request body.
pub fn required_id(id: Option<String>, name: &str) -> Result<String, AppError> {
    id.map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::validation(format!("{name} is required")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn batch_status_takes_mirrored_fields() {
        let reply = json!({
            "id": "batch_1",
            "name": "Spring outreach",
            "status": "in_progress",
            "total_calls_dispatched": 42,
            "total_calls_scheduled": 100,
            "last_updated_at_unix": 1717236000,
        });
        let status: BatchStatus = serde_json::from_value(reply).unwrap();
        assert_eq!(
            status,
            BatchStatus {
                status: Some("in_progress".into()),
                total_calls_dispatched: Some(42),
                last_updated_at_unix: Some(1717236000),
            }
        );
    }

    #[test]
    fn partial_batch_status_leaves_missing_fields_empty() {
        let status: BatchStatus = serde_json::from_value(json!({ "status": "completed" })).unwrap();
        assert_eq!(status.status.as_deref(), Some("completed"));
        assert_eq!(status.total_calls_dispatched, None);
        assert_eq!(status.last_updated_at_unix, None);
    }

    #[test]
    fn required_id_trims_and_rejects_blank() {
        assert_eq!(required_id(Some("  abc ".into()), "batchId").unwrap(), "abc");
        assert!(matches!(
            required_id(Some("   ".into()), "batchId"),
            Err(AppError::Validation(_))
        ));
        assert!(required_id(None, "batchId").is_err());
    }
}
