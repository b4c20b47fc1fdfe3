use serde::{Deserialize, Serialize};
use sqlx::types::time::OffsetDateTime;
use sqlx::types::Json;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// One outbound call attempt.
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: Uuid,
    /// ElevenLabs conversation id
    pub conversation_id: String,
    pub phone_number: String,
    pub contact_name: Option<String>,
    pub status: Option<String>,
    pub call_successful: Option<String>,
    pub call_duration_secs: Option<i32>,
    pub start_time_unix: Option<i64>,
    pub conversation_summary: Option<String>,
    pub analysis: Option<serde_json::Value>,
    pub has_audio: bool,
    pub campaign_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Conversation {
    /// Evaluation results keyed by criterion name. Unreadable analysis counts as none.
    pub fn evaluation_results(&self) -> HashMap<String, CriterionResult> {
        self.analysis
            .as_ref()
            .and_then(|a| serde_json::from_value::<Analysis>(a.clone()).ok())
            .and_then(|a| a.evaluation_criteria_results)
            .unwrap_or_default()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Analysis {
    #[serde(default)]
    pub evaluation_criteria_results: Option<HashMap<String, CriterionResult>>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct CriterionResult {
    #[serde(default)]
    pub result: Option<String>,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Campaign {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub launched_at: Option<OffsetDateTime>,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Contact {
    pub id: Uuid,
    pub user_id: Uuid,
    pub phone: String,
    pub additional_fields: Json<BTreeMap<String, String>>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[allow(dead_code)]
#[derive(Debug, sqlx::FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub call_rate: Option<f64>,
    pub currency: Option<String>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Transcript {
    pub full_transcript: Option<String>,
}

#[allow(dead_code)]
#[derive(Debug, sqlx::FromRow)]
pub struct BatchCall {
    pub batch_id: String,
    pub status: Option<String>,
    pub total_calls_dispatched: Option<i64>,
    pub last_updated_at_unix: Option<i64>,
}
