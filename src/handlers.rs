use crate::contacts::{filter_contacts, ContactInput, ContactMessage};
use crate::db_types::{Contact, Conversation, Transcript};
use crate::elevenlabs_types::{
    required_id, BatchStatus, BatchStatusRequest, ConversationAudioRequest,
};
use crate::error::AppError;
use crate::filters::{search_campaigns, CampaignSelection, ALL_CAMPAIGNS};
use crate::metrics::{aggregate, CallRate, DashboardData};
use crate::store;
use crate::types::AppState;

use axum::{
    body::{Bytes, StreamBody},
    extract::{Path, Query, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

pub const CORS_ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

pub fn cors_headers() -> [(HeaderName, &'static str); 2] {
    [
        (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        (header::ACCESS_CONTROL_ALLOW_HEADERS, CORS_ALLOW_HEADERS),
    ]
}

/// Empty success answer to a cross-origin pre-flight request.
pub async fn preflight() -> impl IntoResponse {
    (StatusCode::OK, cors_headers())
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| {
        warn!(error=%e, "failed to deserialize proxy request body");
        AppError::validation("request body must be a JSON object")
    })
}

pub async fn batch_status(State(app_state): State<Arc<AppState>>, body: Bytes) -> Response {
    match refresh_batch_status(&app_state, &body).await {
        Ok(batch) => (cors_headers(), Json(batch)).into_response(),
        Err(e) => (cors_headers(), e).into_response(),
    }
}

/// Fetch the batch state upstream, then mirror it into `batch_calls`. Nothing is
/// written unless the upstream call succeeded, and a failed write does not fail the request.
async fn refresh_batch_status(
    app_state: &AppState,
    body: &[u8],
) -> Result<serde_json::Value, AppError> {
    let request: BatchStatusRequest = parse_body(body)?;
    let batch_id = required_id(request.batch_id, "batchId")?;
    let batch = app_state.get_batch_status(&batch_id).await?;

    match serde_json::from_value::<BatchStatus>(batch.clone()) {
        Ok(status) => {
            match store::update_batch_status(&app_state.db_pool, &batch_id, &status).await {
                Ok(Some(row)) => debug!(batch_id=%row.batch_id, status=?row.status, "mirrored batch status"),
                Ok(None) => warn!(batch_id=%batch_id, "no batch_calls row for batch"),
                Err(e) => error!(error=%e, batch_id=%batch_id, "error updating batch status"),
            }
        }
        Err(e) => warn!(error=%e, batch_id=%batch_id, "batch status has unexpected shape; not mirrored"),
    }
    info!(batch_id=%batch_id, "fetched batch status");
    Ok(batch)
}

pub async fn conversation_audio(State(app_state): State<Arc<AppState>>, body: Bytes) -> Response {
    match stream_conversation_audio(&app_state, &body).await {
        Ok(response) => response,
        Err(e) => (cors_headers(), e).into_response(),
    }
}

async fn stream_conversation_audio(app_state: &AppState, body: &[u8]) -> Result<Response, AppError> {
    let request: ConversationAudioRequest = parse_body(body)?;
    let conversation_id = required_id(request.conversation_id, "conversationId")?;
    let upstream = app_state.get_conversation_audio(&conversation_id).await?;

    info!(conversation_id=%conversation_id, "streaming audio to client");
    let disposition = format!("attachment; filename=\"conversation_{conversation_id}.mp3\"");
    Ok((
        StatusCode::OK,
        cors_headers(),
        [
            (header::CONTENT_TYPE, "audio/mpeg".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        StreamBody::new(upstream.bytes_stream()),
    )
        .into_response())
}

#[derive(Deserialize)]
pub struct DashboardQuery {
    pub user_id: Uuid,
    /// Comma separated campaign ids, or `all`.
    pub campaigns: Option<String>,
}

pub async fn dashboard(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardData>, AppError> {
    let selection = CampaignSelection::parse_csv(query.campaigns.as_deref())?;
    trace!(user_id=%query.user_id, selection=?selection, "loading dashboard");
    let pool = &app_state.db_pool;

    let conversations = store::fetch_conversations(pool, query.user_id, &selection).await?;
    let campaigns = store::fetch_campaigns_with_calls(pool, query.user_id, &selection).await?;
    let rate = CallRate::from_profile(
        store::fetch_call_rate(pool, query.user_id).await?,
        app_state.config.default_call_rate,
    );

    Ok(Json(aggregate(conversations, campaigns, rate)))
}

pub async fn campaign_conversations(
    State(app_state): State<Arc<AppState>>,
    Path(campaign_id): Path<Uuid>,
) -> Result<Json<Vec<Conversation>>, AppError> {
    let conversations = store::fetch_campaign_conversations(&app_state.db_pool, campaign_id).await?;
    Ok(Json(conversations))
}

#[derive(Deserialize)]
pub struct CampaignFilterQuery {
    pub user_id: Uuid,
    pub campaigns: Option<String>,
    #[serde(default)]
    pub q: String,
}

#[derive(Serialize)]
pub struct CampaignOption {
    pub id: Uuid,
    pub name: String,
    pub selected: bool,
}

#[derive(Serialize)]
pub struct CampaignFilterView {
    pub label: String,
    pub all_selected: bool,
    pub campaigns: Vec<CampaignOption>,
}

/// Options for the campaign dropdown: searchable, with the current selection marked.
pub async fn campaign_filter(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<CampaignFilterQuery>,
) -> Result<Json<CampaignFilterView>, AppError> {
    let selection = CampaignSelection::parse_csv(query.campaigns.as_deref())?;
    let campaigns =
        store::fetch_campaigns(&app_state.db_pool, query.user_id, &CampaignSelection::All).await?;

    let label = selection.label(|id| {
        campaigns
            .iter()
            .find(|c| c.id == *id)
            .map(|c| c.name.as_str())
    });
    let options = search_campaigns(&campaigns, &query.q, |c| c.name.as_str())
        .into_iter()
        .map(|c| CampaignOption {
            id: c.id,
            name: c.name.clone(),
            selected: selection != CampaignSelection::All && selection.contains(&c.id),
        })
        .collect();

    Ok(Json(CampaignFilterView {
        label,
        all_selected: selection == CampaignSelection::All,
        campaigns: options,
    }))
}

#[derive(Deserialize, Serialize)]
pub struct SelectionToggle {
    #[serde(default)]
    pub selected: Vec<String>,
    pub campaign_id: String,
}

#[derive(Deserialize, Serialize)]
pub struct SelectionState {
    pub selected: Vec<String>,
}

pub async fn toggle_campaign(
    Json(toggle): Json<SelectionToggle>,
) -> Result<Json<SelectionState>, AppError> {
    let current = CampaignSelection::parse(toggle.selected.iter().map(String::as_str))?;
    let next = if toggle.campaign_id.trim() == ALL_CAMPAIGNS {
        CampaignSelection::All
    } else {
        let id = Uuid::parse_str(toggle.campaign_id.trim())
            .map_err(|_| AppError::validation("invalid campaign id"))?;
        current.toggle(id)
    };
    let selected = match next.ids() {
        None => vec![ALL_CAMPAIGNS.to_string()],
        Some(ids) => ids.iter().map(Uuid::to_string).collect(),
    };
    Ok(Json(SelectionState { selected }))
}

pub async fn transcript(
    State(app_state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
) -> Result<Json<Transcript>, AppError> {
    store::fetch_transcript(&app_state.db_pool, &conversation_id)
        .await?
        .filter(|t| t.full_transcript.is_some())
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no transcript for {conversation_id}")))
}

#[derive(Deserialize)]
pub struct ContactsQuery {
    pub user_id: Uuid,
    pub q: Option<String>,
}

pub async fn list_contacts(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<ContactsQuery>,
) -> Result<Json<Vec<Contact>>, AppError> {
    let contacts = store::list_contacts(&app_state.db_pool, query.user_id).await?;
    Ok(Json(filter_contacts(contacts, query.q.as_deref())))
}

#[derive(Deserialize)]
pub struct UserQuery {
    pub user_id: Uuid,
}

pub async fn create_contact(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
    Json(input): Json<ContactInput>,
) -> Result<(StatusCode, Json<Contact>), AppError> {
    let input = input.validate()?;
    let contact = store::insert_contact(&app_state.db_pool, query.user_id, input).await?;
    info!(contact_id=%contact.id, "created contact");
    Ok((StatusCode::CREATED, Json(contact)))
}

pub async fn update_contact(
    State(app_state): State<Arc<AppState>>,
    Path(contact_id): Path<Uuid>,
    Query(query): Query<UserQuery>,
    Json(input): Json<ContactInput>,
) -> Result<Json<Contact>, AppError> {
    let input = input.validate()?;
    let contact =
        store::update_contact(&app_state.db_pool, query.user_id, contact_id, input).await?;
    Ok(Json(contact))
}

pub async fn submit_contact_message(
    State(app_state): State<Arc<AppState>>,
    Json(msg): Json<ContactMessage>,
) -> Result<StatusCode, AppError> {
    let (msg, reason) = msg.validate()?;
    store::insert_contact_message(&app_state.db_pool, &msg, reason).await?;
    info!(reason = reason.as_str(), "stored contact message");
    Ok(StatusCode::CREATED)
}
