use crate::db_types::{Campaign, Conversation};

use serde::{Serialize, Serializer};
use sqlx::types::time::OffsetDateTime;
use uuid::Uuid;

pub const SUCCESS_RESULT: &str = "success";
pub const CONNECTED_STATUSES: &[&str] = &["done", "completed"];

/// Per-minute price for a user's calls.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CallRate(pub f64);

impl CallRate {
    pub fn from_profile(rate: Option<f64>, default: f64) -> Self {
        CallRate(rate.unwrap_or(default))
    }
}

/// Chargeable minutes for a call: nothing for empty calls, otherwise rounded up
/// with a one-minute minimum.
pub fn billing_minutes(duration_secs: i64) -> i64 {
    if duration_secs <= 0 {
        0
    } else {
        (duration_secs + 59) / 60
    }
}

pub fn is_connected(conversation: &Conversation) -> bool {
    conversation
        .status
        .as_deref()
        .map(|s| {
            CONNECTED_STATUSES
                .iter()
                .any(|c| s.eq_ignore_ascii_case(c))
        })
        .unwrap_or(false)
}

/// A call is successful when it was scored on at least one criterion and passed all of them.
pub fn is_successful(conversation: &Conversation) -> bool {
    let results = conversation.evaluation_results();
    !results.is_empty()
        && results
            .values()
            .all(|r| r.result.as_deref() == Some(SUCCESS_RESULT))
}

pub fn success_rate(successful: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        successful as f64 / total as f64 * 100.0
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub total_calls: usize,
    pub total_connected: usize,
    pub successful_calls: usize,
    pub success_rate: f64,
    pub total_minutes: i64,
    pub total_cost: f64,
}

/// Fold a set of calls into metrics. Used for both the global and the per-campaign view.
pub fn summarize<'a, I>(conversations: I, rate: CallRate) -> Metrics
where
    I: IntoIterator<Item = &'a Conversation>,
{
    let mut m = Metrics::default();
    for c in conversations {
        m.total_calls += 1;
        if is_connected(c) {
            m.total_connected += 1;
        }
        if is_successful(c) {
            m.successful_calls += 1;
        }
        m.total_minutes += billing_minutes(c.call_duration_secs.unwrap_or(0).into());
    }
    m.success_rate = success_rate(m.successful_calls, m.total_calls);
    m.total_cost = m.total_minutes as f64 * rate.0;
    m
}

#[derive(Clone, Debug)]
pub struct CampaignSummary {
    pub id: Uuid,
    pub name: String,
    pub status: String,
    pub metrics: Metrics,
    pub created_at: OffsetDateTime,
    pub launched_at: Option<OffsetDateTime>,
}

/// Wire form of a campaign row. The connected count is `connectedCalls` here,
/// unlike the global `totalConnected`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CampaignSummaryJson<'a> {
    id: Uuid,
    name: &'a str,
    status: &'a str,
    total_calls: usize,
    connected_calls: usize,
    successful_calls: usize,
    success_rate: f64,
    total_minutes: i64,
    total_cost: f64,
    #[serde(rename = "created_at", with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    #[serde(rename = "launched_at", with = "time::serde::rfc3339::option")]
    launched_at: Option<OffsetDateTime>,
}

impl Serialize for CampaignSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        CampaignSummaryJson {
            id: self.id,
            name: &self.name,
            status: &self.status,
            total_calls: self.metrics.total_calls,
            connected_calls: self.metrics.total_connected,
            successful_calls: self.metrics.successful_calls,
            success_rate: self.metrics.success_rate,
            total_minutes: self.metrics.total_minutes,
            total_cost: self.metrics.total_cost,
            created_at: self.created_at,
            launched_at: self.launched_at,
        }
        .serialize(serializer)
    }
}

impl CampaignSummary {
    /// Launch time when known, creation time otherwise.
    pub fn effective_date(&self) -> OffsetDateTime {
        self.launched_at.unwrap_or(self.created_at)
    }
}

pub struct CampaignWithCalls {
    pub campaign: Campaign,
    pub conversations: Vec<Conversation>,
}

#[derive(Debug, Serialize)]
pub struct DashboardData {
    pub metrics: Metrics,
    pub campaigns: Vec<CampaignSummary>,
    pub conversations: Vec<Conversation>,
}

pub fn is_draft(status: &str) -> bool {
    status == "Draft"
}

/// Build the dashboard from already-filtered conversations and their campaigns.
/// Draft campaigns are dropped even if the caller passed them in.
pub fn aggregate(
    conversations: Vec<Conversation>,
    campaigns: Vec<CampaignWithCalls>,
    rate: CallRate,
) -> DashboardData {
    let metrics = summarize(&conversations, rate);
    let mut campaigns: Vec<CampaignSummary> = campaigns
        .into_iter()
        .filter(|c| !is_draft(&c.campaign.status))
        .map(|c| CampaignSummary {
            metrics: summarize(&c.conversations, rate),
            id: c.campaign.id,
            name: c.campaign.name,
            status: c.campaign.status,
            created_at: c.campaign.created_at,
            launched_at: c.campaign.launched_at,
        })
        .collect();
    sort_campaigns(&mut campaigns);

    DashboardData {
        metrics,
        campaigns,
        conversations,
    }
}

/// Newest first by effective date. Equal dates keep their input order.
pub fn sort_campaigns(campaigns: &mut [CampaignSummary]) {
    campaigns.sort_by(|a, b| b.effective_date().cmp(&a.effective_date()));
}
