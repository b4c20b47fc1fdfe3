//! Queries against the Postgres store. Every function maps driver errors to an
//! [`AppError::Database`] carrying the message the client will see.

use crate::contacts::{ContactInput, ContactMessage, ContactReason};
use crate::db_types::{BatchCall, Campaign, Contact, Conversation, Profile, Transcript};
use crate::elevenlabs_types::BatchStatus;
use crate::error::AppError;
use crate::filters::CampaignSelection;
use crate::metrics::CampaignWithCalls;

use sqlx::types::Json;
use sqlx::{Pool, Postgres};
use std::collections::HashMap;
use uuid::Uuid;

pub async fn fetch_conversations(
    pool: &Pool<Postgres>,
    user_id: Uuid,
    selection: &CampaignSelection,
) -> Result<Vec<Conversation>, AppError> {
    sqlx::query_as::<_, Conversation>(
        "
        select *
        from conversations
        where user_id = $1
          and ($2::uuid[] is null or campaign_id = any($2))
        order by created_at desc
        ",
    )
    .bind(user_id)
    .bind(selection.ids())
    .fetch_all(pool)
    .await
    .map_err(AppError::db("Failed to fetch conversation data"))
}

pub async fn fetch_campaign_conversations(
    pool: &Pool<Postgres>,
    campaign_id: Uuid,
) -> Result<Vec<Conversation>, AppError> {
    sqlx::query_as::<_, Conversation>(
        "
        select *
        from conversations
        where campaign_id = $1
        order by created_at desc
        ",
    )
    .bind(campaign_id)
    .fetch_all(pool)
    .await
    .map_err(AppError::db("Failed to fetch campaign details"))
}

/// Non-draft campaigns of a user, each with its calls attached.
pub async fn fetch_campaigns_with_calls(
    pool: &Pool<Postgres>,
    user_id: Uuid,
    selection: &CampaignSelection,
) -> Result<Vec<CampaignWithCalls>, AppError> {
    let campaigns = fetch_campaigns(pool, user_id, selection).await?;
    let ids: Vec<Uuid> = campaigns.iter().map(|c| c.id).collect();
    let calls = sqlx::query_as::<_, Conversation>(
        "
        select *
        from conversations
        where campaign_id = any($1)
        ",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await
    .map_err(AppError::db("Failed to fetch campaign data"))?;

    let mut by_campaign: HashMap<Uuid, Vec<Conversation>> = HashMap::new();
    for call in calls {
        if let Some(id) = call.campaign_id {
            by_campaign.entry(id).or_default().push(call);
        }
    }
    Ok(campaigns
        .into_iter()
        .map(|campaign| CampaignWithCalls {
            conversations: by_campaign.remove(&campaign.id).unwrap_or_default(),
            campaign,
        })
        .collect())
}

pub async fn fetch_campaigns(
    pool: &Pool<Postgres>,
    user_id: Uuid,
    selection: &CampaignSelection,
) -> Result<Vec<Campaign>, AppError> {
    sqlx::query_as::<_, Campaign>(
        "
        select id, user_id, name, status, created_at, launched_at
        from campaigns
        where user_id = $1
          and status <> 'Draft'
          and ($2::uuid[] is null or id = any($2))
        ",
    )
    .bind(user_id)
    .bind(selection.ids())
    .fetch_all(pool)
    .await
    .map_err(AppError::db("Failed to fetch campaign data"))
}

/// Configured per-minute rate, `None` when the user has no profile or no rate.
pub async fn fetch_call_rate(pool: &Pool<Postgres>, user_id: Uuid) -> Result<Option<f64>, AppError> {
    let profile = sqlx::query_as::<_, Profile>(
        "
        select id, call_rate, currency
        from profiles
        where id = $1
        ",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(AppError::db("Failed to fetch profile"))?;
    Ok(profile.and_then(|p| p.call_rate))
}

pub async fn fetch_transcript(
    pool: &Pool<Postgres>,
    conversation_id: &str,
) -> Result<Option<Transcript>, AppError> {
    sqlx::query_as::<_, Transcript>(
        "
        select full_transcript
        from transcripts
        where conversation_id = $1
        ",
    )
    .bind(conversation_id)
    .fetch_optional(pool)
    .await
    .map_err(AppError::db("Failed to fetch transcript"))
}

pub async fn list_contacts(pool: &Pool<Postgres>, user_id: Uuid) -> Result<Vec<Contact>, AppError> {
    sqlx::query_as::<_, Contact>(
        "
        select *
        from contacts
        where user_id = $1
        order by created_at desc
        ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(AppError::db("Failed to load contacts"))
}

pub async fn insert_contact(
    pool: &Pool<Postgres>,
    user_id: Uuid,
    input: ContactInput,
) -> Result<Contact, AppError> {
    sqlx::query_as::<_, Contact>(
        "
        insert into contacts (
          user_id,
          phone,
          additional_fields
        )
        values ($1, $2, $3)
        returning *
        ",
    )
    .bind(user_id)
    .bind(input.phone)
    .bind(Json(input.additional_fields))
    .fetch_one(pool)
    .await
    .map_err(AppError::db("Failed to create contact"))
}

pub async fn update_contact(
    pool: &Pool<Postgres>,
    user_id: Uuid,
    contact_id: Uuid,
    input: ContactInput,
) -> Result<Contact, AppError> {
    sqlx::query_as::<_, Contact>(
        "
        update contacts
        set phone = $2,
            additional_fields = $3,
            updated_at = now()
        where id = $1
          and user_id = $4
        returning *
        ",
    )
    .bind(contact_id)
    .bind(input.phone)
    .bind(Json(input.additional_fields))
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(AppError::db("Failed to update contact"))?
    .ok_or_else(|| AppError::NotFound(format!("contact {contact_id} not found")))
}

/// Mirror the upstream batch state. Fields missing from the reply leave their
/// column as is. `None` means no row tracks this batch.
pub async fn update_batch_status(
    pool: &Pool<Postgres>,
    batch_id: &str,
    status: &BatchStatus,
) -> Result<Option<BatchCall>, AppError> {
    sqlx::query_as::<_, BatchCall>(
        "
        update batch_calls
        set status = coalesce($2, status),
            total_calls_dispatched = coalesce($3, total_calls_dispatched),
            last_updated_at_unix = coalesce($4, last_updated_at_unix)
        where batch_id = $1
        returning batch_id, status, total_calls_dispatched, last_updated_at_unix
        ",
    )
    .bind(batch_id)
    .bind(&status.status)
    .bind(status.total_calls_dispatched)
    .bind(status.last_updated_at_unix)
    .fetch_optional(pool)
    .await
    .map_err(AppError::db("Failed to update batch status"))
}

pub async fn insert_contact_message(
    pool: &Pool<Postgres>,
    msg: &ContactMessage,
    reason: ContactReason,
) -> Result<(), AppError> {
    sqlx::query(
        "
        insert into contact_messages (
          full_name,
          email,
          company,
          reason,
          message
        )
        values ($1, $2, $3, $4, $5)
        ",
    )
    .bind(msg.full_name.trim())
    .bind(msg.email.trim())
    .bind(msg.company.trim())
    .bind(reason.as_str())
    .bind(&msg.message)
    .execute(pool)
    .await
    .map_err(AppError::db("Failed to send message"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;
    use std::collections::{BTreeMap, BTreeSet};

    async fn insert_campaign(pool: &PgPool, user_id: Uuid, name: &str, status: &str) -> Uuid {
        sqlx::query_scalar::<_, Uuid>(
            "insert into campaigns (user_id, name, status) values ($1, $2, $3) returning id",
        )
        .bind(user_id)
        .bind(name)
        .bind(status)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    async fn insert_call(pool: &PgPool, user_id: Uuid, conversation_id: &str, campaign_id: Uuid) {
        sqlx::query(
            "
            insert into conversations (user_id, conversation_id, phone_number, status, campaign_id)
            values ($1, $2, '+15550100', 'done', $3)
            ",
        )
        .bind(user_id)
        .bind(conversation_id)
        .bind(campaign_id)
        .execute(pool)
        .await
        .unwrap();
    }

    fn names(campaigns: &[Campaign]) -> BTreeSet<String> {
        campaigns.iter().map(|c| c.name.clone()).collect()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn drafts_are_excluded_for_all_campaigns(pool: PgPool) {
        let user = Uuid::new_v4();
        insert_campaign(&pool, user, "live", "Active").await;
        insert_campaign(&pool, user, "done", "Completed").await;
        insert_campaign(&pool, user, "draft", "Draft").await;
        insert_campaign(&pool, Uuid::new_v4(), "someone else", "Active").await;

        let campaigns = fetch_campaigns(&pool, user, &CampaignSelection::All).await.unwrap();
        assert_eq!(
            names(&campaigns),
            BTreeSet::from(["live".to_string(), "done".to_string()])
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn drafts_are_excluded_even_when_selected(pool: PgPool) {
        let user = Uuid::new_v4();
        let live = insert_campaign(&pool, user, "live", "Active").await;
        insert_campaign(&pool, user, "other", "Active").await;
        let draft = insert_campaign(&pool, user, "draft", "Draft").await;

        let selection = CampaignSelection::Only(BTreeSet::from([live, draft]));
        let campaigns = fetch_campaigns(&pool, user, &selection).await.unwrap();
        assert_eq!(names(&campaigns), BTreeSet::from(["live".to_string()]));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn selection_limits_conversations_and_campaign_calls(pool: PgPool) {
        let user = Uuid::new_v4();
        let a = insert_campaign(&pool, user, "a", "Active").await;
        let b = insert_campaign(&pool, user, "b", "Active").await;
        insert_call(&pool, user, "conv_a1", a).await;
        insert_call(&pool, user, "conv_a2", a).await;
        insert_call(&pool, user, "conv_b1", b).await;

        let only_a = CampaignSelection::Only(BTreeSet::from([a]));
        let calls = fetch_conversations(&pool, user, &only_a).await.unwrap();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|c| c.campaign_id == Some(a)));

        let all = fetch_conversations(&pool, user, &CampaignSelection::All).await.unwrap();
        assert_eq!(all.len(), 3);

        let with_calls = fetch_campaigns_with_calls(&pool, user, &CampaignSelection::All)
            .await
            .unwrap();
        let counts: BTreeMap<String, usize> = with_calls
            .iter()
            .map(|c| (c.campaign.name.clone(), c.conversations.len()))
            .collect();
        assert_eq!(counts, BTreeMap::from([("a".to_string(), 2), ("b".to_string(), 1)]));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn batch_status_is_mirrored_and_partial_replies_keep_columns(pool: PgPool) {
        sqlx::query("insert into batch_calls (batch_id, status) values ('batch_1', 'pending')")
            .execute(&pool)
            .await
            .unwrap();

        let full = BatchStatus {
            status: Some("in_progress".into()),
            total_calls_dispatched: Some(12),
            last_updated_at_unix: Some(1717236000),
        };
        let row = update_batch_status(&pool, "batch_1", &full).await.unwrap().unwrap();
        assert_eq!(row.status.as_deref(), Some("in_progress"));
        assert_eq!(row.total_calls_dispatched, Some(12));
        assert_eq!(row.last_updated_at_unix, Some(1717236000));

        let partial = BatchStatus {
            status: Some("completed".into()),
            ..Default::default()
        };
        let row = update_batch_status(&pool, "batch_1", &partial).await.unwrap().unwrap();
        assert_eq!(row.status.as_deref(), Some("completed"));
        assert_eq!(row.total_calls_dispatched, Some(12));
        assert_eq!(row.last_updated_at_unix, Some(1717236000));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn unknown_batch_is_not_mirrored(pool: PgPool) {
        let row = update_batch_status(&pool, "missing", &BatchStatus::default()).await.unwrap();
        assert!(row.is_none());
    }

    fn contact_input(phone: &str) -> ContactInput {
        ContactInput {
            phone: phone.into(),
            additional_fields: BTreeMap::from([("company".to_string(), "Acme".to_string())]),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn updating_missing_contact_is_not_found(pool: PgPool) {
        let err = update_contact(&pool, Uuid::new_v4(), Uuid::new_v4(), contact_input("+15550100"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn contacts_are_updated_only_by_their_owner(pool: PgPool) {
        let owner = Uuid::new_v4();
        let contact = insert_contact(&pool, owner, contact_input("+15550100")).await.unwrap();

        let err = update_contact(&pool, Uuid::new_v4(), contact.id, contact_input("+15550199"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let updated = update_contact(&pool, owner, contact.id, contact_input("+15550199"))
            .await
            .unwrap();
        assert_eq!(updated.phone, "+15550199");
        assert_eq!(updated.additional_fields.0["company"], "Acme");
        assert_eq!(list_contacts(&pool, owner).await.unwrap().len(), 1);
    }
}
