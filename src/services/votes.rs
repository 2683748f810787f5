use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::ApiError;
use crate::models::{Vote, VoteType};

#[derive(Debug, Serialize)]
pub struct VoteSummary {
    pub vote_score: i64,
    pub user_vote: Option<VoteType>,
    pub upvotes: i64,
    pub downvotes: i64,
}

/// Toggle semantics: no existing vote inserts one, a repeat of the same type
/// retracts it, the opposite type overwrites in place. The UNIQUE(ticket_id,
/// user_id) constraint keeps racing requests down to one stored row.
pub async fn cast(
    pool: &SqlitePool,
    ticket_id: i64,
    user_id: i64,
    vote_type: VoteType,
) -> Result<(String, VoteSummary), ApiError> {
    let mut tx = pool.begin().await?;

    let existing: Option<Vote> =
        sqlx::query_as("SELECT * FROM votes WHERE ticket_id = ? AND user_id = ?")
            .bind(ticket_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;

    let message = match existing {
        Some(vote) if vote.vote_type == vote_type => {
            sqlx::query("DELETE FROM votes WHERE id = ?")
                .bind(vote.id)
                .execute(&mut *tx)
                .await?;
            format!("{}vote removed", vote_type.label_capitalized())
        }
        Some(vote) => {
            sqlx::query("UPDATE votes SET vote_type = ? WHERE id = ?")
                .bind(vote_type)
                .bind(vote.id)
                .execute(&mut *tx)
                .await?;
            format!("Vote changed to {}vote", vote_type.label())
        }
        None => {
            sqlx::query(
                "INSERT INTO votes (vote_type, ticket_id, user_id, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(vote_type)
            .bind(ticket_id)
            .bind(user_id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
            format!("{}voted successfully", vote_type.label_capitalized())
        }
    };

    tx.commit().await?;

    let summary = tally(pool, ticket_id, user_id).await?;
    Ok((message, summary))
}

pub async fn tally(pool: &SqlitePool, ticket_id: i64, user_id: i64) -> Result<VoteSummary, ApiError> {
    let upvotes: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM votes WHERE ticket_id = ? AND vote_type = 'up'")
            .bind(ticket_id)
            .fetch_one(pool)
            .await?;
    let downvotes: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM votes WHERE ticket_id = ? AND vote_type = 'down'")
            .bind(ticket_id)
            .fetch_one(pool)
            .await?;

    let user_vote: Option<VoteType> =
        sqlx::query_scalar("SELECT vote_type FROM votes WHERE ticket_id = ? AND user_id = ?")
            .bind(ticket_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

    Ok(VoteSummary {
        vote_score: upvotes - downvotes,
        user_vote,
        upvotes,
        downvotes,
    })
}
