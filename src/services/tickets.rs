use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::error::ApiError;
use crate::models::{Role, Ticket, TicketPriority, TicketStatus, User};

/// Joined ticket row for API responses: creator, category and assignee are
/// resolved and the vote score is aggregated in the same query.
#[derive(Debug, sqlx::FromRow)]
pub struct TicketView {
    pub id: i64,
    pub subject: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub user_id: i64,
    pub category_id: i64,
    pub assigned_to: Option<i64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub vote_score: i64,
    pub creator_username: String,
    pub creator_email: String,
    pub category_name: String,
    pub assignee_username: Option<String>,
}

impl TicketView {
    pub fn into_json(self) -> Value {
        json!({
            "id": self.id,
            "subject": self.subject,
            "description": self.description,
            "status": self.status,
            "priority": self.priority,
            "user_id": self.user_id,
            "category_id": self.category_id,
            "assigned_to": self.assigned_to,
            "created_at": self.created_at,
            "updated_at": self.updated_at,
            "vote_score": self.vote_score,
            "creator": {
                "id": self.user_id,
                "username": self.creator_username,
                "email": self.creator_email,
            },
            "category": {
                "id": self.category_id,
                "name": self.category_name,
            },
            "assignee": self.assigned_to.map(|id| json!({
                "id": id,
                "username": self.assignee_username,
            })),
        })
    }
}

const VIEW_SELECT: &str = "SELECT t.id, t.subject, t.description, t.status, t.priority, \
     t.user_id, t.category_id, t.assigned_to, t.created_at, t.updated_at, \
     (SELECT COUNT(*) FROM votes v WHERE v.ticket_id = t.id AND v.vote_type = 'up') \
     - (SELECT COUNT(*) FROM votes v WHERE v.ticket_id = t.id AND v.vote_type = 'down') AS vote_score, \
     cu.username AS creator_username, cu.email AS creator_email, \
     c.name AS category_name, au.username AS assignee_username \
     FROM tickets t \
     JOIN users cu ON cu.id = t.user_id \
     JOIN categories c ON c.id = t.category_id \
     LEFT JOIN users au ON au.id = t.assigned_to";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    CreatedAtDesc,
    CreatedAtAsc,
    UpdatedAtDesc,
    PriorityDesc,
}

impl SortKey {
    fn order_clause(self) -> &'static str {
        match self {
            SortKey::CreatedAtDesc => " ORDER BY t.created_at DESC",
            SortKey::CreatedAtAsc => " ORDER BY t.created_at ASC",
            SortKey::UpdatedAtDesc => " ORDER BY t.updated_at DESC",
            // Semantic priority order with insertion-order tie-break
            SortKey::PriorityDesc => {
                " ORDER BY CASE t.priority \
                 WHEN 'urgent' THEN 4 WHEN 'high' THEN 3 WHEN 'medium' THEN 2 ELSE 1 END DESC, \
                 t.id ASC"
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<TicketStatus>,
    pub category_id: Option<i64>,
    pub user_id: Option<i64>,
    pub assigned_to: Option<i64>,
    pub search: Option<String>,
    pub sort_by: Option<SortKey>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug)]
pub struct TicketPage {
    pub tickets: Vec<Value>,
    pub total: i64,
    pub pages: i64,
    pub current_page: i64,
    pub per_page: i64,
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, current: &User, query: &ListQuery) {
    builder.push(" WHERE 1 = 1");

    if let Some(status) = query.status {
        builder.push(" AND t.status = ").push_bind(status);
    }
    if let Some(category_id) = query.category_id {
        builder.push(" AND t.category_id = ").push_bind(category_id);
    }
    if let Some(user_id) = query.user_id {
        builder.push(" AND t.user_id = ").push_bind(user_id);
    }
    if let Some(assigned_to) = query.assigned_to {
        builder.push(" AND t.assigned_to = ").push_bind(assigned_to);
    }
    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        builder
            .push(" AND (t.subject LIKE ")
            .push_bind(pattern.clone())
            .push(" OR t.description LIKE ")
            .push_bind(pattern)
            .push(")");
    }

    // Regular users only ever see their own tickets, whatever filters they pass
    if current.role == Role::User {
        builder.push(" AND t.user_id = ").push_bind(current.id);
    }
}

pub async fn list(pool: &SqlitePool, current: &User, query: &ListQuery) -> Result<TicketPage, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(10).max(1);

    let mut count_builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM tickets t");
    push_filters(&mut count_builder, current, query);
    let total: i64 = count_builder.build_query_scalar().fetch_one(pool).await?;

    let mut builder = QueryBuilder::<Sqlite>::new(VIEW_SELECT);
    push_filters(&mut builder, current, query);
    builder.push(query.sort_by.unwrap_or(SortKey::CreatedAtDesc).order_clause());
    builder.push(" LIMIT ").push_bind(per_page);
    builder.push(" OFFSET ").push_bind((page - 1) * per_page);

    let rows: Vec<TicketView> = builder.build_query_as().fetch_all(pool).await?;

    Ok(TicketPage {
        tickets: rows.into_iter().map(TicketView::into_json).collect(),
        total,
        pages: (total + per_page - 1) / per_page,
        current_page: page,
        per_page,
    })
}

pub async fn get_row(pool: &SqlitePool, id: i64) -> Result<Ticket, ApiError> {
    let ticket: Option<Ticket> = sqlx::query_as("SELECT * FROM tickets WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    ticket.ok_or_else(|| ApiError::not_found("Ticket not found"))
}

pub async fn get_view(pool: &SqlitePool, id: i64) -> Result<TicketView, ApiError> {
    let sql = format!("{} WHERE t.id = ?", VIEW_SELECT);
    let view: Option<TicketView> = sqlx::query_as(&sql).bind(id).fetch_optional(pool).await?;
    view.ok_or_else(|| ApiError::not_found("Ticket not found"))
}

/// Regular users may only see tickets they created; a 403 here deliberately
/// confirms the ticket exists, a missing id is a 404 before this check runs.
pub fn ensure_can_view(current: &User, ticket: &Ticket) -> Result<(), ApiError> {
    if current.role == Role::User && ticket.user_id != current.id {
        return Err(ApiError::forbidden("Access denied"));
    }
    Ok(())
}

/// 404/403 gate shared by the ticket, comment and attachment endpoints.
pub async fn fetch_guarded(pool: &SqlitePool, current: &User, id: i64) -> Result<Ticket, ApiError> {
    let ticket = get_row(pool, id).await?;
    ensure_can_view(current, &ticket)?;
    Ok(ticket)
}

#[derive(Debug, Deserialize)]
pub struct NewTicket {
    pub subject: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub priority: Option<TicketPriority>,
}

pub async fn create(pool: &SqlitePool, current: &User, new: NewTicket) -> Result<TicketView, ApiError> {
    let subject = new.subject.as_deref().unwrap_or("").trim().to_string();
    let description = new.description.as_deref().unwrap_or("").trim().to_string();
    let category_id = new.category_id;

    if subject.is_empty() || description.is_empty() || category_id.is_none() {
        return Err(ApiError::validation("Missing required fields"));
    }
    let category_id = category_id.unwrap();

    let known_category: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE id = ?")
        .bind(category_id)
        .fetch_one(pool)
        .await?;
    if known_category == 0 {
        return Err(ApiError::validation("Unknown category"));
    }

    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO tickets (subject, description, status, priority, user_id, category_id, created_at, updated_at) \
         VALUES (?, ?, 'open', ?, ?, ?, ?, ?)",
    )
    .bind(&subject)
    .bind(&description)
    .bind(new.priority.unwrap_or(TicketPriority::Medium))
    .bind(current.id)
    .bind(category_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    get_view(pool, result.last_insert_rowid()).await
}

fn deserialize_explicit<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default, Deserialize)]
pub struct TicketUpdate {
    pub subject: Option<String>,
    pub description: Option<String>,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    // Outer option: key present in the body; inner option: null clears the assignee
    #[serde(default, deserialize_with = "deserialize_explicit")]
    pub assigned_to: Option<Option<i64>>,
}

/// Field-level gating: subject/description for the creator or staff,
/// status/priority/assignee for staff only. Disallowed fields from a plain
/// user are dropped silently rather than rejected, mirroring partial-update
/// semantics. Always bumps `updated_at`; reports a status change when the
/// value actually moved.
pub async fn update(
    pool: &SqlitePool,
    current: &User,
    id: i64,
    fields: TicketUpdate,
) -> Result<(TicketView, Option<(TicketStatus, TicketStatus)>), ApiError> {
    let mut ticket = fetch_guarded(pool, current, id).await?;
    let old_status = ticket.status;
    let staff = current.role.is_staff();

    if let Some(subject) = fields.subject {
        if staff || ticket.user_id == current.id {
            ticket.subject = subject;
        }
    }
    if let Some(description) = fields.description {
        if staff || ticket.user_id == current.id {
            ticket.description = description;
        }
    }
    if staff {
        if let Some(status) = fields.status {
            ticket.status = status;
        }
        if let Some(priority) = fields.priority {
            ticket.priority = priority;
        }
        if let Some(assigned_to) = fields.assigned_to {
            if let Some(assignee_id) = assigned_to {
                let known: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = ?")
                    .bind(assignee_id)
                    .fetch_one(pool)
                    .await?;
                if known == 0 {
                    return Err(ApiError::validation("Unknown assignee"));
                }
            }
            ticket.assigned_to = assigned_to;
        }
    }

    sqlx::query(
        "UPDATE tickets SET subject = ?, description = ?, status = ?, priority = ?, \
         assigned_to = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&ticket.subject)
    .bind(&ticket.description)
    .bind(ticket.status)
    .bind(ticket.priority)
    .bind(ticket.assigned_to)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    let status_change = (old_status != ticket.status).then_some((old_status, ticket.status));
    let view = get_view(pool, id).await?;
    Ok((view, status_change))
}

/// Deletes the ticket and everything it owns. Comments, votes, attachment
/// rows and the ticket itself go in one transaction; the physical attachment
/// files are removed only after the commit, best effort.
pub async fn delete(
    pool: &SqlitePool,
    uploads_dir: &Path,
    current: &User,
    id: i64,
) -> Result<(), ApiError> {
    let ticket = get_row(pool, id).await?;

    if current.role == Role::User {
        if ticket.user_id != current.id {
            return Err(ApiError::forbidden("You can only delete your own tickets"));
        }
        if matches!(ticket.status, TicketStatus::Resolved | TicketStatus::Closed) {
            return Err(ApiError::invalid_state("Cannot delete resolved or closed tickets"));
        }
    }

    let mut tx = pool.begin().await?;

    let stored_files: Vec<String> =
        sqlx::query_scalar("SELECT filename FROM attachments WHERE ticket_id = ?")
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;

    sqlx::query("DELETE FROM comments WHERE ticket_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM votes WHERE ticket_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM attachments WHERE ticket_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM tickets WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    for filename in stored_files {
        let path = uploads_dir.join(&filename);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::warn!("failed to remove attachment file {}: {}", path.display(), e);
        }
    }

    Ok(())
}
