//! Back-office views and mutations over submitted queries.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use diesel::dsl::count_star;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::lifecycle::{plan_update, QueryUpdate};
use super::models::{ContactQuery, Feedback, QueryRecord, SupportRequest, TechnicalIssue};
use crate::core::shared::enums::{QueryKind, QueryStatus};
use crate::core::shared::error::{ApiError, ApiResult};
use crate::core::shared::pagination::{clamp_limit, paginate, Page};
use crate::core::shared::schema::{contact_queries, feedback, support_requests, technical_issues};
use crate::core::shared::state::AppState;
use crate::core::shared::utils::with_conn;
use crate::drive::resolve_urls;
use crate::security::auth_api::AuthenticatedUser;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminListParams {
    pub status: Option<QueryStatus>,
    pub limit: Option<i64>,
    pub cursor: Option<Uuid>,
}

/// Newest first; the cursor row opens the next page.
macro_rules! load_page {
    ($conn:expr, $table:ident, $row:ty, $params:expr) => {{
        let params = $params;
        let limit = clamp_limit(params.limit);
        let mut query = $table::table.into_boxed();

        if let Some(status) = params.status {
            query = query.filter($table::status.eq(status));
        }

        if let Some(cursor) = params.cursor {
            let (at, cursor_id): (DateTime<Utc>, Uuid) = $table::table
                .find(cursor)
                .select(($table::created_at, $table::id))
                .first($conn)
                .optional()?
                .ok_or_else(|| ApiError::BadRequest("Unknown cursor".to_string()))?;
            query = query.filter(
                $table::created_at
                    .lt(at)
                    .or($table::created_at.eq(at).and($table::id.le(cursor_id))),
            );
        }

        let rows: Vec<$row> = query
            .order(($table::created_at.desc(), $table::id.desc()))
            .limit(limit + 1)
            .load($conn)?;
        Ok::<Page<$row>, ApiError>(paginate(rows, limit, |row| row.id))
    }};
}

pub async fn get_contact_queries(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AdminListParams>,
) -> ApiResult<Json<Page<ContactQuery>>> {
    let page = with_conn(&state.conn, move |conn| load_page!(conn, contact_queries, ContactQuery, params)).await?;
    Ok(Json(page))
}

pub async fn get_feedback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AdminListParams>,
) -> ApiResult<Json<Page<Feedback>>> {
    let page = with_conn(&state.conn, move |conn| load_page!(conn, feedback, Feedback, params)).await?;
    Ok(Json(page))
}

pub async fn get_support_requests(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AdminListParams>,
) -> ApiResult<Json<Page<SupportRequest>>> {
    let page = with_conn(&state.conn, move |conn| load_page!(conn, support_requests, SupportRequest, params)).await?;
    Ok(Json(page))
}

/// Issue row plus browser-openable links for its attachments.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalIssueView {
    #[serde(flatten)]
    pub issue: TechnicalIssue,
    pub attachment_urls: Vec<String>,
}

async fn with_urls(state: &AppState, issue: TechnicalIssue) -> TechnicalIssueView {
    let attachment_urls = match resolve_urls(state.attachments.as_ref(), &issue.attachments).await
    {
        Ok(urls) => urls,
        Err(e) => {
            warn!("Could not resolve attachments of issue {}: {}", issue.id, e);
            Vec::new()
        }
    };
    TechnicalIssueView {
        issue,
        attachment_urls,
    }
}

pub async fn get_technical_issues(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AdminListParams>,
) -> ApiResult<Json<Page<TechnicalIssueView>>> {
    let page = with_conn(&state.conn, move |conn| {
        load_page!(conn, technical_issues, TechnicalIssue, params)
    })
    .await?;

    let next_cursor = page.next_cursor;
    let items = futures::future::join_all(
        page.items
            .into_iter()
            .map(|issue| with_urls(&state, issue)),
    )
    .await;
    Ok(Json(Page { items, next_cursor }))
}

// ============================================================================
// Counts
// ============================================================================

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub new: i64,
    pub in_progress: i64,
    pub resolved: i64,
    pub cancelled: i64,
    pub total: i64,
}

impl StatusCounts {
    pub fn from_grouped(rows: &[(QueryStatus, i64)]) -> Self {
        let mut counts = Self::default();
        for (status, n) in rows {
            match status {
                QueryStatus::New => counts.new += n,
                QueryStatus::InProgress => counts.in_progress += n,
                QueryStatus::Resolved => counts.resolved += n,
                QueryStatus::Cancelled => counts.cancelled += n,
            }
            counts.total += n;
        }
        counts
    }

    pub fn get(&self, status: QueryStatus) -> i64 {
        match status {
            QueryStatus::New => self.new,
            QueryStatus::InProgress => self.in_progress,
            QueryStatus::Resolved => self.resolved,
            QueryStatus::Cancelled => self.cancelled,
        }
    }

    pub fn open(&self) -> i64 {
        self.new + self.in_progress
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryCounts {
    pub contact: StatusCounts,
    pub feedback: StatusCounts,
    pub support: StatusCounts,
    pub technical_issues: StatusCounts,
}

impl QueryCounts {
    pub fn by_kind(&self) -> HashMap<QueryKind, StatusCounts> {
        HashMap::from([
            (QueryKind::Contact, self.contact),
            (QueryKind::Feedback, self.feedback),
            (QueryKind::Support, self.support),
            (QueryKind::TechnicalIssue, self.technical_issues),
        ])
    }

    pub fn total(&self) -> i64 {
        self.contact.total + self.feedback.total + self.support.total + self.technical_issues.total
    }
}

macro_rules! grouped_status {
    ($conn:expr, $table:ident) => {
        $table::table
            .group_by($table::status)
            .select(($table::status, count_star()))
            .load::<(QueryStatus, i64)>($conn)
            .map(|rows| StatusCounts::from_grouped(&rows))
    };
}

pub fn count_queries(conn: &mut PgConnection) -> QueryResult<QueryCounts> {
    Ok(QueryCounts {
        contact: grouped_status!(conn, contact_queries)?,
        feedback: grouped_status!(conn, feedback)?,
        support: grouped_status!(conn, support_requests)?,
        technical_issues: grouped_status!(conn, technical_issues)?,
    })
}

pub async fn get_query_counts(State(state): State<Arc<AppState>>) -> ApiResult<Json<QueryCounts>> {
    let counts = with_conn(&state.conn, |conn| Ok(count_queries(conn)?)).await?;
    Ok(Json(counts))
}

// ============================================================================
// Single row
// ============================================================================

fn parse_kind(raw: &str) -> ApiResult<QueryKind> {
    raw.parse::<QueryKind>()
        .map_err(|_| ApiError::not_found(format!("Query type '{}'", raw)))
}

fn load_record(conn: &mut PgConnection, kind: QueryKind, id: Uuid) -> ApiResult<QueryRecord> {
    let missing = || ApiError::not_found(kind.display_name().to_string());
    let record = match kind {
        QueryKind::Contact => contact_queries::table
            .find(id)
            .first::<ContactQuery>(conn)
            .optional()?
            .map(QueryRecord::Contact),
        QueryKind::Feedback => feedback::table
            .find(id)
            .first::<Feedback>(conn)
            .optional()?
            .map(QueryRecord::Feedback),
        QueryKind::Support => support_requests::table
            .find(id)
            .first::<SupportRequest>(conn)
            .optional()?
            .map(QueryRecord::Support),
        QueryKind::TechnicalIssue => technical_issues::table
            .find(id)
            .first::<TechnicalIssue>(conn)
            .optional()?
            .map(QueryRecord::TechnicalIssue),
    };
    record.ok_or_else(missing)
}

pub async fn get_admin_query(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, Uuid)>,
) -> ApiResult<Json<serde_json::Value>> {
    let kind = parse_kind(&kind)?;
    let record = with_conn(&state.conn, move |conn| load_record(conn, kind, id)).await?;

    let body = match record {
        QueryRecord::TechnicalIssue(issue) => {
            let view = with_urls(&state, issue).await;
            serde_json::json!({ "type": QueryKind::TechnicalIssue, "data": view })
        }
        other => serde_json::to_value(other).map_err(ApiError::internal)?,
    };
    Ok(Json(body))
}

// ============================================================================
// Mutations
// ============================================================================

/// Row lock, transition check and write. Callers run it inside one
/// transaction.
macro_rules! apply_update {
    ($conn:expr, $table:ident, $row:ty, $id:expr, $update:expr, $what:expr) => {{
        let current: $row = $table::table
            .find($id)
            .for_update()
            .first($conn)
            .optional()?
            .ok_or_else(|| ApiError::not_found($what))?;
        let previous = current.status;
        let planned = plan_update(current.status, current.response, $update)?;
        let updated: $row = diesel::update($table::table.find($id))
            .set((
                $table::status.eq(planned.status),
                $table::response.eq(planned.response),
                $table::updated_at.eq(Utc::now()),
            ))
            .get_result($conn)?;
        Ok::<($row, QueryStatus), ApiError>((updated, previous))
    }};
}

pub async fn update_admin_query(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthenticatedUser>,
    Path((kind, id)): Path<(String, Uuid)>,
    payload: Result<Json<QueryUpdate>, JsonRejection>,
) -> ApiResult<Json<QueryRecord>> {
    let kind = parse_kind(&kind)?;
    let Json(update) = payload?;
    let what = kind.display_name().to_string();

    let (record, previous) = with_conn(&state.conn, move |conn| {
        conn.transaction(|conn| match kind {
            QueryKind::Contact => {
                let (row, prev) = apply_update!(conn, contact_queries, ContactQuery, id, update, what)?;
                Ok((QueryRecord::Contact(row), prev))
            }
            QueryKind::Feedback => {
                let (row, prev) = apply_update!(conn, feedback, Feedback, id, update, what)?;
                Ok((QueryRecord::Feedback(row), prev))
            }
            QueryKind::Support => {
                let (row, prev) = apply_update!(conn, support_requests, SupportRequest, id, update, what)?;
                Ok((QueryRecord::Support(row), prev))
            }
            QueryKind::TechnicalIssue => {
                let (row, prev) = apply_update!(conn, technical_issues, TechnicalIssue, id, update, what)?;
                Ok((QueryRecord::TechnicalIssue(row), prev))
            }
        })
    })
    .await?;

    info!(
        "{} updated {} {}: {} -> {}",
        admin.username,
        kind,
        id,
        previous,
        record.status()
    );
    Ok(Json(record))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_counts_from_grouped() {
        let counts = StatusCounts::from_grouped(&[
            (QueryStatus::New, 3),
            (QueryStatus::Resolved, 2),
            (QueryStatus::Cancelled, 1),
        ]);
        assert_eq!(counts.new, 3);
        assert_eq!(counts.in_progress, 0);
        assert_eq!(counts.total, 6);
        assert_eq!(counts.open(), 3);
        assert_eq!(counts.get(QueryStatus::Resolved), 2);
    }

    #[test]
    fn test_counts_serialize_camel_case() {
        let json = serde_json::to_value(QueryCounts::default()).unwrap();
        assert!(json.get("technicalIssues").is_some());
        assert!(json["contact"].get("inProgress").is_some());
    }

    #[test]
    fn test_parse_kind_accepts_route_spelling() {
        assert_eq!(parse_kind("technical-issues").unwrap(), QueryKind::TechnicalIssue);
        assert!(matches!(parse_kind("billing"), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn test_list_params_parse_status() {
        let params: AdminListParams =
            serde_json::from_value(serde_json::json!({"status": "IN_PROGRESS", "limit": 5}))
                .unwrap();
        assert_eq!(params.status, Some(QueryStatus::InProgress));
        assert_eq!(params.limit, Some(5));
    }
}
