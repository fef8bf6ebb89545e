use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use diesel::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::models::{
    ContactInput, ContactQuery, Feedback, FeedbackInput, QueryRecord, SupportInput,
    SupportRequest, TechnicalIssue, TechnicalIssueInput,
};
use crate::core::shared::enums::QueryKind;
use crate::core::shared::error::{ApiError, ApiResult};
use crate::core::shared::schema::{contact_queries, feedback, support_requests, technical_issues};
use crate::core::shared::state::AppState;
use crate::core::shared::utils::with_conn;
use crate::drive::{decode_attachment, upload_attachments};
use crate::security::validation::Validate;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    pub success: bool,
    pub query_id: Uuid,
    /// False when the row was stored but the confirmation email could not be sent.
    pub notification_sent: bool,
}

/// Sends the confirmation. A failure is logged and reported, never propagated:
/// the query is already stored.
async fn confirm(state: &AppState, kind: QueryKind, name: &str, email: &str, id: Uuid) -> bool {
    match state
        .notifications
        .send_confirmation(kind, name, email, id)
        .await
    {
        Ok(()) => true,
        Err(e) => {
            warn!("{} {} stored without confirmation email: {}", kind, id, e);
            false
        }
    }
}

fn submitted(query_id: Uuid, notification_sent: bool) -> Json<SubmissionResponse> {
    Json(SubmissionResponse {
        success: true,
        query_id,
        notification_sent,
    })
}

pub async fn submit_contact(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ContactInput>, JsonRejection>,
) -> ApiResult<Json<SubmissionResponse>> {
    let Json(input) = payload?;
    input.validate().into_result()?;
    state.captcha.verify(input.captcha_token.as_deref()).await?;

    let row = ContactQuery::from_input(input);
    let row = with_conn(&state.conn, move |conn| {
        diesel::insert_into(contact_queries::table).values(&row).execute(conn)?;
        Ok(row)
    })
    .await?;
    info!("Contact query {} submitted", row.id);

    let sent = confirm(&state, QueryKind::Contact, &row.name, &row.email, row.id).await;
    Ok(submitted(row.id, sent))
}

pub async fn submit_feedback(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FeedbackInput>, JsonRejection>,
) -> ApiResult<Json<SubmissionResponse>> {
    let Json(input) = payload?;
    input.validate().into_result()?;
    state.captcha.verify(input.captcha_token.as_deref()).await?;

    let row = Feedback::from_input(input);
    let row = with_conn(&state.conn, move |conn| {
        diesel::insert_into(feedback::table).values(&row).execute(conn)?;
        Ok(row)
    })
    .await?;
    info!("Feedback {} submitted (satisfaction {})", row.id, row.satisfaction);

    let sent = confirm(&state, QueryKind::Feedback, &row.name, &row.email, row.id).await;
    Ok(submitted(row.id, sent))
}

pub async fn submit_support(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SupportInput>, JsonRejection>,
) -> ApiResult<Json<SubmissionResponse>> {
    let Json(input) = payload?;
    input.validate().into_result()?;
    state.captcha.verify(input.captcha_token.as_deref()).await?;

    let row = SupportRequest::from_input(input);
    let row = with_conn(&state.conn, move |conn| {
        diesel::insert_into(support_requests::table).values(&row).execute(conn)?;
        Ok(row)
    })
    .await?;
    info!("Support request {} submitted ({})", row.id, row.priority);

    let sent = confirm(&state, QueryKind::Support, &row.name, &row.email, row.id).await;
    Ok(submitted(row.id, sent))
}

pub async fn submit_technical_issue(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TechnicalIssueInput>, JsonRejection>,
) -> ApiResult<Json<SubmissionResponse>> {
    let Json(mut input) = payload?;
    input.validate().into_result()?;
    state.captcha.verify(input.captcha_token.as_deref()).await?;

    let decoded = std::mem::take(&mut input.attachments)
        .iter()
        .map(decode_attachment)
        .collect::<Result<Vec<_>, _>>()?;

    let id = Uuid::new_v4();
    let keys = if decoded.is_empty() {
        Vec::new()
    } else {
        let count = decoded.len();
        let keys = upload_attachments(state.attachments.as_ref(), decoded).await?;
        info!("Uploaded {} attachment(s) for issue {}", count, id);
        keys
    };

    let row = TechnicalIssue::from_input(id, input, keys);
    let row = with_conn(&state.conn, move |conn| {
        diesel::insert_into(technical_issues::table).values(&row).execute(conn)?;
        Ok(row)
    })
    .await?;
    info!("Technical issue {} submitted ({})", row.id, row.severity);

    let sent = confirm(&state, QueryKind::TechnicalIssue, &row.name, &row.email, row.id).await;
    Ok(submitted(row.id, sent))
}

/// Finds a query of any kind by id.
pub fn find_query(conn: &mut PgConnection, id: Uuid) -> QueryResult<Option<QueryRecord>> {
    if let Some(row) = contact_queries::table
        .find(id)
        .first::<ContactQuery>(conn)
        .optional()?
    {
        return Ok(Some(QueryRecord::Contact(row)));
    }
    if let Some(row) = feedback::table.find(id).first::<Feedback>(conn).optional()? {
        return Ok(Some(QueryRecord::Feedback(row)));
    }
    if let Some(row) = support_requests::table
        .find(id)
        .first::<SupportRequest>(conn)
        .optional()?
    {
        return Ok(Some(QueryRecord::Support(row)));
    }
    technical_issues::table
        .find(id)
        .first::<TechnicalIssue>(conn)
        .optional()
        .map(|row| row.map(QueryRecord::TechnicalIssue))
}

pub async fn get_query_by_id(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<QueryRecord>> {
    with_conn(&state.conn, move |conn| Ok(find_query(conn, id)?))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Query"))
}
