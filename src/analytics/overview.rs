//! Platform totals for the admin dashboard.

use axum::{extract::State, Json};
use chrono::{Duration, Utc};
use diesel::dsl::{count_star, sum};
use diesel::prelude::*;
use serde::Serialize;
use std::sync::Arc;

use crate::core::shared::enums::UserRole;
use crate::core::shared::error::{ApiError, ApiResult};
use crate::core::shared::schema::{posts, tags, users};
use crate::core::shared::state::AppState;
use crate::core::shared::utils::with_conn;
use crate::queries::admin::{count_queries, QueryCounts};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsersByRole {
    pub total: i64,
    pub members: i64,
    pub admins: i64,
    pub tenant_admins: i64,
}

impl UsersByRole {
    pub fn from_grouped(rows: &[(UserRole, i64)]) -> Self {
        let mut counts = Self::default();
        for (role, n) in rows {
            match role {
                UserRole::Member => counts.members += n,
                UserRole::Admin => counts.admins += n,
                UserRole::TenantAdmin => counts.tenant_admins += n,
            }
            counts.total += n;
        }
        counts
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostTotals {
    pub total: i64,
    pub official: i64,
    pub total_views: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOverview {
    pub users: UsersByRole,
    pub posts: PostTotals,
    pub tags: i64,
    pub queries: QueryCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_users: i64,
    pub members: i64,
    pub admins: i64,
    pub tenant_admins: i64,
    pub new_users_last7_days: i64,
}

fn users_by_role(conn: &mut PgConnection) -> QueryResult<UsersByRole> {
    let rows: Vec<(UserRole, i64)> = users::table
        .group_by(users::role)
        .select((users::role, count_star()))
        .load(conn)?;
    Ok(UsersByRole::from_grouped(&rows))
}

pub fn load_overview(conn: &mut PgConnection) -> Result<AdminOverview, ApiError> {
    let users = users_by_role(conn)?;
    let total: i64 = posts::table.count().get_result(conn)?;
    let official: i64 = posts::table
        .filter(posts::is_official.eq(true))
        .count()
        .get_result(conn)?;
    let total_views: Option<i64> = posts::table.select(sum(posts::view_count)).first(conn)?;
    let tags: i64 = tags::table.count().get_result(conn)?;
    let queries = count_queries(conn)?;

    Ok(AdminOverview {
        users,
        posts: PostTotals {
            total,
            official,
            total_views: total_views.unwrap_or(0),
        },
        tags,
        queries,
    })
}

pub fn load_user_stats(conn: &mut PgConnection) -> Result<UserStats, ApiError> {
    let by_role = users_by_role(conn)?;
    let since = Utc::now() - Duration::days(7);
    let new_users: i64 = users::table
        .filter(users::created_at.ge(since))
        .count()
        .get_result(conn)?;
    Ok(UserStats {
        total_users: by_role.total,
        members: by_role.members,
        admins: by_role.admins,
        tenant_admins: by_role.tenant_admins,
        new_users_last7_days: new_users,
    })
}

pub async fn get_admin_overview(State(state): State<Arc<AppState>>) -> ApiResult<Json<AdminOverview>> {
    let overview = with_conn(&state.conn, load_overview).await?;
    Ok(Json(overview))
}

pub async fn get_user_stats(State(state): State<Arc<AppState>>) -> ApiResult<Json<UserStats>> {
    let stats = with_conn(&state.conn, load_user_stats).await?;
    Ok(Json(stats))
}
