use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use diesel::dsl::count_star;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::auth::accounts::{
    ensure_unique, normalize_email, CreateUserRequest, UpdateUserRequest, User, UserResponse,
};
use crate::core::shared::enums::UserRole;
use crate::core::shared::error::{ApiError, ApiResult};
use crate::core::shared::pagination::clamp_limit;
use crate::core::shared::schema::users;
use crate::core::shared::state::AppState;
use crate::core::shared::utils::{non_blank, with_conn};
use crate::security::auth_api::{AuthenticatedUser, ROOT_ROLES};
use crate::security::password::hash_password;
use crate::security::validation::Validate;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserListParams {
    pub search: Option<String>,
    pub role: Option<UserRole>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = users)]
struct UserChanges {
    username: Option<String>,
    email: Option<String>,
    name: Option<String>,
    password_hash: Option<String>,
    role: Option<UserRole>,
    image: Option<String>,
    updated_at: DateTime<Utc>,
}

/// Username, email or display name containing `search`, case-insensitively.
macro_rules! filter_users {
    ($query:expr, $params:expr) => {{
        let mut query = $query;
        if let Some(search) = non_blank($params.search.clone()) {
            let pattern = format!("%{}%", search.replace('%', "\\%").replace('_', "\\_"));
            query = query.filter(
                users::username
                    .ilike(pattern.clone())
                    .or(users::email.ilike(pattern.clone()))
                    .or(users::name.ilike(pattern)),
            );
        }
        if let Some(role) = $params.role {
            query = query.filter(users::role.eq(role));
        }
        query
    }};
}

/// Role rules for account changes made by `actor`.
///
/// Only `ADMIN` grants `ADMIN`, and nobody changes their own role.
pub fn check_role_change(
    actor: &AuthenticatedUser,
    target: Option<Uuid>,
    current: Option<UserRole>,
    requested: Option<UserRole>,
) -> Result<(), ApiError> {
    let Some(requested) = requested else {
        return Ok(());
    };
    if target == Some(actor.user_id) && current != Some(requested) {
        return Err(ApiError::forbidden("Administrators cannot change their own role"));
    }
    if requested == UserRole::Admin && current != Some(UserRole::Admin) && !actor.has_any_role(ROOT_ROLES) {
        return Err(ApiError::forbidden("Only ADMIN can grant the ADMIN role"));
    }
    Ok(())
}

/// `ADMIN` accounts are managed by `ADMIN` only.
pub fn check_target_account(actor: &AuthenticatedUser, target_role: UserRole) -> Result<(), ApiError> {
    if target_role == UserRole::Admin && !actor.has_any_role(ROOT_ROLES) {
        return Err(ApiError::forbidden("Only ADMIN can modify an ADMIN account"));
    }
    Ok(())
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UserListParams>,
) -> ApiResult<Json<UserListResponse>> {
    let limit = clamp_limit(params.limit);
    let offset = params.offset.unwrap_or(0).max(0);

    let (rows, total) = with_conn(&state.conn, move |conn| {
        let total: i64 = filter_users!(users::table.select(count_star()).into_boxed(), params)
            .get_result(conn)?;
        let rows: Vec<UserResponse> = filter_users!(
            users::table.select(UserResponse::as_select()).into_boxed(),
            params
        )
        .order((users::created_at.desc(), users::id.desc()))
        .limit(limit)
        .offset(offset)
        .load(conn)?;
        Ok((rows, total))
    })
    .await?;

    Ok(Json(UserListResponse {
        users: rows,
        total,
        limit,
        offset,
    }))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserResponse>> {
    let user = with_conn(&state.conn, move |conn| {
        users::table
            .find(id)
            .select(UserResponse::as_select())
            .first(conn)
            .optional()?
            .ok_or_else(|| ApiError::not_found("User"))
    })
    .await?;
    Ok(Json(user))
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<AuthenticatedUser>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<Json<UserResponse>> {
    let Json(input) = payload?;
    input.validate().into_result()?;
    let role = input.role.unwrap_or_default();
    check_role_change(&actor, None, None, Some(role))?;

    let created = with_conn(&state.conn, move |conn| {
        let username = input.username.trim().to_string();
        let email = normalize_email(&input.email);
        ensure_unique(conn, &username, &email, None)?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username,
            email,
            name: non_blank(input.name),
            password_hash: hash_password(&input.password).map_err(ApiError::internal)?,
            role,
            image: None,
            created_at: now,
            updated_at: now,
        };
        Ok(diesel::insert_into(users::table)
            .values(&user)
            .get_result::<User>(conn)?)
    })
    .await?;

    info!("{} created user {} as {}", actor.username, created.username, created.role);
    Ok(Json(created.into()))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> ApiResult<Json<UserResponse>> {
    let Json(input) = payload?;
    input.validate().into_result()?;

    let editor = actor.clone();
    let updated = with_conn(&state.conn, move |conn| {
        conn.transaction(|conn| {
            let current: User = users::table
                .find(id)
                .select(User::as_select())
                .for_update()
                .first(conn)
                .optional()?
                .ok_or_else(|| ApiError::not_found("User"))?;
            check_target_account(&editor, current.role)?;
            check_role_change(&editor, Some(id), Some(current.role), input.role)?;

            let username = input.username.map(|u| u.trim().to_string());
            let email = input.email.as_deref().map(normalize_email);
            if username.is_some() || email.is_some() {
                ensure_unique(
                    conn,
                    username.as_deref().unwrap_or(&current.username),
                    email.as_deref().unwrap_or(&current.email),
                    Some(id),
                )?;
            }
            let password_hash = match input.password {
                Some(password) => Some(hash_password(&password).map_err(ApiError::internal)?),
                None => None,
            };

            let changes = UserChanges {
                username,
                email,
                name: non_blank(input.name),
                password_hash,
                role: input.role,
                image: non_blank(input.image),
                updated_at: Utc::now(),
            };
            Ok(diesel::update(users::table.find(id))
                .set(&changes)
                .get_result::<User>(conn)?)
        })
    })
    .await?;

    info!("{} updated user {}", actor.username, updated.id);
    Ok(Json(updated.into()))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    if id == actor.user_id {
        return Err(ApiError::forbidden("Administrators cannot delete themselves"));
    }
    let remover = actor.clone();
    with_conn(&state.conn, move |conn| {
        conn.transaction(|conn| {
            let role: UserRole = users::table
                .find(id)
                .select(users::role)
                .for_update()
                .first(conn)
                .optional()?
                .ok_or_else(|| ApiError::not_found("User"))?;
            check_target_account(&remover, role)?;
            diesel::delete(users::table.find(id)).execute(conn)?;
            Ok(())
        })
    })
    .await?;

    info!("{} deleted user {}", actor.username, id);
    Ok(Json(json!({ "success": true, "id": id })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: UserRole) -> AuthenticatedUser {
        AuthenticatedUser::new(Uuid::new_v4(), "actor", role)
    }

    #[test]
    fn test_only_admin_grants_admin() {
        let tenant = actor(UserRole::TenantAdmin);
        let admin = actor(UserRole::Admin);
        let target = Some(Uuid::new_v4());

        assert!(matches!(
            check_role_change(&tenant, target, Some(UserRole::Member), Some(UserRole::Admin)),
            Err(ApiError::Forbidden(_))
        ));
        assert!(check_role_change(&admin, target, Some(UserRole::Member), Some(UserRole::Admin)).is_ok());
        assert!(check_role_change(&tenant, target, Some(UserRole::Member), Some(UserRole::TenantAdmin)).is_ok());
        assert!(check_role_change(&tenant, None, None, Some(UserRole::Member)).is_ok());
    }

    #[test]
    fn test_tenant_admin_cannot_touch_admin_accounts() {
        let tenant = actor(UserRole::TenantAdmin);
        let admin = actor(UserRole::Admin);

        assert!(matches!(
            check_target_account(&tenant, UserRole::Admin),
            Err(ApiError::Forbidden(_))
        ));
        assert!(check_target_account(&tenant, UserRole::TenantAdmin).is_ok());
        assert!(check_target_account(&tenant, UserRole::Member).is_ok());
        assert!(check_target_account(&admin, UserRole::Admin).is_ok());
    }

    #[test]
    fn test_no_self_demotion() {
        let admin = actor(UserRole::Admin);
        let own = Some(admin.user_id);
        assert!(matches!(
            check_role_change(&admin, own, Some(UserRole::Admin), Some(UserRole::Member)),
            Err(ApiError::Forbidden(_))
        ));
        assert!(check_role_change(&admin, own, Some(UserRole::Admin), Some(UserRole::Admin)).is_ok());
        assert!(check_role_change(&admin, own, Some(UserRole::Admin), None).is_ok());
    }
}
