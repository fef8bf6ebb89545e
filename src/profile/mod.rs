//! Public profiles and the signed-in user's own profile.

pub mod models;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    middleware,
    routing::get,
    Extension, Json, Router,
};
use chrono::Utc;
use diesel::prelude::*;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::auth::UserResponse;
use crate::core::shared::error::{ApiError, ApiResult};
use crate::core::shared::schema::{posts, profiles, socials, users};
use crate::core::shared::state::AppState;
use crate::core::shared::utils::{non_blank, with_conn};
use crate::security::auth_api::{require_auth_middleware, AuthenticatedUser};
use crate::security::validation::Validate;

pub use models::{
    merge_profile, merge_social, MyProfile, ProfileRow, PublicProfile, PublicUser, SocialRow,
    UpdateProfileInput,
};

type Extras = (Option<ProfileRow>, Option<SocialRow>, i64);

fn load_extras(conn: &mut PgConnection, user_id: Uuid) -> QueryResult<Extras> {
    let profile = profiles::table
        .filter(profiles::user_id.eq(user_id))
        .select(ProfileRow::as_select())
        .first(conn)
        .optional()?;
    let social = socials::table
        .filter(socials::user_id.eq(user_id))
        .select(SocialRow::as_select())
        .first(conn)
        .optional()?;
    let post_count = posts::table
        .filter(posts::user_id.eq(user_id))
        .count()
        .get_result(conn)?;
    Ok((profile, social, post_count))
}

fn load_mine(conn: &mut PgConnection, user_id: Uuid) -> Result<MyProfile, ApiError> {
    let user: UserResponse = users::table
        .find(user_id)
        .select(UserResponse::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| ApiError::not_found("User"))?;
    let (profile, social, post_count) = load_extras(conn, user_id)?;
    Ok(MyProfile {
        user,
        profile,
        social,
        post_count,
    })
}

/// Updates the account and upserts its profile and social rows in one
/// transaction.
pub fn save_profile(
    conn: &mut PgConnection,
    user_id: Uuid,
    input: UpdateProfileInput,
) -> Result<MyProfile, ApiError> {
    conn.transaction(|conn| {
        let now = Utc::now();
        let updated = diesel::update(users::table.find(user_id))
            .set(users::updated_at.eq(now))
            .execute(conn)?;
        if updated == 0 {
            return Err(ApiError::not_found("User"));
        }
        if let Some(name) = input.name {
            diesel::update(users::table.find(user_id))
                .set(users::name.eq(non_blank(Some(name))))
                .execute(conn)?;
        }
        if let Some(image) = input.image {
            diesel::update(users::table.find(user_id))
                .set(users::image.eq(non_blank(Some(image))))
                .execute(conn)?;
        }

        let (stored_profile, stored_social, _) = load_extras(conn, user_id)?;
        let profile = merge_profile(stored_profile, user_id, input.profile, now);
        diesel::insert_into(profiles::table)
            .values(&profile)
            .on_conflict(profiles::user_id)
            .do_update()
            .set(&profile)
            .execute(conn)?;

        let social = merge_social(stored_social, user_id, input.social, now);
        diesel::insert_into(socials::table)
            .values(&social)
            .on_conflict(socials::user_id)
            .do_update()
            .set(&social)
            .execute(conn)?;

        load_mine(conn, user_id)
    })
}

pub async fn get_public_profile(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<PublicProfile>> {
    let profile = with_conn(&state.conn, move |conn| {
        let user: PublicUser = users::table
            .find(user_id)
            .select(PublicUser::as_select())
            .first(conn)
            .optional()?
            .ok_or_else(|| ApiError::not_found("User"))?;
        let (profile, social, post_count) = load_extras(conn, user_id)?;
        Ok(PublicProfile {
            user,
            profile,
            social,
            post_count,
        })
    })
    .await?;
    Ok(Json(profile))
}

pub async fn get_my_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<Json<MyProfile>> {
    let user_id = user.user_id;
    let mine = with_conn(&state.conn, move |conn| load_mine(conn, user_id)).await?;
    Ok(Json(mine))
}

pub async fn update_my_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    payload: Result<Json<UpdateProfileInput>, JsonRejection>,
) -> ApiResult<Json<MyProfile>> {
    let Json(input) = payload?;
    input.validate().into_result()?;

    let user_id = user.user_id;
    let mine = with_conn(&state.conn, move |conn| save_profile(conn, user_id, input)).await?;
    info!("{} updated their profile", user.username);
    Ok(Json(mine))
}

pub fn configure_profile_routes() -> Router<Arc<AppState>> {
    let own = Router::new()
        .route(
            "/api/profile/me",
            get(get_my_profile).put(update_my_profile),
        )
        .route_layer(middleware::from_fn(require_auth_middleware));

    Router::new()
        .route("/api/profile/:user_id", get(get_public_profile))
        .merge(own)
}

#[cfg(test)]
mod tests {
    use crate::core::shared::enums::UserRole;
    use crate::core::shared::test_utils::{bearer_for, json_request, test_state};
    use crate::main_module::build_router;
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_own_profile_requires_session() {
        for method in [Method::GET, Method::PUT] {
            let response = build_router(test_state())
                .oneshot(json_request(method, "/api/profile/me", None, Some(json!({}))))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn test_profile_update_is_validated_before_storage() {
        let state = test_state();
        let (_, token) = bearer_for(&state, UserRole::Member);
        let response = build_router(state)
            .oneshot(json_request(
                Method::PUT,
                "/api/profile/me",
                Some(&token),
                Some(json!({ "profile": { "website": "not a url" } })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_public_profile_rejects_malformed_id() {
        let response = build_router(test_state())
            .oneshot(json_request(Method::GET, "/api/profile/not-a-uuid", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
