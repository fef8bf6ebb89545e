use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Extension, Json,
};
use chrono::Utc;
use diesel::dsl::count_star;
use diesel::prelude::*;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::models::{CreateTagInput, Tag, TagWithCount, MAX_TAGS_PER_POST};
use crate::core::shared::error::{ApiError, ApiResult};
use crate::core::shared::pagination::clamp_limit;
use crate::core::shared::schema::{post_tags, tags};
use crate::core::shared::state::AppState;
use crate::core::shared::utils::with_conn;
use crate::security::auth_api::AuthenticatedUser;
use crate::security::validation::{validate_length, ValidationError};

pub const TAG_NAME_MIN: usize = 2;
pub const TAG_NAME_MAX: usize = 30;

pub fn normalize_tag_name(raw: &str) -> Result<String, ValidationError> {
    let name = raw.trim().to_lowercase();
    validate_length(&name, "tag", Some(TAG_NAME_MIN), Some(TAG_NAME_MAX))?;
    Ok(name)
}

/// Normalizes and deduplicates, keeping first-seen order.
pub fn normalize_tag_names(raw: &[String]) -> Result<Vec<String>, ApiError> {
    let mut names: Vec<String> = Vec::with_capacity(raw.len());
    let mut errors = Vec::new();
    for value in raw {
        match normalize_tag_name(value) {
            Ok(name) if !names.contains(&name) => names.push(name),
            Ok(_) => {}
            Err(e) => errors.push(e.to_string()),
        }
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }
    if names.len() > MAX_TAGS_PER_POST {
        return Err(ApiError::Validation(vec![format!(
            "A post can have at most {} tags",
            MAX_TAGS_PER_POST
        )]));
    }
    Ok(names)
}

pub fn is_official_name(name: &str) -> bool {
    name.to_lowercase().contains("official")
}

/// Rejects official tag names for callers without an elevated role.
pub fn check_official_names(names: &[String], user: &AuthenticatedUser) -> Result<(), ApiError> {
    match names.iter().find(|n| is_official_name(n)) {
        Some(name) if !user.is_admin() => Err(ApiError::forbidden(format!(
            "Only administrators can use the official tag '{}'",
            name
        ))),
        _ => Ok(()),
    }
}

/// Creates missing tags and returns all of `names` as stored rows.
///
/// Tags that already exist keep their flags; a member attaching a tag an
/// admin created as official is refused.
pub fn ensure_tags(
    conn: &mut PgConnection,
    names: &[String],
    user: &AuthenticatedUser,
) -> Result<Vec<Tag>, ApiError> {
    if names.is_empty() {
        return Ok(Vec::new());
    }
    check_official_names(names, user)?;

    let now = Utc::now();
    let fresh: Vec<Tag> = names
        .iter()
        .map(|name| Tag {
            id: Uuid::new_v4(),
            name: name.clone(),
            is_official: is_official_name(name),
            created_by: Some(user.user_id),
            created_at: now,
        })
        .collect();
    diesel::insert_into(tags::table)
        .values(&fresh)
        .on_conflict(tags::name)
        .do_nothing()
        .execute(conn)?;

    let stored: Vec<Tag> = tags::table
        .filter(tags::name.eq_any(names))
        .select(Tag::as_select())
        .load(conn)?;

    if !user.is_admin() {
        if let Some(tag) = stored.iter().find(|t| t.is_official) {
            return Err(ApiError::forbidden(format!(
                "Only administrators can use the official tag '{}'",
                tag.name
            )));
        }
    }
    Ok(stored)
}

pub fn list_with_counts(conn: &mut PgConnection) -> Result<Vec<TagWithCount>, ApiError> {
    let all: Vec<Tag> = tags::table
        .order(tags::name.asc())
        .select(Tag::as_select())
        .load(conn)?;
    let counts: HashMap<Uuid, i64> = post_tags::table
        .group_by(post_tags::tag_id)
        .select((post_tags::tag_id, count_star()))
        .load::<(Uuid, i64)>(conn)?
        .into_iter()
        .collect();

    Ok(all
        .into_iter()
        .map(|tag| TagWithCount {
            post_count: counts.get(&tag.id).copied().unwrap_or(0),
            id: tag.id,
            name: tag.name,
            is_official: tag.is_official,
        })
        .collect())
}

/// Most used first; ties broken by name.
pub fn most_popular(mut tags: Vec<TagWithCount>, limit: usize) -> Vec<TagWithCount> {
    tags.sort_by(|a, b| b.post_count.cmp(&a.post_count).then_with(|| a.name.cmp(&b.name)));
    tags.truncate(limit);
    tags
}

pub async fn get_all_tags(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<TagWithCount>>> {
    let tags = with_conn(&state.conn, list_with_counts).await?;
    Ok(Json(tags))
}

#[derive(Debug, Default, Deserialize)]
pub struct PopularParams {
    pub limit: Option<i64>,
}

pub async fn get_popular_tags(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PopularParams>,
) -> ApiResult<Json<Vec<TagWithCount>>> {
    let limit = clamp_limit(params.limit) as usize;
    let tags = with_conn(&state.conn, list_with_counts).await?;
    Ok(Json(most_popular(tags, limit)))
}

pub async fn create_tag(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    payload: Result<Json<CreateTagInput>, JsonRejection>,
) -> ApiResult<Json<Tag>> {
    user.ensure_authenticated()?;
    let Json(input) = payload?;
    let name = normalize_tag_name(&input.name).map_err(|e| ApiError::Validation(vec![e.to_string()]))?;
    let is_official = input.is_official || is_official_name(&name);
    if is_official && !user.is_admin() {
        return Err(ApiError::forbidden("Only administrators can create official tags"));
    }

    let tag = Tag {
        id: Uuid::new_v4(),
        name,
        is_official,
        created_by: Some(user.user_id),
        created_at: Utc::now(),
    };
    let created = with_conn(&state.conn, move |conn| {
        diesel::insert_into(tags::table)
            .values(&tag)
            .get_result::<Tag>(conn)
            .map_err(|e| match ApiError::from(e) {
                ApiError::Conflict(_) => ApiError::Conflict(format!("Tag '{}' already exists", tag.name)),
                other => other,
            })
    })
    .await?;

    info!("{} created tag '{}'", user.username, created.name);
    Ok(Json(created))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shared::enums::UserRole;

    fn counted(name: &str, post_count: i64) -> TagWithCount {
        TagWithCount {
            id: Uuid::new_v4(),
            name: name.to_string(),
            is_official: false,
            post_count,
        }
    }

    #[test]
    fn test_tag_names_are_trimmed_lowercased_and_deduplicated() {
        let names = normalize_tag_names(&[
            "  Rust ".to_string(),
            "rust".to_string(),
            "WebDev".to_string(),
        ])
        .unwrap();
        assert_eq!(names, vec!["rust", "webdev"]);
    }

    #[test]
    fn test_tag_name_length_bounds() {
        assert!(normalize_tag_name("a").is_err());
        assert!(normalize_tag_name("  ab ").is_ok());
        assert!(normalize_tag_name(&"x".repeat(31)).is_err());
    }

    #[test]
    fn test_too_many_distinct_tags() {
        let raw: Vec<String> = (0..6).map(|i| format!("tag{i}")).collect();
        assert!(matches!(normalize_tag_names(&raw), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_official_names_need_admin() {
        let member = AuthenticatedUser::new(Uuid::new_v4(), "m", UserRole::Member);
        let admin = AuthenticatedUser::new(Uuid::new_v4(), "a", UserRole::TenantAdmin);
        let names = vec!["rust".to_string(), "zelene-official".to_string()];

        assert!(is_official_name("Official-News"));
        assert!(matches!(
            check_official_names(&names, &member),
            Err(ApiError::Forbidden(_))
        ));
        assert!(check_official_names(&names, &admin).is_ok());
        assert!(check_official_names(&names[..1], &member).is_ok());
    }

    #[test]
    fn test_popular_orders_by_count_then_name() {
        let popular = most_popular(
            vec![counted("b", 3), counted("a", 3), counted("c", 9), counted("d", 0)],
            3,
        );
        let names: Vec<_> = popular.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }
}
