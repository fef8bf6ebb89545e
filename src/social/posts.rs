use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::models::{
    AuthorSummary, CreatePostInput, PostDetail, PostListParams, PostRow, PostSummary, PostTag,
    RelatedPost, RelatedSummary, TagRef, UpdatePostInput, EXCERPT_MAX,
};
use super::tags::{check_official_names, ensure_tags, normalize_tag_name, normalize_tag_names};
use crate::core::shared::error::{ApiError, ApiResult};
use crate::core::shared::pagination::{clamp_limit, paginate, Page};
use crate::core::shared::schema::{post_tags, posts, related_posts, tags, users};
use crate::core::shared::state::AppState;
use crate::core::shared::utils::{excerpt_of, non_blank, with_conn};
use crate::security::auth_api::AuthenticatedUser;
use crate::security::validation::Validate;

const DERIVED_EXCERPT_CHARS: usize = 200;

/// Uses the supplied excerpt when it is not blank, otherwise derives one from
/// the content.
pub fn excerpt_for(content: &str, excerpt: Option<String>) -> String {
    non_blank(excerpt).unwrap_or_else(|| excerpt_of(content, DERIVED_EXCERPT_CHARS.min(EXCERPT_MAX)))
}

pub fn check_priority(priority: Option<i32>, user: &AuthenticatedUser) -> Result<(), ApiError> {
    if priority.is_some() && !user.is_admin() {
        return Err(ApiError::forbidden("Only administrators can set post priority"));
    }
    Ok(())
}

fn check_related_ids(conn: &mut PgConnection, post_id: Option<Uuid>, ids: &[Uuid]) -> Result<(), ApiError> {
    if post_id.is_some_and(|own| ids.contains(&own)) {
        return Err(ApiError::BadRequest("A post cannot be related to itself".to_string()));
    }
    if ids.is_empty() {
        return Ok(());
    }
    let mut unique = ids.to_vec();
    unique.sort();
    unique.dedup();
    let found: i64 = posts::table
        .filter(posts::id.eq_any(&unique))
        .count()
        .get_result(conn)?;
    if found as usize != unique.len() {
        return Err(ApiError::BadRequest("Related post not found".to_string()));
    }
    Ok(())
}

fn replace_tags(conn: &mut PgConnection, post_id: Uuid, tag_ids: &[Uuid]) -> QueryResult<()> {
    diesel::delete(post_tags::table.filter(post_tags::post_id.eq(post_id))).execute(conn)?;
    let links: Vec<PostTag> = tag_ids.iter().map(|&tag_id| PostTag { post_id, tag_id }).collect();
    if !links.is_empty() {
        diesel::insert_into(post_tags::table).values(&links).execute(conn)?;
    }
    Ok(())
}

fn replace_related(conn: &mut PgConnection, post_id: Uuid, related: &[Uuid]) -> QueryResult<()> {
    diesel::delete(related_posts::table.filter(related_posts::post_id.eq(post_id))).execute(conn)?;
    let mut links: Vec<RelatedPost> = Vec::with_capacity(related.len());
    for &related_post_id in related {
        if !links.iter().any(|l| l.related_post_id == related_post_id) {
            links.push(RelatedPost { post_id, related_post_id });
        }
    }
    if !links.is_empty() {
        diesel::insert_into(related_posts::table).values(&links).execute(conn)?;
    }
    Ok(())
}

fn tags_by_post(conn: &mut PgConnection, ids: &[Uuid]) -> QueryResult<HashMap<Uuid, Vec<TagRef>>> {
    let rows: Vec<(Uuid, TagRef)> = post_tags::table
        .inner_join(tags::table)
        .filter(post_tags::post_id.eq_any(ids))
        .order(tags::name.asc())
        .select((post_tags::post_id, TagRef::as_select()))
        .load(conn)?;
    let mut grouped: HashMap<Uuid, Vec<TagRef>> = HashMap::new();
    for (post_id, tag) in rows {
        grouped.entry(post_id).or_default().push(tag);
    }
    Ok(grouped)
}

fn authors_by_id(conn: &mut PgConnection, ids: &[Uuid]) -> QueryResult<HashMap<Uuid, AuthorSummary>> {
    let authors: Vec<AuthorSummary> = users::table
        .filter(users::id.eq_any(ids))
        .select(AuthorSummary::as_select())
        .load(conn)?;
    Ok(authors.into_iter().map(|a| (a.id, a)).collect())
}

fn hydrate(conn: &mut PgConnection, rows: Vec<PostRow>) -> QueryResult<Vec<PostSummary>> {
    let ids: Vec<Uuid> = rows.iter().map(|p| p.id).collect();
    let mut author_ids: Vec<Uuid> = rows.iter().map(|p| p.user_id).collect();
    author_ids.sort();
    author_ids.dedup();

    let mut tags = tags_by_post(conn, &ids)?;
    let authors = authors_by_id(conn, &author_ids)?;
    Ok(rows
        .into_iter()
        .map(|post| PostSummary {
            tags: tags.remove(&post.id).unwrap_or_default(),
            author: authors.get(&post.user_id).cloned(),
            post,
        })
        .collect())
}

fn load_detail(conn: &mut PgConnection, post: PostRow) -> QueryResult<PostDetail> {
    let related_ids: Vec<Uuid> = related_posts::table
        .filter(related_posts::post_id.eq(post.id))
        .select(related_posts::related_post_id)
        .load(conn)?;
    let related = posts::table
        .filter(posts::id.eq_any(&related_ids))
        .order(posts::created_at.desc())
        .select(RelatedSummary::as_select())
        .load(conn)?;

    let summary = hydrate(conn, vec![post])?
        .pop()
        .ok_or(diesel::result::Error::NotFound)?;
    Ok(PostDetail {
        post: summary.post,
        tags: summary.tags,
        author: summary.author,
        related_posts: related,
    })
}

/// Official posts first, then by priority, then newest. The cursor row opens
/// the next page.
pub fn list_posts(conn: &mut PgConnection, params: PostListParams) -> Result<Page<PostSummary>, ApiError> {
    let limit = clamp_limit(params.limit);
    let mut query = posts::table.select(PostRow::as_select()).into_boxed();

    if let Some(raw) = params.tag.as_deref() {
        let name = normalize_tag_name(raw).map_err(|e| ApiError::BadRequest(e.to_string()))?;
        query = query.filter(
            posts::id.eq_any(
                post_tags::table
                    .inner_join(tags::table)
                    .filter(tags::name.eq(name))
                    .select(post_tags::post_id),
            ),
        );
    }
    if let Some(author) = params.author_id {
        query = query.filter(posts::user_id.eq(author));
    }

    if let Some(cursor) = params.cursor {
        let (official, priority, at, cursor_id): (bool, i32, DateTime<Utc>, Uuid) = posts::table
            .find(cursor)
            .select((posts::is_official, posts::priority, posts::created_at, posts::id))
            .first(conn)
            .optional()?
            .ok_or_else(|| ApiError::BadRequest("Unknown cursor".to_string()))?;
        let rest = posts::priority.lt(priority).or(posts::priority.eq(priority).and(
            posts::created_at
                .lt(at)
                .or(posts::created_at.eq(at).and(posts::id.le(cursor_id))),
        ));
        query = if official {
            query.filter(posts::is_official.eq(false).or(rest))
        } else {
            query.filter(posts::is_official.eq(false).and(rest))
        };
    }

    let rows: Vec<PostRow> = query
        .order((
            posts::is_official.desc(),
            posts::priority.desc(),
            posts::created_at.desc(),
            posts::id.desc(),
        ))
        .limit(limit + 1)
        .load(conn)?;
    let page = paginate(rows, limit, |row| row.id);
    let items = hydrate(conn, page.items)?;
    Ok(Page {
        items,
        next_cursor: page.next_cursor,
    })
}

pub fn create_post(
    conn: &mut PgConnection,
    user: &AuthenticatedUser,
    input: CreatePostInput,
    tag_names: Vec<String>,
) -> Result<PostDetail, ApiError> {
    conn.transaction(|conn| {
        let tags = ensure_tags(conn, &tag_names, user)?;
        check_related_ids(conn, None, &input.related_post_ids)?;

        let now = Utc::now();
        let row = PostRow {
            id: Uuid::new_v4(),
            user_id: user.user_id,
            excerpt: excerpt_for(&input.content, input.excerpt),
            title: input.title.trim().to_string(),
            content: input.content,
            view_count: 0,
            like_count: 0,
            comment_count: 0,
            is_official: tags.iter().any(|t| t.is_official),
            priority: input.priority.unwrap_or(0),
            created_at: now,
            updated_at: now,
        };
        let post: PostRow = diesel::insert_into(posts::table)
            .values(&row)
            .get_result(conn)?;

        let tag_ids: Vec<Uuid> = tags.iter().map(|t| t.id).collect();
        replace_tags(conn, post.id, &tag_ids)?;
        replace_related(conn, post.id, &input.related_post_ids)?;
        Ok(load_detail(conn, post)?)
    })
}

pub fn update_post(
    conn: &mut PgConnection,
    user: &AuthenticatedUser,
    id: Uuid,
    input: UpdatePostInput,
    tag_names: Option<Vec<String>>,
) -> Result<PostDetail, ApiError> {
    conn.transaction(|conn| {
        let current: PostRow = posts::table
            .find(id)
            .select(PostRow::as_select())
            .first(conn)
            .optional()?
            .ok_or_else(|| ApiError::not_found("Post"))?;
        if !user.can_modify(current.user_id) {
            return Err(ApiError::forbidden("Only the author or an administrator can edit this post"));
        }

        let mut is_official = current.is_official;
        if let Some(names) = &tag_names {
            let tags = ensure_tags(conn, names, user)?;
            is_official = tags.iter().any(|t| t.is_official);
            let tag_ids: Vec<Uuid> = tags.iter().map(|t| t.id).collect();
            replace_tags(conn, id, &tag_ids)?;
        }
        if let Some(related) = &input.related_post_ids {
            check_related_ids(conn, Some(id), related)?;
            replace_related(conn, id, related)?;
        }

        let content_changed = input.content.is_some();
        let content = input.content.unwrap_or(current.content);
        let excerpt = match input.excerpt {
            Some(excerpt) => excerpt_for(&content, Some(excerpt)),
            None if content_changed => excerpt_for(&content, None),
            None => current.excerpt,
        };
        let title = input
            .title
            .map(|t| t.trim().to_string())
            .unwrap_or(current.title);

        let post: PostRow = diesel::update(posts::table.find(id))
            .set((
                posts::title.eq(title),
                posts::content.eq(content),
                posts::excerpt.eq(excerpt),
                posts::is_official.eq(is_official),
                posts::priority.eq(input.priority.unwrap_or(current.priority)),
                posts::updated_at.eq(Utc::now()),
            ))
            .get_result(conn)?;
        Ok(load_detail(conn, post)?)
    })
}

pub async fn get_posts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PostListParams>,
) -> ApiResult<Json<Page<PostSummary>>> {
    let page = with_conn(&state.conn, move |conn| list_posts(conn, params)).await?;
    Ok(Json(page))
}

/// Counts a view and returns the post with its tags, author and related posts.
pub async fn get_post_by_id(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PostDetail>> {
    let detail = with_conn(&state.conn, move |conn| {
        let post: PostRow = diesel::update(posts::table.find(id))
            .set(posts::view_count.eq(posts::view_count + 1))
            .get_result(conn)
            .optional()?
            .ok_or_else(|| ApiError::not_found("Post"))?;
        Ok(load_detail(conn, post)?)
    })
    .await?;
    Ok(Json(detail))
}

pub async fn create_post_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    payload: Result<Json<CreatePostInput>, JsonRejection>,
) -> ApiResult<Json<PostDetail>> {
    user.ensure_authenticated()?;
    let Json(input) = payload?;
    input.validate().into_result()?;
    let tag_names = normalize_tag_names(&input.tags)?;
    check_priority(input.priority, &user)?;
    check_official_names(&tag_names, &user)?;

    let author = user.clone();
    let detail = with_conn(&state.conn, move |conn| {
        create_post(conn, &author, input, tag_names)
    })
    .await?;
    info!("{} published post {}", user.username, detail.post.id);
    Ok(Json(detail))
}

pub async fn update_post_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdatePostInput>, JsonRejection>,
) -> ApiResult<Json<PostDetail>> {
    user.ensure_authenticated()?;
    let Json(input) = payload?;
    input.validate().into_result()?;
    let tag_names = input.tags.as_deref().map(normalize_tag_names).transpose()?;
    check_priority(input.priority, &user)?;
    if let Some(names) = &tag_names {
        check_official_names(names, &user)?;
    }

    let editor = user.clone();
    let detail = with_conn(&state.conn, move |conn| {
        update_post(conn, &editor, id, input, tag_names)
    })
    .await?;
    info!("{} edited post {}", user.username, id);
    Ok(Json(detail))
}

pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    user.ensure_authenticated()?;
    let actor = user.clone();
    with_conn(&state.conn, move |conn| {
        let owner: Uuid = posts::table
            .find(id)
            .select(posts::user_id)
            .first(conn)
            .optional()?
            .ok_or_else(|| ApiError::not_found("Post"))?;
        if !actor.can_modify(owner) {
            return Err(ApiError::forbidden("Only the author or an administrator can delete this post"));
        }
        diesel::delete(posts::table.find(id)).execute(conn)?;
        Ok(())
    })
    .await?;
    info!("{} deleted post {}", user.username, id);
    Ok(Json(json!({ "success": true, "id": id })))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub id: Uuid,
    pub like_count: i32,
}

pub async fn like_post(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<LikeResponse>> {
    user.ensure_authenticated()?;
    let like_count = with_conn(&state.conn, move |conn| {
        diesel::update(posts::table.find(id))
            .set(posts::like_count.eq(posts::like_count + 1))
            .returning(posts::like_count)
            .get_result::<i32>(conn)
            .optional()?
            .ok_or_else(|| ApiError::not_found("Post"))
    })
    .await?;
    Ok(Json(LikeResponse { id, like_count }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shared::enums::UserRole;

    #[test]
    fn test_blank_excerpt_is_derived_from_content() {
        let content = "word ".repeat(100);
        let derived = excerpt_for(&content, Some("   ".to_string()));
        assert!(derived.ends_with("..."));
        assert!(derived.chars().count() <= DERIVED_EXCERPT_CHARS);

        let kept = excerpt_for(&content, Some(" Hand written ".to_string()));
        assert_eq!(kept, "Hand written");
    }

    #[test]
    fn test_priority_is_admin_only() {
        let member = AuthenticatedUser::new(Uuid::new_v4(), "m", UserRole::Member);
        let admin = AuthenticatedUser::new(Uuid::new_v4(), "a", UserRole::Admin);
        assert!(check_priority(None, &member).is_ok());
        assert!(matches!(check_priority(Some(3), &member), Err(ApiError::Forbidden(_))));
        assert!(check_priority(Some(3), &admin).is_ok());
    }
}
