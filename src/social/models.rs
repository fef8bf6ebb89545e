use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::shared::schema::{post_tags, posts, related_posts, tags, users};
use crate::security::validation::{
    validate_length, validate_optional_length, Validate, ValidationError, ValidationResult,
};

pub const TITLE_MIN: usize = 3;
pub const TITLE_MAX: usize = 200;
pub const CONTENT_MIN: usize = 10;
pub const CONTENT_MAX: usize = 50_000;
pub const EXCERPT_MAX: usize = 500;
pub const MAX_TAGS_PER_POST: usize = 5;
pub const MAX_RELATED_POSTS: usize = 5;

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize)]
#[diesel(table_name = posts)]
#[serde(rename_all = "camelCase")]
pub struct PostRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub view_count: i32,
    pub like_count: i32,
    pub comment_count: i32,
    pub is_official: bool,
    pub priority: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize)]
#[diesel(table_name = tags)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub is_official: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Serialize)]
#[diesel(table_name = tags)]
#[serde(rename_all = "camelCase")]
pub struct TagRef {
    pub id: Uuid,
    pub name: String,
    pub is_official: bool,
}

impl From<&Tag> for TagRef {
    fn from(tag: &Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name.clone(),
            is_official: tag.is_official,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = post_tags)]
pub struct PostTag {
    pub post_id: Uuid,
    pub tag_id: Uuid,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = related_posts)]
pub struct RelatedPost {
    pub post_id: Uuid,
    pub related_post_id: Uuid,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = users)]
#[serde(rename_all = "camelCase")]
pub struct AuthorSummary {
    pub id: Uuid,
    pub username: String,
    pub name: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = posts)]
#[serde(rename_all = "camelCase")]
pub struct RelatedSummary {
    pub id: Uuid,
    pub title: String,
    pub excerpt: String,
    pub is_official: bool,
}

/// Feed entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    #[serde(flatten)]
    pub post: PostRow,
    pub tags: Vec<TagRef>,
    pub author: Option<AuthorSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: PostRow,
    pub tags: Vec<TagRef>,
    pub author: Option<AuthorSummary>,
    pub related_posts: Vec<RelatedSummary>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TagWithCount {
    pub id: Uuid,
    pub name: String,
    pub is_official: bool,
    pub post_count: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostListParams {
    pub limit: Option<i64>,
    pub cursor: Option<Uuid>,
    pub tag: Option<String>,
    pub author_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostInput {
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub related_post_ids: Vec<Uuid>,
    pub priority: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub tags: Option<Vec<String>>,
    pub related_post_ids: Option<Vec<Uuid>>,
    pub priority: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTagInput {
    pub name: String,
    #[serde(default)]
    pub is_official: bool,
}

fn check_collections(result: &mut ValidationResult, tags: Option<&[String]>, related: Option<&[Uuid]>) {
    if let Some(tags) = tags {
        if tags.len() > MAX_TAGS_PER_POST {
            result.add_error(ValidationError::Custom(format!(
                "A post can have at most {} tags",
                MAX_TAGS_PER_POST
            )));
        }
    }
    if let Some(related) = related {
        if related.len() > MAX_RELATED_POSTS {
            result.add_error(ValidationError::Custom(format!(
                "A post can link at most {} related posts",
                MAX_RELATED_POSTS
            )));
        }
    }
}

impl Validate for CreatePostInput {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.check(validate_length(&self.title, "title", Some(TITLE_MIN), Some(TITLE_MAX)));
        result.check(validate_length(
            &self.content,
            "content",
            Some(CONTENT_MIN),
            Some(CONTENT_MAX),
        ));
        result.check(validate_optional_length(
            self.excerpt.as_deref(),
            "excerpt",
            EXCERPT_MAX,
        ));
        check_collections(&mut result, Some(&self.tags), Some(&self.related_post_ids));
        result
    }
}

impl Validate for UpdatePostInput {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        if let Some(title) = &self.title {
            result.check(validate_length(title, "title", Some(TITLE_MIN), Some(TITLE_MAX)));
        }
        if let Some(content) = &self.content {
            result.check(validate_length(
                content,
                "content",
                Some(CONTENT_MIN),
                Some(CONTENT_MAX),
            ));
        }
        result.check(validate_optional_length(
            self.excerpt.as_deref(),
            "excerpt",
            EXCERPT_MAX,
        ));
        check_collections(
            &mut result,
            self.tags.as_deref(),
            self.related_post_ids.as_deref(),
        );
        result
    }
}
