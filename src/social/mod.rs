//! Community posts and their tags.

pub mod models;
pub mod posts;
pub mod tags;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::core::shared::state::AppState;

pub use models::{PostDetail, PostRow, PostSummary, Tag, TagWithCount};

pub fn configure_posts_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/posts",
            get(posts::get_posts).post(posts::create_post_handler),
        )
        .route(
            "/api/posts/:id",
            get(posts::get_post_by_id)
                .put(posts::update_post_handler)
                .delete(posts::delete_post),
        )
        .route("/api/posts/:id/like", post(posts::like_post))
}

pub fn configure_tags_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/tags", get(tags::get_all_tags).post(tags::create_tag))
        .route("/api/tags/popular", get(tags::get_popular_tags))
}
