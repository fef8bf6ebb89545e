use super::core::users;

diesel::table! {
    tags (id) {
        id -> Uuid,
        name -> Varchar,
        is_official -> Bool,
        created_by -> Nullable<Uuid>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    posts (id) {
        id -> Uuid,
        user_id -> Uuid,
        title -> Varchar,
        excerpt -> Varchar,
        content -> Text,
        view_count -> Int4,
        like_count -> Int4,
        comment_count -> Int4,
        is_official -> Bool,
        priority -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    post_tags (post_id, tag_id) {
        post_id -> Uuid,
        tag_id -> Uuid,
    }
}

diesel::table! {
    related_posts (post_id, related_post_id) {
        post_id -> Uuid,
        related_post_id -> Uuid,
    }
}

diesel::joinable!(posts -> users (user_id));
diesel::joinable!(post_tags -> posts (post_id));
diesel::joinable!(post_tags -> tags (tag_id));
