pub mod core;
pub use self::core::*;

pub mod queries;
pub use self::queries::*;

pub mod social;
pub use self::social::*;

diesel::allow_tables_to_appear_in_same_query!(
    users,
    profiles,
    socials,
    tags,
    posts,
    post_tags,
    related_posts,
    contact_queries,
    feedback,
    support_requests,
    technical_issues,
);
