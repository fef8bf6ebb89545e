use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::UserResponse;
use crate::core::shared::enums::UserRole;
use crate::core::shared::schema::{profiles, socials, users};
use crate::core::shared::utils::non_blank;
use crate::security::validation::{
    validate_length, validate_optional_length, validate_url, Validate, ValidationError,
    ValidationResult,
};

pub const NAME_MAX: usize = 100;
pub const BIO_MAX: usize = 1000;
pub const FIELD_MAX: usize = 100;
pub const MAX_SKILLS: usize = 20;
pub const SKILL_MAX: usize = 50;

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, AsChangeset, Serialize)]
#[diesel(table_name = profiles, treat_none_as_null = true)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub skills: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, AsChangeset, Serialize)]
#[diesel(table_name = socials, treat_none_as_null = true)]
#[serde(rename_all = "camelCase")]
pub struct SocialRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub github: Option<String>,
    pub twitter: Option<String>,
    pub linkedin: Option<String>,
    pub discord: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// What anyone may see about an account.
#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = users)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub user: PublicUser,
    pub profile: Option<ProfileRow>,
    pub social: Option<SocialRow>,
    pub post_count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyProfile {
    pub user: UserResponse,
    pub profile: Option<ProfileRow>,
    pub social: Option<SocialRow>,
    pub post_count: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileFields {
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub skills: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SocialFields {
    pub github: Option<String>,
    pub twitter: Option<String>,
    pub linkedin: Option<String>,
    pub discord: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileInput {
    pub name: Option<String>,
    pub image: Option<String>,
    #[serde(default)]
    pub profile: ProfileFields,
    #[serde(default)]
    pub social: SocialFields,
}

impl Validate for UpdateProfileInput {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.check(validate_optional_length(self.name.as_deref(), "name", NAME_MAX));

        let profile = &self.profile;
        result.check(validate_optional_length(profile.bio.as_deref(), "bio", BIO_MAX));
        result.check(validate_optional_length(profile.location.as_deref(), "location", FIELD_MAX));
        result.check(validate_optional_length(profile.company.as_deref(), "company", FIELD_MAX));
        result.check(validate_optional_length(profile.job_title.as_deref(), "jobTitle", FIELD_MAX));
        if let Some(website) = non_blank(profile.website.clone()) {
            result.check(validate_url(&website));
        }
        if let Some(skills) = &profile.skills {
            if skills.len() > MAX_SKILLS {
                result.add_error(ValidationError::Custom(format!(
                    "At most {} skills can be listed",
                    MAX_SKILLS
                )));
            }
            for skill in skills {
                result.check(validate_length(skill, "skills", Some(1), Some(SKILL_MAX)));
            }
        }

        let social = &self.social;
        for (field, value) in [
            ("github", &social.github),
            ("twitter", &social.twitter),
            ("linkedin", &social.linkedin),
            ("discord", &social.discord),
        ] {
            result.check(validate_optional_length(value.as_deref(), field, FIELD_MAX));
        }
        result
    }
}

/// `None` keeps the stored value; a blank string clears it.
fn merged(update: Option<String>, stored: Option<String>) -> Option<String> {
    match update {
        Some(value) => non_blank(Some(value)),
        None => stored,
    }
}

pub fn merge_profile(
    stored: Option<ProfileRow>,
    user_id: Uuid,
    fields: ProfileFields,
    now: DateTime<Utc>,
) -> ProfileRow {
    let base = stored.unwrap_or_else(|| ProfileRow {
        id: Uuid::new_v4(),
        user_id,
        bio: None,
        location: None,
        website: None,
        company: None,
        job_title: None,
        skills: Vec::new(),
        created_at: now,
        updated_at: now,
    });
    ProfileRow {
        bio: merged(fields.bio, base.bio),
        location: merged(fields.location, base.location),
        website: merged(fields.website, base.website),
        company: merged(fields.company, base.company),
        job_title: merged(fields.job_title, base.job_title),
        skills: match fields.skills {
            Some(skills) => skills
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => base.skills,
        },
        updated_at: now,
        ..base
    }
}

pub fn merge_social(
    stored: Option<SocialRow>,
    user_id: Uuid,
    fields: SocialFields,
    now: DateTime<Utc>,
) -> SocialRow {
    let base = stored.unwrap_or_else(|| SocialRow {
        id: Uuid::new_v4(),
        user_id,
        github: None,
        twitter: None,
        linkedin: None,
        discord: None,
        updated_at: now,
    });
    SocialRow {
        github: merged(fields.github, base.github),
        twitter: merged(fields.twitter, base.twitter),
        linkedin: merged(fields.linkedin, base.linkedin),
        discord: merged(fields.discord, base.discord),
        updated_at: now,
        ..base
    }
}
