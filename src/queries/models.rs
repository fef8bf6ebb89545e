use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::shared::enums::{IssueSeverity, QueryKind, QueryStatus, SupportPriority};
use crate::core::shared::schema::{contact_queries, feedback, support_requests, technical_issues};
use crate::core::shared::utils::non_blank;
use crate::drive::{check_attachment_list, AttachmentInput};
use crate::security::validation::{
    validate_email, validate_length, validate_optional_length, validate_phone, validate_range,
    validate_url, Validate, ValidationError, ValidationResult,
};

pub const NAME_MIN: usize = 2;
pub const NAME_MAX: usize = 100;
pub const SUBJECT_MIN: usize = 3;
pub const SUBJECT_MAX: usize = 200;
pub const MESSAGE_MIN: usize = 10;
pub const MESSAGE_MAX: usize = 5000;
pub const SATISFACTION_MIN: i32 = 0;
pub const SATISFACTION_MAX: i32 = 5;
pub const CATEGORY_MAX: usize = 50;

// ============================================================================
// Rows
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = contact_queries)]
#[serde(rename_all = "camelCase")]
pub struct ContactQuery {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub subject: String,
    pub message: String,
    pub status: QueryStatus,
    pub response: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = feedback)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub category: String,
    pub satisfaction: i32,
    pub would_recommend: Option<bool>,
    pub message: String,
    pub status: QueryStatus,
    pub response: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = support_requests)]
#[serde(rename_all = "camelCase")]
pub struct SupportRequest {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub priority: SupportPriority,
    pub product_area: Option<String>,
    pub status: QueryStatus,
    pub response: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = technical_issues)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalIssue {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub title: String,
    pub description: String,
    pub severity: IssueSeverity,
    pub steps_to_reproduce: Option<String>,
    pub expected_behavior: Option<String>,
    pub actual_behavior: Option<String>,
    pub browser: Option<String>,
    pub operating_system: Option<String>,
    pub page_url: Option<String>,
    /// Storage keys, not URLs.
    pub attachments: Vec<String>,
    pub status: QueryStatus,
    pub response: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A row of any kind, tagged with its kind on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum QueryRecord {
    Contact(ContactQuery),
    Feedback(Feedback),
    Support(SupportRequest),
    TechnicalIssue(TechnicalIssue),
}

impl QueryRecord {
    pub fn kind(&self) -> QueryKind {
        match self {
            Self::Contact(_) => QueryKind::Contact,
            Self::Feedback(_) => QueryKind::Feedback,
            Self::Support(_) => QueryKind::Support,
            Self::TechnicalIssue(_) => QueryKind::TechnicalIssue,
        }
    }

    pub fn status(&self) -> QueryStatus {
        match self {
            Self::Contact(q) => q.status,
            Self::Feedback(q) => q.status,
            Self::Support(q) => q.status,
            Self::TechnicalIssue(q) => q.status,
        }
    }
}

// ============================================================================
// Submission inputs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInput {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub subject: String,
    pub message: String,
    pub captcha_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackInput {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub category: Option<String>,
    pub satisfaction: i32,
    pub would_recommend: Option<bool>,
    pub message: String,
    pub captcha_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportInput {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    #[serde(default)]
    pub priority: SupportPriority,
    pub product_area: Option<String>,
    pub captcha_token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalIssueInput {
    pub name: String,
    pub email: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub severity: IssueSeverity,
    pub steps_to_reproduce: Option<String>,
    pub expected_behavior: Option<String>,
    pub actual_behavior: Option<String>,
    pub browser: Option<String>,
    pub operating_system: Option<String>,
    pub page_url: Option<String>,
    #[serde(default)]
    pub attachments: Vec<AttachmentInput>,
    pub captcha_token: Option<String>,
}

fn validate_submitter(result: &mut ValidationResult, name: &str, email: &str) {
    result.check(validate_length(name, "name", Some(NAME_MIN), Some(NAME_MAX)));
    result.check(validate_email(email));
}

fn validate_message(result: &mut ValidationResult, field: &str, value: &str) {
    result.check(validate_length(value, field, Some(MESSAGE_MIN), Some(MESSAGE_MAX)));
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl Validate for ContactInput {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        validate_submitter(&mut result, &self.name, &self.email);
        result.check(validate_length(
            &self.subject,
            "subject",
            Some(SUBJECT_MIN),
            Some(SUBJECT_MAX),
        ));
        validate_message(&mut result, "message", &self.message);
        if let Some(phone) = present(&self.phone) {
            result.check(validate_phone(phone));
        }
        result.check(validate_optional_length(present(&self.company), "company", 100));
        result
    }
}

impl Validate for FeedbackInput {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        validate_submitter(&mut result, &self.name, &self.email);
        result.check(validate_range(
            self.satisfaction,
            "satisfaction",
            SATISFACTION_MIN,
            SATISFACTION_MAX,
        ));
        result.check(validate_optional_length(
            present(&self.category),
            "category",
            CATEGORY_MAX,
        ));
        validate_message(&mut result, "message", &self.message);
        result
    }
}

impl Validate for SupportInput {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        validate_submitter(&mut result, &self.name, &self.email);
        result.check(validate_length(
            &self.subject,
            "subject",
            Some(SUBJECT_MIN),
            Some(SUBJECT_MAX),
        ));
        validate_message(&mut result, "message", &self.message);
        result.check(validate_optional_length(
            present(&self.product_area),
            "productArea",
            100,
        ));
        result
    }
}

impl TechnicalIssueInput {
    /// Submitter and problem summary.
    pub fn validate_details(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        validate_submitter(&mut result, &self.name, &self.email);
        result.check(validate_length(
            &self.title,
            "title",
            Some(SUBJECT_MIN),
            Some(SUBJECT_MAX),
        ));
        validate_message(&mut result, "description", &self.description);
        result
    }

    /// Reproduction notes and where the problem happened.
    pub fn validate_environment(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        for (field, value) in [
            ("stepsToReproduce", &self.steps_to_reproduce),
            ("expectedBehavior", &self.expected_behavior),
            ("actualBehavior", &self.actual_behavior),
        ] {
            result.check(validate_optional_length(present(value), field, MESSAGE_MAX));
        }
        result.check(validate_optional_length(present(&self.browser), "browser", 100));
        result.check(validate_optional_length(
            present(&self.operating_system),
            "operatingSystem",
            100,
        ));
        if let Some(url) = present(&self.page_url) {
            result.check(validate_url(url));
        }
        result
    }

    pub fn validate_attachments(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        for problem in check_attachment_list(&self.attachments) {
            result.add_error(ValidationError::Custom(problem));
        }
        result
    }
}

impl Validate for TechnicalIssueInput {
    fn validate(&self) -> ValidationResult {
        let mut result = self.validate_details();
        result.merge(self.validate_environment());
        result.merge(self.validate_attachments());
        result
    }
}

// ============================================================================
// Input -> row
// ============================================================================

impl ContactQuery {
    pub fn from_input(input: ContactInput) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            email: input.email.trim().to_string(),
            phone: non_blank(input.phone),
            company: non_blank(input.company),
            subject: input.subject.trim().to_string(),
            message: input.message.trim().to_string(),
            status: QueryStatus::New,
            response: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Feedback {
    pub fn from_input(input: FeedbackInput) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            email: input.email.trim().to_string(),
            category: non_blank(input.category).unwrap_or_else(|| "general".to_string()),
            satisfaction: input.satisfaction,
            would_recommend: input.would_recommend,
            message: input.message.trim().to_string(),
            status: QueryStatus::New,
            response: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl SupportRequest {
    pub fn from_input(input: SupportInput) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            email: input.email.trim().to_string(),
            subject: input.subject.trim().to_string(),
            message: input.message.trim().to_string(),
            priority: input.priority,
            product_area: non_blank(input.product_area),
            status: QueryStatus::New,
            response: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl TechnicalIssue {
    /// `id` is allocated before the attachments are uploaded so the log lines
    /// for both can be correlated.
    pub fn from_input(id: Uuid, input: TechnicalIssueInput, attachment_keys: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: input.name.trim().to_string(),
            email: input.email.trim().to_string(),
            title: input.title.trim().to_string(),
            description: input.description.trim().to_string(),
            severity: input.severity,
            steps_to_reproduce: non_blank(input.steps_to_reproduce),
            expected_behavior: non_blank(input.expected_behavior),
            actual_behavior: non_blank(input.actual_behavior),
            browser: non_blank(input.browser),
            operating_system: non_blank(input.operating_system),
            page_url: non_blank(input.page_url),
            attachments: attachment_keys,
            status: QueryStatus::New,
            response: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feedback(satisfaction: i32) -> FeedbackInput {
        FeedbackInput {
            name: "Jana".into(),
            email: "jana@example.com".into(),
            category: None,
            satisfaction,
            would_recommend: Some(true),
            message: "Great experience overall".into(),
            captcha_token: None,
        }
    }

    #[test]
    fn test_feedback_satisfaction_bounds() {
        assert!(feedback(0).validate().is_valid());
        assert!(feedback(5).validate().is_valid());
        assert!(!feedback(-1).validate().is_valid());
        assert!(!feedback(6).validate().is_valid());
    }

    #[test]
    fn test_contact_validation_collects_every_field() {
        let input = ContactInput {
            name: "J".into(),
            email: "nope".into(),
            phone: Some("   ".into()),
            company: None,
            subject: "Hi".into(),
            message: "short".into(),
            captcha_token: None,
        };
        let result = input.validate();
        assert_eq!(result.errors().len(), 4);
    }

    #[test]
    fn test_submitted_status_is_ignored() {
        let input: ContactInput = serde_json::from_value(serde_json::json!({
            "name": "Petra",
            "email": "petra@example.com",
            "subject": "Partnership",
            "message": "We would like to talk about a partnership.",
            "status": "RESOLVED"
        }))
        .unwrap();
        let row = ContactQuery::from_input(input);
        assert_eq!(row.status, QueryStatus::New);
        assert!(row.response.is_none());
    }

    #[test]
    fn test_support_priority_defaults_to_medium() {
        let input: SupportInput = serde_json::from_value(serde_json::json!({
            "name": "Petra",
            "email": "petra@example.com",
            "subject": "Billing",
            "message": "The invoice total looks wrong to me."
        }))
        .unwrap();
        assert_eq!(input.priority, SupportPriority::Medium);
        assert!(input.validate().is_valid());
    }

    #[test]
    fn test_technical_issue_rejects_too_many_attachments() {
        let attachment = AttachmentInput {
            name: "a.txt".into(),
            content_type: "text/plain".into(),
            data: "aGVsbG8=".into(),
        };
        let input = TechnicalIssueInput {
            name: "Ivo".into(),
            email: "ivo@example.com".into(),
            title: "Crash on save".into(),
            description: "The editor crashes whenever I save a draft.".into(),
            severity: IssueSeverity::High,
            steps_to_reproduce: None,
            expected_behavior: None,
            actual_behavior: None,
            browser: Some("Firefox".into()),
            operating_system: None,
            page_url: Some("https://zelene.dev/editor".into()),
            attachments: vec![attachment; 6],
            captcha_token: None,
        };
        let result = input.validate();
        assert!(!result.is_valid());
        assert!(result.to_error_messages()[0].contains("At most 5"));
    }

    #[test]
    fn test_record_serializes_with_kind_tag() {
        let row = ContactQuery::from_input(ContactInput {
            name: "Petra".into(),
            email: "petra@example.com".into(),
            phone: None,
            company: None,
            subject: "Hello".into(),
            message: "Just saying hello to the team.".into(),
            captcha_token: None,
        });
        let json = serde_json::to_value(QueryRecord::Contact(row)).unwrap();
        assert_eq!(json["type"], "contact");
        assert_eq!(json["data"]["status"], "NEW");
    }
}
