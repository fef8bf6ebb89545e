//! Text-backed enum types shared by the schema and the procedures.
//!
//! Every enum is stored in PostgreSQL as `VARCHAR` in its wire spelling
//! (`NEW`, `IN_PROGRESS`, `TENANT_ADMIN`, ...), so rows stay readable from
//! `psql` and the JSON form matches the column value.

use diesel::deserialize::{self, FromSql};
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, Output, ToSql};
use diesel::sql_types::Text;
use diesel::{AsExpression, FromSqlRow};
use serde::{Deserialize, Serialize};
use std::io::Write;

macro_rules! text_enum_sql {
    ($ty:ident, $label:literal) => {
        impl ToSql<Text, Pg> for $ty {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
                out.write_all(self.as_str().as_bytes())?;
                Ok(serialize::IsNull::No)
            }
        }

        impl FromSql<Text, Pg> for $ty {
            fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
                let raw = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
                raw.parse::<$ty>()
                    .map_err(|e| format!("{}: {}", $label, e).into())
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

// ============================================================================
// QUERY STATUS
// ============================================================================

/// Lifecycle status shared by all four query kinds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryStatus {
    New,
    InProgress,
    Resolved,
    Cancelled,
}

impl Default for QueryStatus {
    fn default() -> Self {
        Self::New
    }
}

impl QueryStatus {
    pub const ALL: [QueryStatus; 4] = [
        QueryStatus::New,
        QueryStatus::InProgress,
        QueryStatus::Resolved,
        QueryStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::InProgress => "IN_PROGRESS",
            Self::Resolved => "RESOLVED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::New | Self::InProgress)
    }
}

impl std::str::FromStr for QueryStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "NEW" => Ok(Self::New),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "RESOLVED" => Ok(Self::Resolved),
            "CANCELLED" | "CANCELED" => Ok(Self::Cancelled),
            _ => Err(format!("Unknown query status: {}", s)),
        }
    }
}

text_enum_sql!(QueryStatus, "QueryStatus");

// ============================================================================
// USER ROLE
// ============================================================================

/// Account role. Drives every authorization decision in the platform.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    AsExpression,
    FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    #[default]
    Member,
    Admin,
    TenantAdmin,
}

impl UserRole {
    pub const ELEVATED: [UserRole; 2] = [UserRole::Admin, UserRole::TenantAdmin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "MEMBER",
            Self::Admin => "ADMIN",
            Self::TenantAdmin => "TENANT_ADMIN",
        }
    }

    /// `ADMIN` or `TENANT_ADMIN`.
    pub fn is_elevated(&self) -> bool {
        matches!(self, Self::Admin | Self::TenantAdmin)
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "MEMBER" => Ok(Self::Member),
            "ADMIN" => Ok(Self::Admin),
            "TENANT_ADMIN" => Ok(Self::TenantAdmin),
            _ => Err(format!("Unknown user role: {}", s)),
        }
    }
}

text_enum_sql!(UserRole, "UserRole");

// ============================================================================
// SUPPORT PRIORITY
// ============================================================================

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    AsExpression,
    FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SupportPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl SupportPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Urgent => "URGENT",
        }
    }
}

impl std::str::FromStr for SupportPriority {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            "URGENT" => Ok(Self::Urgent),
            _ => Err(format!("Unknown support priority: {}", s)),
        }
    }
}

text_enum_sql!(SupportPriority, "SupportPriority");

// ============================================================================
// ISSUE SEVERITY
// ============================================================================

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    AsExpression,
    FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueSeverity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl IssueSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl std::str::FromStr for IssueSeverity {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            "CRITICAL" => Ok(Self::Critical),
            _ => Err(format!("Unknown issue severity: {}", s)),
        }
    }
}

text_enum_sql!(IssueSeverity, "IssueSeverity");

// ============================================================================
// QUERY KIND
// ============================================================================

/// The four public query types. Not stored; each kind has its own table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    Contact,
    Feedback,
    Support,
    TechnicalIssue,
}

impl QueryKind {
    pub const ALL: [QueryKind; 4] = [
        QueryKind::Contact,
        QueryKind::Feedback,
        QueryKind::Support,
        QueryKind::TechnicalIssue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contact => "contact",
            Self::Feedback => "feedback",
            Self::Support => "support",
            Self::TechnicalIssue => "technical_issue",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Contact => "contact request",
            Self::Feedback => "feedback",
            Self::Support => "support request",
            Self::TechnicalIssue => "issue report",
        }
    }
}

impl std::str::FromStr for QueryKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "contact" => Ok(Self::Contact),
            "feedback" => Ok(Self::Feedback),
            "support" => Ok(Self::Support),
            "technical_issue" | "technical_issues" | "issue" => Ok(Self::TechnicalIssue),
            _ => Err(format!("Unknown query kind: {}", s)),
        }
    }
}

impl std::fmt::Display for QueryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_status_wire_names() {
        assert_eq!(QueryStatus::InProgress.as_str(), "IN_PROGRESS");
        assert_eq!(
            serde_json::to_string(&QueryStatus::InProgress).unwrap(),
            "\"IN_PROGRESS\""
        );
        assert_eq!("in-progress".parse::<QueryStatus>(), Ok(QueryStatus::InProgress));
        assert_eq!("canceled".parse::<QueryStatus>(), Ok(QueryStatus::Cancelled));
        assert!("closed".parse::<QueryStatus>().is_err());
    }

    #[test]
    fn test_user_role_elevation() {
        assert!(UserRole::Admin.is_elevated());
        assert!(UserRole::TenantAdmin.is_elevated());
        assert!(!UserRole::Member.is_elevated());
        assert_eq!(UserRole::default(), UserRole::Member);
        assert_eq!(
            serde_json::from_str::<UserRole>("\"TENANT_ADMIN\"").unwrap(),
            UserRole::TenantAdmin
        );
    }

    #[test]
    fn test_query_kind_parsing() {
        assert_eq!("technical-issues".parse::<QueryKind>(), Ok(QueryKind::TechnicalIssue));
        assert_eq!("Contact".parse::<QueryKind>(), Ok(QueryKind::Contact));
        assert!("billing".parse::<QueryKind>().is_err());
    }
}
