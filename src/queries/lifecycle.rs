//! Status transitions for queries of every kind.
//!
//! | from          | to                                |
//! |---------------|-----------------------------------|
//! | `NEW`         | `IN_PROGRESS`, `RESOLVED`, `CANCELLED` |
//! | `IN_PROGRESS` | `RESOLVED`, `CANCELLED`, `NEW`    |
//! | `RESOLVED`    | `IN_PROGRESS`                     |
//! | `CANCELLED`   | `NEW`                             |
//!
//! Keeping the current status is always allowed so a response can be edited
//! on its own.

use serde::Deserialize;
use thiserror::Error;

use crate::core::shared::enums::QueryStatus;
use crate::core::shared::error::ApiError;
use crate::core::shared::utils::non_blank;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot move a query from {from} to {to}")]
pub struct TransitionError {
    pub from: QueryStatus,
    pub to: QueryStatus,
}

impl From<TransitionError> for ApiError {
    fn from(err: TransitionError) -> Self {
        ApiError::InvalidTransition(err.to_string())
    }
}

impl QueryStatus {
    /// Statuses reachable in one step, excluding the current one.
    pub fn allowed_next(&self) -> &'static [QueryStatus] {
        use QueryStatus::*;
        match self {
            New => &[InProgress, Resolved, Cancelled],
            InProgress => &[Resolved, Cancelled, New],
            Resolved => &[InProgress],
            Cancelled => &[New],
        }
    }

    pub fn can_transition_to(&self, next: QueryStatus) -> bool {
        *self == next || self.allowed_next().contains(&next)
    }

    pub fn transition_to(self, next: QueryStatus) -> Result<QueryStatus, TransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(TransitionError {
                from: self,
                to: next,
            })
        }
    }
}

/// Body of every admin `PATCH /api/admin/queries/<kind>/:id`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryUpdate {
    pub status: Option<QueryStatus>,
    /// An empty string clears the stored response.
    pub response: Option<String>,
}

/// Resolved values to write for an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedUpdate {
    pub status: QueryStatus,
    pub response: Option<String>,
}

pub const RESPONSE_MAX: usize = 5000;

/// Merges an update into the stored state, enforcing the transition table.
pub fn plan_update(
    current_status: QueryStatus,
    current_response: Option<String>,
    update: QueryUpdate,
) -> Result<PlannedUpdate, ApiError> {
    if update.status.is_none() && update.response.is_none() {
        return Err(ApiError::BadRequest(
            "Provide a status, a response, or both".to_string(),
        ));
    }

    let status = match update.status {
        Some(next) => current_status.transition_to(next)?,
        None => current_status,
    };

    let response = match update.response {
        Some(text) => {
            if text.chars().count() > RESPONSE_MAX {
                return Err(ApiError::Validation(vec![format!(
                    "Field 'response' is too long: > {} chars",
                    RESPONSE_MAX
                )]));
            }
            non_blank(Some(text))
        }
        None => current_response,
    };

    Ok(PlannedUpdate { status, response })
}

#[cfg(test)]
mod tests {
    use super::*;
    use QueryStatus::*;

    #[test]
    fn test_transition_table() {
        let allowed = [
            (New, InProgress),
            (New, Resolved),
            (New, Cancelled),
            (InProgress, Resolved),
            (InProgress, Cancelled),
            (InProgress, New),
            (Resolved, InProgress),
            (Cancelled, New),
        ];
        for from in QueryStatus::ALL {
            for to in QueryStatus::ALL {
                let expected = from == to || allowed.contains(&(from, to));
                assert_eq!(
                    from.transition_to(to).is_ok(),
                    expected,
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn test_rejected_transition_maps_to_invalid_transition() {
        let err: ApiError = Resolved.transition_to(Cancelled).unwrap_err().into();
        assert!(matches!(err, ApiError::InvalidTransition(_)));
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_response_only_update_keeps_status() {
        let planned = plan_update(
            Resolved,
            None,
            QueryUpdate {
                status: None,
                response: Some("  Fixed in 1.4.2  ".into()),
            },
        )
        .unwrap();
        assert_eq!(planned.status, Resolved);
        assert_eq!(planned.response.as_deref(), Some("Fixed in 1.4.2"));
    }

    #[test]
    fn test_status_only_update_keeps_response() {
        let planned = plan_update(
            New,
            Some("On it".into()),
            QueryUpdate {
                status: Some(InProgress),
                response: None,
            },
        )
        .unwrap();
        assert_eq!(planned.status, InProgress);
        assert_eq!(planned.response.as_deref(), Some("On it"));
    }

    #[test]
    fn test_empty_response_clears() {
        let planned = plan_update(
            New,
            Some("draft".into()),
            QueryUpdate {
                status: None,
                response: Some(String::new()),
            },
        )
        .unwrap();
        assert!(planned.response.is_none());
    }

    #[test]
    fn test_empty_update_rejected() {
        assert!(matches!(
            plan_update(New, None, QueryUpdate::default()),
            Err(ApiError::BadRequest(_))
        ));
    }
}
