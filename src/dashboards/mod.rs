//! Aggregates shown on the admin dashboard.
//!
//! These work on the rows of the page already loaded by the client, not on
//! the full tables; `/api/admin/stats` covers the table-wide totals.

use serde::Serialize;

use crate::core::shared::enums::QueryStatus;
use crate::queries::models::Feedback;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusShare {
    pub status: QueryStatus,
    pub count: usize,
    /// 0 to 100, rounded to one decimal.
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBreakdown {
    pub total: usize,
    pub shares: Vec<StatusShare>,
}

impl StatusBreakdown {
    pub fn count(&self, status: QueryStatus) -> usize {
        self.shares
            .iter()
            .find(|s| s.status == status)
            .map(|s| s.count)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSummary {
    pub count: usize,
    pub average_satisfaction: Option<f64>,
    /// Share of answered `wouldRecommend` questions that said yes, `None`
    /// when no row on the page answered it.
    pub recommend_percent: Option<f64>,
    pub statuses: StatusBreakdown,
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 * 1000.0 / whole as f64).round() / 10.0
}

pub fn status_breakdown(statuses: &[QueryStatus]) -> StatusBreakdown {
    let total = statuses.len();
    let shares = QueryStatus::ALL
        .iter()
        .map(|&status| {
            let count = statuses.iter().filter(|s| **s == status).count();
            StatusShare {
                status,
                count,
                percent: percent(count, total),
            }
        })
        .collect();
    StatusBreakdown { total, shares }
}

/// Resolved rows over all rows, from 0.0 to 1.0.
pub fn resolution_rate(statuses: &[QueryStatus]) -> f64 {
    if statuses.is_empty() {
        return 0.0;
    }
    let resolved = statuses
        .iter()
        .filter(|s| **s == QueryStatus::Resolved)
        .count();
    resolved as f64 / statuses.len() as f64
}

pub fn feedback_summary(rows: &[Feedback]) -> FeedbackSummary {
    let average_satisfaction = (!rows.is_empty()).then(|| {
        let sum: i64 = rows.iter().map(|f| i64::from(f.satisfaction)).sum();
        ((sum as f64 / rows.len() as f64) * 100.0).round() / 100.0
    });
    let answered: Vec<bool> = rows.iter().filter_map(|f| f.would_recommend).collect();
    let yes = answered.iter().filter(|r| **r).count();
    let statuses: Vec<QueryStatus> = rows.iter().map(|f| f.status).collect();

    FeedbackSummary {
        count: rows.len(),
        average_satisfaction,
        recommend_percent: (!answered.is_empty()).then(|| percent(yes, answered.len())),
        statuses: status_breakdown(&statuses),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn feedback(satisfaction: i32, would_recommend: Option<bool>, status: QueryStatus) -> Feedback {
        let now = Utc::now();
        Feedback {
            id: Uuid::new_v4(),
            name: "Ana".into(),
            email: "ana@zelene.dev".into(),
            category: "ui".into(),
            satisfaction,
            would_recommend,
            message: "Works well for our team.".into(),
            status,
            response: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_empty_page_has_zero_percentages() {
        let breakdown = status_breakdown(&[]);
        assert_eq!(breakdown.total, 0);
        assert!(breakdown.shares.iter().all(|s| s.percent == 0.0));
        assert_eq!(resolution_rate(&[]), 0.0);

        let summary = feedback_summary(&[]);
        assert_eq!(summary.average_satisfaction, None);
        assert_eq!(summary.recommend_percent, None);
    }

    #[test]
    fn test_unanswered_recommend_is_absent_not_zero() {
        let rows = vec![
            feedback(4, None, QueryStatus::New),
            feedback(2, None, QueryStatus::Resolved),
        ];
        let summary = feedback_summary(&rows);
        assert_eq!(summary.average_satisfaction, Some(3.0));
        assert_eq!(summary.recommend_percent, None);

        let json = serde_json::to_value(&summary).unwrap();
        assert!(json["recommendPercent"].is_null());

        let one_no = feedback_summary(&[feedback(1, Some(false), QueryStatus::New)]);
        assert_eq!(one_no.recommend_percent, Some(0.0));
    }

    #[test]
    fn test_breakdown_percentages() {
        use QueryStatus::*;
        let breakdown = status_breakdown(&[New, New, Resolved]);
        assert_eq!(breakdown.count(New), 2);
        assert_eq!(breakdown.count(Cancelled), 0);
        let new_share = breakdown.shares.iter().find(|s| s.status == New).unwrap();
        assert_eq!(new_share.percent, 66.7);
        assert!((resolution_rate(&[New, New, Resolved]) - 1.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_feedback_summary() {
        let rows = vec![
            feedback(5, Some(true), QueryStatus::Resolved),
            feedback(0, Some(false), QueryStatus::New),
            feedback(4, None, QueryStatus::New),
        ];
        let summary = feedback_summary(&rows);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.average_satisfaction, Some(3.0));
        assert_eq!(summary.recommend_percent, Some(50.0));
        assert_eq!(summary.statuses.count(QueryStatus::New), 2);
    }
}
