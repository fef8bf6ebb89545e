//! New users, posts and queries per UTC day over the last week.

use axum::{extract::State, Json};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use diesel::prelude::*;
use serde::Serialize;
use std::sync::Arc;

use crate::core::shared::error::{ApiError, ApiResult};
use crate::core::shared::schema::{
    contact_queries, feedback, posts, support_requests, technical_issues, users,
};
use crate::core::shared::state::AppState;
use crate::core::shared::utils::with_conn;

pub const WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayStats {
    pub date: NaiveDate,
    pub users: i64,
    pub posts: i64,
    pub queries: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyTotals {
    pub users: i64,
    pub posts: i64,
    pub queries: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyStats {
    pub days: Vec<DayStats>,
    pub totals: WeeklyTotals,
}

/// The last `WINDOW_DAYS` UTC dates, oldest first, ending with today.
pub fn window_days(now: DateTime<Utc>) -> Vec<NaiveDate> {
    let today = now.date_naive();
    (0..WINDOW_DAYS)
        .rev()
        .map(|back| today - Duration::days(back))
        .collect()
}

pub fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let first = now.date_naive() - Duration::days(WINDOW_DAYS - 1);
    first.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// Counts timestamps per day; timestamps outside `days` are ignored.
pub fn bucket(days: &[NaiveDate], stamps: &[DateTime<Utc>]) -> Vec<i64> {
    let mut counts = vec![0; days.len()];
    for stamp in stamps {
        if let Some(idx) = days.iter().position(|d| *d == stamp.date_naive()) {
            counts[idx] += 1;
        }
    }
    counts
}

pub fn assemble(
    now: DateTime<Utc>,
    users: &[DateTime<Utc>],
    posts: &[DateTime<Utc>],
    queries: &[DateTime<Utc>],
) -> WeeklyStats {
    let days = window_days(now);
    let (u, p, q) = (bucket(&days, users), bucket(&days, posts), bucket(&days, queries));
    let days: Vec<DayStats> = days
        .into_iter()
        .enumerate()
        .map(|(i, date)| DayStats {
            date,
            users: u[i],
            posts: p[i],
            queries: q[i],
        })
        .collect();
    let totals = days.iter().fold(WeeklyTotals::default(), |mut acc, day| {
        acc.users += day.users;
        acc.posts += day.posts;
        acc.queries += day.queries;
        acc
    });
    WeeklyStats { days, totals }
}

macro_rules! created_since {
    ($conn:expr, $table:ident, $since:expr) => {
        $table::table
            .filter($table::created_at.ge($since))
            .select($table::created_at)
            .load::<DateTime<Utc>>($conn)
    };
}

pub fn load_weekly(conn: &mut PgConnection, now: DateTime<Utc>) -> Result<WeeklyStats, ApiError> {
    let since = window_start(now);
    let new_users = created_since!(conn, users, since)?;
    let new_posts = created_since!(conn, posts, since)?;
    let mut new_queries = created_since!(conn, contact_queries, since)?;
    new_queries.extend(created_since!(conn, feedback, since)?);
    new_queries.extend(created_since!(conn, support_requests, since)?);
    new_queries.extend(created_since!(conn, technical_issues, since)?);
    Ok(assemble(now, &new_users, &new_posts, &new_queries))
}

pub async fn get_weekly_stats(State(state): State<Arc<AppState>>) -> ApiResult<Json<WeeklyStats>> {
    let stats = with_conn(&state.conn, |conn| load_weekly(conn, Utc::now())).await?;
    Ok(Json(stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_window_is_seven_days_ending_today() {
        let days = window_days(at(2026, 3, 2, 10));
        assert_eq!(days.len(), 7);
        assert_eq!(days[0], NaiveDate::from_ymd_opt(2026, 2, 24).unwrap());
        assert_eq!(days[6], NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
        assert_eq!(window_start(at(2026, 3, 2, 10)), at(2026, 2, 24, 0));
    }

    #[test]
    fn test_buckets_by_utc_day() {
        let now = at(2026, 3, 2, 10);
        let stats = assemble(
            now,
            &[at(2026, 3, 2, 0), at(2026, 3, 2, 23), at(2026, 2, 24, 1)],
            &[at(2026, 2, 20, 12)],
            &[at(2026, 2, 28, 5)],
        );
        assert_eq!(stats.days[6].users, 2);
        assert_eq!(stats.days[0].users, 1);
        assert_eq!(stats.totals.posts, 0);
        assert_eq!(stats.days[4].queries, 1);
        assert_eq!(stats.totals, WeeklyTotals { users: 3, posts: 0, queries: 1 });
    }
}
