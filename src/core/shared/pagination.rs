use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Query-string parameters accepted by every cursor-paginated list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CursorParams {
    pub limit: Option<i64>,
    pub cursor: Option<Uuid>,
}

impl CursorParams {
    pub fn limit(&self) -> i64 {
        clamp_limit(self.limit)
    }
}

/// One page of results. `next_cursor` is the id of the first row that did not
/// fit, and is omitted when the listing is exhausted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<Uuid>,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
        }
    }
}

pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

/// Splits `limit + 1` fetched rows into a page.
///
/// Callers load one row more than requested; if it is present its id becomes
/// the cursor and the row itself is dropped from this page.
pub fn paginate<T>(mut rows: Vec<T>, limit: i64, id_of: impl Fn(&T) -> Uuid) -> Page<T> {
    let limit = limit.max(0) as usize;
    let next_cursor = if rows.len() > limit {
        let extra = rows.split_off(limit);
        extra.first().map(&id_of)
    } else {
        None
    };
    Page {
        items: rows,
        next_cursor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn test_cursor_is_first_unreturned_row() {
        let rows = ids(4);
        let page = paginate(rows.clone(), 3, |id| *id);
        assert_eq!(page.items, rows[..3].to_vec());
        assert_eq!(page.next_cursor, Some(rows[3]));
    }

    #[test]
    fn test_no_cursor_when_listing_exhausted() {
        let rows = ids(3);
        let page = paginate(rows.clone(), 3, |id| *id);
        assert_eq!(page.items.len(), 3);
        assert!(page.next_cursor.is_none());

        let short = paginate(ids(1), 3, |id| *id);
        assert_eq!(short.items.len(), 1);
        assert!(short.next_cursor.is_none());
    }

    #[test]
    fn test_never_more_than_limit_items() {
        for total in 0..8 {
            for limit in 1..5 {
                let page = paginate(ids(total), limit, |id| *id);
                assert!(page.items.len() <= limit as usize);
                assert_eq!(page.next_cursor.is_some(), total > limit as usize);
            }
        }
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None), DEFAULT_PAGE_SIZE);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(10_000)), MAX_PAGE_SIZE);
    }

    #[test]
    fn test_next_cursor_omitted_from_json() {
        let page: Page<u8> = Page {
            items: vec![1],
            next_cursor: None,
        };
        let json = serde_json::to_value(&page).unwrap();
        assert!(json.get("nextCursor").is_none());
    }
}
