/// Page/limit parsing and the pagination envelope shared by search and activity

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 20;

/// Requested page, always valid (both fields >= 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    /// Parses raw query values; missing, non-numeric or non-positive input
    /// falls back to the defaults instead of failing
    pub fn parse(page: Option<&str>, limit: Option<&str>) -> Self {
        Self {
            page: parse_positive(page).unwrap_or(DEFAULT_PAGE),
            limit: parse_positive(limit).unwrap_or(DEFAULT_LIMIT),
        }
    }

    /// Rows to skip
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

fn parse_positive(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|v| *v >= 1)
}

/// Pagination metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(request: PageRequest, total: i64) -> Self {
        let total_pages = if total <= 0 {
            0
        } else {
            (total + request.limit - 1) / request.limit
        };

        Self {
            page: request.page,
            limit: request.limit,
            total,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        assert_eq!(PageRequest::parse(None, None), PageRequest::default());
        assert_eq!(
            PageRequest::parse(Some("abc"), Some("")),
            PageRequest { page: 1, limit: 20 }
        );
        assert_eq!(
            PageRequest::parse(Some("0"), Some("-5")),
            PageRequest { page: 1, limit: 20 }
        );
        assert_eq!(
            PageRequest::parse(Some("3"), Some("10")),
            PageRequest { page: 3, limit: 10 }
        );
    }

    #[test]
    fn test_offset() {
        assert_eq!(PageRequest { page: 1, limit: 20 }.offset(), 0);
        assert_eq!(PageRequest { page: 3, limit: 10 }.offset(), 20);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        assert_eq!(Pagination::new(PageRequest { page: 1, limit: 20 }, 25).total_pages, 2);
        assert_eq!(Pagination::new(PageRequest { page: 1, limit: 10 }, 30).total_pages, 3);
        assert_eq!(Pagination::new(PageRequest { page: 1, limit: 10 }, 31).total_pages, 4);
        assert_eq!(Pagination::new(PageRequest::default(), 0).total_pages, 0);
    }

    #[test]
    fn test_envelope_field_names() {
        let json = serde_json::to_value(Pagination::new(PageRequest::default(), 25)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "page": 1, "limit": 20, "total": 25, "totalPages": 2 })
        );
    }
}
