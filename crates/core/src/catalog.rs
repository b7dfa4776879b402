//! Catalog browsing: sort orders, filter validation and pagination clamps.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::MinorUnits;

/// Default page size for catalog listings.
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Maximum page size for any listing.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Maximum length of the free-text search term.
pub const MAX_QUERY_LENGTH: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Actively promoted studios first (by boost), then by rating.
    #[default]
    Recommended,
    PriceAsc,
    PriceDesc,
    Rating,
    Newest,
}

impl FromStr for SortOrder {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "recommended" => Ok(SortOrder::Recommended),
            "price_asc" => Ok(SortOrder::PriceAsc),
            "price_desc" => Ok(SortOrder::PriceDesc),
            "rating" => Ok(SortOrder::Rating),
            "newest" => Ok(SortOrder::Newest),
            other => Err(CoreError::Validation(format!(
                "Unknown sort order '{other}'. Must be one of: recommended, price_asc, price_desc, rating, newest"
            ))),
        }
    }
}

/// Validated catalog filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogFilter {
    pub city: Option<String>,
    pub min_price: Option<MinorUnits>,
    pub max_price: Option<MinorUnits>,
    pub min_capacity: Option<i32>,
    pub query: Option<String>,
    pub sort: SortOrder,
}

impl CatalogFilter {
    /// Build a filter from raw query parameters, normalizing blanks to `None`.
    pub fn parse(
        city: Option<&str>,
        min_price: Option<MinorUnits>,
        max_price: Option<MinorUnits>,
        min_capacity: Option<i32>,
        query: Option<&str>,
        sort: Option<&str>,
    ) -> Result<Self, CoreError> {
        let city = non_blank(city);
        let query = non_blank(query);

        if min_price.is_some_and(|p| p < 0) || max_price.is_some_and(|p| p < 0) {
            return Err(CoreError::Validation("Prices must not be negative".into()));
        }
        if let (Some(min), Some(max)) = (min_price, max_price) {
            if min > max {
                return Err(CoreError::Validation(
                    "min_price must not exceed max_price".into(),
                ));
            }
        }
        if min_capacity.is_some_and(|c| c < 1) {
            return Err(CoreError::Validation(
                "min_capacity must be at least 1".into(),
            ));
        }
        if query
            .as_deref()
            .is_some_and(|q| q.chars().count() > MAX_QUERY_LENGTH)
        {
            return Err(CoreError::Validation(format!(
                "Search query must not exceed {MAX_QUERY_LENGTH} characters"
            )));
        }
        let sort = match sort.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => s.parse()?,
            None => SortOrder::default(),
        };

        Ok(Self {
            city,
            min_price,
            max_price,
            min_capacity,
            query,
            sort,
        })
    }

    /// Stable string for cache keys.
    ///
    /// JSON-encoded, so user-supplied text cannot forge another filter's key.
    pub fn cache_key(&self, limit: i64, offset: i64) -> String {
        serde_json::json!([
            self.city,
            self.min_price,
            self.max_price,
            self.min_capacity,
            self.query,
            self.sort,
            limit,
            offset,
        ])
        .to_string()
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Clamp a user-provided limit to `[1, max]`, using `default` when absent.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).max(1).min(max)
}

/// Clamp a user-provided offset to non-negative.
pub fn clamp_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}
