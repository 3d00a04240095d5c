//! API handlers module

pub mod auth;
pub mod health;
pub mod locations;
pub mod paper_types;
pub mod papers;
pub mod people;
pub mod roles;
pub mod tags;
pub mod users;

use serde::{Deserialize, Serialize};

const DEFAULT_PER_PAGE: u64 = 25;
const MAX_PER_PAGE: u64 = 100;

/// Page selection for list endpoints
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_page")]
    pub page: u64,

    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    DEFAULT_PER_PAGE
}

impl ListParams {
    /// Zero-based page index with per-page clamped to `1..=MAX_PER_PAGE`
    pub fn resolve(&self) -> (u64, u64) {
        (self.page.max(1) - 1, self.per_page.clamp(1, MAX_PER_PAGE))
    }
}

/// One page of a list response
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, params: ListParams, total: u64) -> Self {
        let (page, per_page) = params.resolve();
        Self {
            items,
            page: page + 1,
            per_page,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_params_clamp() {
        let params = ListParams { page: 0, per_page: 1000 };
        assert_eq!(params.resolve(), (0, MAX_PER_PAGE));

        let params = ListParams { page: 3, per_page: 0 };
        assert_eq!(params.resolve(), (2, 1));
    }

    #[test]
    fn test_paginated_reports_one_based_page() {
        let page = Paginated::new(vec![1, 2], ListParams { page: 2, per_page: 2 }, 5);
        assert_eq!(page.page, 2);
        assert_eq!(page.per_page, 2);
        assert_eq!(page.total, 5);
    }
}
