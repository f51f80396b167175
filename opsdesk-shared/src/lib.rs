//! # OpsDesk Shared Library
//!
//! Types, persistence, and access rules shared by the OpsDesk API server.
//!
//! ## Module Organization
//!
//! - `db`: Connection pool and embedded migrations
//! - `models`: Row types and their queries (users, roles, budgets, invoices, tasks, notes)
//! - `auth`: Tokens, password hashing, identity resolution, and the access policy table
//! - `dashboard`: Cross-resource aggregation for the dashboard view

pub mod auth;
pub mod dashboard;
pub mod db;
pub mod models;

/// Current version of the OpsDesk shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
