//! # OpsDesk API Server Library
//!
//! HTTP surface of OpsDesk: budgets, invoices, tasks, notes, the team
//! roster, and a per-caller dashboard, all behind bearer-token identity and
//! the role policy from `opsdesk-shared`.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `bootstrap`: First-lead seeding at startup
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Identity resolution and preflight handling
//! - `routes`: API route handlers

pub mod app;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
