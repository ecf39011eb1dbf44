//! Console E2E
//!
//! End-to-end scenarios for the identity server's login flow and admin
//! console, written as Gherkin features and executed by a cucumber harness
//! that drives Playwright from Rust.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                cucumber harness (tests/bdd.rs)              │
//! │    before hook -> ExecutionContext::setup                   │
//! │    steps       -> steps::* (&mut ExecutionContext, args)    │
//! │    after hook  -> screenshot on failure, teardown           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ExecutionContext   Uninitialized -> Ready -> TornDown      │
//! │    ├── EnvironmentConfig (config::EnvironmentResolver)      │
//! │    └── BrowserSession > BrowsingContext > Page (engine)     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  PlaywrightEngine   Node bridge, JSON lines over stdio      │
//! │    └── lighthouse   audits via Chromium's debugging port    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Run settings are read once from the environment ([`RunSettings::from_env`])
//! and shared by every scenario through a [`Harness`].

pub mod audit;
pub mod auth;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod locator;
pub mod playwright;
pub mod preflight;
pub mod reports;
pub mod settings;
pub mod steps;

#[cfg(test)]
mod fake;

pub use audit::{AuditCategory, AuditResult, Metric, ScoreSource, StoredScore};
pub use config::{EnvironmentConfig, EnvironmentResolver};
pub use context::{ExecutionContext, Harness};
pub use error::{ConfigError, E2eError, E2eResult};
pub use playwright::PlaywrightEngine;
pub use settings::{BrowserKind, ReportFormat, RunSettings};
