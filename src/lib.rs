//! # Tech Radar
//!
//! A local technology radar for customer-experience teams.
//!
//! Free-text descriptions of tools are sent to a language model, which
//! returns a structured assessment (category, relevance and integration
//! scores, adoption ring, cost tier). Assessments are validated, stored in
//! SQLite, and served back as lists, search results, radar plots and
//! exports through a CLI and a JSON HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌────────────┐
//! │  Analyzer  │──▶│  Validation  │──▶│   SQLite   │
//! │ (Messages) │   │  + scoring   │   │ tools+FTS5 │
//! └────────────┘   └──────────────┘   └─────┬──────┘
//!                                           │
//!                       ┌───────────────────┤
//!                       ▼                   ▼
//!                  ┌──────────┐       ┌──────────┐
//!                  │   CLI    │       │   HTTP   │
//!                  │ (radar)  │       │  (axum)  │
//!                  └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! radar init
//! radar add "Intercom: conversational support platform" --url https://intercom.com
//! radar list --position Trial
//! radar search "call recordings"
//! radar radar --json
//! radar serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and weight normalization |
//! | [`models`] | Core data types |
//! | [`error`] | Analysis error taxonomy |
//! | [`llm`] | Model client trait, Anthropic client, retry policy |
//! | [`analyzer`] | Prompt construction and analysis |
//! | [`validate`] | Reply parsing and normalization |
//! | [`layout`] | Layout offsets and radar geometry |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema and SQL migration files |
//! | [`store`] | Tool persistence and search |
//! | [`export`] | CSV and JSON export |
//! | [`backup`] | Database snapshots |
//! | [`server`] | JSON HTTP API |
//! | [`logging`] | Tracing subscriber setup |

pub mod add;
pub mod analyzer;
pub mod backup;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod get;
pub mod layout;
pub mod list;
pub mod llm;
pub mod logging;
pub mod migrate;
pub mod models;
pub mod search;
pub mod server;
pub mod stats;
pub mod store;
pub mod validate;
