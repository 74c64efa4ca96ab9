//! # Stuck Monitor
//!
//! Operational visibility for the link ingestion pipeline: which records are
//! stuck before each processing stage, and how many.
//!
//! Each stage check is a read-only query against the `links` collection for
//! records whose `download_analysis.<stage>.processing_done` flag is still
//! `false`. The server returns the true count plus a capped sample; consumers
//! filter that sample by country, classify stage health, and export CSV.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────────┐
//! │ MongoDB  │◀──│  LinkStore   │◀──│ HTTP server  │  GET /checks/stuck-in-*
//! │  links   │   │ count+sample │   │   (axum)     │
//! └──────────┘   └──────────────┘   └──────┬───────┘
//!                                          │ JSON { total, results }
//!                      ┌───────────────────┤
//!                      ▼                   ▼
//!                ┌───────────┐       ┌────────────┐
//!                │ StageView │       │ Aggregator │
//!                │ filter/CSV│       │  summary   │
//!                └───────────┘       └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! stuckmon serve                                  # start the checks API
//! stuckmon dashboard                              # all stages at a glance
//! stuckmon report website-scraping --country DE   # one stage, filtered
//! stuckmon export general-file-parser --out-dir ./exports
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`stage`] | Pipeline stages and their query definitions |
//! | [`models`] | Link projections and stuck reports |
//! | [`store`] | Store trait, MongoDB and in-memory backends |
//! | [`db`] | MongoDB connection |
//! | [`report`] | Count + sample core, report sources |
//! | [`server`] | HTTP checks API |
//! | [`client`] | HTTP client for the checks API |
//! | [`filter`] | Country filter and health tiers |
//! | [`export`] | CSV rendering, parsing, and filenames |
//! | [`dashboard`] | Concurrent aggregation and stage view state |
//! | [`cli`] | Terminal output for `stuckmon` |

pub mod cli;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod export;
pub mod filter;
pub mod models;
pub mod report;
pub mod server;
pub mod stage;
pub mod store;
