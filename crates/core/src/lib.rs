//! Core library for weathertools
//!
//! This crate implements the **Functional Core** of the weathertools
//! application, following the Functional Core - Imperative Shell pattern.
//!
//! - **`weathertools_core`** (this crate): pure transformation functions with
//!   zero I/O. Query validation/normalization, upstream payload modeling,
//!   response classification and report shaping all live here.
//! - **`weathertools`**: I/O operations and orchestration (the Imperative
//!   Shell) — the HTTP call to OpenWeatherMap, the CLI and the MCP server.
//!
//! All functions in this crate are deterministic and side-effect free, so
//! they are tested with simple fixture data and no mocking.
//!
//! # Module Organization
//!
//! - [`query`]: lookup-mode validation and canonical query construction
//! - [`weather`]: upstream payload model and report transformation
//! - [`error`]: classified failures and their stable error payloads

pub mod error;
pub mod query;
pub mod weather;
