//! # seev
//!
//! An idempotent Markdown worklog. Each day is a `## YYYY-MM-DD` entry with
//! `### ` subsections; new content is merged into the matching subsections
//! without duplicating bullets, so the same write can be repeated safely.
//!
//! The merge engine itself (parse, merge, render, splice) lives in the
//! `seev-core` crate and does no I/O. This crate adds the file boundary,
//! configuration, git and conversation sources, the CLI and a JSON tool
//! server.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ git log     │──▶│  generate    │──▶│              │
//! │ SQLite conv │   └──────────────┘   │  journal     │──▶ WORKLOG.md
//! └─────────────┘   CLI / tools ──────▶│ (seev-core)  │
//!                                      └──────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | `seev.toml` parsing and path resolution |
//! | [`logging`] | stderr `tracing` subscriber |
//! | [`journal`] | Read, merge-write and append against the journal file |
//! | [`git`] | Commits for a date via `git log` |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`conversations`] | Conversation and message store |
//! | [`generate`] | Draft entries from commits and conversations |
//! | [`traits`] | `Tool` trait, built-in tools, registry |
//! | [`server`] | JSON HTTP tool server |

pub mod config;
pub mod conversations;
pub mod db;
pub mod generate;
pub mod git;
pub mod journal;
pub mod logging;
pub mod migrate;
pub mod server;
pub mod traits;
