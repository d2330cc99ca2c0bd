//! Carrel - moderation and audit core for a student note-sharing platform
//!
//! Students upload and request study materials; administrators moderate
//! them from a dashboard that sees every action land in an append-only
//! audit trail. Carrel owns the lifecycle state machines, the ordered
//! side-effect sequencing behind every privileged action, the operator
//! notification fan-out, and the live bounded feeds, over a pluggable
//! document store.
//!
//! ## Services
//!
//! - **Moderation**: note, request, and user state machines behind one
//!   admin capability gate
//! - **Sequencer**: ordered writes (state, point award, audit record) with
//!   partial-failure reporting instead of rollback
//! - **Content**: uploads, requests, engagement counters, bookmarks, and
//!   profile sync, each with operator notification fan-out
//! - **Feeds**: live bounded audit and notification views for the
//!   dashboard, over HTTP and WebSocket

pub mod config;
pub mod content;
pub mod db;
pub mod feed;
pub mod moderation;
pub mod notify;
pub mod routes;
pub mod server;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{CarrelError, Result};
