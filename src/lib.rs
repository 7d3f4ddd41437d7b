//! Offline-first record storage and synchronization for ClinicConnect.
//!
//! Local writes land in a durable store and a mutation queue; the
//! [`SyncManager`](application::services::SyncManager) replays the queue against the
//! clinic API and pulls server changes back into the store.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;
pub mod state;

pub use shared::{AppConfig, AppError, Result};
pub use state::AppState;
