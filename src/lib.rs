// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Eravat sync agent: offline queueing for elephant activity reports
//!
//! This crate provides the local agent the field app talks to: it queues
//! reports while the device is offline, drains them to the Supabase backend
//! when connectivity returns, and decodes the PostGIS polygons used by the
//! beat maps.

pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
pub mod time_utils;

use config::Config;
use services::{NetworkMonitor, SupabaseClient, SyncEngine};
use store::ReportStore;

/// Sync engine as wired in the agent.
pub type AgentSyncEngine = SyncEngine<ReportStore, SupabaseClient>;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub network: NetworkMonitor,
    pub sync: std::sync::Arc<AgentSyncEngine>,
}
