// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod geometry;
pub mod network;
pub mod supabase;
pub mod sync;

pub use network::NetworkMonitor;
pub use supabase::{SubmitError, SupabaseClient};
pub use sync::{
    spawn_sync_loop, FlushOutcome, FlushReport, ReportSubmitter, RetryPolicy, SubmitOutcome,
    SyncEngine, SyncEvent, SyncStatus, SyncTrigger,
};
