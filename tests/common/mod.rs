// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use chrono::NaiveDate;
use eravat_sync::config::Config;
use eravat_sync::models::{ActivityReport, ObservationType};
use eravat_sync::routes::create_router;
use eravat_sync::services::{
    NetworkMonitor, ReportSubmitter, RetryPolicy, SubmitError, SupabaseClient, SyncEngine,
};
use eravat_sync::store::{MemoryStore, ReportStore};
use eravat_sync::AppState;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A valid direct-sighting report, tagged through `notes` so mocks can tell
/// reports apart.
#[allow(dead_code)]
pub fn sample_report(tag: &str) -> ActivityReport {
    ActivityReport {
        user_id: Some("5f0c9a52-field-officer".to_string()),
        activity_date: NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
        activity_time: "06:45".to_string(),
        latitude: 21.25,
        longitude: 75.125,
        observation_type: Some(ObservationType::Direct),
        total_elephants: Some(3),
        male_elephants: Some(1),
        female_elephants: Some(1),
        unknown_elephants: Some(0),
        calves: Some(1),
        indirect_sighting_type: None,
        loss_type: None,
        compass_bearing: Some(90.0),
        photo_url: None,
        notes: Some(tag.to_string()),
    }
}

/// Scriptable submitter that records every call.
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct MockSubmitter {
    calls: Arc<Mutex<Vec<String>>>,
    failures: Arc<Mutex<HashMap<String, SubmitError>>>,
    delay: Arc<Mutex<Duration>>,
}

#[allow(dead_code)]
impl MockSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every submission of the report tagged `tag` fail with `err`.
    pub fn fail(&self, tag: &str, err: SubmitError) {
        self.failures.lock().unwrap().insert(tag.to_string(), err);
    }

    pub fn recover(&self, tag: &str) {
        self.failures.lock().unwrap().remove(tag);
    }

    /// Delay each submission (simulates a slow network).
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Tags of submitted reports, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl ReportSubmitter for MockSubmitter {
    async fn submit(&self, report: &ActivityReport) -> Result<(), SubmitError> {
        let tag = report.notes.clone().unwrap_or_default();
        self.calls.lock().unwrap().push(tag.clone());

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let failure = self.failures.lock().unwrap().get(&tag).cloned();
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[allow(dead_code)]
pub fn network_error() -> SubmitError {
    SubmitError::Network("connection refused".to_string())
}

#[allow(dead_code)]
pub fn validation_error() -> SubmitError {
    SubmitError::Rejected {
        status: 400,
        message: "invalid input value for enum observation_type".to_string(),
    }
}

/// Engine over an in-memory store and a mock submitter, online.
#[allow(dead_code)]
pub async fn test_engine(
    submitter: MockSubmitter,
    policy: RetryPolicy,
) -> SyncEngine<MemoryStore, MockSubmitter> {
    SyncEngine::open(
        MemoryStore::new(),
        submitter,
        NetworkMonitor::new(true, None),
        policy,
    )
    .await
    .expect("Failed to open test engine")
}

/// Create a test app with an offline network and an unreachable backend.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub async fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::default();
    let network = NetworkMonitor::new(false, None);
    let submitter = SupabaseClient::new(&config).expect("Failed to build client");

    let sync = SyncEngine::open(
        ReportStore::Memory(MemoryStore::new()),
        submitter,
        network.clone(),
        RetryPolicy::from_config(&config),
    )
    .await
    .expect("Failed to open sync engine");

    let state = Arc::new(AppState {
        config,
        network,
        sync: Arc::new(sync),
    });

    (create_router(state.clone()), state)
}
