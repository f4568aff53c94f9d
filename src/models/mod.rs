// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod queued;
pub mod report;

pub use queued::{QueuedReport, ReportStatus};
pub use report::{ActivityReport, IndirectSightingType, LossType, ObservationType, ReportError};
