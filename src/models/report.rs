// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Elephant activity report submitted from the field form.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// A single field observation, as inserted into the `activity_reports` table.
///
/// The queue treats this as an opaque payload; only the submission path
/// looks inside it (via [`ActivityReport::check`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivityReport {
    /// Auth user id of the reporter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Date of the observation (YYYY-MM-DD)
    pub activity_date: NaiveDate,
    /// Local time of the observation ("HH:MM")
    pub activity_time: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation_type: Option<ObservationType>,

    // ─── Direct sighting ─────────────────────────────────────────
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_elephants: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub male_elephants: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub female_elephants: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unknown_elephants: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calves: Option<u32>,

    // ─── Indirect sighting / loss ────────────────────────────────
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indirect_sighting_type: Option<IndirectSightingType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loss_type: Option<LossType>,

    /// Bearing from the observer to the herd, in degrees
    #[validate(range(min = 0.0, max = 360.0))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compass_bearing: Option<f64>,
    /// Storage URL of an uploaded photo
    #[validate(url)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[validate(length(max = 2000))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// How the elephants were observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum ObservationType {
    Direct,
    Indirect,
    Loss,
}

/// Evidence type for an indirect sighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum IndirectSightingType {
    Pugmark,
    Dung,
    #[serde(rename = "Broken Branches")]
    BrokenBranches,
    Sound,
    Eyewitness,
}

/// Category of damage for a loss report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum LossType {
    #[serde(rename = "No loss")]
    NoLoss,
    #[serde(rename = "crop")]
    Crop,
    #[serde(rename = "livestock")]
    Livestock,
    #[serde(rename = "property")]
    Property,
    #[serde(rename = "fencing")]
    Fencing,
    #[serde(rename = "solar panels")]
    SolarPanels,
    #[serde(rename = "FD establishment")]
    FdEstablishment,
    Other,
}

impl ActivityReport {
    /// Validate the report before it is submitted or queued.
    pub fn check(&self) -> Result<(), ReportError> {
        self.validate()
            .map_err(|e| ReportError::Invalid(e.to_string()))?;

        if NaiveTime::parse_from_str(&self.activity_time, "%H:%M").is_err() {
            return Err(ReportError::Invalid(format!(
                "activity_time: expected HH:MM, got {:?}",
                self.activity_time
            )));
        }

        if self.observation_type == Some(ObservationType::Direct) {
            if let Some(total) = self.total_elephants {
                let sum = [
                    self.male_elephants,
                    self.female_elephants,
                    self.unknown_elephants,
                    self.calves,
                ]
                .iter()
                .map(|n| n.unwrap_or(0))
                .fold(0u32, u32::saturating_add);
                if sum != total {
                    return Err(ReportError::Invalid(format!(
                        "total_elephants: breakdown sums to {}, total is {}",
                        sum, total
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Report validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Invalid report: {0}")]
    Invalid(String),
}
