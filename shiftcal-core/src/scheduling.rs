//! Scheduling resources: shifts, shift presets, and day notes.
//!
//! Every resource belongs to exactly one calendar; access is decided by the
//! resolver for that calendar, never per resource.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// A single scheduled shift on a calendar day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shift {
    pub id: String,
    pub calendar_id: String,
    pub date: NaiveDate,
    /// Missing times mean an all-day entry.
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub title: String,
    /// Preset this shift was stamped from, if any.
    pub preset_id: Option<String>,
    pub note: Option<String>,
    /// User who created the shift; `None` for guest/token writers.
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A reusable shift template (name, color, default times).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftPreset {
    pub id: String,
    pub calendar_id: String,
    pub name: String,
    pub color: String,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub created_at: DateTime<Utc>,
}

/// A free-form note attached to a calendar day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub calendar_id: String,
    pub date: NaiveDate,
    pub text: String,
    pub updated_at: DateTime<Utc>,
}
