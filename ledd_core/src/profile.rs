//! Patient profile loader.
//!
//! The profile is a small JSON document:
//!
//! ```json
//! {
//!   "wake": "06:00",
//!   "sleep": "23:00",
//!   "meals": { "breakfast": "07:00", "lunch": "12:00", "dinner": "18:00" },
//!   "symptoms": { "wearing_off": true, "dyskinesia": false },
//!   "timeline": { "off_hours": [5, 6, 14], "dyskinesia_hours": [10] }
//! }
//! ```
//!
//! Every field is optional. Missing wake or sleep times do not fail the load;
//! they only stop schedule synthesis later on.

use crate::{Error, PatientProfile, Result};
use std::path::Path;

/// Load a patient profile from a JSON file
pub fn load_profile(path: &Path) -> Result<PatientProfile> {
    let contents = std::fs::read_to_string(path)?;
    let profile = parse_profile(&contents)
        .map_err(|e| Error::Input(format!("profile {:?}: {}", path, e)))?;

    let timeline = &profile.timeline;
    if let Some(hour) = timeline
        .off_hours
        .iter()
        .chain(&timeline.dyskinesia_hours)
        .find(|h| **h > 23)
    {
        return Err(Error::Input(format!(
            "profile {:?}: timeline hour {} is not a clock hour (0-23)",
            path, hour
        )));
    }

    tracing::info!(
        "Loaded profile: wake={:?} sleep={:?} meals={} off_hours={}",
        profile.wake,
        profile.sleep,
        profile.meals.present().len(),
        profile.timeline.off_hours.len()
    );
    Ok(profile)
}

fn parse_profile(contents: &str) -> std::result::Result<PatientProfile, serde_json::Error> {
    serde_json::from_str(contents)
}
