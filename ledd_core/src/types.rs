//! Core domain types for the LEDD calculator.
//!
//! This module defines the fundamental types used throughout the system:
//! - Drug catalog entries and their conversion parameters
//! - Prescription lines and the patient time profile
//! - LEDD summaries, warnings and synthesized plans

use crate::time::{format_hhmm, hhmm, hhmm_opt};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of explicit administration times on one prescription line
pub const MAX_ADMINISTRATION_TIMES: usize = 5;

/// Upper bound on administrations per day for one prescription line
pub const MAX_DAILY_FREQUENCY: u32 = 24;

// ============================================================================
// Drug Catalog Types
// ============================================================================

/// Pharmacological class of a drug
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum DrugCategory {
    Ldopa,
    Agonist,
    Maob,
    Comt,
    Other,
}

impl DrugCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DrugCategory::Ldopa => "LDOPA",
            DrugCategory::Agonist => "AGONIST",
            DrugCategory::Maob => "MAOB",
            DrugCategory::Comt => "COMT",
            DrugCategory::Other => "OTHER",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "LDOPA" | "L-DOPA" => Some(DrugCategory::Ldopa),
            "AGONIST" => Some(DrugCategory::Agonist),
            "MAOB" | "MAO-B" => Some(DrugCategory::Maob),
            "COMT" => Some(DrugCategory::Comt),
            "OTHER" => Some(DrugCategory::Other),
            _ => None,
        }
    }

    /// Summary bucket a directly converted dose of this class lands in
    pub fn bucket(&self) -> LeddBucket {
        match self {
            DrugCategory::Ldopa => LeddBucket::Ldopa,
            DrugCategory::Agonist => LeddBucket::Agonist,
            DrugCategory::Maob | DrugCategory::Comt | DrugCategory::Other => LeddBucket::Other,
        }
    }
}

impl fmt::Display for DrugCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three LEDD summary buckets
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeddBucket {
    Ldopa,
    Agonist,
    Other,
}

/// How a drug's dose converts into LEDD
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeddMode {
    /// dose × frequency × factor
    Direct,
    /// Scales the concurrent levodopa total instead of contributing itself
    MultiplyLdopa,
    /// Constant contribution regardless of dose
    Fixed,
}

impl LeddMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeddMode::Direct => "DIRECT",
            LeddMode::MultiplyLdopa => "MULTIPLY_LDOPA",
            LeddMode::Fixed => "FIXED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DIRECT" => Some(LeddMode::Direct),
            "MULTIPLY_LDOPA" => Some(LeddMode::MultiplyLdopa),
            "FIXED" => Some(LeddMode::Fixed),
            _ => None,
        }
    }
}

/// Release characteristics derived from the catalog identity
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReleaseProfile {
    Immediate,
    Extended,
}

const EXTENDED_ID_SUFFIXES: [&str; 4] = ["_ER", "_CR", "_LA", "_PATCH"];
const EXTENDED_NAME_MARKERS: [&str; 2] = ["(ER)", "(CR)"];

/// One row of the drug catalog
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DrugEntry {
    pub id: String,
    pub display_name: String,
    pub category: DrugCategory,
    pub unit: String,
    pub ledd_mode: LeddMode,
    pub ledd_factor: f64,
    pub ldopa_multiplier: f64,
    pub max_single_dose: f64,
    pub max_daily_dose: f64,
    pub warnings: String,
    pub active: bool,
}

impl DrugEntry {
    pub fn release_profile(&self) -> ReleaseProfile {
        let id = self.id.to_uppercase();
        let extended = EXTENDED_ID_SUFFIXES.iter().any(|s| id.ends_with(s))
            || EXTENDED_NAME_MARKERS
                .iter()
                .any(|m| self.display_name.contains(m));
        if extended {
            ReleaseProfile::Extended
        } else {
            ReleaseProfile::Immediate
        }
    }

    /// Short-acting levodopa: the doses OFF-period retiming applies to
    pub fn is_short_acting_ldopa(&self) -> bool {
        self.category == DrugCategory::Ldopa && self.release_profile() == ReleaseProfile::Immediate
    }
}

// ============================================================================
// Prescription and Patient Types
// ============================================================================

/// One line of the prescription table
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PrescriptionLine {
    pub drug_id: String,
    /// Amount per administration, in the catalog unit
    pub dose: f64,
    /// Administrations per day
    pub frequency: u32,
    #[serde(default)]
    pub times: Vec<NaiveTime>,
    #[serde(default)]
    pub notes: String,
}

impl PrescriptionLine {
    pub fn new(drug_id: impl Into<String>, dose: f64, frequency: u32) -> Self {
        Self {
            drug_id: drug_id.into(),
            dose,
            frequency,
            times: Vec::new(),
            notes: String::new(),
        }
    }

    pub fn with_times(mut self, times: Vec<NaiveTime>) -> Self {
        self.times = times;
        self
    }

    /// Frequency used for arithmetic; an unset frequency counts as once daily
    pub fn effective_frequency(&self) -> u32 {
        self.frequency.max(1)
    }

    /// dose × frequency
    pub fn daily_amount(&self) -> f64 {
        self.dose * f64::from(self.effective_frequency())
    }

    /// A zero-dose line administers nothing
    pub fn is_inert(&self) -> bool {
        self.dose <= 0.0
    }
}

/// Optional meal times used as OFF-period anchors
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct MealTimes {
    #[serde(default, with = "hhmm_opt", skip_serializing_if = "Option::is_none")]
    pub breakfast: Option<NaiveTime>,
    #[serde(default, with = "hhmm_opt", skip_serializing_if = "Option::is_none")]
    pub lunch: Option<NaiveTime>,
    #[serde(default, with = "hhmm_opt", skip_serializing_if = "Option::is_none")]
    pub dinner: Option<NaiveTime>,
}

impl MealTimes {
    /// Present meals in breakfast, lunch, dinner order
    pub fn present(&self) -> Vec<(Meal, NaiveTime)> {
        [
            (Meal::Breakfast, self.breakfast),
            (Meal::Lunch, self.lunch),
            (Meal::Dinner, self.dinner),
        ]
        .into_iter()
        .filter_map(|(meal, time)| time.map(|t| (meal, t)))
        .collect()
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Meal {
    Breakfast,
    Lunch,
    Dinner,
}

impl Meal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Meal::Breakfast => "breakfast",
            Meal::Lunch => "lunch",
            Meal::Dinner => "dinner",
        }
    }
}

/// Symptom signals entered by the clinician
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SymptomFlags {
    #[serde(default)]
    pub wearing_off: bool,
    #[serde(default)]
    pub dyskinesia: bool,
    /// Morning OFF / delayed ON
    #[serde(default)]
    pub morning_off: bool,
    /// Nocturnal or early-morning OFF
    #[serde(default)]
    pub nocturnal_off: bool,
    #[serde(default)]
    pub reduce_dose_count: bool,
    /// Somnolence or psychiatric concern
    #[serde(default)]
    pub somnolence_or_psychiatric: bool,
}

/// Hourly symptom record: which clock hours (0-23) were spent OFF or dyskinetic
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SymptomTimeline {
    #[serde(default)]
    pub off_hours: Vec<u8>,
    #[serde(default)]
    pub dyskinesia_hours: Vec<u8>,
}

impl SymptomTimeline {
    pub fn is_empty(&self) -> bool {
        self.off_hours.is_empty() && self.dyskinesia_hours.is_empty()
    }

    /// First hour of each run of consecutive OFF hours, ascending
    pub fn off_onsets(&self) -> Vec<u8> {
        let mut hours: Vec<u8> = self.off_hours.iter().copied().filter(|h| *h < 24).collect();
        hours.sort_unstable();
        hours.dedup();

        let mut onsets = Vec::new();
        let mut previous: Option<u8> = None;
        for hour in hours {
            if previous.map_or(true, |p| p + 1 != hour) {
                onsets.push(hour);
            }
            previous = Some(hour);
        }
        onsets
    }
}

/// Patient day profile
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct PatientProfile {
    #[serde(default, with = "hhmm_opt", skip_serializing_if = "Option::is_none")]
    pub wake: Option<NaiveTime>,
    #[serde(default, with = "hhmm_opt", skip_serializing_if = "Option::is_none")]
    pub sleep: Option<NaiveTime>,
    #[serde(default)]
    pub meals: MealTimes,
    #[serde(default)]
    pub symptoms: SymptomFlags,
    #[serde(default, skip_serializing_if = "SymptomTimeline::is_empty")]
    pub timeline: SymptomTimeline,
}

// ============================================================================
// LEDD Output Types
// ============================================================================

/// LEDD totals for one recalculation
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct LeddSummary {
    /// Levodopa total after COMT multipliers
    pub ldopa_adjusted: f64,
    pub agonist: f64,
    /// MAO-B, other agents and fixed contributions
    pub other: f64,
    pub total: f64,
}

/// Derived LEDD and Category cells for one prescription line
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LineLedd {
    pub line: usize,
    pub drug_id: String,
    pub ledd: f64,
    pub category: Option<DrugCategory>,
}

// ============================================================================
// Warnings
// ============================================================================

/// Non-fatal findings attached to a recalculation.
///
/// None of these change a clinician-entered value; they are annotations only.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    UnknownDrug {
        line: usize,
        drug_id: String,
    },
    InactiveDrug {
        line: usize,
        drug_id: String,
    },
    SingleDoseExceeded {
        line: usize,
        drug_id: String,
        dose: f64,
        max: f64,
    },
    DailyDoseExceeded {
        drug_id: String,
        total: f64,
        max: f64,
    },
    ComtWithoutLdopa {
        line: usize,
        drug_id: String,
    },
    ExtraTimesIgnored {
        line: usize,
        drug_id: String,
        frequency: u32,
        times: usize,
    },
    ClampedToBounds {
        strategy: Strategy,
        drug_id: String,
        #[serde(with = "hhmm")]
        requested: NaiveTime,
        #[serde(with = "hhmm")]
        clamped: NaiveTime,
    },
    AgonistWithSomnolence {
        line: usize,
        drug_id: String,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnknownDrug { line, drug_id } => write!(
                f,
                "line {}: unknown drug '{}' (excluded from scheduling, no LEDD contribution)",
                line + 1,
                drug_id
            ),
            Warning::InactiveDrug { line, drug_id } => write!(
                f,
                "line {}: '{}' is no longer in the active catalog",
                line + 1,
                drug_id
            ),
            Warning::SingleDoseExceeded {
                line,
                drug_id,
                dose,
                max,
            } => write!(
                f,
                "line {}: {} single dose {} exceeds maximum {}",
                line + 1,
                drug_id,
                dose,
                max
            ),
            Warning::DailyDoseExceeded {
                drug_id,
                total,
                max,
            } => write!(
                f,
                "{} daily total {} exceeds maximum {} (manual review required)",
                drug_id, total, max
            ),
            Warning::ComtWithoutLdopa { line, drug_id } => write!(
                f,
                "line {}: COMT-class drug {} without concurrent LDOPA (no LEDD contribution)",
                line + 1,
                drug_id
            ),
            Warning::ExtraTimesIgnored {
                line,
                drug_id,
                frequency,
                times,
            } => write!(
                f,
                "line {}: {} has {} administration times for frequency {}; extra times not scheduled",
                line + 1,
                drug_id,
                times,
                frequency
            ),
            Warning::ClampedToBounds {
                strategy,
                drug_id,
                requested,
                clamped,
            } => write!(
                f,
                "{}: {} at {} moved to {} (outside wake/sleep window)",
                strategy.label(),
                drug_id,
                format_hhmm(*requested),
                format_hhmm(*clamped)
            ),
            Warning::AgonistWithSomnolence { line, drug_id } => write!(
                f,
                "line {}: agonist {} with somnolence/psychiatric concern; increases not advised, consider reduction",
                line + 1,
                drug_id
            ),
        }
    }
}

// ============================================================================
// Schedule Types
// ============================================================================

/// Placement strategy identifier
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Strategy {
    A,
    B,
    C,
}

impl Strategy {
    pub fn label(&self) -> &'static str {
        match self {
            Strategy::A => "Plan A",
            Strategy::B => "Plan B",
            Strategy::C => "Plan C",
        }
    }
}

/// Why a slot sits where it does
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SlotComment {
    PrescribedTime,
    BeforeMeal { meal: Meal },
    BeforeSleep,
    BeforeOffPeriod { hour: u8 },
    MorningOff,
    WidenedSpacing,
    SplitDose { part: u32, of: u32 },
    Consolidated,
    ClampedToBounds {
        #[serde(with = "hhmm")]
        requested: NaiveTime,
    },
    ReviewRequired,
}

impl fmt::Display for SlotComment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotComment::PrescribedTime => f.write_str("prescribed time"),
            SlotComment::BeforeMeal { meal } => write!(f, "before {}", meal.as_str()),
            SlotComment::BeforeSleep => f.write_str("before sleep"),
            SlotComment::BeforeOffPeriod { hour } => {
                write!(f, "before recorded OFF at {:02}:00", hour)
            }
            SlotComment::MorningOff => f.write_str("on waking (morning OFF)"),
            SlotComment::WidenedSpacing => f.write_str("widened spacing"),
            SlotComment::SplitDose { part, of } => {
                write!(f, "split {}/{} (single-dose limit)", part, of)
            }
            SlotComment::Consolidated => f.write_str("consolidated"),
            SlotComment::ClampedToBounds { requested } => {
                write!(f, "clamped from {}", format_hhmm(*requested))
            }
            SlotComment::ReviewRequired => f.write_str("review required: daily maximum exceeded"),
        }
    }
}

/// One administration in a plan
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ScheduleSlot {
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub drug_id: String,
    pub display_name: String,
    pub dose: f64,
    #[serde(default)]
    pub comments: Vec<SlotComment>,
}

impl ScheduleSlot {
    pub fn comment_text(&self) -> String {
        self.comments
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn has_comment(&self, comment: &SlotComment) -> bool {
        self.comments.contains(comment)
    }
}

/// Plan-level remarks
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlanNote {
    /// No symptom flag applies to this strategy; the plan mirrors the even split
    NoTriggeringSymptoms,
    DyskinesiaOverridesConsolidation,
    MorningOffExtraDose { drug_id: String },
    MorningOffShiftedDose { drug_id: String },
    MorningOffAlreadyCovered { drug_id: String },
}

impl fmt::Display for PlanNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanNote::NoTriggeringSymptoms => {
                f.write_str("no triggering symptoms; timing follows the even split")
            }
            PlanNote::DyskinesiaOverridesConsolidation => f.write_str(
                "dyskinesia and dose-count reduction both set; peak suppression takes priority",
            ),
            PlanNote::MorningOffExtraDose { drug_id } => write!(
                f,
                "extra {} dose added on waking for morning OFF; other doses spread after it",
                drug_id
            ),
            PlanNote::MorningOffShiftedDose { drug_id } => write!(
                f,
                "first {} dose moved to waking for morning OFF (no headroom for an extra dose)",
                drug_id
            ),
            PlanNote::MorningOffAlreadyCovered { drug_id } => {
                write!(f, "a {} dose already falls on waking; kept for morning OFF", drug_id)
            }
        }
    }
}

/// A named, time-ordered dosing timetable
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    pub strategy: Strategy,
    pub title: String,
    pub slots: Vec<ScheduleSlot>,
    #[serde(default)]
    pub notes: Vec<PlanNote>,
}

/// The proposal: always all three plans together
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PlanSet {
    pub plan_a: Plan,
    pub plan_b: Plan,
    pub plan_c: Plan,
}

impl PlanSet {
    pub fn iter(&self) -> impl Iterator<Item = &Plan> {
        [&self.plan_a, &self.plan_b, &self.plan_c].into_iter()
    }
}
