//! Recalculation pipeline.
//!
//! One recalculation runs the four stages in a fixed order:
//! 1. Constraint validation against catalog limits
//! 2. LEDD aggregation
//! 3. Symptom advisories
//! 4. Schedule synthesis (Plans A, B, C)
//!
//! A synthesis failure is carried in the result instead of aborting, so the
//! LEDD summary and warnings are always available.

use crate::catalog::DrugCatalog;
use crate::config::ScheduleConfig;
use crate::error::ScheduleError;
use crate::ledd::aggregate;
use crate::schedule::synthesize;
use crate::types::*;
use crate::validate::{symptom_advisories, validate};

/// Everything one recalculation produces
#[derive(Clone, Debug, PartialEq)]
pub struct Recalculation {
    /// Derived LEDD and Category per prescription line
    pub lines: Vec<LineLedd>,
    pub summary: LeddSummary,
    /// Validation, then aggregation, then symptom, then synthesis warnings
    pub warnings: Vec<Warning>,
    /// Drugs above their daily maximum
    pub review_required: Vec<String>,
    pub plans: Result<PlanSet, ScheduleError>,
}

impl Recalculation {
    pub fn plans(&self) -> Option<&PlanSet> {
        self.plans.as_ref().ok()
    }
}

/// Recompute LEDD, warnings and schedule suggestions from scratch
///
/// Pure with respect to its inputs: the same prescription, profile and
/// catalog give the same result.
pub fn recalculate(
    catalog: &DrugCatalog,
    prescription: &[PrescriptionLine],
    profile: &PatientProfile,
    tuning: &ScheduleConfig,
) -> Recalculation {
    tracing::info!("Recalculating {} prescription lines", prescription.len());

    let validation = validate(prescription, catalog);
    let aggregation = aggregate(prescription, catalog);

    let mut warnings = validation.violations.clone();
    warnings.extend(aggregation.advisories);
    warnings.extend(symptom_advisories(prescription, catalog, &profile.symptoms));

    let plans = match synthesize(prescription, catalog, profile, &validation, tuning) {
        Ok(synthesis) => {
            warnings.extend(synthesis.warnings);
            Ok(synthesis.plans)
        }
        Err(e) => {
            tracing::warn!("Schedule synthesis skipped: {}", e);
            Err(e)
        }
    };

    tracing::info!(
        "Recalculated: total LEDD {:.1}, {} warnings",
        aggregation.summary.total,
        warnings.len()
    );

    Recalculation {
        lines: aggregation.lines,
        summary: aggregation.summary,
        warnings,
        review_required: validation.review_required,
        plans,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_default_catalog;
    use crate::logging::init_test;
    use crate::time::parse_hhmm;

    fn profile() -> PatientProfile {
        PatientProfile {
            wake: parse_hhmm("06:00"),
            sleep: parse_hhmm("23:00"),
            ..Default::default()
        }
    }

    #[test]
    fn test_recalculate_levodopa_with_entacapone() {
        init_test();
        let catalog = build_default_catalog();
        let lines = vec![
            PrescriptionLine::new("LDOPA_IR", 100.0, 4),
            PrescriptionLine::new("ENTACAPONE", 100.0, 4),
        ];

        let result = recalculate(&catalog, &lines, &profile(), &ScheduleConfig::default());

        assert!((result.summary.total - 532.0).abs() < 1e-9);
        assert!(result.warnings.is_empty());
        let plans = result.plans().unwrap();
        assert_eq!(plans.plan_a.slots.len(), 8);
    }

    #[test]
    fn test_missing_sleep_still_publishes_ledd() {
        init_test();
        let catalog = build_default_catalog();
        let lines = vec![PrescriptionLine::new("LDOPA_IR", 100.0, 3)];
        let mut p = profile();
        p.sleep = None;

        let result = recalculate(&catalog, &lines, &p, &ScheduleConfig::default());

        assert_eq!(result.summary.total, 300.0);
        assert_eq!(
            result.plans,
            Err(ScheduleError::MissingProfileAnchor { field: "sleep" })
        );
    }

    #[test]
    fn test_warning_order_is_stage_order() {
        init_test();
        let catalog = build_default_catalog();
        let lines = vec![
            PrescriptionLine::new("MYSTERY", 1.0, 1),
            PrescriptionLine::new("PRAMIPEXOLE", 0.5, 3),
            PrescriptionLine::new("ENTACAPONE", 100.0, 3),
        ];
        let mut p = profile();
        p.symptoms.somnolence_or_psychiatric = true;

        let result = recalculate(&catalog, &lines, &p, &ScheduleConfig::default());

        let kinds: Vec<_> = result
            .warnings
            .iter()
            .map(|w| match w {
                Warning::UnknownDrug { .. } => "unknown",
                Warning::ComtWithoutLdopa { .. } => "comt",
                Warning::AgonistWithSomnolence { .. } => "somnolence",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, vec!["unknown", "comt", "somnolence"]);
    }

    #[test]
    fn test_over_daily_maximum_is_reviewed_not_reduced() {
        init_test();
        let catalog = build_default_catalog();
        let lines = vec![PrescriptionLine::new("LDOPA_IR", 200.0, 7)];

        let result = recalculate(&catalog, &lines, &profile(), &ScheduleConfig::default());

        assert_eq!(result.review_required, vec!["LDOPA_IR".to_string()]);
        assert_eq!(result.summary.total, 1400.0);
        for plan in result.plans().unwrap().iter() {
            let daily: f64 = plan.slots.iter().map(|s| s.dose).sum();
            assert_eq!(daily, 1400.0, "{}", plan.title);
        }
    }

    #[test]
    fn test_recalculate_is_deterministic() {
        let catalog = build_default_catalog();
        let lines = vec![
            PrescriptionLine::new("LDOPA_IR", 150.0, 4),
            PrescriptionLine::new("OPICAPONE", 25.0, 1),
            PrescriptionLine::new("ROPINIROLE", 4.0, 3),
        ];
        let mut p = profile();
        p.meals.breakfast = parse_hhmm("07:30");
        p.symptoms.wearing_off = true;
        p.symptoms.reduce_dose_count = true;

        let first = recalculate(&catalog, &lines, &p, &ScheduleConfig::default());
        let second = recalculate(&catalog, &lines, &p, &ScheduleConfig::default());

        assert_eq!(first, second);
    }
}
