//! Constraint validation of a prescription against catalog limits.
//!
//! Violations are annotations, never corrections: the entered doses flow
//! through to LEDD and scheduling unchanged.

use crate::catalog::DrugCatalog;
use crate::types::*;

/// Outcome of validating a prescription
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Validation {
    pub violations: Vec<Warning>,
    /// Drugs over their daily maximum; plans keep them at the entered dose
    pub review_required: Vec<String>,
}

impl Validation {
    pub fn requires_review(&self, drug_id: &str) -> bool {
        self.review_required.iter().any(|id| id == drug_id)
    }

    /// Whether a line is left out of scheduling (drug not in the catalog)
    pub fn is_excluded(&self, line: usize) -> bool {
        self.violations
            .iter()
            .any(|v| matches!(v, Warning::UnknownDrug { line: l, .. } if *l == line))
    }
}

/// Check each line and each drug's daily total against the catalog limits
pub fn validate(lines: &[PrescriptionLine], catalog: &DrugCatalog) -> Validation {
    let mut violations = Vec::new();

    // (drug id, summed daily amount) in first-seen order
    let mut daily: Vec<(&str, f64)> = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let Some(entry) = catalog.lookup(&line.drug_id) else {
            tracing::warn!("line {}: unknown drug '{}'", idx + 1, line.drug_id);
            violations.push(Warning::UnknownDrug {
                line: idx,
                drug_id: line.drug_id.clone(),
            });
            continue;
        };

        if !entry.active {
            violations.push(Warning::InactiveDrug {
                line: idx,
                drug_id: entry.id.clone(),
            });
        }

        if line.dose > entry.max_single_dose {
            tracing::warn!(
                "line {}: {} dose {} > max single {}",
                idx + 1,
                entry.id,
                line.dose,
                entry.max_single_dose
            );
            violations.push(Warning::SingleDoseExceeded {
                line: idx,
                drug_id: entry.id.clone(),
                dose: line.dose,
                max: entry.max_single_dose,
            });
        }

        if line.times.len() > line.effective_frequency() as usize {
            violations.push(Warning::ExtraTimesIgnored {
                line: idx,
                drug_id: entry.id.clone(),
                frequency: line.effective_frequency(),
                times: line.times.len(),
            });
        }

        if line.is_inert() {
            continue;
        }
        match daily.iter_mut().find(|(id, _)| *id == entry.id) {
            Some((_, total)) => *total += line.daily_amount(),
            None => daily.push((entry.id.as_str(), line.daily_amount())),
        }
    }

    let mut review_required = Vec::new();
    for (drug_id, total) in daily {
        // Present in `daily` only when the lookup succeeded
        let Some(entry) = catalog.lookup(drug_id) else {
            continue;
        };
        if total > entry.max_daily_dose {
            tracing::warn!(
                "{} daily total {} > max daily {}; flagged for review",
                drug_id,
                total,
                entry.max_daily_dose
            );
            violations.push(Warning::DailyDoseExceeded {
                drug_id: drug_id.to_string(),
                total,
                max: entry.max_daily_dose,
            });
            review_required.push(drug_id.to_string());
        }
    }

    tracing::info!(
        "Validated {} lines: {} violations, {} drugs for review",
        lines.len(),
        violations.len(),
        review_required.len()
    );

    Validation {
        violations,
        review_required,
    }
}

/// Advisories that depend on the patient's symptom flags
pub fn symptom_advisories(
    lines: &[PrescriptionLine],
    catalog: &DrugCatalog,
    symptoms: &SymptomFlags,
) -> Vec<Warning> {
    if !symptoms.somnolence_or_psychiatric {
        return Vec::new();
    }

    lines
        .iter()
        .enumerate()
        .filter(|(_, line)| !line.is_inert())
        .filter_map(|(idx, line)| {
            catalog
                .lookup(&line.drug_id)
                .filter(|e| e.category == DrugCategory::Agonist)
                .map(|e| Warning::AgonistWithSomnolence {
                    line: idx,
                    drug_id: e.id.clone(),
                })
        })
        .collect()
}
