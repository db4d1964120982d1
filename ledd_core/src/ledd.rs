//! LEDD aggregation.
//!
//! Converts a prescription into per-line LEDD values and the summary totals:
//! - `DIRECT` lines add dose × frequency × factor to their class bucket
//! - `FIXED` lines add the factor itself to "Other"
//! - `MULTIPLY_LDOPA` lines scale the levodopa total; one multiplier per drug,
//!   composed by multiplication

use crate::catalog::DrugCatalog;
use crate::types::*;

/// Result of aggregating a prescription
#[derive(Clone, Debug, PartialEq)]
pub struct Aggregation {
    pub summary: LeddSummary,
    /// Derived LEDD/Category cells, one per prescription line
    pub lines: Vec<LineLedd>,
    pub advisories: Vec<Warning>,
}

/// Aggregate a prescription into LEDD totals
///
/// Pure function: unknown drugs contribute zero and are reported by the
/// constraint validator, not here.
pub fn aggregate(lines: &[PrescriptionLine], catalog: &DrugCatalog) -> Aggregation {
    let mut base_ldopa = 0.0;
    let mut agonist = 0.0;
    let mut other = 0.0;

    // (drug id, multiplier) in first-seen order
    let mut multipliers: Vec<(&str, f64)> = Vec::new();
    let mut comt_lines: Vec<(usize, &str)> = Vec::new();
    let mut has_ldopa = false;

    let mut derived = Vec::with_capacity(lines.len());

    for (idx, line) in lines.iter().enumerate() {
        let Some(entry) = catalog.lookup(&line.drug_id) else {
            derived.push(LineLedd {
                line: idx,
                drug_id: line.drug_id.clone(),
                ledd: 0.0,
                category: None,
            });
            continue;
        };

        let ledd = if line.is_inert() {
            0.0
        } else {
            match entry.ledd_mode {
                LeddMode::Direct => line.daily_amount() * entry.ledd_factor,
                LeddMode::Fixed => entry.ledd_factor,
                LeddMode::MultiplyLdopa => {
                    if !multipliers.iter().any(|(id, _)| *id == entry.id) {
                        multipliers.push((entry.id.as_str(), entry.ldopa_multiplier));
                    }
                    comt_lines.push((idx, entry.id.as_str()));
                    0.0
                }
            }
        };

        if !line.is_inert() && entry.category == DrugCategory::Ldopa {
            has_ldopa = true;
        }

        match (entry.ledd_mode, entry.category.bucket()) {
            (LeddMode::MultiplyLdopa, _) => {}
            (LeddMode::Fixed, _) => other += ledd,
            (LeddMode::Direct, LeddBucket::Ldopa) => base_ldopa += ledd,
            (LeddMode::Direct, LeddBucket::Agonist) => agonist += ledd,
            (LeddMode::Direct, LeddBucket::Other) => other += ledd,
        }

        tracing::debug!(
            "line {}: {} {:?} contributes {}",
            idx + 1,
            entry.id,
            entry.ledd_mode,
            ledd
        );

        derived.push(LineLedd {
            line: idx,
            drug_id: line.drug_id.clone(),
            ledd,
            category: Some(entry.category),
        });
    }

    let mut advisories = Vec::new();
    let factor = if has_ldopa {
        multipliers.iter().map(|(_, m)| m).product::<f64>()
    } else {
        for (line, drug_id) in &comt_lines {
            tracing::warn!("COMT-class drug {} without concurrent LDOPA", drug_id);
            advisories.push(Warning::ComtWithoutLdopa {
                line: *line,
                drug_id: drug_id.to_string(),
            });
        }
        1.0
    };

    let ldopa_adjusted = base_ldopa * factor;
    let summary = LeddSummary {
        ldopa_adjusted,
        agonist,
        other,
        total: ldopa_adjusted + agonist + other,
    };

    tracing::info!(
        "LEDD: ldopa={} (x{}) agonist={} other={} total={}",
        base_ldopa,
        factor,
        agonist,
        other,
        summary.total
    );

    Aggregation {
        summary,
        lines: derived,
        advisories,
    }
}
