//! Schedule synthesis.
//!
//! Every strategy works on the same validated input and produces raw
//! placements; a shared assembly step clamps them to the waking window,
//! marks drugs under review and orders the slots.

use crate::catalog::DrugCatalog;
use crate::config::ScheduleConfig;
use crate::error::ScheduleError;
use crate::plans::{EvenSplit, OffPeriodTargeted, PeakSuppression};
use crate::time::{from_minutes, to_minutes, MINUTES_PER_DAY};
use crate::types::*;
use crate::validate::Validation;

/// A prescription line that can be placed on a timetable
#[derive(Clone, Debug)]
pub struct SchedulableLine<'a> {
    /// Index into the prescription
    pub line: usize,
    pub entry: &'a DrugEntry,
    /// Catalog declaration order
    pub order: usize,
    pub dose: f64,
    pub frequency: u32,
    /// Explicit administration times, in minutes, at most `frequency` of them
    pub times: Vec<u32>,
    /// Over the daily maximum: entered dose only, no extra or split slots
    pub review: bool,
}

/// Validated input shared by all strategies
#[derive(Clone, Debug)]
pub struct ScheduleInput<'a> {
    pub wake: u32,
    pub sleep: u32,
    pub meals: Vec<(Meal, u32)>,
    pub symptoms: SymptomFlags,
    /// Start of each recorded OFF period, in minutes
    pub off_onsets: Vec<u32>,
    /// Dyskinesia recorded on the hourly timeline
    pub dyskinesia_recorded: bool,
    pub tuning: &'a ScheduleConfig,
    pub lines: Vec<SchedulableLine<'a>>,
}

impl<'a> ScheduleInput<'a> {
    pub fn build(
        lines: &[PrescriptionLine],
        catalog: &'a DrugCatalog,
        profile: &PatientProfile,
        validation: &Validation,
        tuning: &'a ScheduleConfig,
    ) -> Result<Self, ScheduleError> {
        let wake = profile
            .wake
            .ok_or(ScheduleError::MissingProfileAnchor { field: "wake" })?;
        let sleep = profile
            .sleep
            .ok_or(ScheduleError::MissingProfileAnchor { field: "sleep" })?;
        if wake >= sleep {
            return Err(ScheduleError::InvalidDayWindow { wake, sleep });
        }

        let schedulable = lines
            .iter()
            .enumerate()
            .filter(|(idx, line)| !validation.is_excluded(*idx) && !line.is_inert())
            .filter_map(|(idx, line)| {
                let entry = catalog.lookup(&line.drug_id)?;
                let order = catalog.position(&entry.id)?;
                let frequency = line.effective_frequency();
                Some(SchedulableLine {
                    line: idx,
                    entry,
                    order,
                    dose: line.dose,
                    frequency,
                    times: line
                        .times
                        .iter()
                        .take(frequency as usize)
                        .map(|t| to_minutes(*t))
                        .collect(),
                    review: validation.requires_review(&entry.id),
                })
            })
            .collect();

        Ok(Self {
            wake: to_minutes(wake),
            sleep: to_minutes(sleep),
            meals: profile
                .meals
                .present()
                .into_iter()
                .map(|(meal, t)| (meal, to_minutes(t)))
                .collect(),
            symptoms: profile.symptoms,
            off_onsets: profile
                .timeline
                .off_onsets()
                .into_iter()
                .map(|hour| u32::from(hour) * 60)
                .collect(),
            dyskinesia_recorded: !profile.timeline.dyskinesia_hours.is_empty(),
            tuning,
            lines: schedulable,
        })
    }

    pub fn span(&self) -> u32 {
        self.sleep - self.wake
    }

    /// Dyskinesia flagged or recorded on the timeline
    pub fn dyskinesia(&self) -> bool {
        self.symptoms.dyskinesia || self.dyskinesia_recorded
    }

    /// `wake + k × span / n`, floored to the minute
    pub fn even_minute(&self, k: u32, n: u32) -> i64 {
        let n = n.max(1);
        i64::from(self.wake) + i64::from(k) * i64::from(self.span()) / i64::from(n)
    }

    /// Sum of dose × frequency over every schedulable line of a drug
    pub fn daily_amount(&self, drug_id: &str) -> f64 {
        self.lines
            .iter()
            .filter(|l| l.entry.id == drug_id)
            .map(|l| l.dose * f64::from(l.frequency))
            .sum()
    }
}

/// A slot before clamping and ordering
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedSlot {
    /// Minutes since midnight; may fall outside the day before clamping
    pub minute: i64,
    /// Index into `ScheduleInput::lines`
    pub source: usize,
    pub dose: f64,
    pub comments: Vec<SlotComment>,
}

/// Raw output of a strategy
#[derive(Clone, Debug, Default)]
pub struct Placement {
    pub slots: Vec<PlacedSlot>,
    pub notes: Vec<PlanNote>,
}

/// A placement strategy over the shared input contract
pub trait ScheduleStrategy {
    fn strategy(&self) -> Strategy;
    fn title(&self) -> &'static str;
    fn place(&self, input: &ScheduleInput<'_>) -> Placement;
}

/// All three plans plus the warnings their assembly raised
#[derive(Clone, Debug, PartialEq)]
pub struct Synthesis {
    pub plans: PlanSet,
    pub warnings: Vec<Warning>,
}

/// Produce Plan A, Plan B and Plan C for a validated prescription
pub fn synthesize(
    lines: &[PrescriptionLine],
    catalog: &DrugCatalog,
    profile: &PatientProfile,
    validation: &Validation,
    tuning: &ScheduleConfig,
) -> Result<Synthesis, ScheduleError> {
    let input = ScheduleInput::build(lines, catalog, profile, validation, tuning)?;

    tracing::info!(
        "Synthesizing plans for {} schedulable lines ({} excluded)",
        input.lines.len(),
        lines.len() - input.lines.len()
    );

    let mut warnings = Vec::new();
    let plan_a = run_strategy(&EvenSplit, &input, &mut warnings);
    let plan_b = run_strategy(&OffPeriodTargeted, &input, &mut warnings);
    let plan_c = run_strategy(&PeakSuppression, &input, &mut warnings);

    Ok(Synthesis {
        plans: PlanSet {
            plan_a,
            plan_b,
            plan_c,
        },
        warnings,
    })
}

fn run_strategy(
    strategy: &dyn ScheduleStrategy,
    input: &ScheduleInput<'_>,
    warnings: &mut Vec<Warning>,
) -> Plan {
    let placement = strategy.place(input);
    let plan = assemble(strategy.strategy(), strategy.title(), placement, input, warnings);
    tracing::debug!("{}: {} slots", plan.title, plan.slots.len());
    plan
}

/// Clamp, annotate and order raw placements into a plan
pub fn assemble(
    strategy: Strategy,
    title: &str,
    placement: Placement,
    input: &ScheduleInput<'_>,
    warnings: &mut Vec<Warning>,
) -> Plan {
    let wake = i64::from(input.wake);
    let sleep = i64::from(input.sleep);

    let mut placed: Vec<(i64, PlacedSlot)> = placement
        .slots
        .into_iter()
        .map(|mut slot| {
            let clamped = slot.minute.clamp(wake, sleep);
            if clamped != slot.minute {
                let requested = from_minutes(slot.minute.rem_euclid(i64::from(MINUTES_PER_DAY)) as u32);
                let source = &input.lines[slot.source];
                warnings.push(Warning::ClampedToBounds {
                    strategy,
                    drug_id: source.entry.id.clone(),
                    requested,
                    clamped: from_minutes(clamped as u32),
                });
                slot.comments.push(SlotComment::ClampedToBounds { requested });
            }
            if input.lines[slot.source].review && !slot.comments.contains(&SlotComment::ReviewRequired) {
                slot.comments.push(SlotComment::ReviewRequired);
            }
            (clamped, slot)
        })
        .collect();

    // Same time: LDOPA first, then catalog order, then prescription order
    placed.sort_by_key(|(minute, slot)| {
        let source = &input.lines[slot.source];
        (
            *minute,
            source.entry.category != DrugCategory::Ldopa,
            source.order,
            source.line,
        )
    });

    let slots = placed
        .into_iter()
        .map(|(minute, slot)| {
            let source = &input.lines[slot.source];
            ScheduleSlot {
                time: from_minutes(minute as u32),
                drug_id: source.entry.id.clone(),
                display_name: source.entry.display_name.clone(),
                dose: slot.dose,
                comments: slot.comments,
            }
        })
        .collect();

    Plan {
        strategy,
        title: title.to_string(),
        slots,
        notes: placement.notes,
    }
}
