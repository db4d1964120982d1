//! The three placement strategies.
//!
//! - Plan A spreads each drug evenly over the waking day
//! - Plan B pulls short-acting levodopa toward OFF-risk windows
//! - Plan C suppresses levodopa peaks, or consolidates doses when asked to
//!
//! None of them lowers a drug's daily amount.

use crate::schedule::{PlacedSlot, Placement, ScheduleInput, ScheduleStrategy};
use crate::types::*;

// ============================================================================
// Plan A: even split
// ============================================================================

pub struct EvenSplit;

impl ScheduleStrategy for EvenSplit {
    fn strategy(&self) -> Strategy {
        Strategy::A
    }

    fn title(&self) -> &'static str {
        "Plan A (even split)"
    }

    fn place(&self, input: &ScheduleInput<'_>) -> Placement {
        Placement {
            slots: (0..input.lines.len())
                .flat_map(|source| even_split_slots(input, source))
                .collect(),
            notes: Vec::new(),
        }
    }
}

/// Even-split slots for one line: explicit time i for dose i when given,
/// otherwise `wake + k × span / N`
pub(crate) fn even_split_slots(input: &ScheduleInput<'_>, source: usize) -> Vec<PlacedSlot> {
    let line = &input.lines[source];
    (0..line.frequency)
        .map(|k| match line.times.get(k as usize) {
            Some(&minute) => PlacedSlot {
                minute: i64::from(minute),
                source,
                dose: line.dose,
                comments: vec![SlotComment::PrescribedTime],
            },
            None => PlacedSlot {
                minute: input.even_minute(k, line.frequency),
                source,
                dose: line.dose,
                comments: Vec::new(),
            },
        })
        .collect()
}

// ============================================================================
// Plan B: OFF-period targeted
// ============================================================================

pub struct OffPeriodTargeted;

impl ScheduleStrategy for OffPeriodTargeted {
    fn strategy(&self) -> Strategy {
        Strategy::B
    }

    fn title(&self) -> &'static str {
        "Plan B (OFF-period targeted)"
    }

    fn place(&self, input: &ScheduleInput<'_>) -> Placement {
        let symptoms = input.symptoms;
        let anchors = off_anchors(input);
        let retime = !anchors.is_empty();
        let mut notes = Vec::new();

        let morning_target = if symptoms.morning_off {
            input
                .lines
                .iter()
                .enumerate()
                .filter(|(_, l)| l.entry.is_short_acting_ldopa())
                .min_by_key(|(_, l)| (l.order, l.line))
                .map(|(source, _)| source)
        } else {
            None
        };

        let mut slots = Vec::new();
        for (source, line) in input.lines.iter().enumerate() {
            let mut line_slots = even_split_slots(input, source);
            let mut locked = vec![false; line_slots.len()];

            if morning_target == Some(source) {
                notes.push(anchor_morning_dose(input, source, &mut line_slots, &mut locked));
            }

            if retime && line.entry.is_short_acting_ldopa() {
                let reach = i64::from(input.span() / line.frequency.max(1));
                retime_toward_anchors(input, &anchors, &mut line_slots, &locked, reach);
            }

            slots.extend(line_slots);
        }

        if !retime && morning_target.is_none() {
            notes.push(PlanNote::NoTriggeringSymptoms);
        }

        Placement { slots, notes }
    }
}

/// Morning OFF: put a dose on the waking anchor.
///
/// A prescribed time already on the anchor is kept. Otherwise, when the daily
/// maximum allows it, an extra dose goes on the anchor and the line's
/// unprescribed doses are spread over the rest of the day after it; failing
/// that, the earliest dose moves onto the anchor. The anchored slot is locked.
fn anchor_morning_dose(
    input: &ScheduleInput<'_>,
    source: usize,
    slots: &mut Vec<PlacedSlot>,
    locked: &mut Vec<bool>,
) -> PlanNote {
    let line = &input.lines[source];
    let anchor = i64::from(input.wake) - i64::from(input.tuning.morning_off_lead_minutes);
    let drug_id = line.entry.id.clone();

    let prescribed_on_anchor = slots
        .iter()
        .position(|s| s.minute == anchor && s.comments.contains(&SlotComment::PrescribedTime));
    if let Some(idx) = prescribed_on_anchor {
        slots[idx].comments.push(SlotComment::MorningOff);
        locked[idx] = true;
        return PlanNote::MorningOffAlreadyCovered { drug_id };
    }

    let headroom = input.daily_amount(&line.entry.id) + line.dose <= line.entry.max_daily_dose;
    if !line.review && headroom {
        let n = line.frequency;
        for (k, slot) in slots.iter_mut().enumerate() {
            if !slot.comments.contains(&SlotComment::PrescribedTime) {
                slot.minute = input.even_minute(k as u32 + 1, n + 1);
            }
        }
        slots.push(PlacedSlot {
            minute: anchor,
            source,
            dose: line.dose,
            comments: vec![SlotComment::MorningOff],
        });
        locked.push(true);
        tracing::debug!("Plan B: extra {} dose on waking", drug_id);
        return PlanNote::MorningOffExtraDose { drug_id };
    }

    // Earliest dose moves; ties go to the first placed
    let Some(idx) = (0..slots.len()).min_by_key(|&i| (slots[i].minute, i)) else {
        return PlanNote::MorningOffShiftedDose { drug_id };
    };
    locked[idx] = true;
    if slots[idx].minute == anchor {
        slots[idx].comments.push(SlotComment::MorningOff);
        return PlanNote::MorningOffAlreadyCovered { drug_id };
    }
    slots[idx].minute = anchor;
    slots[idx].comments = vec![SlotComment::MorningOff];
    PlanNote::MorningOffShiftedDose { drug_id }
}

/// OFF-risk anchors.
///
/// Wearing-off or nocturnal OFF anchors before each present meal and before
/// sleep. Every recorded OFF period anchors a lead before its onset.
fn off_anchors(input: &ScheduleInput<'_>) -> Vec<(i64, SlotComment)> {
    let symptoms = input.symptoms;
    let mut anchors = Vec::new();

    if symptoms.wearing_off || symptoms.nocturnal_off {
        anchors.extend(input.meals.iter().map(|&(meal, minute)| {
            (
                i64::from(minute) - i64::from(input.tuning.pre_meal_lead_minutes),
                SlotComment::BeforeMeal { meal },
            )
        }));
        anchors.push((
            i64::from(input.sleep) - i64::from(input.tuning.pre_sleep_lead_minutes),
            SlotComment::BeforeSleep,
        ));
    }

    anchors.extend(input.off_onsets.iter().map(|&onset| {
        (
            i64::from(onset) - i64::from(input.tuning.off_onset_lead_minutes),
            SlotComment::BeforeOffPeriod {
                hour: (onset / 60) as u8,
            },
        )
    }));
    anchors
}

/// Move unlocked doses onto OFF anchors.
///
/// With nocturnal OFF the latest dose takes the pre-sleep anchor first. The
/// remaining anchors and doses are then paired closest first; a dose moves at
/// most `reach` minutes, so one with no anchor nearby keeps its even-split
/// time and anchors left over stay empty.
fn retime_toward_anchors(
    input: &ScheduleInput<'_>,
    anchors: &[(i64, SlotComment)],
    slots: &mut [PlacedSlot],
    locked: &[bool],
    reach: i64,
) {
    let mut used = vec![false; anchors.len()];
    let mut moved = locked.to_vec();

    if input.symptoms.nocturnal_off {
        let latest = (0..slots.len())
            .filter(|&i| !moved[i])
            .max_by_key(|&i| (slots[i].minute, i));
        let sleep_anchor = anchors.iter().position(|(_, c)| *c == SlotComment::BeforeSleep);
        if let (Some(last), Some(a)) = (latest, sleep_anchor) {
            slots[last].minute = anchors[a].0;
            slots[last].comments = vec![anchors[a].1.clone()];
            used[a] = true;
            moved[last] = true;
        }
    }

    // (distance, anchor minute, dose minute, anchor, dose)
    let mut pairs = Vec::new();
    for (a, (anchor, _)) in anchors.iter().enumerate() {
        for (i, slot) in slots.iter().enumerate() {
            let distance = (anchor - slot.minute).abs();
            if !used[a] && !moved[i] && distance <= reach {
                pairs.push((distance, *anchor, slot.minute, a, i));
            }
        }
    }
    pairs.sort_unstable();

    for (_, minute, _, a, i) in pairs {
        if used[a] || moved[i] {
            continue;
        }
        slots[i].minute = minute;
        slots[i].comments = vec![anchors[a].1.clone()];
        used[a] = true;
        moved[i] = true;
    }
}

// ============================================================================
// Plan C: peak suppression
// ============================================================================

pub struct PeakSuppression;

impl ScheduleStrategy for PeakSuppression {
    fn strategy(&self) -> Strategy {
        Strategy::C
    }

    fn title(&self) -> &'static str {
        "Plan C (peak suppression)"
    }

    fn place(&self, input: &ScheduleInput<'_>) -> Placement {
        let symptoms = input.symptoms;

        if input.dyskinesia() {
            let mut placement = widen_ldopa_spacing(input);
            if symptoms.reduce_dose_count {
                placement.notes.push(PlanNote::DyskinesiaOverridesConsolidation);
            }
            placement
        } else if symptoms.reduce_dose_count {
            consolidate(input)
        } else {
            let mut placement = EvenSplit.place(input);
            placement.notes.push(PlanNote::NoTriggeringSymptoms);
            placement
        }
    }
}

/// Spread every levodopa administration across the full waking window.
///
/// Doses of different levodopa lines are interleaved so they do not coincide;
/// a dose above the drug's single-dose maximum becomes several smaller
/// administrations unless the drug is under review.
fn widen_ldopa_spacing(input: &ScheduleInput<'_>) -> Placement {
    let mut slots = Vec::new();
    let mut queues: Vec<Vec<PlacedSlot>> = Vec::new();

    for (source, line) in input.lines.iter().enumerate() {
        if line.entry.category != DrugCategory::Ldopa {
            slots.extend(even_split_slots(input, source));
            continue;
        }

        let max_single = line.entry.max_single_dose;
        let parts = if !line.review && max_single > 0.0 && line.dose > max_single {
            (line.dose / max_single).ceil() as u32
        } else {
            1
        };

        let mut queue = Vec::with_capacity((line.frequency * parts) as usize);
        for _ in 0..line.frequency {
            for part in 1..=parts {
                let mut comments = vec![SlotComment::WidenedSpacing];
                if parts > 1 {
                    comments.push(SlotComment::SplitDose { part, of: parts });
                }
                queue.push(PlacedSlot {
                    minute: 0,
                    source,
                    dose: line.dose / f64::from(parts),
                    comments,
                });
            }
        }
        queues.push(queue);
    }

    // Round-robin across levodopa lines
    let mut interleaved = Vec::new();
    let longest = queues.iter().map(Vec::len).max().unwrap_or(0);
    let mut iters: Vec<_> = queues.into_iter().map(Vec::into_iter).collect();
    for _ in 0..longest {
        for it in iters.iter_mut() {
            if let Some(slot) = it.next() {
                interleaved.push(slot);
            }
        }
    }

    let total = interleaved.len() as i64;
    let wake = i64::from(input.wake);
    let span = i64::from(input.span());
    for (k, mut slot) in interleaved.into_iter().enumerate() {
        slot.minute = if total > 1 {
            wake + k as i64 * span / (total - 1)
        } else {
            wake
        };
        slots.push(slot);
    }

    Placement {
        slots,
        notes: Vec::new(),
    }
}

/// Reduce administration occasions.
///
/// Slots within the consolidation window of a group's first slot move onto
/// that slot's time; doses of the same drug in a group merge while the merged
/// dose stays within the single-dose maximum. Drugs under review are untouched.
fn consolidate(input: &ScheduleInput<'_>) -> Placement {
    let window = i64::from(input.tuning.consolidation_window_minutes);
    let base = EvenSplit.place(input);

    let (mut fixed, mut movable): (Vec<PlacedSlot>, Vec<PlacedSlot>) = base
        .slots
        .into_iter()
        .partition(|s| input.lines[s.source].review);

    movable.sort_by_key(|s| {
        let line = &input.lines[s.source];
        (s.minute, line.entry.category != DrugCategory::Ldopa, line.order, line.line)
    });

    let mut groups: Vec<Vec<PlacedSlot>> = Vec::new();
    for slot in movable {
        match groups.last_mut() {
            Some(group) if slot.minute - group[0].minute <= window => group.push(slot),
            _ => groups.push(vec![slot]),
        }
    }

    let mut slots = Vec::new();
    for group in groups {
        if group.len() == 1 {
            slots.extend(group);
            continue;
        }

        let anchor = group[0].minute;
        let mut merged: Vec<PlacedSlot> = Vec::with_capacity(group.len());
        for mut slot in group {
            let line = &input.lines[slot.source];
            let same_drug = merged.iter().position(|m| {
                input.lines[m.source].entry.id == line.entry.id
                    && m.dose + slot.dose <= line.entry.max_single_dose
            });
            match same_drug {
                Some(target) => merged[target].dose += slot.dose,
                None => {
                    slot.minute = anchor;
                    merged.push(slot);
                }
            }
        }
        for slot in merged.iter_mut() {
            if !slot.comments.contains(&SlotComment::Consolidated) {
                slot.comments.push(SlotComment::Consolidated);
            }
        }
        slots.extend(merged);
    }

    slots.append(&mut fixed);
    Placement {
        slots,
        notes: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScheduleConfig;
    use crate::schedule::synthesize;
    use crate::time::parse_hhmm;
    use crate::validate::validate;
    use crate::{build_default_catalog, DrugCatalog};

    fn t(s: &str) -> chrono::NaiveTime {
        parse_hhmm(s).unwrap()
    }

    fn profile(symptoms: SymptomFlags) -> PatientProfile {
        PatientProfile {
            wake: Some(t("06:00")),
            sleep: Some(t("23:00")),
            meals: MealTimes {
                breakfast: Some(t("07:00")),
                lunch: Some(t("12:00")),
                dinner: Some(t("18:00")),
            },
            symptoms,
            ..Default::default()
        }
    }

    fn plans(lines: &[PrescriptionLine], symptoms: SymptomFlags) -> PlanSet {
        plans_with(&build_default_catalog(), lines, symptoms)
    }

    fn plans_with(catalog: &DrugCatalog, lines: &[PrescriptionLine], symptoms: SymptomFlags) -> PlanSet {
        let validation = validate(lines, catalog);
        synthesize(lines, catalog, &profile(symptoms), &validation, &ScheduleConfig::default())
            .unwrap()
            .plans
    }

    fn times(plan: &Plan, drug_id: &str) -> Vec<String> {
        plan.slots
            .iter()
            .filter(|s| s.drug_id == drug_id)
            .map(|s| crate::time::format_hhmm(s.time))
            .collect()
    }

    fn daily(plan: &Plan, drug_id: &str) -> f64 {
        plan.slots.iter().filter(|s| s.drug_id == drug_id).map(|s| s.dose).sum()
    }

    #[test]
    fn test_plan_a_even_thirds() {
        let set = plans(&[PrescriptionLine::new("PRAMIPEXOLE", 0.5, 3)], SymptomFlags::default());
        assert_eq!(times(&set.plan_a, "PRAMIPEXOLE"), vec!["06:00", "11:40", "17:20"]);
    }

    #[test]
    fn test_plan_a_uses_explicit_times_then_fills() {
        let line = PrescriptionLine::new("LDOPA_IR", 100.0, 3).with_times(vec![t("07:30")]);
        let set = plans(&[line], SymptomFlags::default());

        assert_eq!(times(&set.plan_a, "LDOPA_IR"), vec!["07:30", "11:40", "17:20"]);
        assert!(set.plan_a.slots[0].has_comment(&SlotComment::PrescribedTime));
    }

    #[test]
    fn test_plan_a_keeps_excess_single_dose() {
        let set = plans(&[PrescriptionLine::new("LDOPA_IR", 250.0, 3)], SymptomFlags::default());
        assert!(set.plan_a.slots.iter().all(|s| s.dose == 250.0));
    }

    #[test]
    fn test_no_flags_plans_mirror_even_split() {
        let set = plans(&[PrescriptionLine::new("LDOPA_IR", 100.0, 3)], SymptomFlags::default());

        assert_eq!(times(&set.plan_b, "LDOPA_IR"), times(&set.plan_a, "LDOPA_IR"));
        assert_eq!(times(&set.plan_c, "LDOPA_IR"), times(&set.plan_a, "LDOPA_IR"));
        assert_eq!(set.plan_b.notes, vec![PlanNote::NoTriggeringSymptoms]);
        assert_eq!(set.plan_c.notes, vec![PlanNote::NoTriggeringSymptoms]);
    }

    #[test]
    fn test_plan_b_wearing_off_moves_ldopa_before_meals_and_sleep() {
        let lines = vec![
            PrescriptionLine::new("LDOPA_IR", 100.0, 4),
            PrescriptionLine::new("PRAMIPEXOLE", 0.5, 3),
        ];
        let set = plans(
            &lines,
            SymptomFlags {
                wearing_off: true,
                ..Default::default()
            },
        );

        // Even split 06:00, 10:15, 14:30, 18:45; 14:30 has no anchor within 4h15m
        assert_eq!(times(&set.plan_b, "LDOPA_IR"), vec!["06:30", "11:30", "14:30", "17:30"]);
        assert_eq!(times(&set.plan_b, "PRAMIPEXOLE"), times(&set.plan_a, "PRAMIPEXOLE"));
        assert_eq!(daily(&set.plan_b, "LDOPA_IR"), daily(&set.plan_a, "LDOPA_IR"));
    }

    fn profile_with_meals(symptoms: SymptomFlags, meals: MealTimes) -> PatientProfile {
        PatientProfile {
            meals,
            ..profile(symptoms)
        }
    }

    fn plan_b_for(lines: &[PrescriptionLine], profile: &PatientProfile) -> Plan {
        let catalog = build_default_catalog();
        let validation = validate(lines, &catalog);
        synthesize(lines, &catalog, profile, &validation, &ScheduleConfig::default())
            .unwrap()
            .plans
            .plan_b
    }

    #[test]
    fn test_plan_b_wearing_off_without_meals_keeps_morning_dose() {
        let wearing_off = SymptomFlags {
            wearing_off: true,
            ..Default::default()
        };
        let plan = plan_b_for(
            &[PrescriptionLine::new("LDOPA_IR", 100.0, 3)],
            &profile_with_meals(wearing_off, MealTimes::default()),
        );

        // Only the 17:20 dose is close enough to the pre-sleep anchor
        assert_eq!(times(&plan, "LDOPA_IR"), vec!["06:00", "11:40", "22:30"]);
    }

    #[test]
    fn test_plan_b_wearing_off_dinner_only_keeps_daytime_spread() {
        let wearing_off = SymptomFlags {
            wearing_off: true,
            ..Default::default()
        };
        let meals = MealTimes {
            dinner: Some(t("18:00")),
            ..Default::default()
        };
        let plan = plan_b_for(
            &[PrescriptionLine::new("LDOPA_IR", 100.0, 3)],
            &profile_with_meals(wearing_off, meals),
        );

        assert_eq!(times(&plan, "LDOPA_IR"), vec!["06:00", "11:40", "17:30"]);
        assert!(plan.slots[2].has_comment(&SlotComment::BeforeMeal { meal: Meal::Dinner }));
    }

    #[test]
    fn test_plan_b_targets_recorded_off_hours() {
        let mut p = profile(SymptomFlags::default());
        p.timeline.off_hours = vec![14, 15];
        let plan = plan_b_for(&[PrescriptionLine::new("LDOPA_IR", 100.0, 3)], &p);

        // Half an hour before the 14:00 OFF onset; meals are not anchors without wearing-off
        assert_eq!(times(&plan, "LDOPA_IR"), vec!["06:00", "13:30", "17:20"]);
        assert!(plan.slots[1].has_comment(&SlotComment::BeforeOffPeriod { hour: 14 }));
        assert!(plan.notes.is_empty());
    }

    #[test]
    fn test_plan_b_nocturnal_off_claims_pre_sleep_anchor() {
        let set = plans(
            &[PrescriptionLine::new("LDOPA_IR", 100.0, 2)],
            SymptomFlags {
                nocturnal_off: true,
                ..Default::default()
            },
        );

        // 14:30 takes the pre-sleep anchor, 06:00 the nearest meal anchor
        assert_eq!(times(&set.plan_b, "LDOPA_IR"), vec!["06:30", "22:30"]);
    }

    #[test]
    fn test_plan_b_leaves_extended_release_alone() {
        let set = plans(
            &[PrescriptionLine::new("LDOPA_ER", 200.0, 2)],
            SymptomFlags {
                wearing_off: true,
                ..Default::default()
            },
        );

        assert_eq!(times(&set.plan_b, "LDOPA_ER"), times(&set.plan_a, "LDOPA_ER"));
    }

    #[test]
    fn test_plan_b_morning_off_adds_dose_on_waking() {
        let line = PrescriptionLine::new("LDOPA_IR", 100.0, 3)
            .with_times(vec![t("08:00"), t("13:00"), t("18:00")]);
        let set = plans(
            &[line],
            SymptomFlags {
                morning_off: true,
                ..Default::default()
            },
        );

        assert_eq!(
            times(&set.plan_b, "LDOPA_IR"),
            vec!["06:00", "08:00", "13:00", "18:00"]
        );
        assert_eq!(
            set.plan_b.notes,
            vec![PlanNote::MorningOffExtraDose {
                drug_id: "LDOPA_IR".into()
            }]
        );
    }

    #[test]
    fn test_plan_b_morning_off_adds_dose_before_even_split() {
        let set = plans(
            &[PrescriptionLine::new("LDOPA_IR", 100.0, 3)],
            SymptomFlags {
                morning_off: true,
                ..Default::default()
            },
        );

        assert_eq!(times(&set.plan_a, "LDOPA_IR"), vec!["06:00", "11:40", "17:20"]);
        // Waking dose, then the three prescribed doses spread after it
        assert_eq!(
            times(&set.plan_b, "LDOPA_IR"),
            vec!["06:00", "10:15", "14:30", "18:45"]
        );
        assert!(set.plan_b.slots[0].has_comment(&SlotComment::MorningOff));
        assert_eq!(daily(&set.plan_b, "LDOPA_IR"), 400.0);
        assert_eq!(
            set.plan_b.notes,
            vec![PlanNote::MorningOffExtraDose {
                drug_id: "LDOPA_IR".into()
            }]
        );
    }

    #[test]
    fn test_plan_b_morning_off_prescribed_waking_dose_is_kept() {
        let line = PrescriptionLine::new("LDOPA_IR", 100.0, 3)
            .with_times(vec![t("06:00"), t("12:00"), t("18:00")]);
        let set = plans(
            &[line],
            SymptomFlags {
                morning_off: true,
                ..Default::default()
            },
        );

        assert_eq!(times(&set.plan_b, "LDOPA_IR"), vec!["06:00", "12:00", "18:00"]);
        assert_eq!(
            set.plan_b.notes,
            vec![PlanNote::MorningOffAlreadyCovered {
                drug_id: "LDOPA_IR".into()
            }]
        );
    }

    #[test]
    fn test_plan_b_morning_off_shifts_when_no_headroom() {
        // 300 x 4 = 1200 is at the daily maximum already
        let line = PrescriptionLine::new("LDOPA_IR", 300.0, 4)
            .with_times(vec![t("08:00"), t("12:00"), t("16:00"), t("20:00")]);
        let set = plans(
            &[line],
            SymptomFlags {
                morning_off: true,
                ..Default::default()
            },
        );

        assert_eq!(
            times(&set.plan_b, "LDOPA_IR"),
            vec!["06:00", "12:00", "16:00", "20:00"]
        );
        assert_eq!(daily(&set.plan_b, "LDOPA_IR"), 1200.0);
    }

    #[test]
    fn test_plan_b_review_drug_gets_no_extra_slot() {
        let line = PrescriptionLine::new("LDOPA_IR", 200.0, 7);
        let set = plans(
            &[line],
            SymptomFlags {
                morning_off: true,
                ..Default::default()
            },
        );

        // Over the daily maximum: the first even-split dose already sits on waking
        assert_eq!(
            set.plan_b.notes,
            vec![PlanNote::MorningOffAlreadyCovered {
                drug_id: "LDOPA_IR".into()
            }]
        );
        assert_eq!(set.plan_b.slots.len(), 7);
        assert!(set
            .plan_b
            .slots
            .iter()
            .all(|s| s.has_comment(&SlotComment::ReviewRequired) && s.dose == 200.0));
    }

    #[test]
    fn test_plan_c_dyskinesia_interleaves_and_widens() {
        let lines = vec![
            PrescriptionLine::new("LDOPA_IR", 100.0, 2),
            PrescriptionLine::new("LDOPA_BEN_IR", 100.0, 2),
            PrescriptionLine::new("AMANTADINE", 100.0, 2),
        ];
        let set = plans(
            &lines,
            SymptomFlags {
                dyskinesia: true,
                ..Default::default()
            },
        );

        // Four levodopa administrations over 17h: every 5h40m, none coinciding
        assert_eq!(times(&set.plan_c, "LDOPA_IR"), vec!["06:00", "17:20"]);
        assert_eq!(times(&set.plan_c, "LDOPA_BEN_IR"), vec!["11:40", "23:00"]);
        assert_eq!(times(&set.plan_c, "AMANTADINE"), times(&set.plan_a, "AMANTADINE"));
    }

    #[test]
    fn test_plan_c_recorded_dyskinesia_widens_spacing() {
        let mut p = profile(SymptomFlags::default());
        p.timeline.dyskinesia_hours = vec![10, 11];
        let catalog = build_default_catalog();
        let lines = vec![PrescriptionLine::new("LDOPA_IR", 100.0, 3)];
        let validation = validate(&lines, &catalog);
        let set = synthesize(&lines, &catalog, &p, &validation, &ScheduleConfig::default())
            .unwrap()
            .plans;

        assert_eq!(times(&set.plan_c, "LDOPA_IR"), vec!["06:00", "14:30", "23:00"]);
        assert!(set.plan_c.notes.is_empty());
    }

    #[test]
    fn test_plan_c_splits_dose_over_single_maximum() {
        let set = plans(
            &[PrescriptionLine::new("LDOPA_IR", 250.0, 2)],
            SymptomFlags {
                dyskinesia: true,
                ..Default::default()
            },
        );

        let slots: Vec<_> = set.plan_c.slots.iter().filter(|s| s.drug_id == "LDOPA_IR").collect();
        assert_eq!(slots.len(), 4);
        assert!(slots.iter().all(|s| s.dose == 125.0));
        assert!(slots[0].has_comment(&SlotComment::SplitDose { part: 1, of: 2 }));
        assert_eq!(daily(&set.plan_c, "LDOPA_IR"), 500.0);
    }

    #[test]
    fn test_plan_c_dyskinesia_wins_over_consolidation() {
        let set = plans(
            &[PrescriptionLine::new("LDOPA_IR", 100.0, 3)],
            SymptomFlags {
                dyskinesia: true,
                reduce_dose_count: true,
                ..Default::default()
            },
        );

        assert_eq!(times(&set.plan_c, "LDOPA_IR"), vec!["06:00", "14:30", "23:00"]);
        assert_eq!(set.plan_c.notes, vec![PlanNote::DyskinesiaOverridesConsolidation]);
    }

    #[test]
    fn test_plan_c_consolidates_nearby_doses() {
        let lines = vec![
            PrescriptionLine::new("LDOPA_IR", 100.0, 3)
                .with_times(vec![t("07:00"), t("12:00"), t("18:00")]),
            PrescriptionLine::new("ROPINIROLE", 2.0, 3)
                .with_times(vec![t("07:30"), t("12:45"), t("18:30")]),
        ];
        let set = plans(
            &lines,
            SymptomFlags {
                reduce_dose_count: true,
                ..Default::default()
            },
        );

        assert_eq!(times(&set.plan_c, "LDOPA_IR"), vec!["07:00", "12:00", "18:00"]);
        // 12:45 is still within the 60-minute window of 12:00
        assert_eq!(times(&set.plan_c, "ROPINIROLE"), vec!["07:00", "12:00", "18:00"]);
        assert!(set.plan_c.slots.iter().all(|s| s.has_comment(&SlotComment::Consolidated)));
    }

    #[test]
    fn test_plan_c_merges_same_drug_within_single_limit() {
        let line = PrescriptionLine::new("LDOPA_IR", 50.0, 4)
            .with_times(vec![t("07:00"), t("07:30"), t("15:00"), t("15:20")]);
        let set = plans(
            &[line],
            SymptomFlags {
                reduce_dose_count: true,
                ..Default::default()
            },
        );

        assert_eq!(times(&set.plan_c, "LDOPA_IR"), vec!["07:00", "15:00"]);
        assert!(set.plan_c.slots.iter().all(|s| s.dose == 100.0));
        assert_eq!(daily(&set.plan_c, "LDOPA_IR"), 200.0);
    }

    #[test]
    fn test_plan_c_consolidation_leaves_review_drugs() {
        let lines = vec![
            PrescriptionLine::new("LDOPA_IR", 100.0, 2).with_times(vec![t("07:00"), t("19:00")]),
            PrescriptionLine::new("PRAMIPEXOLE", 2.5, 2).with_times(vec![t("07:40"), t("19:40")]),
        ];
        let set = plans(
            &lines,
            SymptomFlags {
                reduce_dose_count: true,
                ..Default::default()
            },
        );

        assert_eq!(times(&set.plan_c, "PRAMIPEXOLE"), vec!["07:40", "19:40"]);
        assert!(set
            .plan_c
            .slots
            .iter()
            .filter(|s| s.drug_id == "PRAMIPEXOLE")
            .all(|s| s.has_comment(&SlotComment::ReviewRequired)));
    }
}
