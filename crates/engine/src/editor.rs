use log::info;

use crate::constraints::SchedulingContext;
use crate::model::{sort_canonical, FieldId, PlacedMatch};
use crate::rules::BETWEEN_MATCHES_BREAK_MINS;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EditError {
    #[error("{0} has no match at position {1}")]
    InvalidPosition(FieldId, usize),
    #[error("Positions are the same; nothing to swap")]
    SamePosition,
    #[error("Both positions are on {0}; use a swap within the field")]
    SameField(FieldId),
    #[error("{0} matches are not allowed on {1}")]
    FieldNotAllowed(String, FieldId),
}

// ---------------------------------------------------------------------------
// Field lists and recomputation
// ---------------------------------------------------------------------------

/// One field's matches in chronological order.
pub fn field_matches(schedule: &[PlacedMatch], field: FieldId) -> Vec<PlacedMatch> {
    let mut list: Vec<PlacedMatch> = schedule
        .iter()
        .filter(|m| m.field == field)
        .cloned()
        .collect();
    list.sort_by_key(|m| m.start_time);
    list
}

/// Re-time an ordered field list without reordering it.
///
/// Walks from the day start: each match starts at the cursor, floored by its
/// age group's earliest start, runs for the duration its age group's rule
/// gives now, and the cursor moves to its end plus the changeover break.
/// Matches whose age group has lost its rule keep their previous duration.
pub fn recompute_field(list: &mut [PlacedMatch], field: FieldId, ctx: &SchedulingContext<'_>) {
    let mut cursor = ctx.window.start;
    for m in list.iter_mut() {
        let duration = ctx
            .rules
            .duration_mins(m.age_group())
            .unwrap_or(m.fixture.duration_mins);
        cursor = cursor.max(ctx.earliest_start(m.age_group()));
        m.field = field;
        m.fixture.duration_mins = duration;
        m.start_time = cursor;
        m.end_time = cursor + duration;
        cursor = m.end_time + BETWEEN_MATCHES_BREAK_MINS;
    }
}

/// Re-time every field, keeping each field's order. Used after rules or
/// requests change.
pub fn recompute_all(schedule: &[PlacedMatch], ctx: &SchedulingContext<'_>) -> Vec<PlacedMatch> {
    let mut merged = Vec::with_capacity(schedule.len());
    for field in FieldId::ALL {
        let mut list = field_matches(schedule, field);
        recompute_field(&mut list, field, ctx);
        merged.extend(list);
    }
    sort_canonical(&mut merged);
    merged
}

/// Matches on fields other than `touched`.
fn untouched(schedule: &[PlacedMatch], touched: &[FieldId]) -> Vec<PlacedMatch> {
    schedule
        .iter()
        .filter(|m| !touched.contains(&m.field))
        .cloned()
        .collect()
}

/// Convert a 1-based position to an index, if it exists in `list`.
fn index_of(list: &[PlacedMatch], field: FieldId, pos: usize) -> Result<usize, EditError> {
    if pos == 0 || pos > list.len() {
        return Err(EditError::InvalidPosition(field, pos));
    }
    Ok(pos - 1)
}

fn check_allowed(m: &PlacedMatch, field: FieldId, ctx: &SchedulingContext<'_>) -> Result<(), EditError> {
    if ctx.resolver.allows_field(m.age_group(), field) {
        Ok(())
    } else {
        Err(EditError::FieldNotAllowed(m.age_group().to_string(), field))
    }
}

// ---------------------------------------------------------------------------
// Edit operations
// ---------------------------------------------------------------------------

/// Exchange two positions (1-based) on one field and re-time that field.
/// Other fields are returned unchanged.
pub fn swap_within_field(
    schedule: &[PlacedMatch],
    field: FieldId,
    pos_a: usize,
    pos_b: usize,
    ctx: &SchedulingContext<'_>,
) -> Result<Vec<PlacedMatch>, EditError> {
    let mut list = field_matches(schedule, field);
    let a = index_of(&list, field, pos_a)?;
    let b = index_of(&list, field, pos_b)?;
    if a == b {
        return Err(EditError::SamePosition);
    }

    list.swap(a, b);
    recompute_field(&mut list, field, ctx);
    info!("Swapped positions {} and {} on {}", pos_a, pos_b, field);

    let mut merged = untouched(schedule, &[field]);
    merged.extend(list);
    sort_canonical(&mut merged);
    Ok(merged)
}

/// Take the match at `from_pos` on `from_field` and insert it at `to_pos` on
/// `to_field` (appending when `to_pos` is `None` or past the end), then
/// re-time both fields. Refused if the age group may not use `to_field`.
pub fn move_match(
    schedule: &[PlacedMatch],
    from_field: FieldId,
    from_pos: usize,
    to_field: FieldId,
    to_pos: Option<usize>,
    ctx: &SchedulingContext<'_>,
) -> Result<Vec<PlacedMatch>, EditError> {
    let mut source = field_matches(schedule, from_field);
    let from = index_of(&source, from_field, from_pos)?;
    check_allowed(&source[from], to_field, ctx)?;

    let moving = source.remove(from);
    let label = moving.fixture.label();
    let mut target = if to_field == from_field {
        std::mem::take(&mut source)
    } else {
        field_matches(schedule, to_field)
    };
    let at = match to_pos {
        Some(pos) if pos >= 1 && pos <= target.len() => pos - 1,
        _ => target.len(),
    };
    target.insert(at, moving);

    recompute_field(&mut source, from_field, ctx);
    recompute_field(&mut target, to_field, ctx);
    info!(
        "Moved {} from {} #{} to {} #{}",
        label,
        from_field,
        from_pos,
        to_field,
        at + 1
    );

    let mut merged = untouched(schedule, &[from_field, to_field]);
    merged.extend(source);
    merged.extend(target);
    sort_canonical(&mut merged);
    Ok(merged)
}

/// Exchange matches between two different fields and re-time both. Both
/// matches must be allowed on their new field, otherwise nothing changes.
pub fn swap_across_fields(
    schedule: &[PlacedMatch],
    field_a: FieldId,
    pos_a: usize,
    field_b: FieldId,
    pos_b: usize,
    ctx: &SchedulingContext<'_>,
) -> Result<Vec<PlacedMatch>, EditError> {
    if field_a == field_b {
        return Err(EditError::SameField(field_a));
    }
    let mut list_a = field_matches(schedule, field_a);
    let mut list_b = field_matches(schedule, field_b);
    let a = index_of(&list_a, field_a, pos_a)?;
    let b = index_of(&list_b, field_b, pos_b)?;
    check_allowed(&list_a[a], field_b, ctx)?;
    check_allowed(&list_b[b], field_a, ctx)?;

    std::mem::swap(&mut list_a[a], &mut list_b[b]);
    recompute_field(&mut list_a, field_a, ctx);
    recompute_field(&mut list_b, field_b, ctx);
    info!(
        "Swapped {} #{} with {} #{}",
        field_a, pos_a, field_b, pos_b
    );

    let mut merged = untouched(schedule, &[field_a, field_b]);
    merged.extend(list_a);
    merged.extend(list_b);
    sort_canonical(&mut merged);
    Ok(merged)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::clock::ClockTime;
    use crate::model::{AgeGroupRule, ConstraintOverride, DayWindow, Match, TeamRef};
    use crate::rules::RulesTable;

    fn t(h: u32, m: u32) -> ClockTime {
        ClockTime::from_hm(h, m)
    }

    fn day() -> DayWindow {
        DayWindow {
            start: t(8, 0),
            end: t(17, 0),
        }
    }

    fn placed(age: &str, a: &str, b: &str, field: FieldId, start: ClockTime) -> PlacedMatch {
        PlacedMatch::place(
            Match {
                age_group: age.into(),
                team_a: TeamRef::new(a, age, 1),
                team_b: TeamRef::new(b, age, 1),
                duration_mins: RulesTable::default().duration_mins(age).unwrap(),
            },
            field,
            start,
        )
    }

    /// Field A: U8 L-T 08:00, U9 B-W 08:42, U13 L-B 09:34. Field B: U10 T-W 08:00.
    fn sample() -> Vec<PlacedMatch> {
        let mut s = vec![
            placed("U8", "Lions", "Tigers", FieldId::A, t(8, 0)),
            placed("U9", "Bears", "Wolves", FieldId::A, t(8, 42)),
            placed("U13", "Lions", "Bears", FieldId::A, t(9, 34)),
            placed("U10", "Tigers", "Wolves", FieldId::B, t(8, 0)),
        ];
        sort_canonical(&mut s);
        s
    }

    fn order(schedule: &[PlacedMatch], field: FieldId) -> Vec<String> {
        field_matches(schedule, field)
            .iter()
            .map(|m| m.fixture.label())
            .collect()
    }

    #[test]
    fn recompute_is_idempotent() {
        let rules = RulesTable::default();
        let requests = BTreeMap::new();
        let ctx = SchedulingContext::new(&rules, &requests, day());
        let mut list = field_matches(&sample(), FieldId::A);
        recompute_field(&mut list, FieldId::A, &ctx);
        let once = list.clone();
        recompute_field(&mut list, FieldId::A, &ctx);
        assert_eq!(list, once);
        assert_eq!(once[0].start_time, t(8, 0));
        assert_eq!(once[1].start_time, t(8, 42));
        assert_eq!(once[2].start_time, t(9, 34));
    }

    #[test]
    fn recompute_uses_current_rules() {
        let mut rules = RulesTable::default();
        rules.set("U8", AgeGroupRule::new(2, 20, 5));
        let requests = BTreeMap::new();
        let ctx = SchedulingContext::new(&rules, &requests, day());
        let updated = recompute_all(&sample(), &ctx);
        let a = field_matches(&updated, FieldId::A);
        assert_eq!(a[0].end_time, t(8, 45));
        assert_eq!(a[0].fixture.duration_mins, 45);
        assert_eq!(a[1].start_time, t(8, 52));
    }

    #[test]
    fn recompute_honours_earliest_start_floor() {
        let rules = RulesTable::default();
        let mut requests = BTreeMap::new();
        requests.insert(
            "U9".to_string(),
            ConstraintOverride {
                earliest_start: Some("10:00".into()),
                ..ConstraintOverride::default()
            },
        );
        let ctx = SchedulingContext::new(&rules, &requests, day());
        let updated = recompute_all(&sample(), &ctx);
        let a = field_matches(&updated, FieldId::A);
        assert_eq!(a[1].start_time, t(10, 0));
        assert_eq!(a[2].start_time, t(10, 52));
    }

    #[test]
    fn swap_within_field_reorders_and_retimes() {
        let rules = RulesTable::default();
        let requests = BTreeMap::new();
        let ctx = SchedulingContext::new(&rules, &requests, day());
        let schedule = sample();

        let swapped = swap_within_field(&schedule, FieldId::A, 1, 3, &ctx).unwrap();
        let a = field_matches(&swapped, FieldId::A);
        assert_eq!(a[0].age_group(), "U13");
        assert_eq!(a[0].start_time, t(8, 0));
        assert_eq!(a[0].end_time, t(8, 55));
        assert_eq!(a[1].start_time, t(9, 2));
        assert_eq!(a[2].age_group(), "U8");
        assert_eq!(field_matches(&swapped, FieldId::B), field_matches(&schedule, FieldId::B));
    }

    #[test]
    fn swap_within_field_is_its_own_inverse() {
        let rules = RulesTable::default();
        let requests = BTreeMap::new();
        let ctx = SchedulingContext::new(&rules, &requests, day());
        let schedule = sample();

        let once = swap_within_field(&schedule, FieldId::A, 2, 3, &ctx).unwrap();
        let twice = swap_within_field(&once, FieldId::A, 2, 3, &ctx).unwrap();
        assert_eq!(twice, schedule);
    }

    #[test]
    fn swap_within_field_rejects_bad_positions() {
        let rules = RulesTable::default();
        let requests = BTreeMap::new();
        let ctx = SchedulingContext::new(&rules, &requests, day());
        let schedule = sample();
        assert_eq!(
            swap_within_field(&schedule, FieldId::A, 1, 1, &ctx),
            Err(EditError::SamePosition)
        );
        assert_eq!(
            swap_within_field(&schedule, FieldId::B, 1, 2, &ctx),
            Err(EditError::InvalidPosition(FieldId::B, 2))
        );
        assert_eq!(
            swap_within_field(&schedule, FieldId::A, 0, 2, &ctx),
            Err(EditError::InvalidPosition(FieldId::A, 0))
        );
    }

    #[test]
    fn move_appends_and_retimes_both_fields() {
        let rules = RulesTable::default();
        let requests = BTreeMap::new();
        let ctx = SchedulingContext::new(&rules, &requests, day());
        let schedule = sample();

        let moved = move_match(&schedule, FieldId::A, 1, FieldId::B, None, &ctx).unwrap();
        let a = field_matches(&moved, FieldId::A);
        let b = field_matches(&moved, FieldId::B);
        assert_eq!(a.len(), 2);
        assert_eq!(a[0].age_group(), "U9");
        assert_eq!(a[0].start_time, t(8, 0));
        assert_eq!(b.len(), 2);
        assert_eq!(b[1].age_group(), "U8");
        assert_eq!(b[1].field, FieldId::B);
        assert_eq!(b[1].start_time, t(8, 52));
        assert_eq!(moved.len(), schedule.len());
    }

    #[test]
    fn move_inserts_at_position() {
        let rules = RulesTable::default();
        let requests = BTreeMap::new();
        let ctx = SchedulingContext::new(&rules, &requests, day());
        let moved = move_match(&sample(), FieldId::A, 2, FieldId::B, Some(1), &ctx).unwrap();
        assert_eq!(
            order(&moved, FieldId::B),
            vec![
                "Bears U9 #1 vs Wolves U9 #1".to_string(),
                "Tigers U10 #1 vs Wolves U10 #1".to_string(),
            ]
        );
    }

    #[test]
    fn move_within_same_field_reorders() {
        let rules = RulesTable::default();
        let requests = BTreeMap::new();
        let ctx = SchedulingContext::new(&rules, &requests, day());
        let moved = move_match(&sample(), FieldId::A, 1, FieldId::A, None, &ctx).unwrap();
        let a = field_matches(&moved, FieldId::A);
        assert_eq!(a.len(), 3);
        assert_eq!(a[2].age_group(), "U8");
        assert_eq!(a[0].start_time, t(8, 0));
    }

    #[test]
    fn move_onto_forbidden_field_is_refused() {
        let rules = RulesTable::default();
        let requests = BTreeMap::new();
        let ctx = SchedulingContext::new(&rules, &requests, day());
        let schedule = sample();
        assert_eq!(
            move_match(&schedule, FieldId::A, 3, FieldId::B, None, &ctx),
            Err(EditError::FieldNotAllowed("U13".into(), FieldId::B))
        );
    }

    #[test]
    fn swap_across_checks_both_policies() {
        let rules = RulesTable::default();
        let requests = BTreeMap::new();
        let ctx = SchedulingContext::new(&rules, &requests, day());
        let schedule = sample();

        assert_eq!(
            swap_across_fields(&schedule, FieldId::A, 3, FieldId::B, 1, &ctx),
            Err(EditError::FieldNotAllowed("U13".into(), FieldId::B))
        );
        assert_eq!(
            swap_across_fields(&schedule, FieldId::A, 1, FieldId::A, 2, &ctx),
            Err(EditError::SameField(FieldId::A))
        );

        let swapped = swap_across_fields(&schedule, FieldId::A, 1, FieldId::B, 1, &ctx).unwrap();
        let a = field_matches(&swapped, FieldId::A);
        let b = field_matches(&swapped, FieldId::B);
        assert_eq!(a[0].age_group(), "U10");
        assert_eq!(a[0].end_time, t(8, 45));
        assert_eq!(a[1].start_time, t(8, 52));
        assert_eq!(b[0].age_group(), "U8");
        assert_eq!(b[0].field, FieldId::B);
    }
}
