use std::collections::HashSet;

use crate::constraints::SchedulingContext;
use crate::model::PlacedMatch;

// ---------------------------------------------------------------------------
// Validate implementation
// ---------------------------------------------------------------------------

/// Re-scan a finished schedule and return human-readable warnings, in
/// schedule order with duplicates removed.
///
/// Checks:
/// - two same-age matches sharing a club that kick off at the same time
/// - a match on a field its age group may not use
/// - a match starting before, or ending after, its age group's window
///   (the effective constraint intersected with the day window)
///
/// Warnings are advisory; nothing here mutates the schedule.
pub fn validate(schedule: &[PlacedMatch], ctx: &SchedulingContext<'_>) -> Vec<String> {
    let mut warnings: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut push = |msg: String| {
        if seen.insert(msg.clone()) {
            warnings.push(msg);
        }
    };

    // -----------------------------------------------------------------------
    // Parallel same-club kickoffs (pairwise)
    // -----------------------------------------------------------------------
    for (i, a) in schedule.iter().enumerate() {
        for b in &schedule[i + 1..] {
            if a.start_time != b.start_time || a.age_group() != b.age_group() {
                continue;
            }
            for club in shared_clubs(a, b) {
                push(format!(
                    "Club conflict: '{}' has two {} matches starting at {} ({} and {})",
                    club,
                    a.age_group(),
                    a.start_time,
                    a.field,
                    b.field
                ));
            }
        }
    }

    // -----------------------------------------------------------------------
    // Per-match policy and window checks
    // -----------------------------------------------------------------------
    for m in schedule {
        let age = m.age_group();
        if !ctx.resolver.allows_field(age, m.field) {
            push(format!(
                "{} match {} is on {}, which {} may not use",
                age,
                m.fixture.label(),
                m.field,
                age
            ));
        }

        let earliest = ctx.earliest_start(age).max(ctx.window.start);
        let latest = ctx.latest_end(age).min(ctx.window.end);
        if m.start_time < earliest {
            push(format!(
                "{} match {} starts at {}, before the earliest start of {}",
                age,
                m.fixture.label(),
                m.start_time,
                earliest
            ));
        }
        if m.end_time > latest {
            push(format!(
                "{} match {} ends at {}, after the latest end of {}",
                age,
                m.fixture.label(),
                m.end_time,
                latest
            ));
        }
    }

    warnings
}

/// Clubs appearing on both matches, in `a`'s team order.
fn shared_clubs<'a>(a: &'a PlacedMatch, b: &PlacedMatch) -> Vec<&'a str> {
    let theirs = [b.fixture.team_a.club.as_str(), b.fixture.team_b.club.as_str()];
    let mut clubs: Vec<&str> = [a.fixture.team_a.club.as_str(), a.fixture.team_b.club.as_str()]
        .into_iter()
        .filter(|c| theirs.contains(c))
        .collect();
    clubs.dedup();
    clubs
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::clock::ClockTime;
    use crate::model::{ConstraintOverride, DayWindow, FieldId, Match, TeamRef};
    use crate::rules::RulesTable;

    fn t(h: u32, m: u32) -> ClockTime {
        ClockTime::from_hm(h, m)
    }

    fn placed(age: &str, a: &str, b: &str, field: FieldId, start: ClockTime) -> PlacedMatch {
        let rules = RulesTable::default();
        PlacedMatch::place(
            Match {
                age_group: age.into(),
                team_a: TeamRef::new(a, age, 1),
                team_b: TeamRef::new(b, age, 1),
                duration_mins: rules.duration_mins(age).unwrap(),
            },
            field,
            start,
        )
    }

    fn day() -> DayWindow {
        DayWindow {
            start: t(8, 0),
            end: t(17, 0),
        }
    }

    #[test]
    fn clean_schedule_has_no_warnings() {
        let rules = RulesTable::default();
        let requests = BTreeMap::new();
        let ctx = SchedulingContext::new(&rules, &requests, day());
        let schedule = vec![
            placed("U8", "Lions", "Tigers", FieldId::A, t(8, 0)),
            placed("U8", "Bears", "Wolves", FieldId::B, t(8, 0)),
            placed("U13", "Lions", "Bears", FieldId::A, t(8, 42)),
        ];
        assert!(validate(&schedule, &ctx).is_empty());
    }

    #[test]
    fn reports_parallel_same_club_once() {
        let rules = RulesTable::default();
        let requests = BTreeMap::new();
        let ctx = SchedulingContext::new(&rules, &requests, day());
        let mut second = placed("U9", "Bears", "Lions", FieldId::B, t(9, 0));
        second.fixture.team_b.index = 2;
        let schedule = vec![placed("U9", "Lions", "Tigers", FieldId::A, t(9, 0)), second];

        let warnings = validate(&schedule, &ctx);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Club conflict: 'Lions'"));
        assert!(warnings[0].contains("09:00"));
    }

    #[test]
    fn different_age_groups_may_share_kickoff() {
        let rules = RulesTable::default();
        let requests = BTreeMap::new();
        let ctx = SchedulingContext::new(&rules, &requests, day());
        let schedule = vec![
            placed("U9", "Lions", "Tigers", FieldId::A, t(9, 0)),
            placed("U10", "Lions", "Tigers", FieldId::B, t(9, 0)),
        ];
        assert!(validate(&schedule, &ctx).is_empty());
    }

    #[test]
    fn reports_field_policy_violation() {
        let rules = RulesTable::default();
        let requests = BTreeMap::new();
        let ctx = SchedulingContext::new(&rules, &requests, day());
        let schedule = vec![placed("U13", "Lions", "Tigers", FieldId::B, t(8, 0))];
        let warnings = validate(&schedule, &ctx);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Field B"));
    }

    #[test]
    fn reports_window_violations() {
        let rules = RulesTable::default();
        let mut requests = BTreeMap::new();
        requests.insert(
            "U9".to_string(),
            ConstraintOverride {
                latest_end: Some("12:00".into()),
                ..ConstraintOverride::default()
            },
        );
        let ctx = SchedulingContext::new(&rules, &requests, day());
        let schedule = vec![
            // U12 defaults to a 12:00 earliest start.
            placed("U12", "Lions", "Tigers", FieldId::A, t(10, 0)),
            placed("U9", "Lions", "Tigers", FieldId::B, t(11, 30)),
            placed("U8", "Bears", "Wolves", FieldId::B, t(16, 50)),
        ];
        let warnings = validate(&schedule, &ctx);
        assert_eq!(warnings.len(), 3);
        assert!(warnings[0].contains("before the earliest start of 12:00"));
        assert!(warnings[1].contains("after the latest end of 12:00"));
        assert!(warnings[2].contains("after the latest end of 17:00"));
    }
}
