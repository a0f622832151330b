use std::collections::HashMap;

use log::{debug, info};

use crate::clock::ClockTime;
use crate::constraints::SchedulingContext;
use crate::model::{
    sort_canonical, FieldId, Match, PlacedMatch, RejectReason, RejectedMatch, ScheduleOutcome,
    TeamRef,
};
use crate::rules::BETWEEN_MATCHES_BREAK_MINS;

// ---------------------------------------------------------------------------
// Per-field cursors
// ---------------------------------------------------------------------------

/// Next free kickoff time on each field.
#[derive(Debug)]
struct FieldCursors {
    next_free: HashMap<FieldId, ClockTime>,
}

impl FieldCursors {
    fn starting_at(start: ClockTime) -> Self {
        FieldCursors {
            next_free: FieldId::ALL.iter().map(|f| (*f, start)).collect(),
        }
    }

    fn get(&self, field: FieldId) -> ClockTime {
        self.next_free.get(&field).copied().unwrap_or_default()
    }

    /// Occupy the field until `end`, plus the changeover break.
    fn advance(&mut self, field: FieldId, end: ClockTime) {
        self.next_free
            .insert(field, end + BETWEEN_MATCHES_BREAK_MINS);
    }
}

// ---------------------------------------------------------------------------
// Feasibility helpers
// ---------------------------------------------------------------------------

/// True when a same-age match sharing a club already kicks off at `start`.
pub(crate) fn parallel_club_clash<'a>(
    candidate: &Match,
    start: ClockTime,
    placed: impl IntoIterator<Item = &'a PlacedMatch>,
) -> bool {
    placed.into_iter().any(|p| {
        p.start_time == start
            && p.fixture.age_group == candidate.age_group
            && p.fixture.shares_club_with(candidate)
    })
}

fn cap_reached(team: &TeamRef, caps: &HashMap<TeamRef, u32>, played: &HashMap<TeamRef, u32>) -> bool {
    match caps.get(team) {
        Some(&cap) => played.get(team).copied().unwrap_or(0) >= cap,
        None => false,
    }
}

/// Earliest-finishing feasible slot for `candidate`, if any. Fields are tried
/// in allowed order and only a strictly earlier end replaces the best slot,
/// so ties go to the first field.
fn best_slot(
    candidate: &Match,
    cursors: &FieldCursors,
    placed: &[PlacedMatch],
    ctx: &SchedulingContext<'_>,
) -> Option<(FieldId, ClockTime)> {
    let age = candidate.age_group.as_str();
    let earliest = ctx.earliest_start(age);
    let latest = ctx.latest_end(age);

    let mut best: Option<(FieldId, ClockTime, ClockTime)> = None;
    for field in ctx.resolver.allowed_fields(age) {
        let start = cursors.get(field).max(earliest);
        let end = start + candidate.duration_mins;
        if end > latest || end > ctx.window.end {
            continue;
        }
        if parallel_club_clash(candidate, start, placed) {
            continue;
        }
        if best.map_or(true, |(_, _, best_end)| end < best_end) {
            best = Some((field, start, end));
        }
    }
    best.map(|(field, start, _)| (field, start))
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Greedily place candidate matches in the order given.
///
/// For each candidate:
/// 1. Drop it if either team has reached its cap (`caps`; absent = unlimited).
/// 2. Otherwise try every allowed field at `max(field cursor, earliest start)`
///    and keep the option that ends first, provided it ends inside both the
///    age group's window and the day, and no same-age match sharing a club
///    starts at that exact time.
/// 3. Drop it if no field works. Dropped candidates are never retried.
///
/// Placement advances the field's cursor to the match end plus the
/// changeover break. The returned schedule is in canonical order.
pub fn schedule_matches(
    candidates: Vec<Match>,
    caps: &HashMap<TeamRef, u32>,
    ctx: &SchedulingContext<'_>,
) -> ScheduleOutcome {
    let mut cursors = FieldCursors::starting_at(ctx.window.start);
    let mut played: HashMap<TeamRef, u32> = HashMap::new();
    let mut schedule: Vec<PlacedMatch> = Vec::with_capacity(candidates.len());
    let mut rejected: Vec<RejectedMatch> = Vec::new();

    for candidate in candidates {
        if cap_reached(&candidate.team_a, caps, &played)
            || cap_reached(&candidate.team_b, caps, &played)
        {
            debug!("Dropping {}: game cap reached", candidate.label());
            rejected.push(RejectedMatch {
                candidate,
                reason: RejectReason::CapReached,
            });
            continue;
        }

        let Some((field, start)) = best_slot(&candidate, &cursors, &schedule, ctx) else {
            debug!("Dropping {}: no feasible field", candidate.label());
            rejected.push(RejectedMatch {
                candidate,
                reason: RejectReason::NoFeasibleField,
            });
            continue;
        };

        *played.entry(candidate.team_a.clone()).or_insert(0) += 1;
        *played.entry(candidate.team_b.clone()).or_insert(0) += 1;

        let placed = PlacedMatch::place(candidate, field, start);
        debug!(
            "Placed {} on {} at {}-{}",
            placed.fixture.label(),
            field,
            placed.start_time,
            placed.end_time
        );
        cursors.advance(field, placed.end_time);
        schedule.push(placed);
    }

    sort_canonical(&mut schedule);

    let outcome = ScheduleOutcome { schedule, rejected };
    let report = outcome.report();
    info!(
        "Scheduled {} of {} candidates ({} over cap, {} without a slot)",
        report.placed, report.candidates, report.rejected_cap, report.rejected_no_field
    );
    outcome
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
