#![deny(clippy::all)]

use std::collections::HashMap;

use matchday_engine::clock::ClockTime;
use matchday_engine::model as engine;
use matchday_engine::planner::{Planner, PlannerConfig};
use matchday_engine::rules::RulesTable;
use napi_derive::napi;
use rand::rngs::StdRng;
use rand::SeedableRng;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

#[napi(string_enum)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldId {
    A,
    B,
}

#[napi(string_enum)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPolicy {
    Default,
    AOnly,
    BOnly,
    Any,
}

#[napi(string_enum)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    CapReached,
    NoFeasibleField,
}

// ---------------------------------------------------------------------------
// Enum conversions: napi <-> engine
// ---------------------------------------------------------------------------

impl From<FieldId> for engine::FieldId {
    fn from(v: FieldId) -> Self {
        match v {
            FieldId::A => engine::FieldId::A,
            FieldId::B => engine::FieldId::B,
        }
    }
}

impl From<engine::FieldId> for FieldId {
    fn from(v: engine::FieldId) -> Self {
        match v {
            engine::FieldId::A => FieldId::A,
            engine::FieldId::B => FieldId::B,
        }
    }
}

impl From<FieldPolicy> for engine::FieldPolicy {
    fn from(v: FieldPolicy) -> Self {
        match v {
            FieldPolicy::Default => engine::FieldPolicy::Default,
            FieldPolicy::AOnly => engine::FieldPolicy::AOnly,
            FieldPolicy::BOnly => engine::FieldPolicy::BOnly,
            FieldPolicy::Any => engine::FieldPolicy::Any,
        }
    }
}

impl From<engine::FieldPolicy> for FieldPolicy {
    fn from(v: engine::FieldPolicy) -> Self {
        match v {
            engine::FieldPolicy::Default => FieldPolicy::Default,
            engine::FieldPolicy::AOnly => FieldPolicy::AOnly,
            engine::FieldPolicy::BOnly => FieldPolicy::BOnly,
            engine::FieldPolicy::Any => FieldPolicy::Any,
        }
    }
}

impl From<engine::RejectReason> for RejectReason {
    fn from(v: engine::RejectReason) -> Self {
        match v {
            engine::RejectReason::CapReached => RejectReason::CapReached,
            engine::RejectReason::NoFeasibleField => RejectReason::NoFeasibleField,
        }
    }
}

// ---------------------------------------------------------------------------
// Mirror types: planner state (input side)
// ---------------------------------------------------------------------------

#[napi(object)]
#[derive(Debug, Clone)]
pub struct AgeGroupRule {
    pub halves: u32,
    pub half_duration_mins: u32,
    pub halftime_mins: u32,
}

impl From<AgeGroupRule> for engine::AgeGroupRule {
    fn from(v: AgeGroupRule) -> Self {
        engine::AgeGroupRule::new(v.halves, v.half_duration_mins, v.halftime_mins)
    }
}

#[napi(object)]
#[derive(Debug, Clone)]
pub struct TeamEntry {
    pub count: u32,
    pub desired_games_per_team: Option<u32>,
    pub per_team_caps: Option<Vec<Option<u32>>>,
}

impl From<TeamEntry> for engine::TeamEntry {
    fn from(v: TeamEntry) -> Self {
        engine::TeamEntry {
            count: v.count,
            desired_games_per_team: v.desired_games_per_team,
            per_team_caps: v.per_team_caps.unwrap_or_default(),
        }
    }
}

#[napi(object)]
#[derive(Debug, Clone)]
pub struct Club {
    pub name: String,
    pub teams: HashMap<String, TeamEntry>,
}

impl From<Club> for engine::Club {
    fn from(v: Club) -> Self {
        engine::Club {
            name: v.name,
            teams: v.teams.into_iter().map(|(age, e)| (age, e.into())).collect(),
        }
    }
}

#[napi(object)]
#[derive(Debug, Clone)]
pub struct ConstraintOverride {
    pub priority: Option<bool>,
    pub earliest_start: Option<String>,
    pub latest_end: Option<String>,
    pub field_policy: Option<FieldPolicy>,
}

impl From<ConstraintOverride> for engine::ConstraintOverride {
    fn from(v: ConstraintOverride) -> Self {
        engine::ConstraintOverride {
            priority: v.priority.unwrap_or(false),
            earliest_start: v.earliest_start,
            latest_end: v.latest_end,
            field_policy: v.field_policy.map(Into::into).unwrap_or_default(),
        }
    }
}

/// Planner state as held by the UI. Omitted rules fall back to the built-in
/// table; omitted times fall back to 08:00-17:00.
#[napi(object)]
#[derive(Debug, Clone)]
pub struct PlannerState {
    pub clubs: Vec<Club>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub host_name: Option<String>,
    pub logo: Option<String>,
    pub age_rules: Option<HashMap<String, AgeGroupRule>>,
    pub requests: Option<HashMap<String, ConstraintOverride>>,
}

impl From<PlannerState> for PlannerConfig {
    fn from(v: PlannerState) -> Self {
        let defaults = PlannerConfig::default();
        let age_rules = match v.age_rules {
            Some(rules) => {
                let mut table = RulesTable::empty();
                for (age, rule) in rules {
                    table.set(age, rule.into());
                }
                table
            }
            None => defaults.age_rules,
        };
        PlannerConfig {
            clubs: v
                .clubs
                .into_iter()
                .map(engine::Club::from)
                .collect::<Vec<_>>()
                .into(),
            start_time: v.start_time.unwrap_or(defaults.start_time),
            end_time: v.end_time.unwrap_or(defaults.end_time),
            host_name: v.host_name.unwrap_or_default(),
            logo: v.logo,
            age_rules,
            requests: v
                .requests
                .unwrap_or_default()
                .into_iter()
                .map(|(age, r)| (age, r.into()))
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Mirror types: matches (both directions)
// ---------------------------------------------------------------------------

#[napi(object)]
#[derive(Debug, Clone)]
pub struct TeamRef {
    pub club: String,
    pub age_group: String,
    pub index: u32,
}

impl From<TeamRef> for engine::TeamRef {
    fn from(v: TeamRef) -> Self {
        engine::TeamRef::new(v.club, v.age_group, v.index)
    }
}

impl From<engine::TeamRef> for TeamRef {
    fn from(v: engine::TeamRef) -> Self {
        TeamRef {
            club: v.club,
            age_group: v.age_group,
            index: v.index,
        }
    }
}

#[napi(object)]
#[derive(Debug, Clone)]
pub struct Match {
    pub age_group: String,
    pub team_a: TeamRef,
    pub team_b: TeamRef,
    pub duration_mins: u32,
}

impl From<engine::Match> for Match {
    fn from(v: engine::Match) -> Self {
        Match {
            age_group: v.age_group,
            team_a: v.team_a.into(),
            team_b: v.team_b.into(),
            duration_mins: v.duration_mins,
        }
    }
}

#[napi(object)]
#[derive(Debug, Clone)]
pub struct PlacedMatch {
    pub age_group: String,
    pub team_a: TeamRef,
    pub team_b: TeamRef,
    pub duration_mins: u32,
    pub field: FieldId,
    /// HH:MM
    pub start_time: String,
    /// HH:MM
    pub end_time: String,
}

impl TryFrom<PlacedMatch> for engine::PlacedMatch {
    type Error = napi::Error;

    fn try_from(v: PlacedMatch) -> napi::Result<Self> {
        let parse = |s: &str| -> napi::Result<ClockTime> {
            s.parse::<ClockTime>()
                .map_err(|e| napi::Error::from_reason(e.to_string()))
        };
        Ok(engine::PlacedMatch {
            fixture: engine::Match {
                age_group: v.age_group,
                team_a: v.team_a.into(),
                team_b: v.team_b.into(),
                duration_mins: v.duration_mins,
            },
            field: v.field.into(),
            start_time: parse(&v.start_time)?,
            end_time: parse(&v.end_time)?,
        })
    }
}

impl From<engine::PlacedMatch> for PlacedMatch {
    fn from(v: engine::PlacedMatch) -> Self {
        PlacedMatch {
            age_group: v.fixture.age_group,
            team_a: v.fixture.team_a.into(),
            team_b: v.fixture.team_b.into(),
            duration_mins: v.fixture.duration_mins,
            field: v.field.into(),
            start_time: v.start_time.to_string(),
            end_time: v.end_time.to_string(),
        }
    }
}

#[napi(object)]
#[derive(Debug, Clone)]
pub struct RejectedMatch {
    pub candidate: Match,
    pub reason: RejectReason,
}

impl From<engine::RejectedMatch> for RejectedMatch {
    fn from(v: engine::RejectedMatch) -> Self {
        RejectedMatch {
            candidate: v.candidate.into(),
            reason: v.reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[napi(object)]
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub candidates: u32,
    pub placed: u32,
    pub rejected_cap: u32,
    pub rejected_no_field: u32,
}

impl From<engine::GenerationReport> for GenerationReport {
    fn from(v: engine::GenerationReport) -> Self {
        GenerationReport {
            candidates: v.candidates as u32,
            placed: v.placed as u32,
            rejected_cap: v.rejected_cap as u32,
            rejected_no_field: v.rejected_no_field as u32,
        }
    }
}

#[napi(object)]
#[derive(Debug, Clone)]
pub struct GenerateResult {
    pub schedule: Vec<PlacedMatch>,
    pub warnings: Vec<String>,
    pub rejected: Vec<RejectedMatch>,
    pub report: GenerationReport,
}

#[napi(object)]
#[derive(Debug, Clone)]
pub struct ScheduleResult {
    pub schedule: Vec<PlacedMatch>,
    pub warnings: Vec<String>,
}

impl From<&Planner> for ScheduleResult {
    fn from(p: &Planner) -> Self {
        ScheduleResult {
            schedule: p.schedule().iter().cloned().map(Into::into).collect(),
            warnings: p.warnings().to_vec(),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load(state: PlannerState, schedule: Vec<PlacedMatch>) -> napi::Result<Planner> {
    let schedule = schedule
        .into_iter()
        .map(engine::PlacedMatch::try_from)
        .collect::<napi::Result<Vec<_>>>()?;
    Ok(Planner::new(state.into()).with_schedule(schedule))
}

fn edit_error(e: matchday_engine::editor::EditError) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Exported functions
// ---------------------------------------------------------------------------

/// Generate a fresh schedule. Pass `seed` to make the shuffle repeatable.
#[napi]
pub fn generate(state: PlannerState, seed: Option<u32>) -> GenerateResult {
    let mut planner = Planner::new(state.into());
    let report = match seed {
        Some(seed) => planner.generate(&mut StdRng::seed_from_u64(u64::from(seed))),
        None => planner.generate(&mut rand::thread_rng()),
    };
    GenerateResult {
        schedule: planner.schedule().iter().cloned().map(Into::into).collect(),
        warnings: planner.warnings().to_vec(),
        rejected: planner.rejected().iter().cloned().map(Into::into).collect(),
        report: report.into(),
    }
}

/// Re-check an existing schedule and return its warnings.
#[napi]
pub fn validate(state: PlannerState, schedule: Vec<PlacedMatch>) -> napi::Result<Vec<String>> {
    Ok(load(state, schedule)?.warnings().to_vec())
}

#[napi]
pub fn swap_within_field(
    state: PlannerState,
    schedule: Vec<PlacedMatch>,
    field: FieldId,
    pos_a: u32,
    pos_b: u32,
) -> napi::Result<ScheduleResult> {
    let mut planner = load(state, schedule)?;
    planner
        .swap_within_field(field.into(), pos_a as usize, pos_b as usize)
        .map_err(edit_error)?;
    Ok((&planner).into())
}

#[napi]
pub fn move_match(
    state: PlannerState,
    schedule: Vec<PlacedMatch>,
    from_field: FieldId,
    from_pos: u32,
    to_field: FieldId,
    to_pos: Option<u32>,
) -> napi::Result<ScheduleResult> {
    let mut planner = load(state, schedule)?;
    planner
        .move_match(
            from_field.into(),
            from_pos as usize,
            to_field.into(),
            to_pos.map(|p| p as usize),
        )
        .map_err(edit_error)?;
    Ok((&planner).into())
}

#[napi]
pub fn swap_across_fields(
    state: PlannerState,
    schedule: Vec<PlacedMatch>,
    field_a: FieldId,
    pos_a: u32,
    field_b: FieldId,
    pos_b: u32,
) -> napi::Result<ScheduleResult> {
    let mut planner = load(state, schedule)?;
    planner
        .swap_across_fields(field_a.into(), pos_a as usize, field_b.into(), pos_b as usize)
        .map_err(edit_error)?;
    Ok((&planner).into())
}

/// Re-time every field with the state's current rules and requests.
#[napi]
pub fn apply_rules(state: PlannerState, schedule: Vec<PlacedMatch>) -> napi::Result<ScheduleResult> {
    let mut planner = load(state, schedule)?;
    planner.apply_rules();
    Ok((&planner).into())
}

/// CSV text (header plus one row per match) for download.
#[napi]
pub fn export_csv(schedule: Vec<PlacedMatch>) -> napi::Result<String> {
    let schedule = schedule
        .into_iter()
        .map(engine::PlacedMatch::try_from)
        .collect::<napi::Result<Vec<_>>>()?;
    Ok(matchday_engine::export::to_csv(&schedule))
}
