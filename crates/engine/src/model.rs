use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::clock::ClockTime;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// One of the physical playing surfaces. Each field keeps its own time cursor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldId {
    #[serde(alias = "Field A", alias = "a")]
    A,
    #[serde(alias = "Field B", alias = "b")]
    B,
}

impl FieldId {
    /// All fields in scheduling order. The order doubles as the tie-break when
    /// two fields would finish a match at the same time.
    pub const ALL: [FieldId; 2] = [FieldId::A, FieldId::B];

    pub fn name(self) -> &'static str {
        match self {
            FieldId::A => "Field A",
            FieldId::B => "Field B",
        }
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which fields an age group may use, as requested by the operator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldPolicy {
    /// Fall back to the hard-coded default for the age group.
    #[default]
    #[serde(alias = "default", alias = "")]
    Default,
    #[serde(alias = "A", alias = "a")]
    AOnly,
    #[serde(alias = "B", alias = "b")]
    BOnly,
    #[serde(alias = "any", alias = "both")]
    Any,
}

impl FieldPolicy {
    /// The explicit field set for this policy, or `None` for `Default`.
    pub fn fields(self) -> Option<Vec<FieldId>> {
        match self {
            FieldPolicy::Default => None,
            FieldPolicy::AOnly => Some(vec![FieldId::A]),
            FieldPolicy::BOnly => Some(vec![FieldId::B]),
            FieldPolicy::Any => Some(FieldId::ALL.to_vec()),
        }
    }
}

/// The day's playing window. Same-day only; `end` is after `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: ClockTime,
    pub end: ClockTime,
}

impl DayWindow {
    pub const DEFAULT: DayWindow = DayWindow {
        start: ClockTime::from_hm(8, 0),
        end: ClockTime::from_hm(17, 0),
    };

    /// `None` unless both times parse and the end is after the start.
    pub fn parse(start: &str, end: &str) -> Option<DayWindow> {
        let start = ClockTime::parse(start)?;
        let end = ClockTime::parse(end)?;
        (end > start).then_some(DayWindow { start, end })
    }
}

impl Default for DayWindow {
    fn default() -> Self {
        DayWindow::DEFAULT
    }
}

// ---------------------------------------------------------------------------
// Rules and roster
// ---------------------------------------------------------------------------

/// Match duration parameters for one age group.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AgeGroupRule {
    pub halves: u32,
    #[serde(alias = "halfDuration")]
    pub half_duration_mins: u32,
    #[serde(default, alias = "break", alias = "halftime")]
    pub halftime_mins: u32,
}

impl AgeGroupRule {
    pub const fn new(halves: u32, half_duration_mins: u32, halftime_mins: u32) -> Self {
        AgeGroupRule {
            halves,
            half_duration_mins,
            halftime_mins,
        }
    }

    /// Total playing time: halves × half duration + halftime. Saturates
    /// rather than overflowing on absurd saved rules.
    pub fn duration_mins(&self) -> u32 {
        self.halves
            .saturating_mul(self.half_duration_mins)
            .saturating_add(self.halftime_mins)
    }

    pub fn is_valid(&self) -> bool {
        self.halves >= 1 && self.half_duration_mins >= 1
    }
}

/// How many teams a club fields in one age group, plus optional game caps.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TeamEntry {
    pub count: u32,
    /// Default cap for every team of this club in this age group.
    /// `None` means unlimited.
    pub desired_games_per_team: Option<u32>,
    /// Per-team overrides, indexed by team index - 1. Unset slots fall back
    /// to `desired_games_per_team`.
    pub per_team_caps: Vec<Option<u32>>,
}

impl TeamEntry {
    pub fn with_count(count: u32) -> Self {
        TeamEntry {
            count,
            ..TeamEntry::default()
        }
    }

    /// Cap for the team with the given 1-based index.
    pub fn cap_for(&self, index: u32) -> Option<u32> {
        index
            .checked_sub(1)
            .and_then(|i| self.per_team_caps.get(i as usize).copied().flatten())
            .or(self.desired_games_per_team)
    }
}

// The persisted shape stores either a bare count or the full object; caps
// typed into a form may arrive as strings or blanks.
impl<'de> Deserialize<'de> for TeamEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Count(u32),
            Full {
                #[serde(default)]
                count: u32,
                #[serde(default, alias = "desired", alias = "desiredGames")]
                #[serde(rename = "desiredGamesPerTeam")]
                desired_games_per_team: Option<serde_json::Value>,
                #[serde(default, alias = "caps")]
                #[serde(rename = "perTeamCaps")]
                per_team_caps: Vec<serde_json::Value>,
            },
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Count(count) => TeamEntry::with_count(count),
            Repr::Full {
                count,
                desired_games_per_team,
                per_team_caps,
            } => TeamEntry {
                count,
                desired_games_per_team: desired_games_per_team.as_ref().and_then(lenient_cap),
                per_team_caps: per_team_caps.iter().map(lenient_cap).collect(),
            },
        })
    }
}

/// Field deserializer that reads an explicit `null` as the type's default.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_cap(value: &serde_json::Value) -> Option<u32> {
    match value {
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A club and the teams it brings, keyed by age-group label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Club {
    pub name: String,
    #[serde(default)]
    pub teams: BTreeMap<String, TeamEntry>,
}

impl Club {
    pub fn new(name: impl Into<String>) -> Self {
        Club {
            name: name.into(),
            teams: BTreeMap::new(),
        }
    }
}

/// Per-age-group scheduling request, overriding the hard-coded defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ConstraintOverride {
    /// Schedule this age group's matches before everyone else's.
    #[serde(deserialize_with = "null_as_default")]
    pub priority: bool,
    /// Raw `HH:MM`; kept verbatim so a malformed value can fall back to the
    /// default instead of failing the load.
    #[serde(alias = "start")]
    pub earliest_start: Option<String>,
    #[serde(alias = "end")]
    pub latest_end: Option<String>,
    #[serde(alias = "field", deserialize_with = "null_as_default")]
    pub field_policy: FieldPolicy,
}

// ---------------------------------------------------------------------------
// Matches
// ---------------------------------------------------------------------------

/// Identifies a team: the `index`-th team (1-based) a club fields in an age group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct TeamRef {
    pub club: String,
    pub age_group: String,
    pub index: u32,
}

impl TeamRef {
    pub fn new(club: impl Into<String>, age_group: impl Into<String>, index: u32) -> Self {
        TeamRef {
            club: club.into(),
            age_group: age_group.into(),
            index,
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} {} #{}", self.club, self.age_group, self.index)
    }
}

/// A candidate pairing produced by the match builder, not yet placed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub age_group: String,
    pub team_a: TeamRef,
    pub team_b: TeamRef,
    pub duration_mins: u32,
}

impl Match {
    pub fn involves(&self, team: &TeamRef) -> bool {
        &self.team_a == team || &self.team_b == team
    }

    /// True when either side of `self` belongs to a club on either side of `other`.
    pub fn shares_club_with(&self, other: &Match) -> bool {
        let ours = [&self.team_a.club, &self.team_b.club];
        ours.iter()
            .any(|c| **c == other.team_a.club || **c == other.team_b.club)
    }

    pub fn label(&self) -> String {
        format!(
            "{} vs {}",
            self.team_a.display_name(),
            self.team_b.display_name()
        )
    }
}

/// A match with a field and concrete clock times.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlacedMatch {
    #[serde(flatten)]
    pub fixture: Match,
    pub field: FieldId,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
}

impl PlacedMatch {
    pub fn place(fixture: Match, field: FieldId, start_time: ClockTime) -> Self {
        let end_time = start_time + fixture.duration_mins;
        PlacedMatch {
            fixture,
            field,
            start_time,
            end_time,
        }
    }

    pub fn age_group(&self) -> &str {
        &self.fixture.age_group
    }

    /// Canonical ordering key: start time, then field.
    pub fn sort_key(&self) -> (ClockTime, FieldId) {
        (self.start_time, self.field)
    }
}

/// Sort a schedule into canonical order (start ascending, then field name).
pub fn sort_canonical(schedule: &mut [PlacedMatch]) {
    schedule.sort_by_key(PlacedMatch::sort_key);
}

// ---------------------------------------------------------------------------
// Scheduler output types
// ---------------------------------------------------------------------------

/// Why a candidate match did not make it into the schedule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RejectReason {
    /// One of the two teams had already reached its game cap.
    CapReached,
    /// No allowed field had room inside the age group's time window.
    NoFeasibleField,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RejectedMatch {
    pub candidate: Match,
    pub reason: RejectReason,
}

/// Counts summarising one generation pass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerationReport {
    pub candidates: usize,
    pub placed: usize,
    pub rejected_cap: usize,
    pub rejected_no_field: usize,
}

/// The complete scheduler output: placed matches in canonical order plus
/// every candidate that was dropped and why.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleOutcome {
    pub schedule: Vec<PlacedMatch>,
    pub rejected: Vec<RejectedMatch>,
}

impl ScheduleOutcome {
    pub fn report(&self) -> GenerationReport {
        let rejected_cap = self
            .rejected
            .iter()
            .filter(|r| r.reason == RejectReason::CapReached)
            .count();
        GenerationReport {
            candidates: self.schedule.len() + self.rejected.len(),
            placed: self.schedule.len(),
            rejected_cap,
            rejected_no_field: self.rejected.len() - rejected_cap,
        }
    }
}
