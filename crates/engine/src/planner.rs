use std::collections::BTreeMap;

use log::info;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::clock::ClockTime;
use crate::constraints::SchedulingContext;
use crate::editor::{self, EditError};
use crate::matches::build_matches;
use crate::model::{
    null_as_default, sort_canonical, AgeGroupRule, ConstraintOverride, DayWindow, FieldId,
    GenerationReport, PlacedMatch, RejectedMatch,
};
use crate::roster::Roster;
use crate::rules::RulesTable;
use crate::solver::schedule_matches;
use crate::validator::validate;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    #[error("Invalid time '{0}' -- expected HH:MM")]
    InvalidTime(String),
    #[error("End time {end} must be after start time {start}")]
    EmptyWindow { start: String, end: String },
    #[error("Invalid rule for {0}: halves and half duration must be at least 1")]
    InvalidRule(String),
    #[error("Invalid saved state: {0}")]
    InvalidState(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Persisted configuration
// ---------------------------------------------------------------------------

fn default_start() -> String {
    DayWindow::DEFAULT.start.to_string()
}

fn default_end() -> String {
    DayWindow::DEFAULT.end.to_string()
}

/// The saved planner document: everything the UI persists between sessions.
/// Missing or null fields take defaults and unknown fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PlannerConfig {
    #[serde(deserialize_with = "null_as_default")]
    pub clubs: Roster,
    #[serde(deserialize_with = "null_as_default")]
    pub start_time: String,
    #[serde(deserialize_with = "null_as_default")]
    pub end_time: String,
    #[serde(deserialize_with = "null_as_default")]
    pub host_name: String,
    pub logo: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub age_rules: RulesTable,
    #[serde(alias = "constraints", deserialize_with = "null_as_default")]
    pub requests: BTreeMap<String, ConstraintOverride>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            clubs: Roster::new(),
            start_time: default_start(),
            end_time: default_end(),
            host_name: String::new(),
            logo: None,
            age_rules: RulesTable::default(),
            requests: BTreeMap::new(),
        }
    }
}

impl PlannerConfig {
    /// The configured day window; an unusable saved window falls back to the
    /// default 08:00-17:00.
    pub fn day_window(&self) -> DayWindow {
        DayWindow::parse(&self.start_time, &self.end_time).unwrap_or_default()
    }

    pub fn context(&self) -> SchedulingContext<'_> {
        SchedulingContext::new(&self.age_rules, &self.requests, self.day_window())
    }
}

// ---------------------------------------------------------------------------
// Planner
// ---------------------------------------------------------------------------

/// The whole scheduling state: configuration plus the current schedule,
/// its warnings and the candidates the last generation dropped.
///
/// Schedule and warnings are always replaced together. Operations that fail
/// leave every part of the state as it was.
#[derive(Debug, Clone, Default)]
pub struct Planner {
    pub config: PlannerConfig,
    schedule: Vec<PlacedMatch>,
    warnings: Vec<String>,
    rejected: Vec<RejectedMatch>,
}

impl Planner {
    pub fn new(config: PlannerConfig) -> Self {
        Planner {
            config,
            ..Planner::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, PlannerError> {
        Ok(Planner::new(serde_json::from_str(json)?))
    }

    pub fn to_json(&self) -> Result<String, PlannerError> {
        Ok(serde_json::to_string_pretty(&self.config)?)
    }

    /// Adopt a schedule produced elsewhere (e.g. restored by the UI) and
    /// validate it against the current configuration.
    pub fn with_schedule(mut self, schedule: Vec<PlacedMatch>) -> Self {
        self.replace_schedule(schedule);
        self
    }

    pub fn schedule(&self) -> &[PlacedMatch] {
        &self.schedule
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn rejected(&self) -> &[RejectedMatch] {
        &self.rejected
    }

    pub fn roster_mut(&mut self) -> &mut Roster {
        &mut self.config.clubs
    }

    /// One field's matches in chronological order (positions are 1-based
    /// indexes into this list).
    pub fn field_matches(&self, field: FieldId) -> Vec<PlacedMatch> {
        editor::field_matches(&self.schedule, field)
    }

    fn replace_schedule(&mut self, mut schedule: Vec<PlacedMatch>) {
        sort_canonical(&mut schedule);
        self.warnings = validate(&schedule, &self.config.context());
        self.schedule = schedule;
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    pub fn set_day_window(&mut self, start: &str, end: &str) -> Result<(), PlannerError> {
        let s = ClockTime::parse(start)
            .ok_or_else(|| PlannerError::InvalidTime(start.to_string()))?;
        let e = ClockTime::parse(end)
            .ok_or_else(|| PlannerError::InvalidTime(end.to_string()))?;
        if e <= s {
            return Err(PlannerError::EmptyWindow {
                start: s.to_string(),
                end: e.to_string(),
            });
        }
        self.config.start_time = s.to_string();
        self.config.end_time = e.to_string();
        Ok(())
    }

    pub fn set_rule(&mut self, age: &str, rule: AgeGroupRule) -> Result<(), PlannerError> {
        if self.config.age_rules.set(age, rule) {
            Ok(())
        } else {
            Err(PlannerError::InvalidRule(age.to_string()))
        }
    }

    pub fn set_request(&mut self, age: &str, request: ConstraintOverride) {
        self.config.requests.insert(age.to_string(), request);
    }

    // -----------------------------------------------------------------------
    // Generation and edits
    // -----------------------------------------------------------------------

    /// Build, shuffle and place every candidate match, replacing the current
    /// schedule, warnings and rejections.
    pub fn generate<R: Rng + ?Sized>(&mut self, rng: &mut R) -> GenerationReport {
        let ctx = self.config.context();
        let candidates = build_matches(&self.config.clubs, &self.config.age_rules, &ctx.resolver, rng);
        let outcome = schedule_matches(candidates, &self.config.clubs.cap_table(), &ctx);
        let report = outcome.report();
        self.rejected = outcome.rejected;
        self.replace_schedule(outcome.schedule);
        report
    }

    /// Re-time every field with the current rules and requests.
    pub fn apply_rules(&mut self) {
        let schedule = editor::recompute_all(&self.schedule, &self.config.context());
        info!("Re-timed {} matches with current rules", schedule.len());
        self.replace_schedule(schedule);
    }

    pub fn swap_within_field(
        &mut self,
        field: FieldId,
        pos_a: usize,
        pos_b: usize,
    ) -> Result<(), EditError> {
        let schedule =
            editor::swap_within_field(&self.schedule, field, pos_a, pos_b, &self.config.context())?;
        self.replace_schedule(schedule);
        Ok(())
    }

    pub fn move_match(
        &mut self,
        from_field: FieldId,
        from_pos: usize,
        to_field: FieldId,
        to_pos: Option<usize>,
    ) -> Result<(), EditError> {
        let schedule = editor::move_match(
            &self.schedule,
            from_field,
            from_pos,
            to_field,
            to_pos,
            &self.config.context(),
        )?;
        self.replace_schedule(schedule);
        Ok(())
    }

    pub fn swap_across_fields(
        &mut self,
        field_a: FieldId,
        pos_a: usize,
        field_b: FieldId,
        pos_b: usize,
    ) -> Result<(), EditError> {
        let schedule = editor::swap_across_fields(
            &self.schedule,
            field_a,
            pos_a,
            field_b,
            pos_b,
            &self.config.context(),
        )?;
        self.replace_schedule(schedule);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::model::{FieldPolicy, RejectReason};

    fn planner_with(entries: &[(&str, &str, u32)]) -> Planner {
        let mut planner = Planner::default();
        let rules = planner.config.age_rules.clone();
        for (club, age, count) in entries {
            let roster = planner.roster_mut();
            if roster.club(club).is_none() {
                roster.add_club(club).unwrap();
            }
            roster.add_teams(club, age, *count, &rules).unwrap();
        }
        planner
    }

    #[test]
    fn loads_partial_state_with_defaults() {
        let planner = Planner::from_json(
            r#"{
                "clubs": [
                    { "name": "Lions", "teams": { "U8": 2 } },
                    { "name": "Tigers", "teams": { "U8": { "count": 1, "desiredGamesPerTeam": 1 } } }
                ],
                "startTime": "09:00",
                "hostName": "Lions RFC",
                "somethingNew": true
            }"#,
        )
        .unwrap();
        let cfg = &planner.config;
        assert_eq!(cfg.clubs.clubs().len(), 2);
        assert_eq!(cfg.end_time, "17:00");
        assert_eq!(cfg.host_name, "Lions RFC");
        assert_eq!(cfg.logo, None);
        assert_eq!(cfg.age_rules, RulesTable::default());
        assert_eq!(cfg.day_window().start, ClockTime::from_hm(9, 0));
    }

    #[test]
    fn null_fields_load_as_defaults() {
        let planner = Planner::from_json(
            r#"{
                "clubs": null,
                "startTime": null,
                "endTime": "16:00",
                "hostName": null,
                "ageRules": null,
                "requests": { "U9": { "priority": null, "fieldPolicy": null } }
            }"#,
        )
        .unwrap();
        let cfg = &planner.config;
        assert!(cfg.clubs.clubs().is_empty());
        assert_eq!(cfg.host_name, "");
        assert_eq!(cfg.age_rules, RulesTable::default());
        assert_eq!(cfg.requests["U9"], ConstraintOverride::default());
        assert_eq!(cfg.day_window(), DayWindow::DEFAULT);
    }

    #[test]
    fn duplicate_saved_clubs_are_scheduled_once() {
        let mut planner = Planner::from_json(
            r#"{
                "clubs": [
                    { "name": "Lions", "teams": { "U8": 1 } },
                    { "name": "Lions", "teams": { "U8": 1 } },
                    { "name": "lions", "teams": { "U8": 1 } },
                    { "name": "Tigers", "teams": { "U8": 1 } }
                ]
            }"#,
        )
        .unwrap();
        let report = planner.generate(&mut ChaCha8Rng::seed_from_u64(2));
        assert_eq!(report.candidates, 1);
        assert_eq!(planner.schedule().len(), 1);
        let m = &planner.schedule()[0];
        assert_ne!(
            m.fixture.team_a.club.to_lowercase(),
            m.fixture.team_b.club.to_lowercase()
        );
    }

    #[test]
    fn oversized_saved_rule_is_rejected_not_fatal() {
        let mut planner = Planner::from_json(
            r#"{
                "clubs": [
                    { "name": "Lions", "teams": { "U8": 1 } },
                    { "name": "Tigers", "teams": { "U8": 1 } }
                ],
                "ageRules": { "U8": { "halves": 100000, "halfDuration": 100000 } }
            }"#,
        )
        .unwrap();
        let report = planner.generate(&mut ChaCha8Rng::seed_from_u64(1));
        assert_eq!(report.placed, 0);
        assert_eq!(planner.rejected()[0].reason, RejectReason::NoFeasibleField);
    }

    #[test]
    fn save_then_load_keeps_config() {
        let mut planner = planner_with(&[("Lions", "U9", 2), ("Tigers", "U9", 1)]);
        planner.config.logo = Some("logo.png".into());
        planner.set_request(
            "U9",
            ConstraintOverride {
                priority: true,
                earliest_start: Some("10:00".into()),
                latest_end: None,
                field_policy: FieldPolicy::BOnly,
            },
        );
        let json = planner.to_json().unwrap();
        let back = Planner::from_json(&json).unwrap();
        assert_eq!(back.config, planner.config);
    }

    #[test]
    fn unusable_saved_window_falls_back() {
        let planner = Planner::from_json(r#"{"startTime": "late", "endTime": "07:00"}"#).unwrap();
        assert_eq!(planner.config.day_window(), DayWindow::DEFAULT);
    }

    #[test]
    fn bad_day_window_is_a_no_op() {
        let mut planner = Planner::default();
        assert!(planner.set_day_window("9am", "17:00").is_err());
        assert!(planner.set_day_window("17:00", "09:00").is_err());
        assert_eq!(planner.config.start_time, "08:00");
        planner.set_day_window("09:00", "16:00").unwrap();
        assert_eq!(planner.config.end_time, "16:00");
    }

    #[test]
    fn generate_replaces_schedule_and_warnings() {
        let mut planner = planner_with(&[("Lions", "U8", 1), ("Tigers", "U8", 1)]);
        planner.set_day_window("08:00", "09:30").unwrap();
        let report = planner.generate(&mut ChaCha8Rng::seed_from_u64(1));
        assert_eq!(report.placed, 1);
        assert_eq!(planner.schedule().len(), 1);
        assert!(planner.warnings().is_empty());
        assert!(planner.rejected().is_empty());
    }

    #[test]
    fn refused_move_leaves_state_untouched() {
        let mut planner =
            planner_with(&[("Lions", "U13", 1), ("Tigers", "U13", 1), ("Bears", "U13", 1)]);
        planner.generate(&mut ChaCha8Rng::seed_from_u64(3));
        let before = planner.schedule().to_vec();
        let warnings_before = planner.warnings().to_vec();

        let err = planner.move_match(FieldId::A, 1, FieldId::B, None).unwrap_err();
        assert_eq!(err, EditError::FieldNotAllowed("U13".into(), FieldId::B));
        assert_eq!(planner.schedule(), before.as_slice());
        assert_eq!(planner.warnings(), warnings_before.as_slice());
    }

    #[test]
    fn edits_surface_warnings_without_blocking() {
        let mut planner = planner_with(&[("Lions", "U9", 1), ("Tigers", "U9", 1)]);
        planner.generate(&mut ChaCha8Rng::seed_from_u64(0));
        assert_eq!(planner.field_matches(FieldId::A).len(), 1);

        // Narrow U9 to Field B after the fact: the existing placement drifts.
        planner.set_request(
            "U9",
            ConstraintOverride {
                field_policy: FieldPolicy::BOnly,
                ..ConstraintOverride::default()
            },
        );
        planner.apply_rules();
        assert_eq!(planner.warnings().len(), 1);

        planner.move_match(FieldId::A, 1, FieldId::B, None).unwrap();
        assert!(planner.warnings().is_empty());
        assert_eq!(planner.field_matches(FieldId::B).len(), 1);
    }

    #[test]
    fn apply_rules_retimes_existing_matches() {
        let mut planner = planner_with(&[("Lions", "U8", 1), ("Tigers", "U8", 1), ("Bears", "U8", 1)]);
        planner.generate(&mut ChaCha8Rng::seed_from_u64(5));
        planner.set_rule("U8", AgeGroupRule::new(2, 10, 0)).unwrap();
        assert!(planner.set_rule("U8", AgeGroupRule::new(0, 10, 0)).is_err());
        planner.apply_rules();
        for m in planner.schedule() {
            assert_eq!(m.end_time.minutes() - m.start_time.minutes(), 20);
        }
    }
}
