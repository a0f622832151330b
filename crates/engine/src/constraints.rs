use std::collections::BTreeMap;

use crate::clock::ClockTime;
use crate::model::{ConstraintOverride, DayWindow, FieldId, FieldPolicy};
use crate::rules::RulesTable;

/// Age groups limited to Field A unless a request says otherwise.
const DEFAULT_FIELD_A_ONLY: &[&str] = &["U12", "U13"];

/// Age groups that do not kick off before a fixed afternoon time by default.
const DEFAULT_EARLIEST_START: &[(&str, ClockTime)] = &[("U12", ClockTime::from_hm(12, 0))];

/// Resolves an age group's effective allowed fields and time window by
/// layering explicit requests over the hard-coded defaults.
///
/// Pure lookups; a request time that does not parse counts as "not set".
#[derive(Debug, Clone, Copy)]
pub struct ConstraintResolver<'a> {
    requests: &'a BTreeMap<String, ConstraintOverride>,
}

impl<'a> ConstraintResolver<'a> {
    pub fn new(requests: &'a BTreeMap<String, ConstraintOverride>) -> Self {
        ConstraintResolver { requests }
    }

    fn request(&self, age: &str) -> Option<&'a ConstraintOverride> {
        self.requests.get(age)
    }

    /// Fields this age group may play on, in scheduling order.
    pub fn allowed_fields(&self, age: &str) -> Vec<FieldId> {
        let policy = self
            .request(age)
            .map(|r| r.field_policy)
            .unwrap_or(FieldPolicy::Default);
        policy.fields().unwrap_or_else(|| {
            if DEFAULT_FIELD_A_ONLY.contains(&age) {
                vec![FieldId::A]
            } else {
                FieldId::ALL.to_vec()
            }
        })
    }

    pub fn allows_field(&self, age: &str, field: FieldId) -> bool {
        self.allowed_fields(age).contains(&field)
    }

    pub fn earliest_start(&self, age: &str, day_start: ClockTime) -> ClockTime {
        self.request(age)
            .and_then(|r| r.earliest_start.as_deref())
            .and_then(ClockTime::parse)
            .or_else(|| {
                DEFAULT_EARLIEST_START
                    .iter()
                    .find(|(a, _)| *a == age)
                    .map(|(_, t)| *t)
            })
            .unwrap_or(day_start)
    }

    pub fn latest_end(&self, age: &str, day_end: ClockTime) -> ClockTime {
        self.request(age)
            .and_then(|r| r.latest_end.as_deref())
            .and_then(ClockTime::parse)
            .unwrap_or(day_end)
    }

    pub fn is_priority(&self, age: &str) -> bool {
        self.request(age).map(|r| r.priority).unwrap_or(false)
    }
}

/// Everything placement and validation read: current rules, resolved
/// constraints and the day window.
#[derive(Debug, Clone, Copy)]
pub struct SchedulingContext<'a> {
    pub rules: &'a RulesTable,
    pub resolver: ConstraintResolver<'a>,
    pub window: DayWindow,
}

impl<'a> SchedulingContext<'a> {
    pub fn new(
        rules: &'a RulesTable,
        requests: &'a BTreeMap<String, ConstraintOverride>,
        window: DayWindow,
    ) -> Self {
        SchedulingContext {
            rules,
            resolver: ConstraintResolver::new(requests),
            window,
        }
    }

    /// Effective earliest kickoff for an age group.
    pub fn earliest_start(&self, age: &str) -> ClockTime {
        self.resolver.earliest_start(age, self.window.start)
    }

    /// Effective latest finish for an age group.
    pub fn latest_end(&self, age: &str) -> ClockTime {
        self.resolver.latest_end(age, self.window.end)
    }
}
