use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::AgeGroupRule;

/// Minutes a field stays empty between the end of one match and the next kickoff.
pub const BETWEEN_MATCHES_BREAK_MINS: u32 = 7;

const DEFAULT_RULES: &[(&str, AgeGroupRule)] = &[
    ("U8", AgeGroupRule::new(2, 15, 5)),
    ("U9", AgeGroupRule::new(2, 20, 5)),
    ("U10", AgeGroupRule::new(2, 20, 5)),
    ("U11", AgeGroupRule::new(2, 20, 5)),
    ("U12", AgeGroupRule::new(2, 20, 5)),
    ("U13", AgeGroupRule::new(2, 25, 5)),
];

/// Age-group label -> match duration rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct RulesTable {
    rules: BTreeMap<String, AgeGroupRule>,
}

impl Default for RulesTable {
    fn default() -> Self {
        RulesTable {
            rules: DEFAULT_RULES
                .iter()
                .map(|(age, rule)| (age.to_string(), *rule))
                .collect(),
        }
    }
}

impl RulesTable {
    pub fn empty() -> Self {
        RulesTable {
            rules: BTreeMap::new(),
        }
    }

    pub fn get(&self, age: &str) -> Option<&AgeGroupRule> {
        self.rules.get(age)
    }

    pub fn contains(&self, age: &str) -> bool {
        self.rules.contains_key(age)
    }

    /// Insert or replace a rule. Rules with zero halves or zero-length halves
    /// are refused and the table is left unchanged.
    pub fn set(&mut self, age: impl Into<String>, rule: AgeGroupRule) -> bool {
        if !rule.is_valid() {
            return false;
        }
        self.rules.insert(age.into(), rule);
        true
    }

    /// Current total duration for an age group, if it has a rule.
    pub fn duration_mins(&self, age: &str) -> Option<u32> {
        self.get(age).map(AgeGroupRule::duration_mins)
    }

    /// Age-group labels ordered youngest first ("U8" before "U10").
    pub fn age_groups(&self) -> Vec<&str> {
        let mut ages: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        ages.sort_by_key(|age| (age_rank(age), age.to_string()));
        ages
    }
}

fn age_rank(age: &str) -> u32 {
    age.trim_start_matches(|c: char| !c.is_ascii_digit())
        .parse()
        .unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_matches_known_durations() {
        let rules = RulesTable::default();
        assert_eq!(rules.duration_mins("U8"), Some(35));
        assert_eq!(rules.duration_mins("U11"), Some(45));
        assert_eq!(rules.duration_mins("U13"), Some(55));
        assert_eq!(rules.duration_mins("U19"), None);
    }

    #[test]
    fn age_groups_sort_numerically() {
        let rules = RulesTable::default();
        assert_eq!(
            rules.age_groups(),
            vec!["U8", "U9", "U10", "U11", "U12", "U13"]
        );
    }

    #[test]
    fn invalid_rule_is_refused() {
        let mut rules = RulesTable::default();
        assert!(!rules.set("U8", AgeGroupRule::new(2, 0, 5)));
        assert_eq!(rules.duration_mins("U8"), Some(35));
        assert!(rules.set("U8", AgeGroupRule::new(2, 10, 0)));
        assert_eq!(rules.duration_mins("U8"), Some(20));
    }

    #[test]
    fn deserializes_from_persisted_map() {
        let rules: RulesTable = serde_json::from_str(
            r#"{"U8": {"halves": 2, "halfDuration": 12, "break": 4}}"#,
        )
        .unwrap();
        assert_eq!(rules.duration_mins("U8"), Some(28));
        assert!(!rules.contains("U9"));
    }
}
