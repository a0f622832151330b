use log::{debug, warn};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::constraints::ConstraintResolver;
use crate::model::Match;
use crate::roster::Roster;
use crate::rules::RulesTable;

/// Every valid pairing for the roster: one candidate per unordered pair of
/// same-age teams from different clubs, without any ordering applied.
///
/// Age groups some club entered but which have no rule cannot be timed and
/// are skipped.
pub fn all_pairings(roster: &Roster, rules: &RulesTable) -> Vec<Match> {
    for age in roster.age_groups() {
        if !rules.contains(age) {
            warn!("Age group '{}' has teams but no match rule; skipping", age);
        }
    }

    let mut matches = Vec::new();
    for age in rules.age_groups() {
        let Some(duration_mins) = rules.duration_mins(age) else {
            continue;
        };
        let teams = roster.teams_in(age);
        for (i, a) in teams.iter().enumerate() {
            for b in &teams[i + 1..] {
                if a.club != b.club {
                    matches.push(Match {
                        age_group: age.to_string(),
                        team_a: a.clone(),
                        team_b: b.clone(),
                        duration_mins,
                    });
                }
            }
        }
    }
    matches
}

/// Build the ordered candidate list the scheduler consumes.
///
/// The full list is shuffled with `rng`, then priority age groups are moved to
/// the front. The partition is stable, so the shuffled order survives within
/// each half.
pub fn build_matches<R: Rng + ?Sized>(
    roster: &Roster,
    rules: &RulesTable,
    resolver: &ConstraintResolver<'_>,
    rng: &mut R,
) -> Vec<Match> {
    let mut matches = all_pairings(roster, rules);
    matches.shuffle(rng);
    matches.sort_by_key(|m| !resolver.is_priority(&m.age_group));
    debug!("Built {} candidate matches", matches.len());
    matches
}
