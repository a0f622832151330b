use std::collections::HashMap;

use log::warn;
use serde::{Deserialize, Deserializer, Serialize};

use crate::model::{Club, TeamEntry, TeamRef};
use crate::rules::RulesTable;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RosterError {
    #[error("Club name cannot be empty")]
    EmptyClubName,
    #[error("Club '{0}' already exists")]
    DuplicateClub(String),
    #[error("Club '{0}' not found")]
    UnknownClub(String),
    #[error("Team count must be at least 1")]
    ZeroTeamCount,
    #[error("Age group '{0}' has no match rule")]
    UnknownAgeGroup(String),
    #[error("Club '{0}' has no {1} team #{2}")]
    UnknownTeam(String, String, u32),
    #[error("Too many {1} teams for club '{0}'")]
    TeamCountOverflow(String, String),
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// The clubs attending, in the order they were added.
///
/// Every mutation either applies fully or returns an error and leaves the
/// roster untouched. Loaded rosters go through the same name rules as
/// `add_club`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct Roster {
    clubs: Vec<Club>,
}

impl Roster {
    pub fn new() -> Self {
        Roster::default()
    }

    pub fn clubs(&self) -> &[Club] {
        &self.clubs
    }

    pub fn club(&self, name: &str) -> Option<&Club> {
        self.clubs.iter().find(|c| c.name == name)
    }

    fn club_mut(&mut self, name: &str) -> Result<&mut Club, RosterError> {
        self.clubs
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| RosterError::UnknownClub(name.to_string()))
    }

    pub fn add_club(&mut self, name: &str) -> Result<(), RosterError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RosterError::EmptyClubName);
        }
        if self
            .clubs
            .iter()
            .any(|c| c.name.to_lowercase() == name.to_lowercase())
        {
            return Err(RosterError::DuplicateClub(name.to_string()));
        }
        self.clubs.push(Club::new(name));
        Ok(())
    }

    pub fn remove_club(&mut self, name: &str) -> Result<Club, RosterError> {
        let pos = self
            .clubs
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| RosterError::UnknownClub(name.to_string()))?;
        Ok(self.clubs.remove(pos))
    }

    /// Add `count` more teams for a club in an age group.
    pub fn add_teams(
        &mut self,
        club: &str,
        age: &str,
        count: u32,
        rules: &RulesTable,
    ) -> Result<u32, RosterError> {
        if count == 0 {
            return Err(RosterError::ZeroTeamCount);
        }
        if !rules.contains(age) {
            return Err(RosterError::UnknownAgeGroup(age.to_string()));
        }
        let entry = self.club_mut(club)?.teams.entry(age.to_string()).or_default();
        entry.count = entry
            .count
            .checked_add(count)
            .ok_or_else(|| RosterError::TeamCountOverflow(club.to_string(), age.to_string()))?;
        Ok(entry.count)
    }

    /// Set the team count directly. Zero removes the age group from the club.
    pub fn set_team_count(&mut self, club: &str, age: &str, count: u32) -> Result<(), RosterError> {
        let club = self.club_mut(club)?;
        if count == 0 {
            club.teams.remove(age);
        } else {
            let entry = club.teams.entry(age.to_string()).or_default();
            entry.count = count;
            entry.per_team_caps.truncate(count as usize);
        }
        Ok(())
    }

    pub fn set_desired_games(
        &mut self,
        club: &str,
        age: &str,
        games: Option<u32>,
    ) -> Result<(), RosterError> {
        let entry = self.entry_mut(club, age)?;
        entry.desired_games_per_team = games;
        Ok(())
    }

    /// Set or clear the cap for one team (1-based index).
    pub fn set_team_cap(
        &mut self,
        club: &str,
        age: &str,
        index: u32,
        cap: Option<u32>,
    ) -> Result<(), RosterError> {
        let entry = self.entry_mut(club, age)?;
        if index == 0 || index > entry.count {
            return Err(RosterError::UnknownTeam(club.to_string(), age.to_string(), index));
        }
        let slot = (index - 1) as usize;
        if entry.per_team_caps.len() <= slot {
            entry.per_team_caps.resize(slot + 1, None);
        }
        entry.per_team_caps[slot] = cap;
        Ok(())
    }

    fn entry_mut(&mut self, club: &str, age: &str) -> Result<&mut TeamEntry, RosterError> {
        self.club_mut(club)?
            .teams
            .get_mut(age)
            .ok_or_else(|| RosterError::UnknownAgeGroup(age.to_string()))
    }

    /// Every team in an age group, in club order then index order.
    pub fn teams_in(&self, age: &str) -> Vec<TeamRef> {
        self.clubs
            .iter()
            .flat_map(|club| {
                let count = club.teams.get(age).map(|e| e.count).unwrap_or(0);
                (1..=count).map(move |i| TeamRef::new(club.name.clone(), age, i))
            })
            .collect()
    }

    /// Every age-group label any club has entered teams for.
    pub fn age_groups(&self) -> Vec<&str> {
        let mut ages: Vec<&str> = self
            .clubs
            .iter()
            .flat_map(|c| c.teams.iter())
            .filter(|(_, e)| e.count > 0)
            .map(|(age, _)| age.as_str())
            .collect();
        ages.sort_unstable();
        ages.dedup();
        ages
    }

    /// Effective game cap for a team; `None` means unlimited.
    pub fn effective_cap(&self, team: &TeamRef) -> Option<u32> {
        self.club(&team.club)
            .and_then(|c| c.teams.get(&team.age_group))
            .and_then(|e| e.cap_for(team.index))
    }

    /// Caps for every team that has one. Teams absent from the map are unlimited.
    pub fn cap_table(&self) -> HashMap<TeamRef, u32> {
        let mut caps = HashMap::new();
        for club in &self.clubs {
            for (age, entry) in &club.teams {
                for index in 1..=entry.count {
                    if let Some(cap) = entry.cap_for(index) {
                        caps.insert(TeamRef::new(club.name.clone(), age.clone(), index), cap);
                    }
                }
            }
        }
        caps
    }
}

/// Trims names, then drops blank names and later case-insensitive duplicates.
/// The first club with a given name wins.
impl From<Vec<Club>> for Roster {
    fn from(clubs: Vec<Club>) -> Self {
        let mut roster = Roster::new();
        for mut club in clubs {
            let name = club.name.trim().to_string();
            if let Err(e) = roster.add_club(&name) {
                warn!("Skipping club '{}': {}", club.name, e);
                continue;
            }
            club.name = name;
            if let Some(last) = roster.clubs.last_mut() {
                *last = club;
            }
        }
        roster
    }
}

impl<'de> Deserialize<'de> for Roster {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<Club>::deserialize(deserializer).map(Roster::from)
    }
}
