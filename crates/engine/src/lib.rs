//! Matchday scheduling engine: pairs teams across clubs, places matches on
//! fields within a day window, validates the result and supports manual
//! reordering with time recomputation.

pub mod clock;
pub mod constraints;
pub mod editor;
pub mod export;
pub mod matches;
pub mod model;
pub mod planner;
pub mod roster;
pub mod rules;
pub mod solver;
pub mod validator;
