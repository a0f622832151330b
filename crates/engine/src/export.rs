use serde::Serialize;

use crate::editor::field_matches;
use crate::model::{FieldId, PlacedMatch};

pub const HEADERS: [&str; 6] = ["Field", "Age Group", "Start Time", "End Time", "Team A", "Team B"];

/// One field's fixtures, ready for a spreadsheet tab or a printed page.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FieldSheet {
    pub field: FieldId,
    pub title: String,
    pub rows: Vec<[String; 6]>,
}

pub fn row(m: &PlacedMatch) -> [String; 6] {
    [
        m.field.name().to_string(),
        m.fixture.age_group.clone(),
        m.start_time.to_string(),
        m.end_time.to_string(),
        m.fixture.team_a.display_name(),
        m.fixture.team_b.display_name(),
    ]
}

/// One sheet per field, in field order, rows chronological.
pub fn field_sheets(schedule: &[PlacedMatch]) -> Vec<FieldSheet> {
    FieldId::ALL
        .iter()
        .map(|&field| FieldSheet {
            field,
            title: field.name().to_string(),
            rows: field_matches(schedule, field).iter().map(row).collect(),
        })
        .collect()
}

fn csv_cell(cell: &str) -> String {
    if cell.contains([',', '"', '\n']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

/// Header plus every match in schedule order, comma-separated.
pub fn to_csv(schedule: &[PlacedMatch]) -> String {
    std::iter::once(HEADERS.map(String::from))
        .chain(schedule.iter().map(row))
        .map(|r| r.iter().map(|c| csv_cell(c)).collect::<Vec<_>>().join(","))
        .collect::<Vec<_>>()
        .join("\n")
}
