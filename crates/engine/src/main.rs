use std::io::{self, Read, Write};

use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use matchday_engine::export::{self, FieldSheet};
use matchday_engine::model::{FieldId, GenerationReport, PlacedMatch, RejectedMatch};
use matchday_engine::planner::{Planner, PlannerConfig};

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
enum Request {
    Generate {
        #[serde(default)]
        state: PlannerConfig,
        /// Fixes the shuffle so the same input yields the same schedule.
        seed: Option<u64>,
    },
    Validate {
        #[serde(default)]
        state: PlannerConfig,
        schedule: Vec<PlacedMatch>,
    },
    #[serde(rename_all = "camelCase")]
    SwapWithinField {
        #[serde(default)]
        state: PlannerConfig,
        schedule: Vec<PlacedMatch>,
        field: FieldId,
        pos_a: usize,
        pos_b: usize,
    },
    #[serde(rename_all = "camelCase")]
    MoveMatch {
        #[serde(default)]
        state: PlannerConfig,
        schedule: Vec<PlacedMatch>,
        from_field: FieldId,
        from_pos: usize,
        to_field: FieldId,
        to_pos: Option<usize>,
    },
    #[serde(rename_all = "camelCase")]
    SwapAcrossFields {
        #[serde(default)]
        state: PlannerConfig,
        schedule: Vec<PlacedMatch>,
        field_a: FieldId,
        pos_a: usize,
        field_b: FieldId,
        pos_b: usize,
    },
    ApplyRules {
        #[serde(default)]
        state: PlannerConfig,
        schedule: Vec<PlacedMatch>,
    },
    Export {
        schedule: Vec<PlacedMatch>,
    },
}

#[derive(Debug, Serialize)]
struct OkResponse<T: Serialize> {
    ok: bool,
    data: T,
}

#[derive(Debug, Serialize)]
struct ErrResponse {
    ok: bool,
    error: String,
}

#[derive(Debug, Serialize)]
struct GenerateResponse<'a> {
    schedule: &'a [PlacedMatch],
    warnings: &'a [String],
    rejected: &'a [RejectedMatch],
    report: GenerationReport,
}

#[derive(Debug, Serialize)]
struct ScheduleResponse<'a> {
    schedule: &'a [PlacedMatch],
    warnings: &'a [String],
}

#[derive(Debug, Serialize)]
struct ValidateResponse<'a> {
    warnings: &'a [String],
}

#[derive(Debug, Serialize)]
struct ExportResponse {
    sheets: Vec<FieldSheet>,
    csv: String,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn write_ok<T: Serialize>(data: T) {
    let resp = OkResponse { ok: true, data };
    let json = serde_json::to_string(&resp).unwrap_or_else(|e| {
        format!("{{\"ok\":false,\"error\":\"serialization error: {}\"}}", e)
    });
    println!("{}", json);
    let _ = io::stdout().flush();
}

fn write_err(msg: impl std::fmt::Display) -> ! {
    let resp = ErrResponse {
        ok: false,
        error: msg.to_string(),
    };
    let json = serde_json::to_string(&resp).unwrap_or_else(|_| {
        "{\"ok\":false,\"error\":\"double serialization error\"}".to_string()
    });
    println!("{}", json);
    let _ = io::stdout().flush();
    std::process::exit(1);
}

fn write_schedule(planner: &Planner) {
    write_ok(ScheduleResponse {
        schedule: planner.schedule(),
        warnings: planner.warnings(),
    });
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    // Logs go to stderr; stdout carries only the JSON response.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut input = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut input) {
        write_err(format!("Failed to read stdin: {}", e));
    }

    let request: Request = match serde_json::from_str(&input) {
        Ok(r) => r,
        Err(e) => write_err(format!("Invalid JSON input: {}", e)),
    };
    debug!("Received {:?}", request);

    match request {
        Request::Generate { state, seed } => {
            let mut planner = Planner::new(state);
            let report = match seed {
                Some(seed) => planner.generate(&mut StdRng::seed_from_u64(seed)),
                None => planner.generate(&mut rand::thread_rng()),
            };
            write_ok(GenerateResponse {
                schedule: planner.schedule(),
                warnings: planner.warnings(),
                rejected: planner.rejected(),
                report,
            });
        }
        Request::Validate { state, schedule } => {
            let planner = Planner::new(state).with_schedule(schedule);
            write_ok(ValidateResponse {
                warnings: planner.warnings(),
            });
        }
        Request::SwapWithinField {
            state,
            schedule,
            field,
            pos_a,
            pos_b,
        } => {
            let mut planner = Planner::new(state).with_schedule(schedule);
            if let Err(e) = planner.swap_within_field(field, pos_a, pos_b) {
                write_err(e);
            }
            write_schedule(&planner);
        }
        Request::MoveMatch {
            state,
            schedule,
            from_field,
            from_pos,
            to_field,
            to_pos,
        } => {
            let mut planner = Planner::new(state).with_schedule(schedule);
            if let Err(e) = planner.move_match(from_field, from_pos, to_field, to_pos) {
                write_err(e);
            }
            write_schedule(&planner);
        }
        Request::SwapAcrossFields {
            state,
            schedule,
            field_a,
            pos_a,
            field_b,
            pos_b,
        } => {
            let mut planner = Planner::new(state).with_schedule(schedule);
            if let Err(e) = planner.swap_across_fields(field_a, pos_a, field_b, pos_b) {
                write_err(e);
            }
            write_schedule(&planner);
        }
        Request::ApplyRules { state, schedule } => {
            let mut planner = Planner::new(state).with_schedule(schedule);
            planner.apply_rules();
            write_schedule(&planner);
        }
        Request::Export { schedule } => {
            write_ok(ExportResponse {
                sheets: export::field_sheets(&schedule),
                csv: export::to_csv(&schedule),
            });
        }
    }
}
