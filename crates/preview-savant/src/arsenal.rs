//! Pitch-level rows to per-pitch-type usage.

use std::io::Cursor;

use polars::prelude::*;
use preview_core::{PitchUsage, pitch_name};

/// Pitch outcomes counted as a swing and miss.
const WHIFFS: &[&str] = &["swinging_strike", "swinging_strike_blocked"];

/// Pitch outcomes counted as a swing.
const SWINGS: &[&str] = &[
    "swinging_strike",
    "swinging_strike_blocked",
    "foul",
    "foul_tip",
    "hit_into_play",
];

fn any_description(values: &[&str]) -> Expr {
    values
        .iter()
        .map(|v| col("description").eq(lit(*v)))
        .reduce(|acc, e| acc.or(e))
        .unwrap_or_else(|| lit(false))
}

/// Parses a Statcast CSV export into a `DataFrame`.
///
/// # Errors
/// Returns an error if the body is not CSV.
pub fn read_pitches(csv: Vec<u8>) -> PolarsResult<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(10_000))
        .into_reader_with_file_handle(Cursor::new(csv))
        .finish()
}

/// Groups pitch-level rows by pitch type, most used first.
///
/// Rows without a pitch type are ignored. Whiff rate is whiffs over swings and
/// is `None` for a pitch nobody swung at.
///
/// # Errors
/// Returns an error if a required column is missing.
pub fn summarize(pitches: DataFrame) -> PolarsResult<Vec<PitchUsage>> {
    let grouped = pitches
        .lazy()
        .filter(col("pitch_type").is_not_null())
        .group_by([col("pitch_type")])
        .agg([
            len().alias("pitches"),
            col("release_speed")
                .cast(DataType::Float64)
                .mean()
                .alias("velocity"),
            col("release_spin_rate")
                .cast(DataType::Float64)
                .mean()
                .alias("spin_rate"),
            any_description(WHIFFS)
                .cast(DataType::Float64)
                .sum()
                .alias("whiffs"),
            any_description(SWINGS)
                .cast(DataType::Float64)
                .sum()
                .alias("swings"),
        ])
        .collect()?;

    let codes = grouped.column("pitch_type")?.str()?;
    let counts = grouped.column("pitches")?.cast(&DataType::Float64)?;
    let counts = counts.f64()?;
    let velocity = grouped.column("velocity")?.f64()?;
    let spin = grouped.column("spin_rate")?.f64()?;
    let whiffs = grouped.column("whiffs")?.f64()?;
    let swings = grouped.column("swings")?.f64()?;

    let code_at = |i: usize| codes.get(i).map(str::trim).filter(|c| !c.is_empty());
    let total: f64 = (0..grouped.height())
        .filter(|i| code_at(*i).is_some())
        .filter_map(|i| counts.get(i))
        .sum();

    let mut arsenal = Vec::with_capacity(grouped.height());
    for i in 0..grouped.height() {
        let Some(code) = code_at(i) else {
            continue;
        };
        let count = counts.get(i).unwrap_or(0.0);
        let whiff_pct = match (whiffs.get(i), swings.get(i)) {
            (Some(w), Some(s)) if s > 0.0 => Some(w / s * 100.0),
            _ => None,
        };
        arsenal.push(PitchUsage {
            code: code.to_string(),
            name: pitch_name(code).to_string(),
            pitches: count as u32,
            usage_pct: if total > 0.0 { count / total * 100.0 } else { 0.0 },
            velocity: velocity.get(i),
            spin_rate: spin.get(i),
            whiff_pct,
        });
    }

    arsenal.sort_by(|a, b| {
        b.pitches
            .cmp(&a.pitches)
            .then_with(|| a.code.cmp(&b.code))
    });
    Ok(arsenal)
}
