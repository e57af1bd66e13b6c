//! Plain-text rendering of a snapshot.

use std::fmt::Write;

use preview::{
    BatterLine, PitchUsage, PitcherRef, PitcherStats, ProviderKind, Snapshot, SourceStatus,
};

fn opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn fixed(value: Option<f64>, places: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.places$}"))
}

fn unavailable(snapshot: &Snapshot, kind: ProviderKind, label: &str) -> Option<String> {
    if snapshot.status(kind) != Some(SourceStatus::Failed) {
        return None;
    }
    let reason = snapshot
        .source_errors
        .get(&kind)
        .map_or(String::new(), |r| format!(" ({r})"));
    Some(format!("  {label} unavailable{reason}\n"))
}

/// Renders the snapshot as the text shown by `game-preview show`.
pub(crate) fn render(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let identity = &snapshot.identity;
    let _ = writeln!(
        out,
        "{} at {} on {}",
        identity.away_team,
        identity.home_team,
        identity.game_date.format("%A, %B %-d, %Y")
    );
    let _ = writeln!(
        out,
        "Fetched {}",
        snapshot.fetched_at.format("%Y-%m-%d %H:%M UTC")
    );

    out.push_str("\nGame\n");
    match &snapshot.game_info {
        Some(game) => {
            let _ = writeln!(out, "  Venue:  {}", opt(game.venue.as_deref()));
            let _ = writeln!(
                out,
                "  First pitch: {}",
                opt(game.start_time.map(|t| t.format("%H:%M UTC")))
            );
            let _ = writeln!(
                out,
                "  Records: {} {} / {} {}",
                identity.away_team,
                opt(game.away_record),
                identity.home_team,
                opt(game.home_record)
            );
            for (side, starter) in [
                (&identity.away_team, &game.probable_pitchers.away),
                (&identity.home_team, &game.probable_pitchers.home),
            ] {
                let label = starter_label(snapshot, starter.as_ref());
                let _ = writeln!(out, "  {side} starter: {label}");
            }
        }
        None => {
            let note = unavailable(snapshot, ProviderKind::GameInfo, "game info");
            out.push_str(&note.unwrap_or_default());
        }
    }

    out.push_str("\nPitching\n");
    if let Some(note) = unavailable(snapshot, ProviderKind::Stats, "pitcher stats") {
        out.push_str(&note);
    } else {
        for stats in snapshot.pitcher_stats.values() {
            out.push_str(&pitcher_line(stats));
        }
    }

    out.push_str("\nPitch mix\n");
    if let Some(note) = unavailable(snapshot, ProviderKind::PitchMix, "pitch mix") {
        out.push_str(&note);
    } else {
        for (id, arsenal) in &snapshot.pitch_mix {
            let name = snapshot
                .pitcher_stats
                .get(id)
                .map_or_else(|| id.to_string(), |s| s.name.clone());
            let _ = writeln!(out, "  {name}");
            for pitch in arsenal {
                out.push_str(&pitch_line(pitch));
            }
        }
    }

    out.push_str("\nLineups\n");
    if let Some(note) = unavailable(snapshot, ProviderKind::Stats, "lineup stats") {
        out.push_str(&note);
    } else if snapshot.lineup_stats.is_empty() {
        out.push_str("  lineups not posted\n");
    } else {
        for (side, lines) in [
            (&identity.away_team, &snapshot.lineup_stats.away),
            (&identity.home_team, &snapshot.lineup_stats.home),
        ] {
            let _ = writeln!(out, "  {side}");
            for (slot, line) in lines.iter().enumerate() {
                out.push_str(&batter_line(slot + 1, line));
            }
        }
    }

    out.push_str("\nDivision race\n");
    if let Some(note) = unavailable(snapshot, ProviderKind::DivisionRace, "standings") {
        out.push_str(&note);
    } else {
        for race in &snapshot.division_race {
            let _ = writeln!(out, "  {}", race.division);
            for row in &race.standings {
                let gb = if row.games_back == 0.0 {
                    "-".to_string()
                } else {
                    format!("{:.1}", row.games_back)
                };
                let _ = writeln!(
                    out,
                    "    {:<4} {:>3}-{:<3} {:>5}",
                    row.team, row.wins, row.losses, gb
                );
            }
        }
    }

    out.push_str("\nAssets\n");
    let assets = &snapshot.assets;
    for (side, logo) in [
        (&identity.away_team, &assets.away_logo),
        (&identity.home_team, &assets.home_logo),
    ] {
        let _ = writeln!(out, "  {side:<4} logo {}", opt(logo.as_deref()));
    }
    for (id, url) in &assets.headshots {
        let _ = writeln!(out, "  #{id} headshot {url}");
    }

    out.push_str("\nSources\n");
    for kind in ProviderKind::ALL {
        let status = snapshot
            .status(kind)
            .map_or_else(|| "missing".to_string(), |s| s.to_string());
        match snapshot.source_errors.get(&kind) {
            Some(reason) => {
                let _ = writeln!(out, "  {kind:<14} {status} ({reason})");
            }
            None => {
                let _ = writeln!(out, "  {kind:<14} {status}");
            }
        }
    }
    out
}

fn starter_label(snapshot: &Snapshot, starter: Option<&PitcherRef>) -> String {
    match starter {
        Some(p) => p
            .name
            .clone()
            .or_else(|| snapshot.pitcher_stats.get(&p.id).map(|s| s.name.clone()))
            .unwrap_or_else(|| format!("#{}", p.id)),
        None => "TBD".to_string(),
    }
}

fn pitcher_line(stats: &PitcherStats) -> String {
    format!(
        "  {:<22} {}-{}  ERA {}  FIP {}  WHIP {}  K/9 {}  BB/9 {}  IP {}\n",
        stats.name,
        opt(stats.wins),
        opt(stats.losses),
        fixed(stats.era, 2),
        fixed(stats.fip, 2),
        fixed(stats.whip, 2),
        fixed(stats.k_per_9, 1),
        fixed(stats.bb_per_9, 1),
        fixed(stats.innings, 1),
    )
}

fn pitch_line(pitch: &PitchUsage) -> String {
    format!(
        "    {:<14} {:>5.1}%  {:>5} mph  {:>5} rpm  whiff {}\n",
        pitch.name,
        pitch.usage_pct,
        fixed(pitch.velocity, 1),
        fixed(pitch.spin_rate, 0),
        pitch
            .whiff_pct
            .map_or_else(|| "-".to_string(), |w| format!("{w:.1}%")),
    )
}

fn batter_line(slot: usize, line: &BatterLine) -> String {
    format!(
        "    {slot}. {:<22} {:<3} {}  wRC+ {}  HR {}\n",
        line.name,
        line.position.as_deref().unwrap_or(""),
        line.slash_line(),
        fixed(line.wrc_plus, 0),
        opt(line.home_runs),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use preview::{GameIdentity, GameInfo, Lineups, PreviewAssets};
    use std::collections::BTreeMap;

    fn snapshot() -> Snapshot {
        let mut source_status: BTreeMap<ProviderKind, SourceStatus> = ProviderKind::ALL
            .into_iter()
            .map(|kind| (kind, SourceStatus::Ok))
            .collect();
        source_status.insert(ProviderKind::PitchMix, SourceStatus::Failed);

        let identity = GameIdentity::parse("NYY", "BOS", "2025-09-25").unwrap();
        let mut assets = PreviewAssets::for_game(&identity);
        assets.add_headshot(676656);

        Snapshot {
            identity,
            fetched_at: Utc::now(),
            season: 2025,
            game_info: Some(GameInfo {
                venue: Some("Fenway Park".into()),
                ..Default::default()
            }),
            pitcher_stats: BTreeMap::from([(
                676656,
                PitcherStats {
                    player_id: 676656,
                    name: "Brayan Bello".into(),
                    era: Some(3.35),
                    ..Default::default()
                },
            )]),
            pitch_mix: BTreeMap::new(),
            lineup_stats: Lineups::default(),
            division_race: Vec::new(),
            source_status,
            source_errors: BTreeMap::from([(
                ProviderKind::PitchMix,
                "timed out after 30s".to_string(),
            )]),
            assets,
        }
    }

    #[test]
    fn test_render_marks_failed_section() {
        let text = render(&snapshot());
        assert!(text.contains("NYY at BOS on Thursday, September 25, 2025"));
        assert!(text.contains("Fenway Park"));
        assert!(text.contains("ERA 3.35"));
        assert!(text.contains("pitch mix unavailable (timed out after 30s)"));
        assert!(text.contains("lineups not posted"));
        assert!(text.contains("pitch_mix      failed"));
        assert!(text.contains("BOS  logo https://www.mlbstatic.com/team-logos/111.svg"));
        assert!(text.contains("#676656 headshot https://img.mlbstatic.com/"));
    }
}
