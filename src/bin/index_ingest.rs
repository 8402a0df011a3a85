use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use mlb_live_wp::config::Settings;
use mlb_live_wp::history;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let outcomes = parse_path_arg("--outcomes");
    let leverage = parse_path_arg("--leverage");
    if outcomes.is_none() && leverage.is_none() {
        return Err(anyhow!(
            "usage: index_ingest [--db PATH] [--outcomes FILE.tsv] [--leverage FILE.tsv]"
        ));
    }

    let db_path = parse_path_arg("--db")
        .or_else(|| Settings::from_env().history_db_path)
        .context("unable to resolve sqlite path")?;
    let mut conn = history::open_index(&db_path)?;

    if let Some(path) = outcomes {
        let file = File::open(&path).with_context(|| format!("open {}", path.display()))?;
        let summary = history::ingest_outcomes(&mut conn, BufReader::new(file))
            .with_context(|| format!("ingest {}", path.display()))?;
        println!("Outcomes: {} rows ({} skipped)", summary.rows, summary.skipped);
    }

    if let Some(path) = leverage {
        let file = File::open(&path).with_context(|| format!("open {}", path.display()))?;
        let summary = history::ingest_leverage(&mut conn, BufReader::new(file))
            .with_context(|| format!("ingest {}", path.display()))?;
        println!("Leverage: {} rows ({} skipped)", summary.rows, summary.skipped);
    }

    println!("DB: {}", db_path.display());
    Ok(())
}

fn parse_path_arg(flag: &str) -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if arg == flag {
            return args.get(idx + 1).map(PathBuf::from);
        }
        if let Some(rest) = arg.strip_prefix(&format!("{flag}=")) {
            return Some(PathBuf::from(rest));
        }
    }
    None
}
