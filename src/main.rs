use anyhow::Result;
use sharp_odds::config::Config;
use sharp_odds::engine::MatchOdds;
use sharp_odds::feed::the_odds_api::TheOddsApi;
use sharp_odds::keys::KeyPool;
use sharp_odds::{report, OddsOrchestrator};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: sharp-odds <command>

commands:
  status                               API key pool status
  sports                               list leagues
  events <sport_key>                   list upcoming matches
  league <sport_key> [--refresh]       sharp odds for every match of a league
  match <sport_key> <event_id> [--refresh]
                                       sharp odds for one match";

fn print_match(odds: &MatchOdds) {
    let header = report::match_header(odds, chrono::Utc::now());
    println!();
    println!("  {}  |  {}  |  {}  [{}]", header.matchup, header.commence_time, header.status, odds.event_id);
    for market in &odds.markets {
        print!("{}", report::render_market(market));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sharp_odds=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let refresh = args.iter().any(|a| a == "--refresh");
    let positional: Vec<&str> = args
        .iter()
        .map(String::as_str)
        .filter(|a| !a.starts_with("--"))
        .collect();

    let Some(&command) = positional.first() else {
        println!("{}", USAGE);
        return Ok(());
    };

    let config_path = Path::new("config.toml");
    let config = if config_path.exists() {
        Config::load(config_path)?
    } else {
        tracing::info!("config.toml not found, using defaults");
        Config::default()
    };

    // Saved keys from .env; real env vars take precedence.
    Config::load_env_file();
    let keys = Config::odds_api_keys()?;
    let pool = Arc::new(KeyPool::with_cooldown(keys, config.key_pool.cooldown())?);
    tracing::info!(keys = pool.len(), "loaded API keys");

    let source = Arc::new(TheOddsApi::new(&config.odds_api, &config.bookmakers.league_request)?);
    let orchestrator = OddsOrchestrator::new(&config, pool, source);

    match (command, &positional[1..]) {
        ("status", _) => {
            print!("{}", report::render_key_status(&orchestrator.key_status()));
        }
        ("sports", _) => {
            let sports = orchestrator.fetch_sports().await?;
            for s in sports.data.iter() {
                println!("  {:<40} {}", s.key, s.title);
            }
        }
        ("events", [sport]) => {
            let events = orchestrator.fetch_events(sport).await?;
            for e in events.data.iter() {
                println!(
                    "  {}  {} vs {}  ({})",
                    e.id,
                    e.home_team,
                    e.away_team,
                    report::match_status(&e.commence_time, chrono::Utc::now())
                );
            }
        }
        ("league", [sport]) => {
            let league = orchestrator.fetch_league_odds(sport, refresh).await?;
            let mut matches: Vec<&MatchOdds> = league.data.events.values().collect();
            matches.sort_by(|a, b| a.commence_time.cmp(&b.commence_time));
            for odds in matches {
                print_match(odds);
            }
            println!();
            print!("{}", report::render_key_status(&orchestrator.key_status()));
        }
        ("match", [sport, event_id]) => {
            let odds = orchestrator.fetch_match_odds(sport, event_id, refresh).await?;
            if odds.from_cache {
                println!("  (cached {})", odds.data.fetched_at.format("%H:%M:%S UTC"));
            }
            print_match(&odds.data);
        }
        _ => {
            println!("{}", USAGE);
            std::process::exit(2);
        }
    }

    Ok(())
}
