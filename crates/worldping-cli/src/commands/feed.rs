use std::path::PathBuf;

use chrono::Utc;
use clap::Args;
use serde_json::json;
use worldping_core::{Config, Coordinate, Message, MessageSource, RestContentStore, StaticMessages};

use super::{print_json, CliResult, Session};

#[derive(Args)]
pub struct FeedArgs {
    /// JSON file with a message snapshot; defaults to the configured content store
    #[arg(short, long)]
    pub snapshot: Option<PathBuf>,
    /// Only show messages near "lat,lon"
    #[arg(long, value_parser = parse_coordinate, allow_hyphen_values = true)]
    pub near: Option<Coordinate>,
    /// Override the configured radius in km
    #[arg(long)]
    pub radius: Option<f64>,
}

#[derive(Args)]
pub struct UnlockArgs {
    /// JSON file with a message snapshot; defaults to the configured content store
    #[arg(short, long)]
    pub snapshot: Option<PathBuf>,
    /// How many messages to unlock (defaults to gate.default_unlock_count)
    #[arg(short, long, allow_hyphen_values = true)]
    pub count: Option<i64>,
}

fn parse_coordinate(s: &str) -> Result<Coordinate, String> {
    let (lat, lon) = s
        .split_once(',')
        .ok_or_else(|| format!("expected \"lat,lon\", got \"{s}\""))?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("bad latitude: {e}"))?;
    let lon: f64 = lon.trim().parse().map_err(|e| format!("bad longitude: {e}"))?;
    let coord = Coordinate::new(lat, lon);
    coord.validate().map_err(|e| e.to_string())?;
    Ok(coord)
}

/// Active messages from a snapshot file or the remote content store.
fn load_messages(snapshot: Option<&PathBuf>, config: &Config) -> CliResult<Vec<Message>> {
    let now = Utc::now();
    match snapshot {
        Some(path) => {
            let json = std::fs::read_to_string(path)?;
            Ok(StaticMessages::from_json(&json)?.active(now))
        }
        None => {
            let store = RestContentStore::from_config(&config.content_store)?;
            let rt = tokio::runtime::Runtime::new()?;
            Ok(rt.block_on(store.list_active_messages(now))?)
        }
    }
}

pub fn run_feed(args: FeedArgs) -> CliResult {
    let mut session = Session::open()?;
    let now = Utc::now();
    session.ctx.check_expiry(now)?;

    let messages = load_messages(args.snapshot.as_ref(), session.ctx.config())?;
    let items = match args.near {
        Some(center) => {
            let radius = args
                .radius
                .unwrap_or(session.ctx.config().geo.nearby_radius_km);
            session.ctx.view_within(&messages, &center, radius, now)
        }
        None => session.ctx.view_messages(&messages, now),
    };

    print_json(&json!({
        "has_posted": session.ctx.has_device_ever_posted(),
        "items": items,
        "events": session.events(),
    }))
}

pub fn run_unlock(args: UnlockArgs) -> CliResult {
    let mut session = Session::open()?;
    let messages = load_messages(args.snapshot.as_ref(), session.ctx.config())?;
    let count = args
        .count
        .unwrap_or_else(|| i64::from(session.ctx.config().gate.default_unlock_count));

    let unlocked = session.ctx.unlock_random(&messages, count)?;
    print_json(&json!({
        "unlocked": unlocked,
        "total_unlocked": session.ctx.unlock_set().len(),
        "events": session.events(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_coordinates() {
        assert_eq!(
            parse_coordinate("48.85, 2.35").unwrap(),
            Coordinate::new(48.85, 2.35)
        );
        assert_eq!(
            parse_coordinate("-33.9,18.4").unwrap(),
            Coordinate::new(-33.9, 18.4)
        );
        assert!(parse_coordinate("48.85").is_err());
        assert!(parse_coordinate("100,0").is_err());
    }
}
