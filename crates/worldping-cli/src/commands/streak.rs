use chrono::Utc;
use clap::Subcommand;
use serde_json::json;

use super::{print_json, CliResult, Session};

#[derive(Subcommand)]
pub enum StreakAction {
    /// Show the stored streak record
    Show,
    /// Reset the streak if it has lapsed
    Check,
    /// Mirror the upvote total received across this device's posts
    Upvotes {
        total: u64,
    },
}

pub fn run(action: StreakAction) -> CliResult {
    let mut session = Session::open()?;

    match action {
        StreakAction::Show => {
            print_json(&json!({
                "record": session.ctx.streak_record(),
                "has_posted": session.ctx.has_device_ever_posted(),
            }))?;
        }
        StreakAction::Check => {
            let record = session.ctx.check_expiry(Utc::now())?;
            print_json(&json!({
                "record": record,
                "events": session.events(),
            }))?;
        }
        StreakAction::Upvotes { total } => {
            let earned = session.ctx.record_upvotes_received(total, Utc::now())?;
            print_json(&json!({
                "earned": earned,
                "record": session.ctx.streak_record(),
                "events": session.events(),
            }))?;
        }
    }
    Ok(())
}

pub fn achievements() -> CliResult {
    let session = Session::open()?;
    let list: Vec<_> = session
        .ctx
        .achievements()
        .iter()
        .map(|a| json!({ "key": a.key(), "title": a.title() }))
        .collect();
    print_json(&list)
}
