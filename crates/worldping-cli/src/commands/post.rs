use chrono::{Duration, Utc};
use clap::Args;
use serde_json::json;
use worldping_core::{Coordinate, NewMessage};

use super::{print_json, CliResult, Session};

#[derive(Args)]
pub struct PostArgs {
    /// Location tag for the post (e.g. a country name)
    #[arg(short, long)]
    pub location: String,
    /// Message text; when given, a validated draft is printed too
    #[arg(short, long, requires_all = ["lat", "lon"])]
    pub content: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    pub lat: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    pub lon: Option<f64>,
    /// Emoji tag for the draft
    #[arg(long)]
    pub emoji: Option<String>,
    /// Mood tag for the draft
    #[arg(long)]
    pub mood: Option<String>,
}

pub fn run(args: PostArgs) -> CliResult {
    let mut session = Session::open()?;
    let now = Utc::now();

    // Validate the draft before touching the streak so a bad post counts for nothing.
    let draft = match (&args.content, args.lat, args.lon) {
        (Some(content), Some(lat), Some(lon)) => {
            let config = session.ctx.config();
            let mut draft = NewMessage::new(content.as_str(), Coordinate::new(lat, lon))
                .lifetime(Duration::hours(i64::from(config.message.lifetime_hours)));
            if let Some(emoji) = &args.emoji {
                draft = draft.emoji(emoji.as_str());
            }
            if let Some(mood) = &args.mood {
                draft = draft.mood(mood.as_str());
            }
            Some(draft.build(session.ctx.device(), now, config.message.max_content_len)?)
        }
        _ => None,
    };

    let outcome = session.ctx.record_post(&args.location, now)?;
    print_json(&json!({
        "message": draft,
        "outcome": outcome,
        "events": session.events(),
    }))
}
