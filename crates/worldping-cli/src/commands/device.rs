use clap::Subcommand;
use serde_json::json;
use worldping_core::get_or_create_device_id;

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum DeviceAction {
    /// Print this installation's device id, creating it on first run
    Id,
}

pub fn run(action: DeviceAction) -> CliResult {
    match action {
        DeviceAction::Id => {
            let device = get_or_create_device_id()?;
            print_json(&json!({ "device_id": device }))?;
        }
    }
    Ok(())
}
