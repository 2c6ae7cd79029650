pub mod config;
pub mod device;
pub mod feed;
pub mod post;
pub mod streak;

use std::error::Error;
use std::sync::Arc;

use serde::Serialize;
use worldping_core::{get_or_create_device_id, Config, DeviceContext, Event, RecordingSink, SqliteKv};

pub type CliResult<T = ()> = Result<T, Box<dyn Error>>;

/// Context for the local device, backed by the on-disk store.
pub struct Session {
    pub ctx: DeviceContext<Arc<SqliteKv>>,
    pub sink: Arc<RecordingSink>,
}

impl Session {
    pub fn open() -> CliResult<Self> {
        let config = Config::load()?;
        let device = get_or_create_device_id()?;
        let store = Arc::new(SqliteKv::open()?);
        let sink = Arc::new(RecordingSink::new());
        tracing::debug!(device = %device, "opening device session");
        let ctx = DeviceContext::new(store, device, config, sink.clone());
        Ok(Self { ctx, sink })
    }

    pub fn events(&self) -> Vec<Event> {
        self.sink.take()
    }
}

pub fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
