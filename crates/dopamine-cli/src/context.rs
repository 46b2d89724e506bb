//! Session setup shared by every command.

use std::sync::Arc;

use dopamine_core::{AppServices, Config, SqliteStore, StaticIdentity};
use serde::Serialize;

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Open the default store and wire services for `--user`, falling back to
/// the configured session user.
pub fn open(user: Option<String>) -> CliResult<AppServices> {
    let config = Config::load_or_default();
    let user = user.or_else(|| config.session.user_id.clone());
    let store = SqliteStore::open_default()?;

    Ok(AppServices::new(
        Arc::new(store),
        Arc::new(StaticIdentity::new(user)),
        config,
    ))
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
