//! Profile commands.

use clap::Subcommand;
use dopamine_core::stats::PreferencesPatch;
use serde_json::json;

use crate::context::{self, print_json, CliResult};

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Create the profile with zeroed statistics, or sign in to an
    /// existing one
    Create {
        email: String,
        /// Display name (defaults to the part of the email before '@')
        #[arg(long)]
        name: Option<String>,
    },
    /// Show the profile
    Show,
    /// Change the display name
    Rename { name: String },
    /// Update preferences; omitted flags are left alone
    Prefs {
        #[arg(long)]
        notifications: Option<bool>,
        #[arg(long)]
        dark_mode: Option<bool>,
        /// Daily goal in minutes
        #[arg(long)]
        daily_goal: Option<u32>,
    },
    /// Delete the profile
    Delete,
}

pub fn run(action: ProfileAction, user: Option<String>) -> CliResult {
    let app = context::open(user)?;
    let user_id = app.require_user()?;

    match action {
        ProfileAction::Create { email, name } => {
            app.stats.ensure_profile(&user_id, &email, name.as_deref())?;
            let profile = app.stats.touch_last_login(&user_id)?;
            print_json(&profile)?;
        }
        ProfileAction::Show => {
            print_json(&app.stats.fetch_profile(&user_id)?)?;
        }
        ProfileAction::Rename { name } => {
            print_json(&app.stats.update_name(&user_id, &name)?)?;
        }
        ProfileAction::Prefs {
            notifications,
            dark_mode,
            daily_goal,
        } => {
            let patch = PreferencesPatch {
                notifications_enabled: notifications,
                dark_mode,
                daily_goal,
            };
            print_json(&app.stats.update_preferences(&user_id, patch)?)?;
        }
        ProfileAction::Delete => {
            app.stats.delete_profile(&user_id)?;
            print_json(&json!({ "deleted": user_id }))?;
        }
    }
    Ok(())
}
