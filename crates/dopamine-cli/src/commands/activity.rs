use chrono::{NaiveDate, NaiveTime};
use clap::Subcommand;
use dopamine_core::catalog::NewUserActivity;
use dopamine_core::ActivityCategory;
use serde_json::json;

use crate::context::{self, print_json, CliResult};

#[derive(Subcommand)]
pub enum ActivityAction {
    /// Create a user activity
    Create {
        title: String,
        #[arg(long)]
        category: ActivityCategory,
        /// Duration in minutes
        #[arg(long)]
        duration: i64,
        /// Scheduled time, HH:MM
        #[arg(long, value_parser = parse_time)]
        time: NaiveTime,
        /// Scheduled date, YYYY-MM-DD
        #[arg(long)]
        date: NaiveDate,
        /// Pin to the home screen
        #[arg(long)]
        home: bool,
    },
    /// List your activities, newest first
    List {
        /// Only those pinned to the home screen
        #[arg(long)]
        home: bool,
    },
    /// Delete one of your activities
    Delete { id: String },
    /// Pin or unpin an activity on the home screen
    Home { id: String, pinned: bool },
}

fn parse_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|e| format!("invalid time '{s}': {e}"))
}

pub fn run(action: ActivityAction, user: Option<String>) -> CliResult {
    let app = context::open(user)?;
    let user_id = app.require_user()?;

    match action {
        ActivityAction::Create {
            title,
            category,
            duration,
            time,
            date,
            home,
        } => {
            let created = app.user_activities.create(
                &user_id,
                NewUserActivity {
                    title,
                    category,
                    duration_minutes: duration,
                    scheduled_time: time,
                    scheduled_date: date,
                    is_on_home_screen: home,
                },
            )?;
            print_json(&created)?;
        }
        ActivityAction::List { home } => {
            let activities = if home {
                app.user_activities.home_screen(&user_id)?
            } else {
                app.user_activities.list(&user_id)?
            };
            print_json(&activities)?;
        }
        ActivityAction::Delete { id } => {
            app.user_activities.delete(&user_id, &id)?;
            print_json(&json!({ "deleted": id }))?;
        }
        ActivityAction::Home { id, pinned } => {
            print_json(&app.user_activities.set_on_home_screen(&user_id, &id, pinned)?)?;
        }
    }
    Ok(())
}
