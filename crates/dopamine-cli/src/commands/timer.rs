//! Foreground countdown for one activity.

use clap::Subcommand;
use dopamine_core::{ActivityResolver, CountdownPhase};

use crate::context::{self, CliResult};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Run a countdown for an activity, printing one JSON state per tick
    Run {
        activity_id: String,
        /// The id refers to a user-authored activity
        #[arg(long)]
        user_activity: bool,
        /// Override the activity's duration in minutes
        #[arg(long)]
        minutes: Option<u32>,
    },
}

pub async fn run(action: TimerAction, user: Option<String>) -> CliResult {
    let app = context::open(user)?;

    match action {
        TimerAction::Run {
            activity_id,
            user_activity,
            minutes,
        } => {
            let activity = app
                .catalog()
                .resolve(&activity_id, user_activity)
                .ok_or_else(|| format!("activity not found: {activity_id}"))?;
            let minutes = minutes.unwrap_or(activity.duration_minutes);

            let mut states = app
                .timers
                .start(&activity.id, &activity.name, &activity.icon, minutes);
            loop {
                let state = states.borrow_and_update().clone();
                println!("{}", serde_json::to_string(&state)?);
                if state.phase == CountdownPhase::Completed {
                    break;
                }
                if states.changed().await.is_err() {
                    break;
                }
            }
            app.timers.stop(&activity.id);
        }
    }
    Ok(())
}
