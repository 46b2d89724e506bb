use clap::Subcommand;

use crate::context::{self, print_json, CliResult};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Totals and streaks
    Show,
    /// Store the current streak (longest streak is kept)
    Streak { days: u32 },
}

pub fn run(action: StatsAction, user: Option<String>) -> CliResult {
    let app = context::open(user)?;
    let user_id = app.require_user()?;

    let stats = match action {
        StatsAction::Show => app.stats.statistics(&user_id)?,
        StatsAction::Streak { days } => app.stats.update_streak(&user_id, days)?,
    };
    print_json(&stats)
}
