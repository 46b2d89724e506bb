use clap::Subcommand;
use dopamine_core::catalog::{seed_sample_activities, ActivityFilter, Difficulty, MenuConfiguration};
use dopamine_core::ActivityCategory;
use serde_json::json;

use crate::context::{self, print_json, CliResult};

#[derive(Subcommand)]
pub enum CatalogAction {
    /// List activities, optionally filtered
    List {
        /// starters, mains, sides, desserts or special
        #[arg(long)]
        category: Option<ActivityCategory>,
        /// easy, medium or hard
        #[arg(long)]
        difficulty: Option<Difficulty>,
        /// Minimum duration in minutes
        #[arg(long)]
        min: Option<u32>,
        /// Maximum duration in minutes
        #[arg(long)]
        max: Option<u32>,
    },
    /// Search name, description and benefits
    Search { query: String },
    /// Write the built-in sample activities to the store
    Seed,
    /// Show menu categories
    Menu {
        /// Write the default menu to the store first
        #[arg(long)]
        seed: bool,
    },
}

pub fn run(action: CatalogAction, user: Option<String>) -> CliResult {
    let app = context::open(user)?;

    match action {
        CatalogAction::List {
            category,
            difficulty,
            min,
            max,
        } => {
            let catalog = app.catalog();
            let activities = catalog.filter(ActivityFilter {
                category,
                difficulty,
                min_duration: min,
                max_duration: max,
            });
            print_json(&activities)?;
        }
        CatalogAction::Search { query } => {
            let catalog = app.catalog();
            print_json(&catalog.search(&query))?;
        }
        CatalogAction::Seed => {
            let count = seed_sample_activities(app.store().as_ref())?;
            print_json(&json!({ "seeded": count }))?;
        }
        CatalogAction::Menu { seed } => {
            if seed {
                MenuConfiguration::default().save(app.store().as_ref())?;
            }
            let menu = app.menu();
            let categories: Vec<_> = menu
                .ordered()
                .into_iter()
                .map(|(category, info)| json!({ "category": category, "info": info }))
                .collect();
            print_json(&categories)?;
        }
    }
    Ok(())
}
