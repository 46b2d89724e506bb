use clap::Subcommand;
use dopamine_core::ActivityResolver;
use serde_json::json;

use crate::context::{self, print_json, CliResult};

#[derive(Subcommand)]
pub enum CartAction {
    /// Show the cart with its total duration
    Show,
    /// Add an activity to the cart
    Add {
        activity_id: String,
        /// The id refers to a user-authored activity
        #[arg(long)]
        user_activity: bool,
    },
    /// Remove a cart item by its item id
    Remove { item_id: String },
    /// Empty the cart
    Clear,
}

pub fn run(action: CartAction, user: Option<String>) -> CliResult {
    let app = context::open(user)?;
    let user_id = app.require_user()?;
    let catalog = app.catalog();

    let cart = match action {
        CartAction::Show => app.carts.fetch_or_create(&user_id)?,
        CartAction::Add {
            activity_id,
            user_activity,
        } => {
            if catalog.resolve(&activity_id, user_activity).is_none() {
                tracing::warn!(%activity_id, "activity is not in the catalog");
            }
            app.carts.add_item(&user_id, &activity_id, user_activity)?
        }
        CartAction::Remove { item_id } => app.carts.remove_item(&user_id, &item_id)?,
        CartAction::Clear => app.carts.clear(&user_id)?,
    };

    let total = app.carts.total_duration(&cart, &catalog);
    print_json(&json!({ "cart": cart, "totalDuration": total }))
}
