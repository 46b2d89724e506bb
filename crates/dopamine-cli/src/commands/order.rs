use clap::Subcommand;
use serde_json::json;

use crate::context::{self, print_json, CliResult};

#[derive(Subcommand)]
pub enum OrderAction {
    /// Turn the cart into an order
    Checkout,
    /// List orders, newest first
    List,
    /// Show one order
    Show { order_id: String },
    /// Mark an order item completed
    Complete { order_id: String, item_id: String },
    /// Mark an order item not completed
    Incomplete { order_id: String, item_id: String },
    /// Cancel an order that is not completed
    Cancel { order_id: String },
    /// Delete an order
    Delete { order_id: String },
}

pub fn run(action: OrderAction, user: Option<String>) -> CliResult {
    let app = context::open(user)?;

    match action {
        OrderAction::Checkout => {
            let user_id = app.require_user()?;
            let order = app.orders.checkout(&user_id, &app.catalog())?;
            print_json(&order)?;
        }
        OrderAction::List => {
            let user_id = app.require_user()?;
            print_json(&app.orders.list_orders(&user_id)?)?;
        }
        OrderAction::Show { order_id } => {
            let order = app.orders.get_order(&order_id)?;
            print_json(&json!({
                "order": order,
                "completionPercentage": order.completion_percentage(),
            }))?;
        }
        OrderAction::Complete { order_id, item_id } => {
            print_json(&app.orders.mark_item_completed(&order_id, &item_id)?)?;
        }
        OrderAction::Incomplete { order_id, item_id } => {
            print_json(&app.orders.mark_item_incomplete(&order_id, &item_id)?)?;
        }
        OrderAction::Cancel { order_id } => {
            print_json(&app.orders.cancel(&order_id)?)?;
        }
        OrderAction::Delete { order_id } => {
            let user_id = app.require_user()?;
            app.orders.delete_order(&user_id, &order_id)?;
            print_json(&json!({ "deleted": order_id }))?;
        }
    }
    Ok(())
}
