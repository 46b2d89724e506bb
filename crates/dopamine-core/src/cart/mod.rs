//! Per-user cart of selected activities.

mod manager;
mod model;

pub use manager::{CartFeed, CartManager};
pub use model::{Cart, CartItem};
