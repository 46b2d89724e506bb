//! Orders: immutable snapshots of a checked-out cart with per-item completion.

mod lifecycle;
mod model;

pub use lifecycle::{OrderFeed, OrderLifecycle};
pub use model::{Order, OrderItem, OrderStatus};
