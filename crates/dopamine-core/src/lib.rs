//! # Dopamine Core Library
//!
//! Core logic for the Dopamine habit tracker: users pick activities from a
//! catalog into a cart, check the cart out into an order, and complete order
//! items to build statistics and streaks. A running activity can drive a
//! live countdown.
//!
//! ## Architecture
//!
//! - **Storage**: a [`DocumentStore`] trait with SQLite and in-memory
//!   backends, atomic field transforms and change notifications, plus
//!   TOML-based configuration
//! - **Catalog**: system and user-authored activities, menu configuration
//! - **Cart / Order**: the checkout and completion lifecycle
//! - **Stats**: per-user totals, streaks and profile preferences
//! - **Timer**: countdown state machine and the live countdown registry
//!
//! ## Key Components
//!
//! - [`CartManager`]: per-user cart operations and feed
//! - [`OrderLifecycle`]: checkout, item completion, order feed
//! - [`StatisticsEngine`]: completion totals and streaks
//! - [`LiveCountdowns`]: ticking countdowns for the live display
//! - [`AppServices`]: everything above wired for one session

pub mod cart;
pub mod catalog;
pub mod error;
pub mod feed;
pub mod identity;
pub mod order;
pub mod services;
pub mod stats;
pub mod storage;
pub mod timer;

pub use cart::{Cart, CartFeed, CartItem, CartManager};
pub use catalog::{Activity, ActivityCategory, ActivityResolver, Catalog, ResolvedActivity, UserActivity};
pub use error::{ConfigError, CoreError, StorageError, ValidationError};
pub use feed::Feed;
pub use identity::{IdentityProvider, StaticIdentity};
pub use order::{Order, OrderFeed, OrderItem, OrderLifecycle, OrderStatus};
pub use services::AppServices;
pub use stats::{CompletionRecorder, StatisticsEngine, User, UserStatistics};
pub use storage::{Config, DocumentStore, MemoryStore, SqliteStore};
pub use timer::{Countdown, CountdownPhase, LiveActivitySink, LiveCountdowns, TimerState};
