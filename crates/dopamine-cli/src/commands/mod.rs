pub mod activity;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod order;
pub mod profile;
pub mod stats;
pub mod timer;
