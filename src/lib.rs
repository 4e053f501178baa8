pub mod analytics;
pub mod clicks;
pub mod config;
pub mod models;
pub mod reconcile;
pub mod resolve;
pub mod store;
pub mod visit;
pub mod visitor;
