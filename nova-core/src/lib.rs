pub mod aggregator;
pub mod api;
pub mod api_config;
pub mod config;
pub mod confirm;
pub mod constants;
pub mod dashboard;
pub mod dispatcher;
pub mod error;
pub mod models;
pub mod notify;
pub mod poller;
pub mod registry;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{FetchError, NovaError, Result};
