pub mod api;
pub mod config;
pub mod context;
pub mod database_ops;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod reconcile;

pub mod util {
    pub mod env;
}

#[cfg(test)]
mod testing;

pub use context::PullContext;
pub use error::PullError;
pub use ingest::PullSummary;
