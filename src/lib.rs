//! Progressive action statistics for half-space play.
//!
//! Passes and carries that move the ball substantially toward goal are
//! counted per player for the left and right half-spaces, joined with
//! minutes played and normalized to per-90 rates.

use polars::prelude::*;

pub mod aggregate;
pub mod cache;
pub mod columns;
pub mod combine;
pub mod config;
pub mod drive;
mod error;
pub mod grouping;
pub mod halfspace;
pub mod loader;
pub mod minutes;
pub mod progressive;
pub mod report;

pub use aggregate::{AggregateOutcome, EmptyReason, aggregate};
pub use config::{Config, ProgressionConfig};
pub use error::Error;

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| *c == name)
}

pub(crate) fn missing_columns<'a>(df: &DataFrame, names: &[&'a str]) -> Vec<&'a str> {
    names
        .iter()
        .copied()
        .filter(|name| !has_column(df, name))
        .collect()
}
