//! # basediff-core
//!
//! Core library for basediff - compares two columns of a multi-dimensional
//! table record by record and writes the added and removed values into two
//! destination columns.
//!
//! This crate provides the core functionality that can be used by different
//! interfaces (the CLI, host plugins, etc.).

pub mod compare;
pub mod config;
pub mod diff;
pub mod encode;
pub mod error;
pub mod model;
pub mod normalize;
pub mod reader;
pub mod store;
pub mod updater;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod test_fixtures;

// Re-export the most commonly used types for convenience
pub use compare::{
    run_compare, run_compare_with_fields, CompareForm, CompareOptions, CompareReport,
    CompareRequest,
};
pub use config::Config;
pub use diff::{diff, ColumnDiff};
pub use encode::encode;
pub use error::{BasediffError, Result};
pub use model::{FieldDescriptor, FieldType, PendingUpdate, Record, WriteValue};
pub use normalize::normalize;
pub use store::{create_store, BaseStore};
