//! Change detection and package filtering for monorail.
//!
//! Commands rarely act on every package of a repository. This crate narrows
//! the package list: by name globs, by what changed in git since the last
//! release, and by extending the selection along local dependency edges.
//!
//! # Key Types
//!
//! - [`ChangeOracle`] / [`GitOracle`]: Where change information comes from
//! - [`UpdateOptions`] / [`collect_updates`]: Which packages count as updated
//! - [`FilterOptions`] / [`get_filtered_packages`]: The full selection pipeline

#![warn(missing_docs)]

mod error;
mod filter;
mod oracle;
mod updates;

pub use error::{Error, Result};
pub use filter::{FilterOptions, filter_packages, get_filtered_packages};
pub use oracle::{ChangeOracle, DescribeRef, GitOracle};
pub use updates::{UpdateOptions, collect_dependents, collect_updates};
