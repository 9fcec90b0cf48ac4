//! Station and line reference resolution.
//!
//! The tables are data, the resolver is logic: everything agency-specific
//! (stop-id maps, alias rewrites, route expansions, text patterns) lives in
//! [`AgencyTables`] so a new agency is a new table, not new branches.

mod resolver;
mod tables;

pub use resolver::{RawStationRef, Resolver};
pub use tables::{AgencyTables, LineMatch};
