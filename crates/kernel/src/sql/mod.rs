//! SQL text generation.
//!
//! [`terms`] is the expression algebra every generated predicate is built
//! with; [`dialect`] compiles geo-queries into backend-specific predicates.

pub mod dialect;
pub mod terms;

pub use dialect::{CrateDialect, GeoDialect, PostGisDialect};
pub use terms::{Term, lit, var};
