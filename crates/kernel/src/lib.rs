//! Tempora Kernel Library
//!
//! Geometry codecs, spatial query compilers and the batched insert path of
//! a time-series store for NGSI entities. The `tempora` binary exposes the
//! same operations on the command line.

pub mod backend;
pub mod config;
pub mod db;
pub mod error;
pub mod geo;
pub mod insert;
pub mod sql;

pub use backend::Backend;
pub use config::Config;
