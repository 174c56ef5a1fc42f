//! Recessive gene analysis: indexing and querying of knockouts.

pub mod catalog;
pub mod cli;
pub mod codec;
pub mod conf;
pub mod convert;
pub mod engine;
pub mod load;
pub mod manager;
pub mod model;
pub mod query;
pub mod variants;
