pub mod config;
pub mod dedup;
pub mod error;
pub mod parse;
pub mod pipeline;
pub mod reconcile;
pub mod record;
pub mod reference;
pub mod upload;
pub mod writer;
