pub mod analyzers;
pub mod config;
pub mod filter;
pub mod output;
pub mod parser;
pub mod record;
