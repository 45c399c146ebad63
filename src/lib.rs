pub mod analyzers;
pub mod config;
pub mod error;
pub mod geo;
pub mod job;
pub mod output;
pub mod parser;
pub mod retry;
pub mod sample;
pub mod sink;
pub mod source;
pub mod sql;
