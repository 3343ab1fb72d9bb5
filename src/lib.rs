pub mod adapters;
pub mod cmd;
pub mod config;
pub mod domain;
pub mod engine;
pub mod io;
