pub mod config;
pub mod family_core;
