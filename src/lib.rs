pub mod config;
pub mod control;
pub mod domain;
pub mod error;
pub mod messages;
pub mod motor;
pub mod runtime;
pub mod transport;
