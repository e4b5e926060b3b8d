//! Core recipe logic: state types, fragment codec, engine, session.

pub mod codec;
pub mod engine;
pub mod precision;
pub mod session;
pub mod types;
