//! Core orchestration: plan model, parsing, reference resolution, the
//! execution journal, and the deployment engine.

pub mod engine;
pub mod error;
pub mod events;
pub mod journal;
pub mod parser;
pub mod resolver;
pub mod types;
