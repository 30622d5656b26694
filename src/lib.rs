//! Desplegar — declarative smart-contract deployment.
//!
//! Describe contracts, constructor args, dependencies, and post-deploy
//! calls in deploy.yaml; the engine deploys them in dependency order,
//! resolves `@Name` references to addresses, and journals every step so an
//! interrupted run resumes exactly where it stopped.

pub mod chain;
pub mod cli;
pub mod core;
