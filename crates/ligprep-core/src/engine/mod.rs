//! # Engine Module
//!
//! Stateful machinery that drives external computation engines on behalf of
//! the workflows.
//!
//! - **Configuration** ([`config`]) - the validated, immutable pipeline configuration
//! - **Stages** ([`stage`]) - stage and engine identifiers and the engine contracts
//! - **Fallback** ([`fallback`]) - primary/secondary engine attempts for one stage
//! - **Registry** ([`registry`]) - engines available on the current worker
//! - **Processes** ([`process`]) - subprocess execution with hard timeouts
//! - **Open Babel** ([`obabel`]) - the shipped command-line adapter
//! - **Progress** ([`progress`]) - callback-based progress reporting
//! - **Errors** ([`error`]) - the stage failure taxonomy

pub mod config;
pub mod context;
pub mod error;
pub mod fallback;
pub mod obabel;
pub mod process;
pub mod progress;
pub mod registry;
pub mod stage;
