//! # LigPrep Core Library
//!
//! Orchestration engine for preparing ligands for virtual screening. Every input
//! ligand runs through a fixed sequence of stages (desalting, neutralization,
//! stereoisomer enumeration, tautomerization, protonation, 3D conformation,
//! tranche assignment and target-format export), each of which may be satisfied
//! by one of several interchangeable external engines tried in priority order.
//!
//! ## Architectural Philosophy
//!
//! - **[`core`]: The Foundation.** Stateless data models (the ligand fan-out tree,
//!   node bookkeeping, remarks), pure chemistry helpers, the tranche assignment
//!   engine and I/O utilities (collection reader, archives, output routing).
//!
//! - **[`engine`]: The Logic Core.** Configuration, the error taxonomy, the stage
//!   engine interface and registry, the fallback runner, the subprocess runner and
//!   the Open Babel adapter.
//!
//! - **[`workflows`]: The Public API.** The fan-out tree processor that takes one
//!   ligand through every stage and the collection scheduler that runs it over a
//!   whole collection, serially or on a worker pool.

pub mod core;
pub mod engine;
pub mod workflows;

#[cfg(test)]
pub(crate) mod testing;
