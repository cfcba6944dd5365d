//! # Core Module
//!
//! Stateless building blocks shared by the engine and workflow layers.
//!
//! - **Models** ([`models`]) - Ligand, stereoisomer and tautomer nodes, the arena
//!   that holds one ligand's fan-out tree, bookkeeping logs and remarks
//! - **Attributes** ([`attributes`]) - Closed registry of computable
//!   per-tautomer attributes
//! - **Chemistry helpers** ([`chem`]) - Desalting heuristic, SMILES text
//!   descriptors, PDB post-processing and energy report parsing
//! - **Tranche assignment** ([`tranche`]) - Maps computed attributes to a
//!   fixed-width letter code
//! - **I/O** ([`io`]) - Collection input files, summary and bundle archives and
//!   deterministic output routing

pub mod attributes;
pub mod chem;
pub mod io;
pub mod models;
pub mod tranche;
