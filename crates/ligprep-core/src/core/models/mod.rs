//! Data models for the ligand fan-out tree.
//!
//! A [`tree::LigandTree`] owns one ligand and every stereoisomer and tautomer
//! derived from it. Child nodes live in slot-map arenas and refer to their parent
//! by id, never by ownership. Each node carries a [`node::NodeLog`] with its
//! terminal status, status sub-events and stage timers.

pub mod collection;
pub mod format;
pub mod ids;
pub mod ligand;
pub mod node;
pub mod remarks;
pub mod tree;
