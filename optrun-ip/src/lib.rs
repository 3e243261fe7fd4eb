//! optrun-ip library - initial population builder
//!
//! Picks the best solutions out of one or more optimizer result stores and
//! merges them into a fresh store that seeds the initial population of a
//! later run.

pub mod layout;
pub mod merge;
pub mod profile;
pub mod registry;
pub mod schema;
pub mod selector;
pub mod spec;
pub mod writer;

pub use merge::{generate, MergeReport, MergeRequest, SourceReport};
pub use profile::{CandidateIdentity, Ranking, SourceProfile};
pub use selector::CandidateRef;
pub use spec::{Addressing, SourceSpec};
