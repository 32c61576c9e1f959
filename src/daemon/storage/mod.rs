//! Storage is organized around JSON documents kept in a [document_store::DocumentStore].
//! The basic idea is:
//!  - Every calendar date gets one [entities::DailyAggregate], keyed by `YYYY-MM-DD`.
//!  - Aggregates only change by merging increments ([aggregate]).
//!  - The local store persists the whole date mapping as a single document.

pub mod aggregate;
pub mod document_store;
pub mod entities;
pub mod local_store;
