//! Shared domain types for the taskboard kanban engine.
//!
//! The records here are plain data: boards own columns, columns own cards,
//! and siblings inside a container carry a dense `order` index (`0..N`).
//! Everything that mutates them lives in the `taskboard` crate.

pub mod ids;
pub mod models;
pub mod patch;
pub mod position;

pub use ids::{BoardId, CardId, ColumnId};
pub use models::{Board, Card, Column};
pub use patch::{CardPatch, CardUpdates, ColumnPatch, ColumnUpdates};
pub use position::{OrderViolation, Ordered, check_dense, renumber};
