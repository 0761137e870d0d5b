//! Local-first kanban board: boards, columns and cards with dense
//! drag-and-drop ordering, a SQLite store and an HTTP/WebSocket surface.

pub mod board;
pub mod config;
pub mod errors;
pub mod logging;
