//! Kanban board back-end: ordered columns and cards with drag-and-drop.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐   HTTP   ┌──────────────────────────────────────────────────┐
//! │  Client  │ ───────> │  server.rs  (axum Router, ServerConfig)          │
//! │          │ <─────── │    └─ api.rs  (route handlers, AppState)         │
//! └──────────┘ WebSocket│         │                                        │
//!                       │         │ BoardService::apply_drag()             │
//!                       │         v                                        │
//!                       │  service.rs   (BoardService, repair)             │
//!                       │         │                                        │
//!                       │         │ plan_drag() under the ordering lock    │
//!                       │         v                                        │
//!                       │  drag.rs  ── resolve.rs ── reorder.rs            │
//!                       │         │    (dense-order update sets)           │
//!                       │         │ write_updates() fan-out                │
//!                       │         v                                        │
//!                       │  gateway.rs  (Gateway trait, Filter, Change)     │
//!                       │         │                                        │
//!                       │         v                                        │
//!                       │  db.rs   (SqliteGateway, live subscriptions)     │
//!                       └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Supporting Modules
//!
//! | Module    | Responsibility                                              |
//! |-----------|-------------------------------------------------------------|
//! | `view`    | `BoardState` snapshot and the nested `BoardView` JSON shape |
//! | `overlay` | `PendingOverlay` and `project()` for optimistic display     |
//! | `ws`      | `WsMessage` enum, `broadcast_message()`, change relay       |
//!
//! ## Drag Flow
//!
//! 1. `POST /api/boards/{id}/drag` with a `DragEvent` body reaches
//!    `BoardService::apply_drag()`, which holds the service's ordering lock
//!    until step 3 finishes.
//! 2. `plan_drag()` validates the event against the freshly loaded
//!    `BoardState` and builds the minimal update set so every sibling list
//!    stays `0..n-1`.
//! 3. `write_updates()` issues one gateway patch per record concurrently.
//!    Failures are reported in `DragOutcome`, never rolled back.
//! 4. Each commit refreshes matching subscriptions, then lands on the change
//!    feed, which `ws::forward_changes()` relays to socket clients.
//!
//! Clients that want the new order before the writes land use
//! `DragController`: it runs the same plan, keeps the update set as a
//! `PendingOverlay` over its subscription snapshot, and clears it once
//! `write_updates()` returns.

pub mod api;
pub mod db;
pub mod drag;
pub mod gateway;
pub mod overlay;
pub mod reorder;
pub mod resolve;
pub mod server;
pub mod service;
pub mod view;
pub mod ws;

pub use db::{BoardDb, SqliteGateway};
pub use drag::{DragController, DragEvent, DragOutcome, plan_drag, write_updates};
pub use gateway::{Change, ChangeOp, Filter, Gateway, GatewayExt, Record, RecordKey, RecordPatch};
pub use service::BoardService;
pub use view::{BoardState, BoardView};
