//! Drag Interaction Handler.
//!
//! A gesture moves through `Idle → Dragging → Resolving → Settled`. Planning
//! ([`plan_drag`]) is pure and runs against the projected board; the
//! controller then shows the plan as an optimistic overlay, fans the writes
//! out concurrently, and drops the overlay once every write has finished,
//! whatever the individual outcomes.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use taskboard_common::{BoardId, CardId, ColumnId};

use super::gateway::{Filter, Gateway, RecordKey, Subscription};
use super::overlay::{PendingOverlay, project};
use super::resolve::{CardMove, resolve_card_move, resolve_column_move};
use super::view::BoardState;
use crate::errors::{DragError, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DragKind {
    Card,
    Column,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragSource {
    pub container_id: String,
    pub index: usize,
}

/// Where an item was released.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DropTarget {
    /// Released on another card; the card's column and index are the target.
    #[serde(rename_all = "camelCase")]
    Card { card_id: CardId },
    /// Released on a column (for cards) or board (for columns). No index
    /// means the container body: append.
    #[serde(rename_all = "camelCase")]
    Container {
        container_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },
}

/// A drag-end event as reported by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragEvent {
    pub drag_type: DragKind,
    pub dragged_item_id: String,
    pub source: DragSource,
    /// `None` when the drag was cancelled.
    #[serde(default)]
    pub destination: Option<DropTarget>,
}

impl DragEvent {
    /// Build an event for an item at its current position in `state`.
    pub fn locate(
        state: &BoardState,
        drag_type: DragKind,
        item_id: &str,
        destination: Option<DropTarget>,
    ) -> Result<Self, DragError> {
        let source = match drag_type {
            DragKind::Card => {
                let (column, index) = state
                    .card_position(&CardId::from(item_id))
                    .ok_or_else(|| unknown_item(item_id))?;
                DragSource {
                    container_id: column.to_string(),
                    index,
                }
            }
            DragKind::Column => DragSource {
                container_id: state.board_id.to_string(),
                index: state
                    .column_index(&ColumnId::from(item_id))
                    .ok_or_else(|| unknown_item(item_id))?,
            },
        };
        Ok(Self {
            drag_type,
            dragged_item_id: item_id.to_string(),
            source,
            destination,
        })
    }
}

/// Resolved writes for one drag.
#[derive(Debug, Clone, PartialEq)]
pub struct DragPlan {
    pub item: RecordKey,
    pub updates: PendingOverlay,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteFailure {
    pub key: RecordKey,
    pub error: String,
}

/// Result of a committed drag. Failed writes are reported, never rolled back.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DragOutcome {
    pub applied: Vec<RecordKey>,
    pub failures: Vec<WriteFailure>,
}

impl DragOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragPhase {
    Idle,
    Dragging { kind: DragKind, item: String },
    Resolving,
    Settled,
}

impl DragPhase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Dragging { .. } => "dragging",
            Self::Resolving => "resolving",
            Self::Settled => "settled",
        }
    }
}

fn unknown_item(id: &str) -> DragError {
    DragError::UnknownItem { id: id.to_string() }
}

fn check_index(index: usize, len: usize) -> Result<usize, DragError> {
    if index < len {
        Ok(index)
    } else {
        Err(DragError::IndexOutOfRange { index, len })
    }
}

/// Turn a drag-end event into an update plan.
///
/// Returns `Ok(None)` for cancelled and no-op drops. Every error is raised
/// before anything is written.
pub fn plan_drag(state: &BoardState, event: &DragEvent) -> Result<Option<DragPlan>, DragError> {
    let plan = match event.drag_type {
        DragKind::Card => plan_card_drag(state, event)?,
        DragKind::Column => plan_column_drag(state, event)?,
    };
    Ok(plan.filter(|plan| !plan.updates.is_empty()))
}

fn check_source(event: &DragEvent, container: &str, index: usize) -> Result<(), DragError> {
    if event.source.container_id != container || event.source.index != index {
        return Err(DragError::InvalidTarget(format!(
            "{} is at {}[{}], not {}[{}]",
            event.dragged_item_id, container, index, event.source.container_id, event.source.index
        )));
    }
    Ok(())
}

fn plan_card_drag(state: &BoardState, event: &DragEvent) -> Result<Option<DragPlan>, DragError> {
    let card_id = CardId::from(event.dragged_item_id.as_str());
    let (source_column, source_index) = state
        .card_position(&card_id)
        .ok_or_else(|| unknown_item(&event.dragged_item_id))?;
    check_source(event, source_column.as_str(), source_index)?;

    let Some(destination) = &event.destination else {
        return Ok(None);
    };

    let (destination_column, destination_index) = match destination {
        DropTarget::Card { card_id: target } => {
            let (column, index) = state.card_position(target).ok_or_else(|| {
                DragError::InvalidTarget(format!("card {target} is not on this board"))
            })?;
            (column, Some(index))
        }
        DropTarget::Container {
            container_id,
            index,
        } => {
            if container_id == state.board_id.as_str() {
                return Err(DragError::InvalidTarget(
                    "cards can only be dropped into a column".into(),
                ));
            }
            let column = ColumnId::from(container_id.as_str());
            if state.column(&column).is_none() {
                return Err(DragError::UnknownContainer {
                    id: container_id.clone(),
                });
            }
            if let Some(index) = index {
                let len = state.cards_in(&column).len();
                // A card may land after the last card of another column, but
                // only on an existing slot of its own.
                let slots = if column == source_column { len } else { len + 1 };
                check_index(*index, slots)?;
            }
            (column, *index)
        }
    };

    let source_cards = state.cards_in(&source_column);
    let destination_cards = if destination_column == source_column {
        Vec::new()
    } else {
        state.cards_in(&destination_column)
    };
    let mv = CardMove {
        card_id: &card_id,
        source_column: &source_column,
        destination_column: &destination_column,
        source_cards: &source_cards,
        destination_cards: &destination_cards,
        source_index,
        destination_index,
    };

    Ok(Some(DragPlan {
        item: RecordKey::Card(card_id.clone()),
        updates: PendingOverlay {
            cards: resolve_card_move(&mv),
            ..Default::default()
        },
    }))
}

fn plan_column_drag(
    state: &BoardState,
    event: &DragEvent,
) -> Result<Option<DragPlan>, DragError> {
    let column_id = ColumnId::from(event.dragged_item_id.as_str());
    let from = state
        .column_index(&column_id)
        .ok_or_else(|| unknown_item(&event.dragged_item_id))?;
    check_source(event, state.board_id.as_str(), from)?;

    let Some(destination) = &event.destination else {
        return Ok(None);
    };

    let last = state.columns.len() - 1;
    let to = match destination {
        DropTarget::Card { card_id } => {
            let card = state.card(card_id).ok_or_else(|| {
                DragError::InvalidTarget(format!("card {card_id} is not on this board"))
            })?;
            state
                .column_index(&card.column_id)
                .ok_or_else(|| DragError::UnknownContainer {
                    id: card.column_id.to_string(),
                })?
        }
        DropTarget::Container {
            container_id,
            index,
        } if container_id == state.board_id.as_str() => match index {
            Some(index) => check_index(*index, state.columns.len())?,
            None => last,
        },
        DropTarget::Container { container_id, .. } => state
            .column_index(&ColumnId::from(container_id.as_str()))
            .ok_or_else(|| DragError::UnknownContainer {
                id: container_id.clone(),
            })?,
    };

    Ok(Some(DragPlan {
        item: RecordKey::Column(column_id),
        updates: PendingOverlay {
            columns: resolve_column_move(&state.columns, from, to),
            ..Default::default()
        },
    }))
}

/// Issue one patch per affected record, all at once, and wait for every one
/// of them.
pub async fn write_updates<G: Gateway + ?Sized>(
    gateway: &G,
    updates: &PendingOverlay,
) -> DragOutcome {
    let writes = updates.patches().into_iter().map(|patch| async move {
        let key = patch.key();
        (key, gateway.patch(patch).await)
    });

    let mut outcome = DragOutcome::default();
    for (key, result) in join_all(writes).await {
        match result {
            Ok(_) => outcome.applied.push(key),
            Err(err) => {
                warn!(key = %key, error = %err, "Drag write failed, siblings keep what was written");
                outcome.failures.push(WriteFailure {
                    key,
                    error: err.to_string(),
                });
            }
        }
    }
    outcome
}

/// Client-side drag state for one open board.
///
/// Canonical lists come from two live subscriptions; the published view is
/// the canonical state with the pending overlay projected on top.
pub struct DragController<G> {
    gateway: G,
    board_id: BoardId,
    columns: Subscription,
    cards: Subscription,
    overlay: PendingOverlay,
    phase: DragPhase,
    view: watch::Sender<BoardState>,
}

impl<G: Gateway> DragController<G> {
    pub async fn open(gateway: G, board_id: BoardId) -> Result<Self, StoreError> {
        let columns = gateway
            .subscribe(Filter::ColumnsOf(board_id.clone()))
            .await?;
        let cards = gateway
            .subscribe(Filter::CardsOfBoard(board_id.clone()))
            .await?;
        let canonical =
            BoardState::from_records(board_id.clone(), columns.current(), cards.current());
        let (view, _) = watch::channel(canonical);
        Ok(Self {
            gateway,
            board_id,
            columns,
            cards,
            overlay: PendingOverlay::default(),
            phase: DragPhase::Idle,
            view,
        })
    }

    pub fn phase(&self) -> &DragPhase {
        &self.phase
    }

    pub fn overlay(&self) -> &PendingOverlay {
        &self.overlay
    }

    /// State as last emitted by the store, without the overlay.
    pub fn canonical(&self) -> BoardState {
        BoardState::from_records(
            self.board_id.clone(),
            self.columns.current(),
            self.cards.current(),
        )
    }

    /// State as the user should see it.
    pub fn view(&self) -> BoardState {
        project(&self.canonical(), &self.overlay)
    }

    pub fn watch(&self) -> watch::Receiver<BoardState> {
        self.view.subscribe()
    }

    fn publish(&self) {
        self.view.send_replace(self.view());
    }

    /// Wait for the store to emit a new column or card list, then republish.
    pub async fn refresh(&mut self) -> Result<(), StoreError> {
        tokio::select! {
            changed = self.columns.changed() => { changed?; }
            changed = self.cards.changed() => { changed?; }
        }
        self.publish();
        Ok(())
    }

    pub fn begin(&mut self, kind: DragKind, item: &str) -> Result<(), DragError> {
        if !matches!(self.phase, DragPhase::Idle | DragPhase::Settled) {
            return Err(DragError::Busy {
                phase: self.phase.name(),
            });
        }
        let view = self.view();
        let known = match kind {
            DragKind::Card => view.card(&CardId::from(item)).is_some(),
            DragKind::Column => view.column(&ColumnId::from(item)).is_some(),
        };
        if !known {
            return Err(unknown_item(item));
        }
        self.phase = DragPhase::Dragging {
            kind,
            item: item.to_string(),
        };
        Ok(())
    }

    pub fn cancel(&mut self) {
        if matches!(self.phase, DragPhase::Dragging { .. }) {
            self.phase = DragPhase::Idle;
        }
    }

    /// Plan the drop and show it immediately. Returns `None` for cancelled
    /// and no-op drops, which go straight back to idle.
    pub fn resolve(&mut self, event: &DragEvent) -> Result<Option<DragPlan>, DragError> {
        match &self.phase {
            DragPhase::Dragging { kind, item }
                if *kind == event.drag_type && *item == event.dragged_item_id => {}
            DragPhase::Dragging { item, .. } => {
                return Err(DragError::InvalidTarget(format!(
                    "event is for {}, but {} is being dragged",
                    event.dragged_item_id, item
                )));
            }
            DragPhase::Resolving => return Err(DragError::Busy { phase: "resolving" }),
            DragPhase::Idle | DragPhase::Settled => return Err(DragError::NotDragging),
        }

        let plan = match plan_drag(&self.view(), event) {
            Ok(Some(plan)) => plan,
            Ok(None) => {
                debug!(item = %event.dragged_item_id, "Drop is a no-op");
                self.phase = DragPhase::Idle;
                return Ok(None);
            }
            Err(err) => {
                self.phase = DragPhase::Idle;
                return Err(err);
            }
        };

        debug!(item = %plan.item, updates = plan.updates.len(), "Drag resolved");
        self.overlay = plan.updates.clone();
        self.phase = DragPhase::Resolving;
        self.publish();
        Ok(Some(plan))
    }

    /// Write the plan, then clear the overlay regardless of the outcome.
    pub async fn commit(&mut self, plan: DragPlan) -> Result<DragOutcome, DragError> {
        if self.phase != DragPhase::Resolving {
            return Err(DragError::NotDragging);
        }

        let outcome = write_updates(&self.gateway, &plan.updates).await;

        self.overlay.clear();
        self.phase = DragPhase::Settled;
        self.publish();

        if outcome.is_complete() {
            info!(item = %plan.item, writes = outcome.applied.len(), "Drag settled");
        } else {
            warn!(
                item = %plan.item,
                applied = outcome.applied.len(),
                failed = outcome.failures.len(),
                "Drag settled with failed writes"
            );
        }
        Ok(outcome)
    }

    /// `resolve` followed by `commit`. `None` for cancelled and no-op drops.
    pub async fn complete(&mut self, event: &DragEvent) -> Result<Option<DragOutcome>, DragError> {
        match self.resolve(event)? {
            Some(plan) => Ok(Some(self.commit(plan).await?)),
            None => Ok(None),
        }
    }
}
