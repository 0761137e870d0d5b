use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use taskboard_common::{
    Board, BoardId, Card, CardId, CardPatch, Column, ColumnId, ColumnPatch, renumber,
};

use super::drag::{DragEvent, DragKind, DragOutcome, DropTarget, plan_drag, write_updates};
use super::gateway::{Gateway, GatewayExt, RecordKey, RecordPatch};
use super::view::{BoardState, BoardView};
use crate::errors::{DragError, StoreError};

/// Number of records rewritten by [`BoardService::repair_board`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub columns: usize,
    pub cards: usize,
}

impl RepairReport {
    pub fn total(&self) -> usize {
        self.columns + self.cards
    }
}

/// Board, column and card lifecycle on top of a [`Gateway`].
///
/// Every operation leaves the containers it touches densely ordered.
/// Operations that rewrite sibling orders run one at a time, so a plan is
/// always computed from the state it is written against.
pub struct BoardService<G> {
    gateway: G,
    owner: String,
    ordering: Mutex<()>,
}

fn clean_title(title: &str) -> Result<String, StoreError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(StoreError::validation("title must not be empty"));
    }
    Ok(title.to_string())
}

impl<G: Gateway> BoardService<G> {
    pub fn new(gateway: G, owner: impl Into<String>) -> Self {
        Self {
            gateway,
            owner: owner.into(),
            ordering: Mutex::new(()),
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    // ── Boards ────────────────────────────────────────────────────────

    pub async fn list_boards(&self) -> Result<Vec<Board>, StoreError> {
        self.gateway.boards().await
    }

    pub async fn create_board(&self, title: &str) -> Result<Board, StoreError> {
        let board = Board::new(clean_title(title)?, self.owner.as_str());
        self.gateway.insert(board.clone().into()).await?;
        info!(board = %board.id, title = %board.title, "Board created");
        Ok(board)
    }

    pub async fn rename_board(&self, id: &BoardId, title: &str) -> Result<Board, StoreError> {
        let key = RecordKey::Board(id.clone());
        let record = self
            .gateway
            .patch(RecordPatch::Retitle {
                key: key.clone(),
                title: clean_title(title)?,
            })
            .await?;
        record.into_board().ok_or_else(|| key.not_found())
    }

    /// Delete a board with all of its columns and cards.
    pub async fn delete_board(&self, id: &BoardId) -> Result<(), StoreError> {
        self.gateway.remove(RecordKey::Board(id.clone())).await?;
        info!(board = %id, "Board deleted");
        Ok(())
    }

    pub async fn board_state(&self, id: &BoardId) -> Result<BoardState, StoreError> {
        self.gateway.board(id).await?;
        BoardState::load(&self.gateway, id).await
    }

    pub async fn board_view(&self, id: &BoardId) -> Result<BoardView, StoreError> {
        let board = self.gateway.board(id).await?;
        let state = BoardState::load(&self.gateway, id).await?;
        Ok(BoardView::new(board, &state))
    }

    // ── Columns ───────────────────────────────────────────────────────

    /// Append a column to a board.
    pub async fn create_column(&self, board: &BoardId, title: &str) -> Result<Column, StoreError> {
        let title = clean_title(title)?;
        let _guard = self.ordering.lock().await;
        self.gateway.board(board).await?;
        let order = self.gateway.columns_of(board).await?.len() as u32;
        let column = Column::new(board.clone(), title, order, self.owner.as_str());
        self.gateway.insert(column.clone().into()).await?;
        info!(board = %board, column = %column.id, order, "Column created");
        Ok(column)
    }

    pub async fn rename_column(&self, id: &ColumnId, title: &str) -> Result<Column, StoreError> {
        let key = RecordKey::Column(id.clone());
        let record = self
            .gateway
            .patch(RecordPatch::Retitle {
                key: key.clone(),
                title: clean_title(title)?,
            })
            .await?;
        record.into_column().ok_or_else(|| key.not_found())
    }

    /// Delete a column with its cards, then close the gap it leaves.
    pub async fn delete_column(&self, id: &ColumnId) -> Result<(), StoreError> {
        let _guard = self.ordering.lock().await;
        let column = self.gateway.column(id).await?;
        self.gateway.remove(RecordKey::Column(id.clone())).await?;
        let shifted = self.renumber_columns(&column.board_id).await?;
        info!(column = %id, shifted, "Column deleted");
        Ok(())
    }

    // ── Cards ─────────────────────────────────────────────────────────

    /// Add a card to a column. Without an order it is appended; an explicit
    /// order inserts it there and pushes later cards down.
    pub async fn create_card(
        &self,
        column: &ColumnId,
        title: &str,
        order: Option<u32>,
    ) -> Result<Card, StoreError> {
        let title = clean_title(title)?;
        let _guard = self.ordering.lock().await;
        self.gateway.column(column).await?;
        let siblings = self.gateway.cards_of(column).await?;
        let count = siblings.len() as u32;
        let order = order.unwrap_or(count);
        if order > count {
            return Err(StoreError::validation(format!(
                "order {order} is past the end of a column with {count} cards"
            )));
        }

        for (index, sibling) in siblings.iter().enumerate().skip(order as usize) {
            let shifted = index as u32 + 1;
            if sibling.order != shifted {
                self.gateway
                    .patch(RecordPatch::Card {
                        id: sibling.id.clone(),
                        patch: CardPatch::Reorder { order: shifted },
                    })
                    .await?;
            }
        }

        let card = Card::new(column.clone(), title, order, self.owner.as_str());
        self.gateway.insert(card.clone().into()).await?;
        info!(column = %column, card = %card.id, order, "Card created");
        Ok(card)
    }

    pub async fn rename_card(&self, id: &CardId, title: &str) -> Result<Card, StoreError> {
        let key = RecordKey::Card(id.clone());
        let record = self
            .gateway
            .patch(RecordPatch::Retitle {
                key: key.clone(),
                title: clean_title(title)?,
            })
            .await?;
        record.into_card().ok_or_else(|| key.not_found())
    }

    /// Delete a card, then close the gap it leaves in its column.
    pub async fn delete_card(&self, id: &CardId) -> Result<(), StoreError> {
        let _guard = self.ordering.lock().await;
        let card = self.gateway.card(id).await?;
        self.gateway.remove(RecordKey::Card(id.clone())).await?;
        let shifted = self.renumber_cards(&card.column_id).await?;
        info!(card = %id, shifted, "Card deleted");
        Ok(())
    }

    // ── Ordering ──────────────────────────────────────────────────────

    /// Apply a drag-end event to the stored board.
    pub async fn apply_drag(
        &self,
        board: &BoardId,
        event: &DragEvent,
    ) -> Result<DragOutcome, DragError> {
        let _guard = self.ordering.lock().await;
        self.write_drag(board, event).await
    }

    /// Plan and write a drag. Callers hold `ordering`.
    async fn write_drag(
        &self,
        board: &BoardId,
        event: &DragEvent,
    ) -> Result<DragOutcome, DragError> {
        let state = self.board_state(board).await?;
        let Some(plan) = plan_drag(&state, event)? else {
            debug!(item = %event.dragged_item_id, "Drop is a no-op");
            return Ok(DragOutcome::default());
        };
        debug!(item = %plan.item, updates = plan.updates.len(), "Applying drag");
        Ok(write_updates(&self.gateway, &plan.updates).await)
    }

    /// Move a card into `to` at `index`, or to the end when `index` is `None`.
    pub async fn move_card(
        &self,
        id: &CardId,
        to: &ColumnId,
        index: Option<usize>,
    ) -> Result<DragOutcome, DragError> {
        let _guard = self.ordering.lock().await;
        let card = self.gateway.card(id).await?;
        let column = self.gateway.column(&card.column_id).await?;
        let state = self.board_state(&column.board_id).await?;
        let event = DragEvent::locate(
            &state,
            DragKind::Card,
            id.as_str(),
            Some(DropTarget::Container {
                container_id: to.to_string(),
                index,
            }),
        )?;
        self.write_drag(&column.board_id, &event).await
    }

    pub async fn move_column(&self, id: &ColumnId, index: usize) -> Result<DragOutcome, DragError> {
        let _guard = self.ordering.lock().await;
        let column = self.gateway.column(id).await?;
        let state = self.board_state(&column.board_id).await?;
        let event = DragEvent::locate(
            &state,
            DragKind::Column,
            id.as_str(),
            Some(DropTarget::Container {
                container_id: column.board_id.to_string(),
                index: Some(index),
            }),
        )?;
        self.write_drag(&column.board_id, &event).await
    }

    /// Re-densify every container of a board, keeping the current relative
    /// order (ties broken by creation time, then id).
    pub async fn repair_board(&self, board: &BoardId) -> Result<RepairReport, StoreError> {
        let _guard = self.ordering.lock().await;
        self.gateway.board(board).await?;
        let mut report = RepairReport {
            columns: self.renumber_columns(board).await?,
            cards: 0,
        };
        for column in self.gateway.columns_of(board).await? {
            report.cards += self.renumber_cards(&column.id).await?;
        }
        info!(board = %board, columns = report.columns, cards = report.cards, "Board repaired");
        Ok(report)
    }

    async fn renumber_columns(&self, board: &BoardId) -> Result<usize, StoreError> {
        let columns = self.gateway.columns_of(board).await?;
        let updates = renumber(&columns);
        for (id, order) in &updates {
            self.gateway
                .patch(RecordPatch::Column {
                    id: id.clone(),
                    patch: ColumnPatch { order: *order },
                })
                .await?;
        }
        Ok(updates.len())
    }

    async fn renumber_cards(&self, column: &ColumnId) -> Result<usize, StoreError> {
        let cards = self.gateway.cards_of(column).await?;
        let updates = renumber(&cards);
        for (id, order) in &updates {
            self.gateway
                .patch(RecordPatch::Card {
                    id: id.clone(),
                    patch: CardPatch::Reorder { order: *order },
                })
                .await?;
        }
        Ok(updates.len())
    }
}
