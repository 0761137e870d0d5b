use taskboard_common::{CardUpdates, ColumnUpdates};

use super::gateway::RecordPatch;
use super::view::BoardState;

/// Update sets of an in-flight drag, shown on top of the canonical lists
/// until its writes settle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingOverlay {
    pub columns: ColumnUpdates,
    pub cards: CardUpdates,
}

impl PendingOverlay {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.cards.is_empty()
    }

    pub fn len(&self) -> usize {
        self.columns.len() + self.cards.len()
    }

    pub fn clear(&mut self) {
        self.columns.clear();
        self.cards.clear();
    }

    /// One gateway patch per affected record.
    pub fn patches(&self) -> Vec<RecordPatch> {
        let columns = self.columns.iter().map(|(id, patch)| RecordPatch::Column {
            id: id.clone(),
            patch: *patch,
        });
        let cards = self.cards.iter().map(|(id, patch)| RecordPatch::Card {
            id: id.clone(),
            patch: patch.clone(),
        });
        columns.chain(cards).collect()
    }
}

/// Merge an overlay into canonical state. Entries for records that are no
/// longer present are ignored.
pub fn project(state: &BoardState, overlay: &PendingOverlay) -> BoardState {
    if overlay.is_empty() {
        return state.clone();
    }

    let columns = state
        .columns
        .iter()
        .cloned()
        .map(|mut column| {
            if let Some(patch) = overlay.columns.get(&column.id) {
                column.order = patch.order;
            }
            column
        })
        .collect();

    let cards = state
        .cards
        .iter()
        .cloned()
        .map(|mut card| {
            if let Some(patch) = overlay.cards.get(&card.id) {
                card.order = patch.order();
                if let Some(column_id) = patch.column_id() {
                    card.column_id = column_id.clone();
                }
            }
            card
        })
        .collect();

    BoardState::new(state.board_id.clone(), columns, cards)
}
