//! Move resolvers: compute the minimal set of positional patches that
//! realise a card or column drop while keeping every container dense.
//!
//! Both resolvers are pure. They expect sibling lists sorted by `order` and
//! indices already validated against those lists.

use taskboard_common::{
    Card, CardId, CardPatch, CardUpdates, Column, ColumnId, ColumnPatch, ColumnUpdates, renumber,
};

use super::reorder::reorder;

/// Input for [`resolve_card_move`].
#[derive(Debug, Clone, Copy)]
pub struct CardMove<'a> {
    pub card_id: &'a CardId,
    pub source_column: &'a ColumnId,
    pub destination_column: &'a ColumnId,
    /// Cards of the source column, sorted by order.
    pub source_cards: &'a [Card],
    /// Cards of the destination column, sorted by order. Ignored when the
    /// card stays in its column.
    pub destination_cards: &'a [Card],
    pub source_index: usize,
    /// Insertion index in the destination column. `None` appends (drop on
    /// the column body rather than on a sibling card).
    pub destination_index: Option<usize>,
}

impl CardMove<'_> {
    pub fn is_same_column(&self) -> bool {
        self.source_column == self.destination_column
    }
}

/// Compute the patches for a card drop.
///
/// Same-column drops renumber the column through [`reorder`]. Cross-column
/// drops always emit a `Relocate` for the dragged card and renumber both the
/// remaining source cards and the shifted destination cards. Cards whose
/// index does not change are left out.
pub fn resolve_card_move(mv: &CardMove<'_>) -> CardUpdates {
    if mv.is_same_column() {
        resolve_within_column(mv)
    } else {
        resolve_across_columns(mv)
    }
}

fn resolve_within_column(mv: &CardMove<'_>) -> CardUpdates {
    let Some(last) = mv.source_cards.len().checked_sub(1) else {
        return CardUpdates::new();
    };
    let to = mv.destination_index.map_or(last, |index| index.min(last));
    if to == mv.source_index {
        return CardUpdates::new();
    }

    let arranged = reorder(mv.source_cards, mv.source_index, to);
    renumber(&arranged)
        .into_iter()
        .map(|(id, order)| (id, CardPatch::Reorder { order }))
        .collect()
}

fn resolve_across_columns(mv: &CardMove<'_>) -> CardUpdates {
    let mut updates = CardUpdates::new();

    let remaining: Vec<&Card> = mv
        .source_cards
        .iter()
        .filter(|card| &card.id != mv.card_id)
        .collect();
    for (id, order) in renumber(remaining) {
        updates.insert(id, CardPatch::Reorder { order });
    }

    let destination: Vec<&Card> = mv
        .destination_cards
        .iter()
        .filter(|card| &card.id != mv.card_id)
        .collect();
    let at = mv
        .destination_index
        .unwrap_or(destination.len())
        .min(destination.len());

    for (index, card) in destination.iter().enumerate() {
        // Everything at or after the insertion point shifts down by one.
        let order = (if index < at { index } else { index + 1 }) as u32;
        if card.order != order {
            updates.insert(card.id.clone(), CardPatch::Reorder { order });
        }
    }

    updates.insert(
        mv.card_id.clone(),
        CardPatch::Relocate {
            column_id: mv.destination_column.clone(),
            order: at as u32,
        },
    );
    updates
}

/// Compute the patches for a column drop within its board.
///
/// `columns` is the board's full column list sorted by order.
pub fn resolve_column_move(columns: &[Column], from: usize, to: usize) -> ColumnUpdates {
    if from == to {
        return ColumnUpdates::new();
    }
    let arranged = reorder(columns, from, to);
    renumber(&arranged)
        .into_iter()
        .map(|(id, order)| (id, ColumnPatch { order }))
        .collect()
}
