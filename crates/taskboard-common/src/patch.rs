//! Positional patches emitted by the move resolvers.
//!
//! A card either changes its index within the same column or moves to a
//! different column, in which case the new column and the new index travel
//! together. A patch that changes nothing cannot be constructed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::{CardId, ColumnId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "CardPatchWire", into = "CardPatchWire")]
pub enum CardPatch {
    /// New index inside the card's current column.
    Reorder { order: u32 },
    /// New column and the card's index inside it.
    Relocate { column_id: ColumnId, order: u32 },
}

impl CardPatch {
    pub fn order(&self) -> u32 {
        match self {
            Self::Reorder { order } | Self::Relocate { order, .. } => *order,
        }
    }

    pub fn column_id(&self) -> Option<&ColumnId> {
        match self {
            Self::Reorder { .. } => None,
            Self::Relocate { column_id, .. } => Some(column_id),
        }
    }
}

/// Wire form: `{"order": 2}` or `{"order": 0, "columnId": "..."}`.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CardPatchWire {
    order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    column_id: Option<ColumnId>,
}

impl From<CardPatchWire> for CardPatch {
    fn from(wire: CardPatchWire) -> Self {
        match wire.column_id {
            Some(column_id) => Self::Relocate {
                column_id,
                order: wire.order,
            },
            None => Self::Reorder { order: wire.order },
        }
    }
}

impl From<CardPatch> for CardPatchWire {
    fn from(patch: CardPatch) -> Self {
        match patch {
            CardPatch::Reorder { order } => Self {
                order,
                column_id: None,
            },
            CardPatch::Relocate { column_id, order } => Self {
                order,
                column_id: Some(column_id),
            },
        }
    }
}

/// Columns never leave their board, so only the index can change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnPatch {
    pub order: u32,
}

pub type CardUpdates = BTreeMap<CardId, CardPatch>;
pub type ColumnUpdates = BTreeMap<ColumnId, ColumnPatch>;
