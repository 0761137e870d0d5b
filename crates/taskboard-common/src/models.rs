use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{BoardId, CardId, ColumnId};
use crate::position::Ordered;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: BoardId,
    pub title: String,
    pub owner: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Board {
    pub fn new(title: impl Into<String>, owner: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: BoardId::generate(),
            title: title.into(),
            owner: owner.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: ColumnId,
    pub board_id: BoardId,
    pub title: String,
    /// Dense index among the columns of `board_id`.
    pub order: u32,
    pub owner: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Column {
    pub fn new(
        board_id: BoardId,
        title: impl Into<String>,
        order: u32,
        owner: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ColumnId::generate(),
            board_id,
            title: title.into(),
            order,
            owner: owner.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    pub column_id: ColumnId,
    pub title: String,
    /// Dense index among the cards of `column_id`.
    pub order: u32,
    pub owner: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Card {
    pub fn new(
        column_id: ColumnId,
        title: impl Into<String>,
        order: u32,
        owner: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: CardId::generate(),
            column_id,
            title: title.into(),
            order,
            owner: owner.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Ordered for Column {
    type Id = ColumnId;

    fn id(&self) -> &ColumnId {
        &self.id
    }

    fn order(&self) -> u32 {
        self.order
    }
}

impl Ordered for Card {
    type Id = CardId;

    fn id(&self) -> &CardId {
        &self.id
    }

    fn order(&self) -> u32 {
        self.order
    }
}
