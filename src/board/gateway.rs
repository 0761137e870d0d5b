use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::WatchStream;

use taskboard_common::{
    Board, BoardId, Card, CardId, CardPatch, Column, ColumnId, ColumnPatch,
};

use crate::errors::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Board,
    Column,
    Card,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Board => "board",
            Self::Column => "column",
            Self::Card => "card",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primary key of a stored record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum RecordKey {
    Board(BoardId),
    Column(ColumnId),
    Card(CardId),
}

impl RecordKey {
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Board(_) => RecordKind::Board,
            Self::Column(_) => RecordKind::Column,
            Self::Card(_) => RecordKind::Card,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Board(id) => id.as_str(),
            Self::Column(id) => id.as_str(),
            Self::Card(id) => id.as_str(),
        }
    }

    pub fn not_found(&self) -> StoreError {
        StoreError::not_found(self.kind(), self.id())
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Record {
    Board(Board),
    Column(Column),
    Card(Card),
}

impl Record {
    pub fn key(&self) -> RecordKey {
        match self {
            Self::Board(board) => RecordKey::Board(board.id.clone()),
            Self::Column(column) => RecordKey::Column(column.id.clone()),
            Self::Card(card) => RecordKey::Card(card.id.clone()),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Board(board) => &board.title,
            Self::Column(column) => &column.title,
            Self::Card(card) => &card.title,
        }
    }

    pub fn into_board(self) -> Option<Board> {
        match self {
            Self::Board(board) => Some(board),
            _ => None,
        }
    }

    pub fn into_column(self) -> Option<Column> {
        match self {
            Self::Column(column) => Some(column),
            _ => None,
        }
    }

    pub fn into_card(self) -> Option<Card> {
        match self {
            Self::Card(card) => Some(card),
            _ => None,
        }
    }
}

impl From<Board> for Record {
    fn from(board: Board) -> Self {
        Self::Board(board)
    }
}

impl From<Column> for Record {
    fn from(column: Column) -> Self {
        Self::Column(column)
    }
}

impl From<Card> for Record {
    fn from(card: Card) -> Self {
        Self::Card(card)
    }
}

/// A partial update addressed to one record. Every patch also bumps the
/// record's `updated_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RecordPatch {
    Column { id: ColumnId, patch: ColumnPatch },
    Card { id: CardId, patch: CardPatch },
    Retitle { key: RecordKey, title: String },
}

impl RecordPatch {
    pub fn key(&self) -> RecordKey {
        match self {
            Self::Column { id, .. } => RecordKey::Column(id.clone()),
            Self::Card { id, .. } => RecordKey::Card(id.clone()),
            Self::Retitle { key, .. } => key.clone(),
        }
    }
}

/// Parent-scoped query. Positional results come back sorted by order
/// ascending; boards by creation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "snake_case")]
pub enum Filter {
    Boards,
    ColumnsOf(BoardId),
    CardsOf(ColumnId),
    CardsOfBoard(BoardId),
}

impl Filter {
    /// Whether a committed change can alter this filter's result set.
    pub fn matches(&self, change: &Change) -> bool {
        let has_parent = |id: &str| change.parents.iter().any(|p| p == id);
        match (self, change.key.kind()) {
            (Self::Boards, RecordKind::Board) => true,
            (Self::ColumnsOf(board), RecordKind::Column) => has_parent(board.as_str()),
            (Self::CardsOf(column), RecordKind::Card) => has_parent(column.as_str()),
            (Self::CardsOfBoard(board), RecordKind::Card) => has_parent(board.as_str()),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    Inserted,
    Patched,
    Removed,
}

/// One committed write. `parents` lists every container id whose children
/// changed, including the previous column of a relocated card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub op: ChangeOp,
    pub key: RecordKey,
    pub parents: Vec<String>,
}

/// Live result set of a [`Filter`].
///
/// The store replaces the value after every commit that touches the filter,
/// before the write call returns. Identical result sets are not re-emitted.
pub struct Subscription {
    filter: Filter,
    rx: watch::Receiver<Vec<Record>>,
}

impl Subscription {
    pub fn new(filter: Filter, rx: watch::Receiver<Vec<Record>>) -> Self {
        Self { filter, rx }
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn current(&self) -> Vec<Record> {
        self.rx.borrow().clone()
    }

    /// Wait for the next emission. Fails with `Closed` once the store is gone.
    pub async fn changed(&mut self) -> Result<Vec<Record>, StoreError> {
        self.rx.changed().await.map_err(|_| StoreError::Closed)?;
        Ok(self.rx.borrow_and_update().clone())
    }

    pub fn receiver(&self) -> watch::Receiver<Vec<Record>> {
        self.rx.clone()
    }

    pub fn into_stream(self) -> WatchStream<Vec<Record>> {
        WatchStream::new(self.rx)
    }
}

/// The narrow interface to the local-first store.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Create a record. Fails with `AlreadyExists` if the key is taken.
    async fn insert(&self, record: Record) -> Result<Record, StoreError>;

    async fn find_one(&self, key: RecordKey) -> Result<Record, StoreError>;

    /// Merge the patch into an existing record. Fails with `NotFound` if the
    /// key is absent.
    async fn patch(&self, patch: RecordPatch) -> Result<Record, StoreError>;

    /// Delete a record and everything it owns.
    async fn remove(&self, key: RecordKey) -> Result<(), StoreError>;

    async fn query(&self, filter: Filter) -> Result<Vec<Record>, StoreError>;

    async fn subscribe(&self, filter: Filter) -> Result<Subscription, StoreError>;

    /// Feed of committed writes, for replication and the live socket.
    fn changes(&self) -> broadcast::Receiver<Change>;
}

/// Typed conveniences over [`Gateway`].
#[async_trait]
pub trait GatewayExt: Gateway {
    async fn boards(&self) -> Result<Vec<Board>, StoreError> {
        let records = self.query(Filter::Boards).await?;
        Ok(records.into_iter().filter_map(Record::into_board).collect())
    }

    async fn columns_of(&self, board: &BoardId) -> Result<Vec<Column>, StoreError> {
        let records = self.query(Filter::ColumnsOf(board.clone())).await?;
        Ok(records.into_iter().filter_map(Record::into_column).collect())
    }

    async fn cards_of(&self, column: &ColumnId) -> Result<Vec<Card>, StoreError> {
        let records = self.query(Filter::CardsOf(column.clone())).await?;
        Ok(records.into_iter().filter_map(Record::into_card).collect())
    }

    async fn cards_of_board(&self, board: &BoardId) -> Result<Vec<Card>, StoreError> {
        let records = self.query(Filter::CardsOfBoard(board.clone())).await?;
        Ok(records.into_iter().filter_map(Record::into_card).collect())
    }

    async fn board(&self, id: &BoardId) -> Result<Board, StoreError> {
        let key = RecordKey::Board(id.clone());
        self.find_one(key.clone())
            .await?
            .into_board()
            .ok_or_else(|| key.not_found())
    }

    async fn column(&self, id: &ColumnId) -> Result<Column, StoreError> {
        let key = RecordKey::Column(id.clone());
        self.find_one(key.clone())
            .await?
            .into_column()
            .ok_or_else(|| key.not_found())
    }

    async fn card(&self, id: &CardId) -> Result<Card, StoreError> {
        let key = RecordKey::Card(id.clone());
        self.find_one(key.clone())
            .await?
            .into_card()
            .ok_or_else(|| key.not_found())
    }
}

impl<G: Gateway + ?Sized> GatewayExt for G {}
