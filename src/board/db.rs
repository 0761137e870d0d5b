use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Params, Row, params};
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

use taskboard_common::{Board, BoardId, Card, CardId, CardPatch, Column, ColumnId};

use super::gateway::{
    Change, ChangeOp, Filter, Gateway, Record, RecordKey, RecordKind, RecordPatch, Subscription,
};
use crate::errors::StoreError;

const CHANGE_FEED_CAPACITY: usize = 1024;

const BOARD_FIELDS: &str = "id, title, owner, created_at, updated_at";
const COLUMN_FIELDS: &str = "id, board_id, title, position, owner, created_at, updated_at";
const CARD_FIELDS: &str = "cards.id, cards.column_id, cards.title, cards.position, cards.owner, cards.created_at, cards.updated_at";

/// SQLite-backed local-first store.
///
/// Cloning is cheap; all clones share one connection. Every call runs on
/// tokio's blocking pool, and subscriptions are refreshed inside the same
/// lock as the commit that changed them.
#[derive(Clone)]
pub struct SqliteGateway {
    handle: DbHandle,
    feed: broadcast::Sender<Change>,
}

impl SqliteGateway {
    /// Open (or create) a database file and run migrations.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let db = BoardDb::new(path)?;
        debug!(path = %path.display(), "Opened board store");
        Ok(Self::from_db(db))
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self::from_db(BoardDb::new_in_memory()?))
    }

    fn from_db(db: BoardDb) -> Self {
        let (feed, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            handle: DbHandle::new(State {
                db,
                subscribers: Vec::new(),
            }),
            feed,
        }
    }

    /// Release the connection. Live subscriptions end, and every later call
    /// on any clone fails with `StoreError::Closed`. Closing twice is a no-op.
    pub async fn close(&self) -> Result<(), StoreError> {
        self.handle.close().await
    }

    /// Run a write, then refresh affected subscriptions and publish the
    /// resulting changes before releasing the lock.
    async fn commit<F, R>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&BoardDb) -> Result<(R, Vec<Change>), StoreError> + Send + 'static,
        R: Send + 'static,
    {
        let feed = self.feed.clone();
        self.handle
            .call(move |state| {
                let (out, changes) = f(&state.db)?;
                state.publish(&changes, &feed);
                Ok(out)
            })
            .await
    }
}

#[async_trait]
impl Gateway for SqliteGateway {
    async fn insert(&self, record: Record) -> Result<Record, StoreError> {
        self.commit(move |db| {
            let change = db.insert(&record)?;
            debug!(key = %change.key, "Record inserted");
            Ok((record, vec![change]))
        })
        .await
    }

    async fn find_one(&self, key: RecordKey) -> Result<Record, StoreError> {
        self.handle
            .call(move |state| state.db.find(&key)?.ok_or_else(|| key.not_found()))
            .await
    }

    async fn patch(&self, patch: RecordPatch) -> Result<Record, StoreError> {
        self.commit(move |db| {
            let (record, change) = db.patch(&patch)?;
            debug!(key = %change.key, "Record patched");
            Ok((record, vec![change]))
        })
        .await
    }

    async fn remove(&self, key: RecordKey) -> Result<(), StoreError> {
        self.commit(move |db| {
            let changes = db.remove(&key)?;
            debug!(key = %key, cascaded = changes.len() - 1, "Record removed");
            Ok(((), changes))
        })
        .await
    }

    async fn query(&self, filter: Filter) -> Result<Vec<Record>, StoreError> {
        self.handle.call(move |state| state.db.query(&filter)).await
    }

    async fn subscribe(&self, filter: Filter) -> Result<Subscription, StoreError> {
        self.handle
            .call(move |state| {
                let records = state.db.query(&filter)?;
                let (tx, rx) = watch::channel(records);
                state.subscribers.push(Subscriber {
                    filter: filter.clone(),
                    tx,
                });
                Ok(Subscription::new(filter, rx))
            })
            .await
    }

    fn changes(&self) -> broadcast::Receiver<Change> {
        self.feed.subscribe()
    }
}

/// Async-safe handle to the open store. `None` once closed.
#[derive(Clone)]
struct DbHandle {
    inner: Arc<Mutex<Option<State>>>,
}

impl DbHandle {
    fn new(state: State) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(state))),
        }
    }

    /// Run a closure with access to the store on a blocking thread.
    async fn call<F, R>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut State) -> Result<R, StoreError> + Send + 'static,
        R: Send + 'static,
    {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = inner.lock().map_err(|_| StoreError::LockPoisoned)?;
            let state = guard.as_mut().ok_or(StoreError::Closed)?;
            f(state)
        })
        .await?
    }

    async fn close(&self) -> Result<(), StoreError> {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = inner.lock().map_err(|_| StoreError::LockPoisoned)?;
            if guard.take().is_some() {
                debug!("Board store closed");
            }
            Ok(())
        })
        .await?
    }
}

struct State {
    db: BoardDb,
    subscribers: Vec<Subscriber>,
}

struct Subscriber {
    filter: Filter,
    tx: watch::Sender<Vec<Record>>,
}

impl State {
    fn publish(&mut self, changes: &[Change], feed: &broadcast::Sender<Change>) {
        self.subscribers.retain(|sub| !sub.tx.is_closed());
        for sub in &self.subscribers {
            if !changes.iter().any(|change| sub.filter.matches(change)) {
                continue;
            }
            match self.db.query(&sub.filter) {
                Ok(records) => {
                    sub.tx.send_if_modified(|current| {
                        if *current == records {
                            return false;
                        }
                        *current = records;
                        true
                    });
                }
                Err(err) => {
                    warn!(filter = ?sub.filter, error = %err, "Failed to refresh subscription")
                }
            }
        }
        for change in changes {
            // No receivers is fine: nobody is listening yet.
            let _ = feed.send(change.clone());
        }
    }
}

/// Synchronous SQLite access.
pub struct BoardDb {
    conn: Connection,
}

impl BoardDb {
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let db = Self {
            conn: Connection::open(path)?,
        };
        db.init()?;
        Ok(db)
    }

    pub fn new_in_memory() -> Result<Self, StoreError> {
        let db = Self {
            conn: Connection::open_in_memory()?,
        };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<(), StoreError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.run_migrations()
    }

    fn run_migrations(&self) -> Result<(), StoreError> {
        // Sibling positions are deliberately not UNIQUE: a drag writes one
        // record at a time and passes through transient duplicates.
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS boards (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                owner TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS columns (
                id TEXT PRIMARY KEY,
                board_id TEXT NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                position INTEGER NOT NULL CHECK (position >= 0),
                owner TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS cards (
                id TEXT PRIMARY KEY,
                column_id TEXT NOT NULL REFERENCES columns(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                position INTEGER NOT NULL CHECK (position >= 0),
                owner TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_columns_board ON columns(board_id, position);
            CREATE INDEX IF NOT EXISTS idx_cards_column ON cards(column_id, position);
            ",
        )?;
        Ok(())
    }

    // ── Reads ─────────────────────────────────────────────────────────

    pub fn find(&self, key: &RecordKey) -> Result<Option<Record>, StoreError> {
        let record = match key {
            RecordKey::Board(id) => self
                .conn
                .query_row(
                    &format!("SELECT {BOARD_FIELDS} FROM boards WHERE id = ?1"),
                    params![id.as_str()],
                    board_from_row,
                )
                .optional()?
                .map(Record::Board),
            RecordKey::Column(id) => self
                .conn
                .query_row(
                    &format!("SELECT {COLUMN_FIELDS} FROM columns WHERE id = ?1"),
                    params![id.as_str()],
                    column_from_row,
                )
                .optional()?
                .map(Record::Column),
            RecordKey::Card(id) => self
                .conn
                .query_row(
                    &format!("SELECT {CARD_FIELDS} FROM cards WHERE cards.id = ?1"),
                    params![id.as_str()],
                    card_from_row,
                )
                .optional()?
                .map(Record::Card),
        };
        Ok(record)
    }

    pub fn query(&self, filter: &Filter) -> Result<Vec<Record>, StoreError> {
        let records = match filter {
            Filter::Boards => self
                .collect(
                    &format!("SELECT {BOARD_FIELDS} FROM boards ORDER BY created_at, id"),
                    [],
                    board_from_row,
                )?
                .into_iter()
                .map(Record::Board)
                .collect(),
            Filter::ColumnsOf(board) => self
                .collect(
                    &format!(
                        "SELECT {COLUMN_FIELDS} FROM columns WHERE board_id = ?1
                         ORDER BY position, created_at, id"
                    ),
                    params![board.as_str()],
                    column_from_row,
                )?
                .into_iter()
                .map(Record::Column)
                .collect(),
            Filter::CardsOf(column) => self
                .collect(
                    &format!(
                        "SELECT {CARD_FIELDS} FROM cards WHERE cards.column_id = ?1
                         ORDER BY cards.position, cards.created_at, cards.id"
                    ),
                    params![column.as_str()],
                    card_from_row,
                )?
                .into_iter()
                .map(Record::Card)
                .collect(),
            Filter::CardsOfBoard(board) => self
                .collect(
                    &format!(
                        "SELECT {CARD_FIELDS} FROM cards
                         JOIN columns ON columns.id = cards.column_id
                         WHERE columns.board_id = ?1
                         ORDER BY columns.position, columns.id, cards.position, cards.created_at, cards.id"
                    ),
                    params![board.as_str()],
                    card_from_row,
                )?
                .into_iter()
                .map(Record::Card)
                .collect(),
        };
        Ok(records)
    }

    fn collect<T, P: Params>(
        &self,
        sql: &str,
        params: P,
        map: fn(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, map)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn board_of_column(&self, column: &ColumnId) -> Result<Option<String>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT board_id FROM columns WHERE id = ?1",
                params![column.as_str()],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn column_of_card(&self, card: &CardId) -> Result<Option<String>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT column_id FROM cards WHERE id = ?1",
                params![card.as_str()],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Container ids above `key`, nearest first. `None` if the record is
    /// absent.
    fn parents_of(&self, key: &RecordKey) -> Result<Option<Vec<String>>, StoreError> {
        match key {
            RecordKey::Board(id) => {
                let exists = self
                    .conn
                    .query_row(
                        "SELECT 1 FROM boards WHERE id = ?1",
                        params![id.as_str()],
                        |_| Ok(()),
                    )
                    .optional()?;
                Ok(exists.map(|_| Vec::new()))
            }
            RecordKey::Column(id) => Ok(self.board_of_column(id)?.map(|board| vec![board])),
            RecordKey::Card(id) => {
                let Some(column) = self.column_of_card(id)? else {
                    return Ok(None);
                };
                let mut parents = vec![column.clone()];
                if let Some(board) = self.board_of_column(&ColumnId::from(column))? {
                    parents.push(board);
                }
                Ok(Some(parents))
            }
        }
    }

    // ── Writes ────────────────────────────────────────────────────────

    pub fn insert(&self, record: &Record) -> Result<Change, StoreError> {
        let key = record.key();
        validate_title(record.title())?;
        if self.parents_of(&key)?.is_some() {
            return Err(StoreError::AlreadyExists {
                kind: key.kind(),
                id: key.id().to_string(),
            });
        }

        let parents = match record {
            Record::Board(board) => {
                self.conn.execute(
                    &format!("INSERT INTO boards ({BOARD_FIELDS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
                    params![
                        board.id.as_str(),
                        board.title,
                        board.owner,
                        board.created_at,
                        board.updated_at
                    ],
                )?;
                Vec::new()
            }
            Record::Column(column) => {
                if self
                    .parents_of(&RecordKey::Board(column.board_id.clone()))?
                    .is_none()
                {
                    return Err(StoreError::validation(format!(
                        "board {} does not exist",
                        column.board_id
                    )));
                }
                self.conn.execute(
                    &format!(
                        "INSERT INTO columns ({COLUMN_FIELDS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
                    ),
                    params![
                        column.id.as_str(),
                        column.board_id.as_str(),
                        column.title,
                        column.order,
                        column.owner,
                        column.created_at,
                        column.updated_at
                    ],
                )?;
                vec![column.board_id.to_string()]
            }
            Record::Card(card) => {
                let Some(board) = self.board_of_column(&card.column_id)? else {
                    return Err(StoreError::validation(format!(
                        "column {} does not exist",
                        card.column_id
                    )));
                };
                self.conn.execute(
                    "INSERT INTO cards (id, column_id, title, position, owner, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        card.id.as_str(),
                        card.column_id.as_str(),
                        card.title,
                        card.order,
                        card.owner,
                        card.created_at,
                        card.updated_at
                    ],
                )?;
                vec![card.column_id.to_string(), board]
            }
        };

        Ok(Change {
            op: ChangeOp::Inserted,
            key,
            parents,
        })
    }

    pub fn patch(&self, patch: &RecordPatch) -> Result<(Record, Change), StoreError> {
        let key = patch.key();
        let mut parents = self.parents_of(&key)?.ok_or_else(|| key.not_found())?;
        let now = Utc::now();

        match patch {
            RecordPatch::Column { id, patch } => {
                self.conn.execute(
                    "UPDATE columns SET position = ?1, updated_at = ?2 WHERE id = ?3",
                    params![patch.order, now, id.as_str()],
                )?;
            }
            RecordPatch::Card {
                id,
                patch: CardPatch::Reorder { order },
            } => {
                self.conn.execute(
                    "UPDATE cards SET position = ?1, updated_at = ?2 WHERE id = ?3",
                    params![order, now, id.as_str()],
                )?;
            }
            RecordPatch::Card {
                id,
                patch: CardPatch::Relocate { column_id, order },
            } => {
                let Some(board) = self.board_of_column(column_id)? else {
                    return Err(StoreError::validation(format!(
                        "column {column_id} does not exist"
                    )));
                };
                self.conn.execute(
                    "UPDATE cards SET column_id = ?1, position = ?2, updated_at = ?3 WHERE id = ?4",
                    params![column_id.as_str(), order, now, id.as_str()],
                )?;
                for parent in [column_id.to_string(), board] {
                    if !parents.contains(&parent) {
                        parents.push(parent);
                    }
                }
            }
            RecordPatch::Retitle { key, title } => {
                validate_title(title)?;
                self.conn.execute(
                    &format!(
                        "UPDATE {} SET title = ?1, updated_at = ?2 WHERE id = ?3",
                        table(key.kind())
                    ),
                    params![title, now, key.id()],
                )?;
            }
        }

        let record = self.find(&key)?.ok_or_else(|| key.not_found())?;
        let change = Change {
            op: ChangeOp::Patched,
            key,
            parents,
        };
        Ok((record, change))
    }

    /// Delete a record. Foreign keys cascade to children; one `Removed`
    /// change is returned per deleted row, children first.
    pub fn remove(&self, key: &RecordKey) -> Result<Vec<Change>, StoreError> {
        let parents = self.parents_of(key)?.ok_or_else(|| key.not_found())?;
        let removed = |key: RecordKey, parents: Vec<String>| Change {
            op: ChangeOp::Removed,
            key,
            parents,
        };

        let mut changes = Vec::new();
        match key {
            RecordKey::Board(board) => {
                for record in self.query(&Filter::CardsOfBoard(board.clone()))? {
                    if let Record::Card(card) = record {
                        changes.push(removed(
                            RecordKey::Card(card.id),
                            vec![card.column_id.to_string(), board.to_string()],
                        ));
                    }
                }
                for record in self.query(&Filter::ColumnsOf(board.clone()))? {
                    changes.push(removed(record.key(), vec![board.to_string()]));
                }
            }
            RecordKey::Column(column) => {
                for record in self.query(&Filter::CardsOf(column.clone()))? {
                    let mut card_parents = vec![column.to_string()];
                    card_parents.extend(parents.iter().cloned());
                    changes.push(removed(record.key(), card_parents));
                }
            }
            RecordKey::Card(_) => {}
        }

        self.conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", table(key.kind())),
            params![key.id()],
        )?;
        changes.push(removed(key.clone(), parents));
        Ok(changes)
    }
}

// ── Internal row helpers ──────────────────────────────────────────────

fn table(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Board => "boards",
        RecordKind::Column => "columns",
        RecordKind::Card => "cards",
    }
}

fn validate_title(title: &str) -> Result<(), StoreError> {
    if title.trim().is_empty() {
        return Err(StoreError::validation("title must not be empty"));
    }
    Ok(())
}

fn board_from_row(row: &Row<'_>) -> rusqlite::Result<Board> {
    Ok(Board {
        id: BoardId::from(row.get::<_, String>(0)?),
        title: row.get(1)?,
        owner: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn column_from_row(row: &Row<'_>) -> rusqlite::Result<Column> {
    Ok(Column {
        id: ColumnId::from(row.get::<_, String>(0)?),
        board_id: BoardId::from(row.get::<_, String>(1)?),
        title: row.get(2)?,
        order: row.get(3)?,
        owner: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn card_from_row(row: &Row<'_>) -> rusqlite::Result<Card> {
    Ok(Card {
        id: CardId::from(row.get::<_, String>(0)?),
        column_id: ColumnId::from(row.get::<_, String>(1)?),
        title: row.get(2)?,
        order: row.get(3)?,
        owner: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────
