use serde::Serialize;

use taskboard_common::{Board, BoardId, Card, CardId, Column, ColumnId};

use super::gateway::{Gateway, GatewayExt, Record};
use crate::errors::StoreError;

/// Column and card lists of one open board.
///
/// Lists are kept sorted by `(order, created_at, id)`, the order the store
/// reads them in, so sibling slices can go straight into the move resolvers.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardState {
    pub board_id: BoardId,
    pub columns: Vec<Column>,
    pub cards: Vec<Card>,
}

impl BoardState {
    pub fn new(board_id: BoardId, mut columns: Vec<Column>, mut cards: Vec<Card>) -> Self {
        columns.sort_by(|a, b| {
            (a.order, a.created_at, &a.id).cmp(&(b.order, b.created_at, &b.id))
        });
        cards.sort_by(|a, b| {
            (a.order, a.created_at, &a.id).cmp(&(b.order, b.created_at, &b.id))
        });
        Self {
            board_id,
            columns,
            cards,
        }
    }

    /// Build from the raw result sets of the two board subscriptions.
    pub fn from_records(board_id: BoardId, columns: Vec<Record>, cards: Vec<Record>) -> Self {
        Self::new(
            board_id,
            columns.into_iter().filter_map(Record::into_column).collect(),
            cards.into_iter().filter_map(Record::into_card).collect(),
        )
    }

    pub async fn load<G: Gateway + ?Sized>(
        gateway: &G,
        board_id: &BoardId,
    ) -> Result<Self, StoreError> {
        let columns = gateway.columns_of(board_id).await?;
        let cards = gateway.cards_of_board(board_id).await?;
        Ok(Self::new(board_id.clone(), columns, cards))
    }

    pub fn column(&self, id: &ColumnId) -> Option<&Column> {
        self.columns.iter().find(|c| &c.id == id)
    }

    pub fn card(&self, id: &CardId) -> Option<&Card> {
        self.cards.iter().find(|c| &c.id == id)
    }

    pub fn column_index(&self, id: &ColumnId) -> Option<usize> {
        self.columns.iter().position(|c| &c.id == id)
    }

    /// Cards of one column, sorted by order.
    pub fn cards_in(&self, column: &ColumnId) -> Vec<Card> {
        self.cards
            .iter()
            .filter(|c| &c.column_id == column)
            .cloned()
            .collect()
    }

    /// Parent column and index within it.
    pub fn card_position(&self, id: &CardId) -> Option<(ColumnId, usize)> {
        let card = self.card(id)?;
        let index = self
            .cards
            .iter()
            .filter(|c| c.column_id == card.column_id)
            .position(|c| &c.id == id)?;
        Some((card.column_id.clone(), index))
    }
}

/// Nested board rendering for the API and `board show`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    #[serde(flatten)]
    pub board: Board,
    pub columns: Vec<ColumnView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnView {
    #[serde(flatten)]
    pub column: Column,
    pub cards: Vec<Card>,
}

impl BoardView {
    pub fn new(board: Board, state: &BoardState) -> Self {
        let columns = state
            .columns
            .iter()
            .map(|column| ColumnView {
                column: column.clone(),
                cards: state.cards_in(&column.id),
            })
            .collect();
        Self { board, columns }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(id: &str, column: &str, order: u32) -> Card {
        let mut card = Card::new(ColumnId::from(column), id, order, "tester");
        card.id = CardId::from(id);
        card
    }

    #[test]
    fn new_sorts_by_order() {
        let state = BoardState::new(
            BoardId::from("b"),
            Vec::new(),
            vec![card("z", "todo", 1), card("y", "todo", 0), card("x", "done", 0)],
        );
        let todo: Vec<_> = state.cards_in(&ColumnId::from("todo"));
        assert_eq!(todo[0].id, CardId::from("y"));
        assert_eq!(todo[1].id, CardId::from("z"));
    }

    #[test]
    fn order_ties_fall_back_to_creation_time() {
        let mut older = card("z", "todo", 0);
        older.created_at -= chrono::Duration::seconds(5);
        let newer = card("a", "todo", 0);
        let state = BoardState::new(BoardId::from("b"), Vec::new(), vec![newer, older]);

        let todo: Vec<_> = state.cards_in(&ColumnId::from("todo"));
        assert_eq!(todo[0].id, CardId::from("z"));
        assert_eq!(todo[1].id, CardId::from("a"));
    }

    #[test]
    fn card_position_is_index_within_column() {
        let state = BoardState::new(
            BoardId::from("b"),
            Vec::new(),
            vec![card("a", "todo", 0), card("b", "done", 0), card("c", "todo", 1)],
        );
        assert_eq!(
            state.card_position(&CardId::from("c")),
            Some((ColumnId::from("todo"), 1))
        );
        assert_eq!(state.card_position(&CardId::from("missing")), None);
    }

    #[test]
    fn board_view_nests_cards_under_columns() {
        let board = Board::new("Roadmap", "tester");
        let mut todo = Column::new(board.id.clone(), "Todo", 0, "tester");
        todo.id = ColumnId::from("todo");
        let state = BoardState::new(
            board.id.clone(),
            vec![todo],
            vec![card("a", "todo", 0)],
        );

        let json = serde_json::to_value(BoardView::new(board, &state)).unwrap();
        assert_eq!(json["title"], "Roadmap");
        assert_eq!(json["columns"][0]["title"], "Todo");
        assert_eq!(json["columns"][0]["cards"][0]["id"], "a");
    }
}
