use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::view::Column;

/// Stable identity of one rendered row. Survives moves; never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowId(pub u64);

/// Identity key of a table row. Every entity owns two: its data row and the
/// detail (chart) row that always sits immediately after it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RowKey {
    Data(String),
    Detail(String),
}

impl RowKey {
    pub fn data(ticker: &str) -> Self {
        RowKey::Data(ticker.to_string())
    }

    pub fn detail(ticker: &str) -> Self {
        RowKey::Detail(ticker.to_string())
    }

    pub fn ticker(&self) -> &str {
        match self {
            RowKey::Data(t) | RowKey::Detail(t) => t,
        }
    }
}

impl std::fmt::Display for RowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowKey::Data(t) => write!(f, "{t}"),
            RowKey::Detail(t) => write!(f, "{t}-chart"),
        }
    }
}

/// Sign class of a displayed value. Mutually exclusive on a cell.
///
/// Colours follow the Taiwanese market convention: gains red, losses green.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignClass {
    Positive,
    Negative,
    Neutral,
}

impl SignClass {
    /// `> 0` positive, `< 0` negative, anything else (±0, NaN) neutral.
    #[must_use]
    pub fn of(value: f64) -> Self {
        if value > 0.0 {
            SignClass::Positive
        } else if value < 0.0 {
            SignClass::Negative
        } else {
            SignClass::Neutral
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            SignClass::Positive => "text-danger",
            SignClass::Negative => "text-success",
            SignClass::Neutral => "text-dark",
        }
    }

    pub const ALL_CSS: [&'static str; 3] = ["text-danger", "text-success", "text-dark"];
}

/// Transient highlight for a value that changed since the last render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlashDirection {
    Up,
    Down,
}

impl FlashDirection {
    /// No flash without a prior value or when the value is unchanged.
    #[must_use]
    pub fn between(new: f64, old: Option<f64>) -> Option<Self> {
        let old = old?;
        if new > old {
            Some(FlashDirection::Up)
        } else if new < old {
            Some(FlashDirection::Down)
        } else {
            None
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            FlashDirection::Up => "flash-up",
            FlashDirection::Down => "flash-down",
        }
    }
}

/// Rendered state of one cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellState {
    pub text: String,
    /// Persistent classes (layout classes plus at most one sign class).
    pub classes: Vec<String>,
    pub flash: Option<FlashDirection>,
}

impl CellState {
    fn with_classes(classes: &[&str]) -> Self {
        Self {
            text: String::new(),
            classes: classes.iter().map(|c| c.to_string()).collect(),
            flash: None,
        }
    }

    /// Full class attribute as a view would render it.
    #[must_use]
    pub fn class_name(&self) -> String {
        let mut all: Vec<&str> = self.classes.iter().map(String::as_str).collect();
        if let Some(flash) = self.flash {
            all.push(flash.css_class());
        }
        all.join(" ")
    }
}

/// Layout classes a freshly built cell starts with.
fn base_classes(column: Column) -> &'static [&'static str] {
    match column {
        Column::CurrentPrice => &["price-cell"],
        Column::MarketValue => &["market-value-cell"],
        Column::TodayPl => &["today-pl-cell"],
        Column::Chart => &["text-center"],
        Column::Actions => &["text-nowrap"],
        _ => &[],
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowKind {
    Data,
    Detail,
    /// "No holdings yet" row with an add action.
    Placeholder,
}

/// One row of the table.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: RowId,
    pub key: Option<RowKey>,
    pub kind: RowKind,
    pub cells: HashMap<Column, CellState>,
    /// Text typed into the what-if input. Owned by the user; updates and
    /// moves never touch it.
    pub what_if_input: String,
    /// Detail rows start collapsed.
    pub expanded: bool,
}

impl Row {
    fn new(id: RowId, key: Option<RowKey>, kind: RowKind) -> Self {
        let cells = if kind == RowKind::Data {
            Column::ALL
                .iter()
                .map(|c| (*c, CellState::with_classes(base_classes(*c))))
                .collect()
        } else {
            HashMap::new()
        };
        Self {
            id,
            key,
            kind,
            cells,
            what_if_input: String::new(),
            expanded: false,
        }
    }

    #[must_use]
    pub fn cell(&self, column: Column) -> Option<&CellState> {
        self.cells.get(&column)
    }
}

/// A single change to the rendered table.
///
/// `before: None` means "append at the end", mirroring positional insert
/// against a missing reference node.
#[derive(Debug, Clone, PartialEq)]
pub enum RowMutation {
    ShowPlaceholder { row: RowId },
    RemovePlaceholder { row: RowId },
    Insert {
        row: RowId,
        key: RowKey,
        before: Option<RowId>,
    },
    Move { row: RowId, before: Option<RowId> },
    SetText {
        row: RowId,
        column: Column,
        text: String,
    },
    SetClasses {
        row: RowId,
        column: Column,
        classes: Vec<String>,
    },
    Flash {
        row: RowId,
        column: Column,
        direction: FlashDirection,
    },
    ClearFlash { row: RowId, column: Column },
    Remove { row: RowId },
    DisposeChart { ticker: String },
}

/// Anything that can apply row mutations: the in-memory arena below, or a
/// thin adapter over a real document.
pub trait RowSink {
    fn apply(&mut self, mutation: &RowMutation);
}

/// Ordered, explicit store of the rendered rows.
///
/// This is the single source of truth for "what is on screen": the
/// reconciler re-indexes it on every pass instead of keeping its own cache.
#[derive(Debug, Clone, Default)]
pub struct RowArena {
    rows: Vec<Row>,
    next_id: u64,
}

impl RowArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a fresh identity for a row about to be inserted.
    pub fn allocate_id(&mut self) -> RowId {
        self.next_id += 1;
        RowId(self.next_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Index every keyed row currently present by its key.
    #[must_use]
    pub fn index_by_key(&self) -> HashMap<RowKey, RowId> {
        self.rows
            .iter()
            .filter_map(|r| r.key.clone().map(|k| (k, r.id)))
            .collect()
    }

    #[must_use]
    pub fn placeholder(&self) -> Option<RowId> {
        self.rows
            .iter()
            .find(|r| r.kind == RowKind::Placeholder)
            .map(|r| r.id)
    }

    #[must_use]
    pub fn id_at(&self, index: usize) -> Option<RowId> {
        self.rows.get(index).map(|r| r.id)
    }

    #[must_use]
    pub fn position(&self, id: RowId) -> Option<usize> {
        self.rows.iter().position(|r| r.id == id)
    }

    #[must_use]
    pub fn next_sibling(&self, id: RowId) -> Option<RowId> {
        self.position(id).and_then(|i| self.id_at(i + 1))
    }

    #[must_use]
    pub fn get(&self, id: RowId) -> Option<&Row> {
        self.rows.iter().find(|r| r.id == id)
    }

    fn get_mut(&mut self, id: RowId) -> Option<&mut Row> {
        self.rows.iter_mut().find(|r| r.id == id)
    }

    #[must_use]
    pub fn find(&self, key: &RowKey) -> Option<&Row> {
        self.rows.iter().find(|r| r.key.as_ref() == Some(key))
    }

    /// Keys in on-screen order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|r| match &r.key {
                Some(k) => k.to_string(),
                None => "<placeholder>".to_string(),
            })
            .collect()
    }

    /// Record what the user typed into an entity's what-if input.
    pub fn set_what_if_input(&mut self, ticker: &str, value: impl Into<String>) -> bool {
        let key = RowKey::data(ticker);
        match self.rows.iter_mut().find(|r| r.key.as_ref() == Some(&key)) {
            Some(row) => {
                row.what_if_input = value.into();
                true
            }
            None => false,
        }
    }

    /// Expand or collapse an entity's detail row.
    pub fn set_expanded(&mut self, ticker: &str, expanded: bool) -> bool {
        let key = RowKey::detail(ticker);
        match self.rows.iter_mut().find(|r| r.key.as_ref() == Some(&key)) {
            Some(row) => {
                row.expanded = expanded;
                true
            }
            None => false,
        }
    }

    fn insert_before(&mut self, row: Row, before: Option<RowId>) {
        let index = before
            .and_then(|b| self.position(b))
            .unwrap_or(self.rows.len());
        self.rows.insert(index, row);
    }

    fn take(&mut self, id: RowId) -> Option<Row> {
        let index = self.position(id)?;
        Some(self.rows.remove(index))
    }
}

impl RowSink for RowArena {
    fn apply(&mut self, mutation: &RowMutation) {
        match mutation {
            RowMutation::ShowPlaceholder { row } => {
                self.rows.clear();
                self.rows
                    .push(Row::new(*row, None, RowKind::Placeholder));
            }
            RowMutation::RemovePlaceholder { row } | RowMutation::Remove { row } => {
                self.take(*row);
            }
            RowMutation::Insert { row, key, before } => {
                let kind = match key {
                    RowKey::Data(_) => RowKind::Data,
                    RowKey::Detail(_) => RowKind::Detail,
                };
                self.insert_before(Row::new(*row, Some(key.clone()), kind), *before);
            }
            RowMutation::Move { row, before } => {
                if Some(*row) == *before {
                    return;
                }
                if let Some(moved) = self.take(*row) {
                    self.insert_before(moved, *before);
                }
            }
            RowMutation::SetText { row, column, text } => {
                if let Some(cell) = self.get_mut(*row).and_then(|r| r.cells.get_mut(column)) {
                    cell.text = text.clone();
                }
            }
            RowMutation::SetClasses {
                row,
                column,
                classes,
            } => {
                if let Some(cell) = self.get_mut(*row).and_then(|r| r.cells.get_mut(column)) {
                    cell.classes = classes.clone();
                }
            }
            RowMutation::Flash {
                row,
                column,
                direction,
            } => {
                if let Some(cell) = self.get_mut(*row).and_then(|r| r.cells.get_mut(column)) {
                    cell.flash = Some(*direction);
                }
            }
            RowMutation::ClearFlash { row, column } => {
                if let Some(cell) = self.get_mut(*row).and_then(|r| r.cells.get_mut(column)) {
                    cell.flash = None;
                }
            }
            RowMutation::DisposeChart { .. } => {}
        }
    }
}
