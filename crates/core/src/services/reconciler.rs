use std::collections::HashMap;

use tracing::debug;

use crate::models::entry::PortfolioEntry;
use crate::models::rows::{
    FlashDirection, RowArena, RowId, RowKey, RowMutation, RowSink, SignClass,
};
use crate::models::view::Column;
use crate::services::charts::ChartRegistry;
use crate::services::format::{format_currency, format_number, format_percent, format_shares};

/// Values remembered per ticker to decide whether a cell flashes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviousValues {
    pub current_price: f64,
    pub today_pl: f64,
    pub market_value: f64,
}

impl PreviousValues {
    fn of(entry: &PortfolioEntry) -> Self {
        Self {
            current_price: entry.current_price,
            today_pl: entry.today_pl,
            market_value: entry.market_value,
        }
    }
}

/// Desired content of one cell.
struct CellUpdate {
    column: Column,
    text: String,
    sign: Option<SignClass>,
    flash: Option<FlashDirection>,
}

/// Keeps the two-rows-per-entity table in line with a sorted entity list.
///
/// Rows of entities present before and after a pass keep their identity:
/// they are updated in place and moved, never rebuilt, so transitions and
/// what-if input survive a refresh.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    previous: HashMap<String, PreviousValues>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values recorded by the last pass.
    #[must_use]
    pub fn previous(&self, ticker: &str) -> Option<&PreviousValues> {
        self.previous.get(ticker)
    }

    /// Bring `arena` to the state implied by `sorted`.
    ///
    /// Every mutation is applied to the arena as it is produced (later cursor
    /// checks depend on the live order) and returned so a view adapter can
    /// replay it. Charts of removed entities are disposed through `charts`.
    pub fn reconcile(
        &mut self,
        arena: &mut RowArena,
        sorted: &[PortfolioEntry],
        charts: &mut ChartRegistry,
    ) -> Vec<RowMutation> {
        let mut out = Vec::new();
        let mut existing = arena.index_by_key();

        if let Some(placeholder) = arena.placeholder() {
            if !sorted.is_empty() {
                emit(arena, &mut out, RowMutation::RemovePlaceholder { row: placeholder });
            }
        } else if sorted.is_empty() && existing.is_empty() {
            let row = arena.allocate_id();
            emit(arena, &mut out, RowMutation::ShowPlaceholder { row });
        }

        let mut rendered = HashMap::with_capacity(sorted.len());
        let mut cursor = 0;
        let (mut moved, mut inserted) = (0usize, 0usize);

        for entry in sorted {
            let old = self.previous.get(&entry.ticker).copied();
            let data_key = RowKey::data(&entry.ticker);
            let detail_key = RowKey::detail(&entry.ticker);

            match (existing.remove(&data_key), existing.remove(&detail_key)) {
                (Some(row), Some(detail)) => {
                    update_row(arena, &mut out, row, entry, old);

                    let at_cursor = arena.id_at(cursor);
                    if at_cursor != Some(row) {
                        emit(arena, &mut out, RowMutation::Move { row, before: at_cursor });
                        moved += 1;
                    }
                    let after_row = arena.next_sibling(row);
                    if after_row != Some(detail) {
                        emit(
                            arena,
                            &mut out,
                            RowMutation::Move {
                                row: detail,
                                before: after_row,
                            },
                        );
                    }
                }
                (lone_row, lone_detail) => {
                    // Half a pair is stale; leave it for cleanup and build a
                    // fresh pair.
                    if let Some(id) = lone_row {
                        existing.insert(data_key.clone(), id);
                    }
                    if let Some(id) = lone_detail {
                        existing.insert(detail_key.clone(), id);
                    }

                    let before = arena.id_at(cursor);
                    let row = arena.allocate_id();
                    emit(
                        arena,
                        &mut out,
                        RowMutation::Insert {
                            row,
                            key: data_key,
                            before,
                        },
                    );
                    update_row(arena, &mut out, row, entry, old);

                    let detail = arena.allocate_id();
                    let after_row = arena.next_sibling(row);
                    emit(
                        arena,
                        &mut out,
                        RowMutation::Insert {
                            row: detail,
                            key: detail_key,
                            before: after_row,
                        },
                    );
                    inserted += 1;
                }
            }

            cursor += 2;
            rendered.insert(entry.ticker.clone(), PreviousValues::of(entry));
        }

        // Whatever is left belongs to entities that disappeared.
        let mut stale: Vec<(RowKey, RowId)> = existing.into_iter().collect();
        stale.sort_by_key(|(_, id)| arena.position(*id));
        let removed = stale.len();
        for (key, row) in stale {
            if let RowKey::Detail(ticker) = &key {
                if charts.dispose(ticker) {
                    out.push(RowMutation::DisposeChart {
                        ticker: ticker.clone(),
                    });
                }
            }
            emit(arena, &mut out, RowMutation::Remove { row });
        }

        if sorted.is_empty() && arena.placeholder().is_none() && arena.is_empty() {
            let row = arena.allocate_id();
            emit(arena, &mut out, RowMutation::ShowPlaceholder { row });
        }

        debug!(
            entities = sorted.len(),
            inserted,
            moved,
            removed_rows = removed,
            mutations = out.len(),
            "reconciled holdings table"
        );

        self.previous = rendered;
        out
    }
}

fn emit(arena: &mut RowArena, out: &mut Vec<RowMutation>, mutation: RowMutation) {
    arena.apply(&mutation);
    out.push(mutation);
}

fn cell_updates(entry: &PortfolioEntry, old: Option<PreviousValues>) -> Vec<CellUpdate> {
    let plain = |column: Column, text: String| CellUpdate {
        column,
        text,
        sign: None,
        flash: None,
    };
    let pl_sign = SignClass::of(entry.pl);

    let ticker_text = if entry.currency != "TWD" {
        format!("{} {}", entry.ticker, entry.currency)
    } else {
        entry.ticker.clone()
    };

    vec![
        plain(
            Column::DataSource,
            entry
                .data_source
                .map(|s| s.label())
                .unwrap_or("N/A")
                .to_string(),
        ),
        plain(Column::Ticker, ticker_text),
        plain(Column::Name, entry.name.clone()),
        plain(Column::Shares, format_shares(entry.shares)),
        plain(Column::AvgCost, format_number(entry.avg_cost)),
        CellUpdate {
            column: Column::CurrentPrice,
            text: format_number(entry.current_price),
            sign: None,
            flash: FlashDirection::between(entry.current_price, old.map(|o| o.current_price)),
        },
        plain(Column::PreviousClose, format_number(entry.previous_close)),
        CellUpdate {
            column: Column::ChangePercent,
            text: format_percent(entry.change_percent),
            sign: Some(SignClass::of(entry.change_percent)),
            flash: None,
        },
        CellUpdate {
            column: Column::MarketValue,
            text: format_currency(entry.market_value),
            sign: None,
            flash: FlashDirection::between(entry.market_value, old.map(|o| o.market_value)),
        },
        CellUpdate {
            column: Column::TodayPl,
            text: format_currency(entry.today_pl),
            sign: Some(SignClass::of(entry.today_pl)),
            flash: FlashDirection::between(entry.today_pl, old.map(|o| o.today_pl)),
        },
        CellUpdate {
            column: Column::Pl,
            text: format_currency(entry.pl),
            sign: Some(pl_sign),
            flash: None,
        },
        CellUpdate {
            column: Column::PlPercent,
            text: format_percent(entry.pl_percent),
            sign: Some(pl_sign),
            flash: None,
        },
    ]
}

fn update_row(
    arena: &mut RowArena,
    out: &mut Vec<RowMutation>,
    row: RowId,
    entry: &PortfolioEntry,
    old: Option<PreviousValues>,
) {
    for update in cell_updates(entry, old) {
        update_cell(arena, out, row, update);
    }
}

/// Write only what differs. Sign classes are swapped as a set; any other
/// class on the cell is preserved. A flash is added on top and cleared
/// later by the flash schedule.
fn update_cell(arena: &mut RowArena, out: &mut Vec<RowMutation>, row: RowId, update: CellUpdate) {
    let Some(cell) = arena.get(row).and_then(|r| r.cell(update.column)) else {
        return;
    };

    let text_changed = cell.text != update.text;

    let mut classes: Vec<String> = cell
        .classes
        .iter()
        .filter(|c| !SignClass::ALL_CSS.contains(&c.as_str()))
        .cloned()
        .collect();
    if let Some(sign) = update.sign {
        classes.push(sign.css_class().to_string());
    }
    let classes_changed = cell.classes != classes;

    if text_changed {
        emit(
            arena,
            out,
            RowMutation::SetText {
                row,
                column: update.column,
                text: update.text,
            },
        );
    }
    if classes_changed {
        emit(
            arena,
            out,
            RowMutation::SetClasses {
                row,
                column: update.column,
                classes,
            },
        );
    }
    if let Some(direction) = update.flash {
        emit(
            arena,
            out,
            RowMutation::Flash {
                row,
                column: update.column,
                direction,
            },
        );
    }
}
