//! Dashboard state: registered views, the active view, and cursor handling.
//!
//! Everything here runs on the UI task. Tables are written by their bridges
//! on other tasks; the dashboard only ever reads them through snapshots and
//! learns about changes through each table's change signal.

use std::sync::Arc;

use crossterm::event::KeyEvent;
use futures::future::{self, FutureExt};
use kt_table::{LiveTable, Row, Updates};
use ratatui::widgets::TableState;
use ratatui::Frame;
use tracing::debug;

use crate::events::{classify_key, Input};

/// Cursor position in grid coordinates: row 0 is the header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    /// Grid row, header included.
    pub row: usize,
    /// Column index.
    pub column: usize,
}

impl Cursor {
    /// Create a cursor at `row`, `column`.
    #[must_use]
    pub const fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }

    /// Fit the cursor to a grid of `rows` rows (header included) and
    /// `columns` columns.
    ///
    /// The header is not selectable, so a cursor on it moves to the first data
    /// row; a cursor past the end moves to the last one. With no data rows the
    /// cursor stays on the header.
    #[must_use]
    pub fn clamp(self, rows: usize, columns: usize) -> Self {
        let data_rows = rows.saturating_sub(1);
        let row = if data_rows == 0 {
            0
        } else {
            self.row.clamp(1, data_rows)
        };
        Self {
            row,
            column: self.column.min(columns.saturating_sub(1)),
        }
    }
}

/// One registered table and what was last painted from it.
struct View {
    table: Arc<LiveTable>,
    updates: Updates,
    live: bool,
    grid: Vec<Row>,
    cursor: Cursor,
    state: TableState,
}

impl View {
    fn new(table: Arc<LiveTable>) -> Self {
        let updates = table.updates();
        let grid = vec![table.header().to_vec()];
        Self {
            table,
            updates,
            live: true,
            grid,
            cursor: Cursor::default(),
            state: TableState::default(),
        }
    }

    /// Take a fresh snapshot and re-validate the cursor against it.
    fn repaint(&mut self) {
        self.updates.mark_seen();
        self.grid = self.table.snapshot();
        self.settle_cursor();
    }

    fn settle_cursor(&mut self) {
        self.cursor = self.cursor.clamp(self.grid.len(), self.table.width());
        self.state.select(self.cursor.row.checked_sub(1));
        self.state.select_column(Some(self.cursor.column));
    }
}

/// The set of live views and which one is on screen.
pub struct Dashboard {
    views: Vec<View>,
    active: usize,
    namespace: String,
    running: bool,
    repaints: u64,
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("views", &self.view_names())
            .field("active", &self.active)
            .field("namespace", &self.namespace)
            .field("running", &self.running)
            .finish_non_exhaustive()
    }
}

impl Dashboard {
    /// Create a dashboard with no views.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            views: Vec::new(),
            active: 0,
            namespace: namespace.into(),
            running: true,
            repaints: 0,
        }
    }

    /// Add a view for `table` and return its index.
    ///
    /// The first registered view becomes active and is painted right away.
    pub fn register(&mut self, table: Arc<LiveTable>) -> usize {
        self.views.push(View::new(table));
        let index = self.views.len() - 1;
        if index == self.active {
            self.repaint();
        }
        index
    }

    /// Whether the dashboard should keep running.
    #[must_use]
    pub const fn running(&self) -> bool {
        self.running
    }

    /// Stop the dashboard.
    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Index of the view on screen.
    #[must_use]
    pub const fn active(&self) -> usize {
        self.active
    }

    /// Table behind the view on screen.
    #[must_use]
    pub fn active_table(&self) -> Option<&Arc<LiveTable>> {
        self.views.get(self.active).map(|view| &view.table)
    }

    /// Collection names in registration order.
    #[must_use]
    pub fn view_names(&self) -> Vec<&str> {
        self.views.iter().map(|view| view.table.name()).collect()
    }

    /// Namespace shown in the status bar.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The grid last painted for the active view, header first.
    #[must_use]
    pub fn grid(&self) -> &[Row] {
        self.views.get(self.active).map_or(&[], |view| view.grid.as_slice())
    }

    /// Cursor of the active view.
    #[must_use]
    pub fn cursor(&self) -> Cursor {
        self.views.get(self.active).map(|view| view.cursor).unwrap_or_default()
    }

    /// How many times a view has been repainted from its table.
    #[must_use]
    pub const fn repaints(&self) -> u64 {
        self.repaints
    }

    /// Grid, cursor state and table for drawing the active view.
    pub(crate) fn active_parts(&mut self) -> Option<(&[Row], &mut TableState, &str)> {
        self.views
            .get_mut(self.active)
            .map(|view| (view.grid.as_slice(), &mut view.state, view.table.name()))
    }

    /// Make `index` the active view and repaint it.
    ///
    /// Always repaints, even if `index` was already active. Returns `false`
    /// for an index with no view.
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.views.len() {
            return false;
        }
        self.active = index;
        self.repaint();
        true
    }

    /// React to a change signal from view `index`.
    ///
    /// The active view is repainted and `true` is returned; signals from other
    /// views are consumed without a repaint.
    pub fn on_table_changed(&mut self, index: usize) -> bool {
        let Some(view) = self.views.get_mut(index) else {
            return false;
        };

        if index == self.active {
            self.repaint();
            true
        } else {
            view.updates.mark_seen();
            false
        }
    }

    /// Wait until any view's table signals a change and return its index.
    ///
    /// Cancel safe. Never resolves while no view can signal.
    pub async fn next_change(&mut self) -> usize {
        loop {
            let (index, alive) = {
                let waiting: Vec<_> = self
                    .views
                    .iter_mut()
                    .enumerate()
                    .filter(|(_, view)| view.live)
                    .map(|(index, view)| {
                        view.updates.changed().map(move |alive| (index, alive)).boxed()
                    })
                    .collect();

                if waiting.is_empty() {
                    return future::pending().await;
                }
                let (outcome, _, _) = future::select_all(waiting).await;
                outcome
            };

            if alive {
                return index;
            }
            debug!(view = index, "table dropped, no longer watching it");
            self.views[index].live = false;
        }
    }

    /// Render the dashboard into `frame`.
    pub fn draw(&mut self, frame: &mut Frame) {
        crate::ui::draw(frame, self);
    }

    /// Apply a key press. Returns whether the screen needs redrawing.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        classify_key(key).is_some_and(|input| self.handle_input(input))
    }

    /// Apply a dashboard input. Returns whether the screen needs redrawing.
    pub fn handle_input(&mut self, input: Input) -> bool {
        let count = self.views.len();
        match input {
            Input::Quit => {
                self.quit();
                false
            }
            Input::SelectView(index) => self.select(index),
            Input::NextView if count > 0 => self.select((self.active + 1) % count),
            Input::PrevView if count > 0 => self.select((self.active + count - 1) % count),
            Input::NextView | Input::PrevView => false,
            Input::Up => self.move_cursor(|c| Cursor::new(c.row.saturating_sub(1), c.column)),
            Input::Down => self.move_cursor(|c| Cursor::new(c.row + 1, c.column)),
            Input::Left => self.move_cursor(|c| Cursor::new(c.row, c.column.saturating_sub(1))),
            Input::Right => self.move_cursor(|c| Cursor::new(c.row, c.column + 1)),
            Input::First => self.move_cursor(|c| Cursor::new(1, c.column)),
            Input::Last => self.move_cursor(|c| Cursor::new(usize::MAX, c.column)),
        }
    }

    fn move_cursor(&mut self, step: impl FnOnce(Cursor) -> Cursor) -> bool {
        let Some(view) = self.views.get_mut(self.active) else {
            return false;
        };
        let before = view.cursor;
        view.cursor = step(before);
        view.settle_cursor();
        view.cursor != before
    }

    fn repaint(&mut self) {
        if let Some(view) = self.views.get_mut(self.active) {
            view.repaint();
            self.repaints += 1;
        }
    }
}
