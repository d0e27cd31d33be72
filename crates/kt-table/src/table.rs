//! The live table: keyed rows behind a lock plus a coalescing change signal.

use std::collections::HashMap;

use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::warn;

use crate::formatter::Row;

/// What an upsert did to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    /// The key was new; the row went to the end.
    Inserted,
    /// The key existed; its row was replaced in place.
    Replaced,
}

#[derive(Debug)]
struct Entry {
    key: Option<String>,
    cells: Row,
}

/// Row storage plus a key index that always agrees with it.
#[derive(Debug, Default)]
struct Rows {
    entries: Vec<Entry>,
    positions: HashMap<String, usize>,
}

impl Rows {
    fn upsert(&mut self, key: &str, cells: Row) -> Upserted {
        if let Some(&pos) = self.positions.get(key) {
            self.entries[pos].cells = cells;
            return Upserted::Replaced;
        }

        self.positions.insert(key.to_string(), self.entries.len());
        self.entries.push(Entry {
            key: Some(key.to_string()),
            cells,
        });
        Upserted::Inserted
    }

    fn delete(&mut self, key: &str) -> bool {
        let Some(pos) = self.positions.remove(key) else {
            return false;
        };

        self.entries.remove(pos);
        for entry in &self.entries[pos..] {
            if let Some(shifted) = entry.key.as_ref().and_then(|k| self.positions.get_mut(k)) {
                *shifted -= 1;
            }
        }
        true
    }

    fn append(&mut self, cells: Row) {
        self.entries.push(Entry { key: None, cells });
    }

    fn retain_keys(&mut self, keep: impl Fn(&str) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.key.as_deref().is_none_or(|key| keep(key)));
        let removed = before - self.entries.len();

        if removed > 0 {
            self.positions.clear();
            for (pos, entry) in self.entries.iter().enumerate() {
                if let Some(key) = &entry.key {
                    self.positions.insert(key.clone(), pos);
                }
            }
        }
        removed
    }
}

/// A table of rows for one resource collection.
///
/// The header is fixed at construction. Data rows keep insertion order:
/// new keys go to the end and updates replace in place. All mutations and
/// snapshots take the same lock, so readers never see a half-applied change.
///
/// Every mutation is followed by [`LiveTable::notify`] from the writer. The
/// signal is a generation counter in a [`watch`] channel: it never blocks,
/// needs no listener, and any number of pending signals collapse into one
/// wake-up for each observer.
#[derive(Debug)]
pub struct LiveTable {
    name: String,
    header: Row,
    rows: RwLock<Rows>,
    generation: watch::Sender<u64>,
}

impl LiveTable {
    /// Create an empty table with the given collection name and header.
    pub fn new(name: impl Into<String>, header: Row) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            name: name.into(),
            header,
            rows: RwLock::new(Rows::default()),
            generation,
        }
    }

    /// Collection name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column names.
    #[must_use]
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Number of columns every row is fitted to.
    #[must_use]
    pub fn width(&self) -> usize {
        self.header.len()
    }

    /// Point-in-time copy of the table with the header as element 0.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Row> {
        let rows = self.rows.read();
        let mut out = Vec::with_capacity(rows.entries.len() + 1);
        out.push(self.header.clone());
        out.extend(rows.entries.iter().map(|entry| entry.cells.clone()));
        out
    }

    /// Point-in-time copy of the data rows only.
    #[must_use]
    pub fn rows(&self) -> Vec<Row> {
        self.rows
            .read()
            .entries
            .iter()
            .map(|entry| entry.cells.clone())
            .collect()
    }

    /// Number of data rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().entries.len()
    }

    /// Whether the table has no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a row with `key` is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.rows.read().positions.contains_key(key)
    }

    /// Replace the row for `key` in place, or append it if the key is new.
    pub fn upsert(&self, key: &str, row: Row) -> Upserted {
        let row = self.fit(row);
        self.rows.write().upsert(key, row)
    }

    /// Remove the row for `key`. Returns `false` if there was none.
    pub fn delete(&self, key: &str) -> bool {
        self.rows.write().delete(key)
    }

    /// Remove every keyed row whose key fails `keep`, in one write.
    ///
    /// Rows without a key are kept. Returns how many rows were removed.
    pub fn retain_keys(&self, keep: impl Fn(&str) -> bool) -> usize {
        self.rows.write().retain_keys(keep)
    }

    /// Append a row that has no identity key.
    pub fn append(&self, row: Row) {
        let row = self.fit(row);
        self.rows.write().append(row);
    }

    /// Signal observers that the table changed.
    pub fn notify(&self) {
        self.generation.send_modify(|generation| *generation = generation.wrapping_add(1));
    }

    /// Subscribe to change signals. Only signals after this call are observed.
    #[must_use]
    pub fn updates(&self) -> Updates {
        Updates {
            rx: self.generation.subscribe(),
        }
    }

    /// How many times [`LiveTable::notify`] has been called.
    #[must_use]
    pub fn generation(&self) -> u64 {
        *self.generation.borrow()
    }

    fn fit(&self, mut row: Row) -> Row {
        let width = self.header.len();
        if row.len() != width {
            warn!(
                table = %self.name,
                expected = width,
                actual = row.len(),
                "row width does not match header"
            );
            row.resize(width, String::new());
        }
        row
    }
}

/// Receiving side of a table's change signal.
#[derive(Debug, Clone)]
pub struct Updates {
    rx: watch::Receiver<u64>,
}

impl Updates {
    /// Wait for the next change signal.
    ///
    /// Returns `false` once the table is gone. Cancel safe, so it can sit in
    /// a `select!` next to other sources.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Whether a signal is pending that has not been observed yet.
    #[must_use]
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Mark every pending signal as observed.
    pub fn mark_seen(&mut self) {
        self.rx.borrow_and_update();
    }
}
