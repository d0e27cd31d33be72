//! Bridging a resource watch stream into a [`LiveTable`].

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{TableError, TableResult};
use crate::formatter::RowFormatter;
use crate::table::{LiveTable, Upserted};

/// One change reported by a watch stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent<T> {
    /// A resource appeared.
    Added(T),
    /// A resource changed.
    Modified(T),
    /// A resource went away.
    Deleted(T),
    /// The source lost track of the collection and is listing it again.
    ///
    /// Every resource still present follows as `Added`, then `Relisted`.
    Restarted,
    /// The re-list that began with `Restarted` is complete.
    Relisted,
    /// Something the stream produced that maps to no row change:
    /// bookmarks, server-side errors, undecodable objects.
    Unrecognized(String),
}

/// Outcome of applying one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// A new row was appended.
    Inserted,
    /// An existing row was replaced in place.
    Replaced,
    /// A row was removed.
    Removed,
    /// A delete named a key that was not present.
    Absent,
    /// A re-list began; rows are kept until it completes.
    Restarted,
    /// A re-list completed and this many stale rows were dropped.
    Pruned(usize),
    /// The event was dropped without touching the table.
    Ignored,
}

impl Applied {
    /// Whether the table contents changed.
    #[must_use]
    pub const fn mutated(self) -> bool {
        match self {
            Self::Inserted | Self::Replaced | Self::Removed => true,
            Self::Pruned(removed) => removed > 0,
            Self::Absent | Self::Restarted | Self::Ignored => false,
        }
    }
}

/// Feeds one collection's change events into its table.
///
/// The bridge is the only writer of its table. Added and modified events
/// both upsert, so a repeated add never duplicates a row; deletes of unknown
/// keys are no-ops. Events that cannot be applied are logged and skipped, and
/// the bridge keeps consuming.
///
/// Between [`ChangeEvent::Restarted`] and [`ChangeEvent::Relisted`] the bridge
/// records which keys were re-added; on `Relisted` every other row is dropped,
/// since its resource went away while the source was not watching.
pub struct WatchBridge<F: RowFormatter> {
    table: Arc<LiveTable>,
    formatter: F,
    relisting: Mutex<Option<HashSet<String>>>,
}

impl<F: RowFormatter> fmt::Debug for WatchBridge<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchBridge")
            .field("collection", &self.table.name())
            .field("rows", &self.table.len())
            .finish_non_exhaustive()
    }
}

impl<F: RowFormatter> WatchBridge<F> {
    /// Create a bridge with a fresh, empty table named `name`.
    pub fn new(name: impl Into<String>, formatter: F) -> Self {
        let table = Arc::new(LiveTable::new(name, formatter.header()));
        Self {
            table,
            formatter,
            relisting: Mutex::new(None),
        }
    }

    /// The table this bridge writes to.
    #[must_use]
    pub fn table(&self) -> Arc<LiveTable> {
        Arc::clone(&self.table)
    }

    /// Apply one event and signal observers if the table changed.
    pub fn apply(&self, event: ChangeEvent<F::Resource>) -> Applied {
        let applied = match event {
            ChangeEvent::Added(resource) => self.upsert(&resource, "added"),
            ChangeEvent::Modified(resource) => self.upsert(&resource, "modified"),
            ChangeEvent::Deleted(resource) => self.delete(&resource),
            ChangeEvent::Restarted => self.restart(),
            ChangeEvent::Relisted => self.prune(),
            ChangeEvent::Unrecognized(reason) => {
                warn!(collection = %self.table.name(), %reason, "skipping unrecognized event");
                Applied::Ignored
            }
        };

        if applied.mutated() {
            self.table.notify();
        }
        applied
    }

    fn upsert(&self, resource: &F::Resource, kind: &str) -> Applied {
        let Some(key) = self.formatter.key(resource) else {
            warn!(collection = %self.table.name(), kind, "skipping event without a name");
            return Applied::Ignored;
        };

        if let Some(seen) = self.relisting.lock().as_mut() {
            seen.insert(key.clone());
        }

        let row = self.formatter.format(resource);
        match self.table.upsert(&key, row) {
            Upserted::Inserted => Applied::Inserted,
            Upserted::Replaced => {
                if kind == "added" {
                    debug!(collection = %self.table.name(), %key, "added event for a present row");
                }
                Applied::Replaced
            }
        }
    }

    fn delete(&self, resource: &F::Resource) -> Applied {
        let Some(key) = self.formatter.key(resource) else {
            warn!(
                collection = %self.table.name(),
                kind = "deleted",
                "skipping event without a name"
            );
            return Applied::Ignored;
        };

        if let Some(seen) = self.relisting.lock().as_mut() {
            seen.remove(&key);
        }

        if self.table.delete(&key) {
            Applied::Removed
        } else {
            debug!(collection = %self.table.name(), %key, "delete for an absent row");
            Applied::Absent
        }
    }

    fn restart(&self) -> Applied {
        info!(collection = %self.table.name(), rows = self.table.len(), "re-listing collection");
        *self.relisting.lock() = Some(HashSet::new());
        Applied::Restarted
    }

    fn prune(&self) -> Applied {
        let Some(seen) = self.relisting.lock().take() else {
            debug!(collection = %self.table.name(), "re-list completed without a restart");
            return Applied::Ignored;
        };

        let removed = self.table.retain_keys(|key| seen.contains(key));
        info!(
            collection = %self.table.name(),
            removed,
            rows = self.table.len(),
            "re-list complete"
        );
        Applied::Pruned(removed)
    }

    /// Consume `events` until the stream ends.
    pub async fn run<S>(self, events: S)
    where
        S: Stream<Item = ChangeEvent<F::Resource>>,
    {
        let mut events = std::pin::pin!(events);
        let mut applied = 0u64;

        while let Some(event) = events.next().await {
            if self.apply(event).mutated() {
                applied += 1;
            }
        }

        info!(
            collection = %self.table.name(),
            applied,
            rows = self.table.len(),
            "watch stream ended"
        );
    }

    /// Run the bridge on its own task.
    pub fn spawn<S>(self, events: S) -> JoinHandle<()>
    where
        S: Stream<Item = ChangeEvent<F::Resource>> + Send + 'static,
    {
        tokio::spawn(self.run(events))
    }

    /// Wait for the subscription to be established, then run the bridge.
    ///
    /// A failed subscription is returned as [`TableError::Subscribe`]; this is
    /// the only point at which a bridge can fail.
    pub async fn start<S, E, Fut>(self, subscription: Fut) -> TableResult<JoinHandle<()>>
    where
        Fut: Future<Output = Result<S, E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
        S: Stream<Item = ChangeEvent<F::Resource>> + Send + 'static,
    {
        match subscription.await {
            Ok(events) => {
                info!(collection = %self.table.name(), "watch established");
                Ok(self.spawn(events))
            }
            Err(err) => Err(TableError::subscribe(self.table.name(), err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::Row;
    use futures::stream;

    #[derive(Debug, Clone)]
    struct Item {
        name: Option<&'static str>,
        status: &'static str,
    }

    struct Items;

    impl RowFormatter for Items {
        type Resource = Item;

        fn header(&self) -> Row {
            vec!["NAME".into(), "STATUS".into()]
        }

        fn key(&self, resource: &Item) -> Option<String> {
            resource.name.map(String::from)
        }

        fn format(&self, resource: &Item) -> Row {
            vec![resource.name.unwrap_or_default().into(), resource.status.into()]
        }
    }

    fn item(name: &'static str, status: &'static str) -> Item {
        Item {
            name: Some(name),
            status,
        }
    }

    #[test]
    fn test_added_for_present_key_replaces() {
        let bridge = WatchBridge::new("items", Items);

        assert_eq!(bridge.apply(ChangeEvent::Added(item("a", "Pending"))), Applied::Inserted);
        assert_eq!(bridge.apply(ChangeEvent::Added(item("a", "Running"))), Applied::Replaced);

        let table = bridge.table();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0][1], "Running");
    }

    #[test]
    fn test_modified_for_unknown_key_inserts() {
        let bridge = WatchBridge::new("items", Items);

        assert_eq!(bridge.apply(ChangeEvent::Modified(item("a", "Running"))), Applied::Inserted);
        assert_eq!(bridge.table().len(), 1);
    }

    #[test]
    fn test_delete_unknown_key_is_absent() {
        let bridge = WatchBridge::new("items", Items);
        bridge.apply(ChangeEvent::Added(item("a", "Running")));

        assert_eq!(bridge.apply(ChangeEvent::Deleted(item("b", ""))), Applied::Absent);
        assert_eq!(bridge.apply(ChangeEvent::Deleted(item("a", ""))), Applied::Removed);
        assert_eq!(bridge.apply(ChangeEvent::Deleted(item("a", ""))), Applied::Absent);
        assert!(bridge.table().is_empty());
    }

    #[test]
    fn test_unnamed_and_unrecognized_events_are_ignored() {
        let bridge = WatchBridge::new("items", Items);
        let table = bridge.table();

        let unnamed = Item {
            name: None,
            status: "Running",
        };
        assert_eq!(bridge.apply(ChangeEvent::Added(unnamed.clone())), Applied::Ignored);
        assert_eq!(bridge.apply(ChangeEvent::Deleted(unnamed)), Applied::Ignored);
        assert_eq!(
            bridge.apply(ChangeEvent::Unrecognized("bookmark".into())),
            Applied::Ignored
        );

        assert!(table.is_empty());
        assert_eq!(table.generation(), 0);
    }

    #[test]
    fn test_only_mutations_notify() {
        let bridge = WatchBridge::new("items", Items);
        let table = bridge.table();

        bridge.apply(ChangeEvent::Added(item("a", "Running")));
        bridge.apply(ChangeEvent::Deleted(item("zzz", "")));
        bridge.apply(ChangeEvent::Modified(item("a", "Failed")));

        assert_eq!(table.generation(), 2);
    }

    #[tokio::test]
    async fn test_run_survives_bad_events() {
        let bridge = WatchBridge::new("items", Items);
        let table = bridge.table();

        let events = stream::iter(vec![
            ChangeEvent::Added(item("a", "Pending")),
            ChangeEvent::Unrecognized("decode error".into()),
            ChangeEvent::Added(Item {
                name: None,
                status: "?",
            }),
            ChangeEvent::Added(item("b", "Pending")),
            ChangeEvent::Modified(item("a", "Running")),
        ]);

        bridge.run(events).await;

        assert_eq!(
            table.rows(),
            vec![
                vec!["a".to_string(), "Running".to_string()],
                vec!["b".to_string(), "Pending".to_string()],
            ]
        );
    }

    #[tokio::test]
    async fn test_start_reports_subscription_failure() {
        let bridge = WatchBridge::new("items", Items);

        let result = bridge
            .start(async {
                Err::<stream::Empty<ChangeEvent<Item>>, _>(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "refused",
                ))
            })
            .await;

        let err = result.err();
        assert!(matches!(
            err,
            Some(TableError::Subscribe { ref collection, .. }) if collection == "items"
        ));
    }

    #[tokio::test]
    async fn test_start_spawns_bridge() {
        let bridge = WatchBridge::new("items", Items);
        let table = bridge.table();
        let mut updates = table.updates();

        let events = stream::iter(vec![ChangeEvent::Added(item("a", "Running"))]);
        let handle = bridge
            .start(async move { Ok::<_, std::io::Error>(events) })
            .await;

        assert!(handle.is_ok());
        assert!(updates.changed().await);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_relist_drops_rows_that_were_not_relisted() {
        let bridge = WatchBridge::new("items", Items);
        let table = bridge.table();
        for name in ["a", "b", "c"] {
            bridge.apply(ChangeEvent::Added(item(name, "Running")));
        }
        let before = table.generation();

        assert_eq!(bridge.apply(ChangeEvent::Restarted), Applied::Restarted);
        assert_eq!(table.len(), 3);
        bridge.apply(ChangeEvent::Added(item("a", "Running")));
        bridge.apply(ChangeEvent::Added(item("c", "Failed")));
        assert_eq!(bridge.apply(ChangeEvent::Relisted), Applied::Pruned(1));

        assert_eq!(
            table.rows(),
            vec![
                vec!["a".to_string(), "Running".to_string()],
                vec!["c".to_string(), "Failed".to_string()],
            ]
        );
        // Two upserts and one prune.
        assert_eq!(table.generation(), before + 3);
    }

    #[test]
    fn test_relist_with_nothing_stale_does_not_notify() {
        let bridge = WatchBridge::new("items", Items);
        let table = bridge.table();
        bridge.apply(ChangeEvent::Added(item("a", "Running")));

        bridge.apply(ChangeEvent::Restarted);
        bridge.apply(ChangeEvent::Added(item("a", "Running")));
        let before = table.generation();

        assert_eq!(bridge.apply(ChangeEvent::Relisted), Applied::Pruned(0));
        assert_eq!(table.generation(), before);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_empty_relist_clears_table() {
        let bridge = WatchBridge::new("items", Items);
        bridge.apply(ChangeEvent::Added(item("a", "Running")));
        bridge.apply(ChangeEvent::Added(item("b", "Running")));

        bridge.apply(ChangeEvent::Restarted);
        assert_eq!(bridge.apply(ChangeEvent::Relisted), Applied::Pruned(2));
        assert!(bridge.table().is_empty());
    }

    #[test]
    fn test_relisted_without_restart_is_ignored() {
        let bridge = WatchBridge::new("items", Items);
        bridge.apply(ChangeEvent::Added(item("a", "Running")));

        assert_eq!(bridge.apply(ChangeEvent::Relisted), Applied::Ignored);
        assert_eq!(bridge.table().len(), 1);

        // A finished re-list stops tracking keys.
        bridge.apply(ChangeEvent::Restarted);
        bridge.apply(ChangeEvent::Relisted);
        bridge.apply(ChangeEvent::Added(item("b", "Running")));
        assert_eq!(bridge.apply(ChangeEvent::Relisted), Applied::Ignored);
        assert_eq!(bridge.table().len(), 1);
    }

    #[test]
    fn test_debug_shows_collection() {
        let bridge = WatchBridge::new("items", Items);
        let debug = format!("{bridge:?}");
        assert!(debug.contains("items"));
    }
}
