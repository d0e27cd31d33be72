//! Startup of the per-collection bridges.

use kt_table::{TableError, TableResult};
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Combine the outcome of starting every bridge.
///
/// All bridges or none: if any collection failed to subscribe, the bridges
/// that did start are aborted and every failure is returned, one per
/// collection, in the order given.
pub fn join_bridges(
    started: impl IntoIterator<Item = TableResult<JoinHandle<()>>>,
) -> Result<Vec<JoinHandle<()>>, Vec<TableError>> {
    let mut tasks = Vec::new();
    let mut failures = Vec::new();
    for outcome in started {
        match outcome {
            Ok(task) => tasks.push(task),
            Err(err) => {
                error!(collection = %err.collection(), error = %err, "subscription failed");
                failures.push(err);
            }
        }
    }

    if failures.is_empty() {
        info!(bridges = tasks.len(), "all collections watched");
        return Ok(tasks);
    }

    for task in &tasks {
        task.abort();
    }
    Err(failures)
}
