//! # kt-table
//!
//! Live tables for watched resource collections.
//!
//! A [`LiveTable`] holds a fixed header and an insertion-ordered set of rows
//! keyed by resource name. One [`WatchBridge`] per collection turns a stream of
//! [`ChangeEvent`]s into table mutations, formatting each resource with a
//! [`RowFormatter`]. Readers take point-in-time snapshots and wait on a
//! coalescing change signal instead of polling.
//!
//! ## Example
//!
//! ```rust
//! use kt_table::{ChangeEvent, Row, RowFormatter, WatchBridge};
//!
//! struct Names;
//!
//! impl RowFormatter for Names {
//!     type Resource = String;
//!
//!     fn header(&self) -> Row {
//!         vec!["NAME".to_string()]
//!     }
//!
//!     fn key(&self, resource: &String) -> Option<String> {
//!         Some(resource.clone())
//!     }
//!
//!     fn format(&self, resource: &String) -> Row {
//!         vec![resource.clone()]
//!     }
//! }
//!
//! let bridge = WatchBridge::new("names", Names);
//! bridge.apply(ChangeEvent::Added("pod-a".to_string()));
//!
//! let table = bridge.table();
//! assert_eq!(table.snapshot().len(), 2);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bridge;
pub mod error;
pub mod formatter;
pub mod table;

pub use bridge::{Applied, ChangeEvent, WatchBridge};
pub use error::{TableError, TableResult};
pub use formatter::{Row, RowFormatter};
pub use table::{LiveTable, Updates, Upserted};
