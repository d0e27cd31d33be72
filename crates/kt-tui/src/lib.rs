//! # kt-tui
//!
//! Terminal dashboard over live Kubernetes tables.
//!
//! Deployments and pods in one namespace are listed, watched, and kept in
//! [`kt_table::LiveTable`]s by background bridges. The [`dashboard`] shows one
//! table at a time and repaints only when the table on screen changes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod events;
pub mod resources;
pub mod startup;
pub mod ui;

pub use client::KubeSource;
pub use config::ClientConfig;
pub use dashboard::{Cursor, Dashboard};
pub use error::{TuiError, TuiResult};
pub use events::{classify_key, AppEvent, EventHandler, Input};
pub use resources::{format_age, DeploymentRows, PodRows};
pub use startup::join_bridges;
