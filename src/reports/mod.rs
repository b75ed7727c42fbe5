//! Local persistence of diagnostic reports.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use car_doctor::config::AppPaths;
//! use car_doctor::reports::{JsonFileStorage, ReportStore, DEFAULT_NAMESPACE};
//!
//! #[tokio::main]
//! async fn main() {
//!     let storage = Arc::new(JsonFileStorage::new(AppPaths::new().reports_file));
//!     let store = ReportStore::new(storage, DEFAULT_NAMESPACE);
//!
//!     store.create("Coolant level low.").await.unwrap();
//!     for report in store.list().await.unwrap() {
//!         println!("{} {}", report.timestamp, report.content);
//!     }
//! }
//! ```

pub mod storage;
pub mod store;

pub use storage::{JsonFileStorage, KeyValueStorage, MemoryStorage, StoreError};
pub use store::{Report, ReportStore, DEFAULT_NAMESPACE};
