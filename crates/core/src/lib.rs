//! modelpull_core - Core library for batch model downloads
//!
//! This crate provides:
//! - Catalog extraction from the model library listing
//! - Listing filters (substring and parameter-size comparisons)
//! - The selection/confirmation state machine
//! - A retrying, requeueing fetch queue driven through the `ollama` CLI

pub mod catalog;
pub mod config;
pub mod fetchers;
pub mod filter;
pub mod inventory;
pub mod models;
pub mod scheduler;
pub mod selection;
pub mod system;

pub use catalog::{CatalogError, CatalogProvider, CatalogSource, HtmlCatalog};
pub use config::Config;
pub use fetchers::{ConnectivityProbe, FetchOutcome, Fetcher, OllamaCli};
pub use filter::{filter, Filter};
pub use inventory::LocalInventory;
pub use models::{CatalogEntry, ColorTag, CompositeKey, ListingItem};
pub use scheduler::{BatchReport, FetchEvent, FetchQueue, FetchScheduler, SchedulerConfig};
pub use selection::{ConfirmedBatch, FlowState, SelectionError, SelectionFlow};
