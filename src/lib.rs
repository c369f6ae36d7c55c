//! # Lyceum
//!
//! Backend for a school resource portal: accounts with global roles, class
//! groups with per-group teacher authority, a published resource catalog,
//! media uploads and a live server metrics feed.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! lyceum = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use lyceum::config::ServerConfig;
//! use lyceum::metrics::ObserverRegistry;
//! use lyceum::server::{AppState, create_router};
//! use lyceum::store::{SqliteStore, Store};
//!
//! let config = ServerConfig::load_from_data_dir("./data".as_ref()).unwrap();
//! let store = SqliteStore::new(config.db_path()).unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(
//!     Arc::new(store),
//!     Arc::new(ObserverRegistry::new()),
//!     config,
//! ));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Builds the `lyceum` binary. Disable with `default-features = false`.

pub mod auth;
pub mod config;
pub mod error;
pub mod media;
pub mod metrics;
pub mod server;
pub mod service;
pub mod store;
pub mod types;
