//! # parkd
//!
//! A Linux daemon reporting parking slot occupancy from presence sensors
//! and keeping a status display in step with it.
//!
//! ## Features
//!
//! - **Async Architecture**: Built on Tokio for high performance
//! - **Read-through State**: every `GET /data` re-reads the sensors
//! - **External Updates**: `POST /update` overrides slots until the next read
//! - **Status Display**: polls the state and repaints only changed slots
//! - **Sensor Backends**: sysfs GPIO lines or fixed bench values
//!
//! ## Architecture
//!
//! The daemon uses a provider-based dependency injection system with:
//! - [`SystemCoordinator`](coordinator::SystemCoordinator) - Main lifecycle manager
//! - [`EventBus`](event::EventBus) - Inter-service communication
//! - [`AppState`](app_context::AppState) - Shared application state
//! - [`SlotStore`](slot_store::SlotStore) - The single source of truth for occupancy
//! - Service providers for the HTTP server and the display
//!
//! ## Example
//!
//! ```no_run
//! use parkd::{application::Application, config::ConfigManager};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config_manager = ConfigManager::load(None).await?;
//!     Application::builder()
//!         .with_config_manager(config_manager)
//!         .build()
//!         .await?
//!         .run()
//!         .await
//! }
//! ```

pub mod app_context;
pub mod application;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod display_sync;
pub mod error;
pub mod event;
pub mod interface;
pub mod net;
pub mod providers;
pub mod renderer;
pub mod sensor_drivers;
pub mod sensors;
pub mod slot_store;
pub mod slots;
pub mod state_service;
pub mod state_source;
pub mod task_manager;
