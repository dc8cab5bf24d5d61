//! Dependency injection providers for service management.
//!
//! This module contains all providers for creating and managing system components
//! using the Dependency Injection pattern for loose coupling and testability.

pub mod app_state;
pub mod display;
pub mod http;
pub mod traits;

pub use app_state::AppStateProvider;
pub use display::DisplayServiceProvider;
pub use http::HttpServiceProvider;
pub use traits::{AsyncProvider, ServiceProvider};
