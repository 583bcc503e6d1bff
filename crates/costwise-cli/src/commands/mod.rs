//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (engine construction, request execution)
//! - `analyze` - Engine commands (ask, forecast, anomalies, optimize, commitment, tags, overview)
//! - `classify` - Intent classification preview
//! - `config` - Configuration commands (show, path)
//! - `render` - Human-readable output for engine results

pub mod analyze;
pub mod classify;
pub mod config;
pub mod core;
pub mod render;

// Re-export command functions for main.rs
pub use analyze::*;
pub use classify::*;
pub use config::*;
pub use core::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
