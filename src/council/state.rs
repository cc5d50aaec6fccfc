//! Council Application State
//!
//! Process-wide state shared by every request handler: the static council
//! configuration, the outbound HTTP client, and the widget asset location.
//! Nothing here mutates after startup; concurrent consultations need no
//! coordination.

use super::config::CouncilConfig;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

// =============================================================================
// Application State
// =============================================================================

/// Shared application state that can be safely passed between threads
pub type SharedState = Arc<AppState>;

/// Core application state for the council server
pub struct AppState {
    /// Static pipeline configuration, read once per consultation
    pub config: CouncilConfig,

    /// Outbound client for the completion endpoint; reqwest clients pool
    /// connections internally and are cheap to share
    pub http: reqwest::Client,

    /// Path to the directory containing HTML assets.
    pub assets_dir: PathBuf,
}

impl AppState {
    /// Creates the application state and locates the assets directory
    pub fn new(config: CouncilConfig) -> Self {
        let current_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let assets_dir = Self::locate_assets_directory(&current_dir);

        tracing::info!(assets_dir = %assets_dir.display(), "using assets directory");

        Self {
            config,
            http: reqwest::Client::new(),
            assets_dir,
        }
    }

    /// Attempts to locate the assets directory using a multi-step strategy
    fn locate_assets_directory(current_dir: &Path) -> PathBuf {
        // Strategy to locate assets:
        // 1. ./assets
        // 2. ../assets (if running from a subdir)
        // 3. Fallback to "assets" relative path

        if current_dir.join("assets").exists() {
            return current_dir.join("assets");
        }

        if let Some(parent) = current_dir.parent() {
            if parent.join("assets").exists() {
                return parent.join("assets");
            }
        }

        PathBuf::from("assets")
    }

    /// Reads the ai-council.html widget template or a fallback version
    pub async fn load_widget_html(&self) -> Result<String, axum::http::StatusCode> {
        // First try the primary HTML file
        let primary_html_path = self.assets_dir.join("ai-council.html");
        if primary_html_path.exists() {
            return tokio::fs::read_to_string(primary_html_path)
                .await
                .map_err(|_| axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        }

        // Search for fallbacks (e.g., ai-council-123.html)
        let fallback_path = self.find_fallback_html_file().await?;

        tokio::fs::read_to_string(fallback_path)
            .await
            .map_err(|_| axum::http::StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Finds a fallback HTML file when the primary one is not available
    async fn find_fallback_html_file(&self) -> Result<PathBuf, axum::http::StatusCode> {
        let mut entries = tokio::fs::read_dir(&self.assets_dir)
            .await
            .map_err(|_| axum::http::StatusCode::NOT_FOUND)?;

        let mut fallbacks = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.starts_with("ai-council-") && name.ends_with(".html") {
                    fallbacks.push(path);
                }
            }
        }

        // Use the lexicographically last fallback (likely the latest build)
        fallbacks.sort();
        fallbacks
            .last()
            .cloned()
            .ok_or(axum::http::StatusCode::NOT_FOUND)
    }
}
