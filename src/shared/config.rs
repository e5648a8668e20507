//! Chat data layer configuration
//!
//! Provides configuration types for the pagination controller.

use thiserror::Error;

/// Default number of messages per history page
pub const DEFAULT_PAGE_SIZE: usize = 12;

/// Chat data layer configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Number of messages requested per history page
    page_size: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        let page_size = std::env::var("CHAT_PAGE_SIZE")
            .ok()
            .and_then(|raw| raw.parse::<usize>().ok())
            .filter(|size| *size >= 1)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        Self { page_size }
    }
}

impl ChatConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new ChatConfigBuilder
    pub fn builder() -> ChatConfigBuilder {
        ChatConfigBuilder::default()
    }

    /// Number of messages requested per history page
    pub fn page_size(&self) -> usize {
        self.page_size
    }
}

/// Builder for ChatConfig
#[derive(Debug, Default)]
pub struct ChatConfigBuilder {
    page_size: Option<usize>,
}

impl ChatConfigBuilder {
    /// Set the history page size
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<ChatConfig, ConfigError> {
        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 {
            return Err(ConfigError::InvalidPageSize(page_size));
        }
        Ok(ChatConfig { page_size })
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid page size: {0}")]
    InvalidPageSize(usize),
}
