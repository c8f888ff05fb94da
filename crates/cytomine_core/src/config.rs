//! Session configuration.

use crate::command::DEFAULT_HISTORY;

/// Configuration shared by every entity and collection of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Page size given to new collections (0 = unpaginated).
    pub default_page_size: u32,
    /// Upper bound on round trips made by one `fetch_all` (0 = unbounded).
    pub max_pages: u32,
    /// Number of command states the session remembers.
    pub command_history: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_page_size: 0,
            max_pages: 0,
            command_history: DEFAULT_HISTORY,
        }
    }
}

impl SessionConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default page size.
    #[must_use]
    pub const fn with_default_page_size(mut self, size: u32) -> Self {
        self.default_page_size = size;
        self
    }

    /// Sets the page bound for `fetch_all`.
    #[must_use]
    pub const fn with_max_pages(mut self, pages: u32) -> Self {
        self.max_pages = pages;
        self
    }

    /// Sets how many command states the session remembers.
    #[must_use]
    pub const fn with_command_history(mut self, commands: usize) -> Self {
        self.command_history = commands;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = SessionConfig::new()
            .with_default_page_size(25)
            .with_max_pages(40)
            .with_command_history(8);
        assert_eq!(config.default_page_size, 25);
        assert_eq!(config.max_pages, 40);
        assert_eq!(config.command_history, 8);
    }

    #[test]
    fn defaults_are_unpaginated() {
        let config = SessionConfig::default();
        assert_eq!(config.default_page_size, 0);
        assert_eq!(config.max_pages, 0);
        assert_eq!(config.command_history, DEFAULT_HISTORY);
    }
}
