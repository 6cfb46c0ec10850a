//! Cursor and sorter configuration.

/// Configuration shared by every cursor opened through one
/// [`StoreAdapter`](crate::StoreAdapter).
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether index cursors build their store iterator during `open`
    /// instead of on the first `next`.
    pub preload_on_open: bool,

    /// Number of rows the sorter buffers before writing a batch to its
    /// temporary keyspace.
    pub sort_batch_size: usize,

    /// First keyspace ID handed out for temporary sort keyspaces.
    pub temp_keyspace_base: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preload_on_open: true,
            sort_batch_size: 256,
            temp_keyspace_base: 0x8000_0000,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether index cursors preload their iterator on open.
    #[must_use]
    pub const fn preload_on_open(mut self, value: bool) -> Self {
        self.preload_on_open = value;
        self
    }

    /// Sets the sorter batch size. Zero is treated as one.
    #[must_use]
    pub const fn sort_batch_size(mut self, rows: usize) -> Self {
        self.sort_batch_size = if rows == 0 { 1 } else { rows };
        self
    }

    /// Sets the first temporary keyspace ID.
    #[must_use]
    pub const fn temp_keyspace_base(mut self, id: u32) -> Self {
        self.temp_keyspace_base = id;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert!(config.preload_on_open);
        assert_eq!(config.sort_batch_size, 256);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .preload_on_open(false)
            .sort_batch_size(0)
            .temp_keyspace_base(7);
        assert!(!config.preload_on_open);
        assert_eq!(config.sort_batch_size, 1);
        assert_eq!(config.temp_keyspace_base, 7);
    }
}
