//! Database configuration.

/// Configuration for a [`Database`](crate::Database) container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of per-identity getters kept in the side-cache.
    ///
    /// The least recently used getter is evicted once the bound is reached.
    /// Zero disables the cache: every request builds a fresh getter.
    pub getter_cache_capacity: usize,

    /// Whether the container maintains its statistics counters.
    pub collect_stats: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            getter_cache_capacity: 512,
            collect_stats: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the getter cache capacity.
    #[must_use]
    pub const fn getter_cache_capacity(mut self, capacity: usize) -> Self {
        self.getter_cache_capacity = capacity;
        self
    }

    /// Sets whether statistics are collected.
    #[must_use]
    pub const fn collect_stats(mut self, value: bool) -> Self {
        self.collect_stats = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.getter_cache_capacity, 512);
        assert!(config.collect_stats);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new().getter_cache_capacity(8).collect_stats(false);

        assert_eq!(config.getter_cache_capacity, 8);
        assert!(!config.collect_stats);
    }
}
