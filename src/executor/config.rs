//! Executor settings

use std::time::Duration;

/// Default timeout for a single test command
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of concurrently running tests
pub const DEFAULT_MAX_PARALLEL: usize = 4;

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum time to wait for a single command to complete
    pub command_timeout: Duration,
    pub max_parallel: usize,
    /// Extra attempts for a failing command before it is classified
    pub retries: u32,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            max_parallel: DEFAULT_MAX_PARALLEL,
            retries: 0,
        }
    }
}

impl ExecutorConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }
}
