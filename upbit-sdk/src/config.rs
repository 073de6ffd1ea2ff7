use std::time::Duration;

/// Default base URL of the Upbit REST API.
pub const UPBIT_API_BASE_URL: &str = "https://api.upbit.com/v1";

/// Configuration for the [`RestClient`].
///
/// [`RestClient`]: crate::RestClient
#[derive(Clone, Debug)]
pub struct RestClientConfig {
    base_url: String,
    timeout: Duration,
    error_cooldown: Duration,
    error_max_trials: u32,
}

impl Default for RestClientConfig {
    fn default() -> Self {
        Self {
            base_url: UPBIT_API_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
            error_cooldown: Duration::from_secs(1),
            error_max_trials: 3,
        }
    }
}

impl RestClientConfig {
    /// Returns the base URL requests are issued against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the timeout applied to each HTTP request.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the cooldown slept between failed attempts of one request.
    pub fn error_cooldown(&self) -> Duration {
        self.error_cooldown
    }

    /// Returns the total number of attempts before an error is propagated.
    pub fn error_max_trials(&self) -> u32 {
        self.error_max_trials
    }

    /// Sets the base URL requests are issued against.
    ///
    /// Default: [`UPBIT_API_BASE_URL`]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the timeout applied to each HTTP request.
    ///
    /// Default: `10` seconds
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the cooldown slept between failed attempts of one request.
    ///
    /// Default: `1` second
    pub fn with_error_cooldown(mut self, cooldown: Duration) -> Self {
        self.error_cooldown = cooldown;
        self
    }

    /// Sets the total number of attempts before an error is propagated.
    ///
    /// HTTP 429 responses are paced by the rate limiter instead and do not
    /// count against this budget.
    ///
    /// Default: `3`
    pub fn with_error_max_trials(mut self, max_trials: u32) -> Self {
        self.error_max_trials = max_trials.max(1);
        self
    }
}
