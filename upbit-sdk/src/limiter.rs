use std::time::Duration;

use tokio::{
    sync::Mutex,
    time::{self, Instant},
};

/// Cooperative pacing for Upbit requests.
///
/// Tracks the instant of the last call and the minimum delay the next call
/// must respect, derived from the server's `Remaining-Req` quota hints. The
/// mutex is held across the pacing sleep, so concurrent callers serialize
/// their effective request times.
pub(crate) struct RateLimiter {
    state: Mutex<LimiterState>,
}

struct LimiterState {
    last_call: Option<Instant>,
    next_min_delay: Duration,
}

impl RateLimiter {
    /// Delay floor applied after an HTTP 429.
    pub const THROTTLE_DELAY: Duration = Duration::from_secs(1);

    pub fn new() -> Self {
        Self {
            state: Mutex::new(LimiterState {
                last_call: None,
                next_min_delay: Duration::ZERO,
            }),
        }
    }

    /// Waits until the pacing window allows another request, then opens it.
    pub async fn acquire(&self) {
        let mut state = self.state.lock().await;

        if let Some(last_call) = state.last_call {
            let elapsed = last_call.elapsed();
            if elapsed < state.next_min_delay {
                time::sleep(state.next_min_delay - elapsed).await;
            }
        }

        state.last_call = Some(Instant::now());
        state.next_min_delay = Duration::ZERO;
    }

    /// Folds a `Remaining-Req` header value and an optional delay floor into
    /// the minimum delay for the next call.
    ///
    /// A missing or unparseable header is treated as zero remaining quota.
    pub async fn observe(&self, remaining_req: Option<&str>, floor: Option<Duration>) {
        let sec_remaining = remaining_req.map(parse_sec_remaining).unwrap_or(0);
        let delay = floor
            .unwrap_or(Duration::ZERO)
            .max(delay_for_remaining(sec_remaining));

        let mut state = self.state.lock().await;
        state.next_min_delay = state.next_min_delay.max(delay);
    }
}

/// Extracts the `sec` field from a `Remaining-Req` header value of the form
/// `group=candles; min=599; sec=9`.
fn parse_sec_remaining(header: &str) -> u64 {
    header
        .split(';')
        .filter_map(|token| token.split_once('='))
        .find(|(key, _)| key.trim() == "sec")
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

fn delay_for_remaining(sec_remaining: u64) -> Duration {
    if sec_remaining <= 1 {
        Duration::from_secs(1)
    } else if sec_remaining <= 5 {
        Duration::from_millis(500)
    } else if sec_remaining <= 10 {
        Duration::from_millis(200)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sec_field_from_remaining_req_header() {
        assert_eq!(parse_sec_remaining("group=candles; min=599; sec=9"), 9);
        assert_eq!(parse_sec_remaining("sec=4"), 4);
        assert_eq!(parse_sec_remaining("group=candles; min=599"), 0);
        assert_eq!(parse_sec_remaining("not a header"), 0);
        assert_eq!(parse_sec_remaining("sec=abc"), 0);
    }

    #[test]
    fn delay_grows_as_quota_shrinks() {
        assert_eq!(delay_for_remaining(0), Duration::from_secs(1));
        assert_eq!(delay_for_remaining(1), Duration::from_secs(1));
        assert_eq!(delay_for_remaining(5), Duration::from_millis(500));
        assert_eq!(delay_for_remaining(10), Duration::from_millis(200));
        assert_eq!(delay_for_remaining(11), Duration::ZERO);
        assert_eq!(delay_for_remaining(599), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_respects_observed_delay() {
        let limiter = RateLimiter::new();

        limiter.acquire().await;
        limiter
            .observe(Some("group=candles; min=10; sec=1"), None)
            .await;

        let before = Instant::now();
        limiter.acquire().await;
        assert!(before.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn throttle_floor_wins_over_header_hint() {
        let limiter = RateLimiter::new();

        limiter.acquire().await;
        limiter
            .observe(
                Some("group=candles; min=10; sec=30"),
                Some(RateLimiter::THROTTLE_DELAY),
            )
            .await;

        let before = Instant::now();
        limiter.acquire().await;
        assert!(before.elapsed() >= RateLimiter::THROTTLE_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn delay_resets_after_acquire() {
        let limiter = RateLimiter::new();

        limiter.acquire().await;
        limiter
            .observe(Some("group=candles; min=10; sec=1"), None)
            .await;
        limiter.acquire().await;

        // No new observation: the next call is not delayed.
        let before = Instant::now();
        limiter.acquire().await;
        assert!(before.elapsed() < Duration::from_millis(10));
    }
}
