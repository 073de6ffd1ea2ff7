use std::{
    future::Future,
    ops::{Deref, DerefMut},
    pin::Pin,
    task::{Context, Poll},
};

use chrono::{DateTime, NaiveDateTime, Utc};
use tokio::task::{JoinError, JoinHandle};

use upbit_sdk::KST;

use crate::shared::{Timeframe, error::ConfigError};

/// A type that can not be instantiated
pub(crate) enum Never {}

pub(crate) trait DateTimeExt {
    /// Floors this instant to the start of its timeframe bucket.
    ///
    /// Buckets are multiples of the timeframe duration from the Unix epoch,
    /// computed on Seoul wall-clock time. Fails for calendar timeframes,
    /// which have no fixed duration.
    fn floor_to_timeframe(&self, timeframe: Timeframe) -> Result<DateTime<Utc>, ConfigError>;

    /// Renders this instant as Seoul wall-clock time.
    fn format_kst(&self) -> String;
}

impl DateTimeExt for DateTime<Utc> {
    fn floor_to_timeframe(&self, timeframe: Timeframe) -> Result<DateTime<Utc>, ConfigError> {
        let secs_per_bucket = timeframe.duration_checked()?.num_seconds();

        let local = self.with_timezone(&KST).naive_local();
        let local_secs = local.and_utc().timestamp();
        let floored_secs = local_secs - local_secs.rem_euclid(secs_per_bucket);

        let floored_local = DateTime::from_timestamp(floored_secs, 0)
            .expect("floored timestamp is always valid")
            .naive_utc();

        Ok(kst_to_utc(floored_local))
    }

    fn format_kst(&self) -> String {
        self.with_timezone(&KST)
            .format("%Y-%m-%d %H:%M:%S (%Z)")
            .to_string()
    }
}

/// Interprets a Seoul wall-clock time as a UTC instant.
pub(crate) fn kst_to_utc(local: NaiveDateTime) -> DateTime<Utc> {
    local
        .and_local_timezone(KST)
        .single()
        .expect("Seoul wall-clock times map to a single instant")
        .with_timezone(&Utc)
}

/// A wrapper around `tokio::task::JoinHandle` that aborts the task when the
/// wrapper is dropped, while still allowing access to the handle.
///
/// `abort()` does not run destructors or cleanup code; tasks held through
/// this wrapper must tolerate abrupt cancellation. Implements `Deref`,
/// `DerefMut` and `Future`, so the wrapper can be used wherever the plain
/// `JoinHandle` could.
#[derive(Debug)]
pub(crate) struct AbortOnDropHandle<T>(JoinHandle<T>);

impl<T> From<JoinHandle<T>> for AbortOnDropHandle<T> {
    fn from(handle: JoinHandle<T>) -> Self {
        Self(handle)
    }
}

impl<T> Deref for AbortOnDropHandle<T> {
    type Target = JoinHandle<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for AbortOnDropHandle<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<T> Future for AbortOnDropHandle<T> {
    type Output = Result<T, JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}

impl<T> Drop for AbortOnDropHandle<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[cfg(test)]
mod tests;
