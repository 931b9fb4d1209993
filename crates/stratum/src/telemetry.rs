// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Structured log events emitted by composed caches.
//!
//! Events are emitted through `tracing` when the `logs` feature is enabled; without it every
//! function here compiles to nothing.

use stratum_tier::{Error, Operation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheActivity {
    FirstHit,
    SecondHit,
    Miss,
    WriteBack,
    WriteBackFailed,
    FanOutFailed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(not(any(feature = "logs", test)), expect(dead_code, reason = "only consulted when emitting logs"))]
pub(crate) enum Level {
    Debug,
    Info,
    Error,
}

impl CacheActivity {
    #[cfg_attr(not(any(feature = "logs", test)), expect(dead_code, reason = "only consulted when emitting logs"))]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FirstHit => "cache.first_hit",
            Self::SecondHit => "cache.second_hit",
            Self::Miss => "cache.miss",
            Self::WriteBack => "cache.write_back",
            Self::WriteBackFailed => "cache.write_back_failed",
            Self::FanOutFailed => "cache.fan_out_failed",
            Self::Cancelled => "cache.cancelled",
        }
    }

    #[cfg_attr(not(any(feature = "logs", test)), expect(dead_code, reason = "only consulted when emitting logs"))]
    pub fn level(self) -> Level {
        match self {
            Self::FirstHit | Self::SecondHit | Self::Miss => Level::Debug,
            Self::WriteBack | Self::Cancelled => Level::Info,
            Self::WriteBackFailed | Self::FanOutFailed => Level::Error,
        }
    }
}

/// Records an activity of a composed operation.
#[inline]
pub(crate) fn record(operation: Operation, activity: CacheActivity) {
    #[cfg(feature = "logs")]
    emit(operation, activity, None);
    #[cfg(not(feature = "logs"))]
    let _ = (operation, activity);
}

/// Records an activity that carries a failure.
#[inline]
pub(crate) fn record_failure(operation: Operation, activity: CacheActivity, error: &Error) {
    #[cfg(feature = "logs")]
    emit(operation, activity, Some(error));
    #[cfg(not(feature = "logs"))]
    let _ = (operation, activity, error);
}

#[cfg(feature = "logs")]
fn emit(operation: Operation, activity: CacheActivity, error: Option<&Error>) {
    let op = operation.as_str();
    let ev = activity.as_str();
    let error = error.map(tracing::field::display);

    // Tracing levels must be constant, so the macro picks the call site per level.
    macro_rules! emit_event {
        ($level:ident) => {
            tracing::$level!(
                cache.operation = op,
                cache.activity = ev,
                cache.error = error,
                "cache.event"
            )
        };
    }

    match activity.level() {
        Level::Debug => emit_event!(debug),
        Level::Info => emit_event!(info),
        Level::Error => emit_event!(error),
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_names() {
        assert_eq!(CacheActivity::FirstHit.as_str(), "cache.first_hit");
        assert_eq!(CacheActivity::SecondHit.as_str(), "cache.second_hit");
        assert_eq!(CacheActivity::Miss.as_str(), "cache.miss");
        assert_eq!(CacheActivity::WriteBack.as_str(), "cache.write_back");
        assert_eq!(CacheActivity::WriteBackFailed.as_str(), "cache.write_back_failed");
        assert_eq!(CacheActivity::FanOutFailed.as_str(), "cache.fan_out_failed");
        assert_eq!(CacheActivity::Cancelled.as_str(), "cache.cancelled");
    }

    #[test]
    fn activity_levels() {
        assert_eq!(CacheActivity::Miss.level(), Level::Debug);
        assert_eq!(CacheActivity::WriteBack.level(), Level::Info);
        assert_eq!(CacheActivity::Cancelled.level(), Level::Info);
        assert_eq!(CacheActivity::WriteBackFailed.level(), Level::Error);
        assert_eq!(CacheActivity::FanOutFailed.level(), Level::Error);
    }

    #[cfg(feature = "logs")]
    #[test]
    fn emits_structured_fields() {
        use crate::testing::LogCapture;

        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        record_failure(Operation::Evict, CacheActivity::FanOutFailed, &Error::caused_by("disk full"));
        record(Operation::Get, CacheActivity::Miss);

        capture.assert_contains("ERROR");
        capture.assert_contains("cache.operation=\"evict\"");
        capture.assert_contains("cache.activity=\"cache.fan_out_failed\"");
        capture.assert_contains("cache.error=disk full");
        capture.assert_contains("cache.activity=\"cache.miss\"");
    }
}
