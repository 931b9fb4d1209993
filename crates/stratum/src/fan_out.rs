// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Joins two concurrently dispatched branch operations into one result.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use stratum_tier::{AsyncResult, Branch, Completer, Error, Operation, Outcome};

use crate::aggregate::aggregate;
use crate::telemetry::{self, CacheActivity};

/// Tracks the two outstanding branches of one fan-out.
struct WaitGroup {
    operation: Operation,
    remaining: AtomicUsize,
    // Indexed by dispatch position.
    failures: Mutex<[Option<Error>; 2]>,
    completer: Mutex<Option<Completer<()>>>,
}

impl WaitGroup {
    fn arrive(&self, branch: Branch, outcome: &Outcome<()>) {
        let failure = match outcome {
            Outcome::Completed(()) => None,
            Outcome::Failed(error) => Some(error.clone()),
            Outcome::Cancelled => Some(Error::cancelled()),
        };

        let slot = match branch {
            Branch::First => 0,
            Branch::Second => 1,
        };
        self.failures.lock()[slot] = failure;

        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.finish();
        }
    }

    fn finish(&self) {
        let [first, second] = std::mem::take(&mut *self.failures.lock());
        let Some(completer) = self.completer.lock().take() else {
            return;
        };

        match aggregate(self.operation, first, second) {
            Ok(()) => {
                completer.complete(());
            }
            // A cancelled fan-out already reported its outcome; late failures are dropped quietly.
            Err(_) if completer.is_cancelled() => {}
            Err(error) => {
                telemetry::record_failure(self.operation, CacheActivity::FanOutFailed, &error);
                completer.fail(error);
            }
        }
    }
}

/// Returns a result that settles once both already-dispatched branches are terminal.
///
/// Cancelling the returned result settles it right away and forwards the request to both
/// branches; their late outcomes are discarded.
pub(crate) fn fan_out(operation: Operation, first: AsyncResult<()>, second: AsyncResult<()>) -> AsyncResult<()> {
    let (completer, result) = AsyncResult::pending();

    completer.on_cancel({
        let (first, second) = (first.clone(), second.clone());
        move || {
            telemetry::record(operation, CacheActivity::Cancelled);
            first.cancel();
            second.cancel();
        }
    });

    let group = Arc::new(WaitGroup {
        operation,
        remaining: AtomicUsize::new(2),
        failures: Mutex::new([None, None]),
        completer: Mutex::new(Some(completer)),
    });

    for (branch, pending) in [(Branch::First, first), (Branch::Second, second)] {
        let group = Arc::clone(&group);
        pending.on_complete(move |outcome| group.arrive(branch, outcome));
    }

    result
}
