// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Combines the outcomes of a two-branch fan-out into one result.

use stratum_tier::{AggregatedFailure, Branch, BranchFailure, Error, Operation, Result};

/// Folds the failures of both branches, labelled by dispatch position.
///
/// No failure yields `Ok`. Otherwise the error is an [`AggregatedFailure`] listing the failing
/// branches first-then-second, whose cause is the first listed failure.
pub(crate) fn aggregate(operation: Operation, first: Option<Error>, second: Option<Error>) -> Result<()> {
    let failures = [(Branch::First, first), (Branch::Second, second)]
        .into_iter()
        .filter_map(|(branch, error)| error.map(|error| BranchFailure::new(branch, error)))
        .collect();

    match AggregatedFailure::new(operation, failures) {
        None => Ok(()),
        Some(failure) => Err(Error::aggregated(failure)),
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn no_failures_is_success() {
        assert!(aggregate(Operation::Set, None, None).is_ok());
    }

    #[test]
    fn single_first_failure() {
        let error = aggregate(Operation::Evict, Some(Error::caused_by("e1")), None).unwrap_err();

        assert_eq!(error.to_string(), "evict failed for firstCache");
        assert_eq!(error.source().unwrap().to_string(), "e1");

        let aggregated = error.as_aggregated().unwrap();
        assert_eq!(aggregated.operation(), Operation::Evict);
        assert_eq!(aggregated.failures().len(), 1);
        assert_eq!(aggregated.failures()[0].branch(), Branch::First);
    }

    #[test]
    fn single_second_failure() {
        let error = aggregate(Operation::Set, None, Some(Error::caused_by("e2"))).unwrap_err();

        assert_eq!(error.to_string(), "set failed for secondCache");
        assert_eq!(error.as_aggregated().unwrap().cause().to_string(), "e2");
    }

    #[test]
    fn both_failures_keep_dispatch_order() {
        let error = aggregate(Operation::Evict, Some(Error::caused_by("e1")), Some(Error::caused_by("e2"))).unwrap_err();

        assert_eq!(error.to_string(), "evict failed for firstCache, evict failed for secondCache");
        assert_eq!(error.source().unwrap().to_string(), "e1");
    }
}
