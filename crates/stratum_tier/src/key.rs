// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Key validation shared by every cache implementation.

use std::{borrow::Cow, rc::Rc, sync::Arc};

use crate::{AsyncResult, Error};

/// A type usable as a cache key.
///
/// Some key types have a value meaning "no key was provided": an empty string or `None`.
/// Caches reject such keys with an [`Error::is_invalid_argument`] failure before scheduling
/// any work, instead of treating them as a miss.
///
/// # Examples
///
/// ```
/// use stratum_tier::CacheKey;
///
/// assert!(String::new().is_unset());
/// assert!(!"user:42".is_unset());
/// assert!(None::<u64>.is_unset());
/// assert!(!Some(0_u64).is_unset());
/// ```
pub trait CacheKey {
    /// Returns `true` if this key is the missing-key sentinel.
    fn is_unset(&self) -> bool;
}

impl CacheKey for str {
    fn is_unset(&self) -> bool {
        self.is_empty()
    }
}

impl CacheKey for String {
    fn is_unset(&self) -> bool {
        self.is_empty()
    }
}

impl CacheKey for Cow<'_, str> {
    fn is_unset(&self) -> bool {
        self.is_empty()
    }
}

impl<T: CacheKey + ?Sized> CacheKey for &T {
    fn is_unset(&self) -> bool {
        (**self).is_unset()
    }
}

impl<T: CacheKey + ?Sized> CacheKey for Box<T> {
    fn is_unset(&self) -> bool {
        (**self).is_unset()
    }
}

impl<T: CacheKey + ?Sized> CacheKey for Arc<T> {
    fn is_unset(&self) -> bool {
        (**self).is_unset()
    }
}

impl<T: CacheKey + ?Sized> CacheKey for Rc<T> {
    fn is_unset(&self) -> bool {
        (**self).is_unset()
    }
}

impl<T: CacheKey> CacheKey for Option<T> {
    fn is_unset(&self) -> bool {
        self.as_ref().is_none_or(CacheKey::is_unset)
    }
}

macro_rules! never_unset {
    ($($ty:ty),* $(,)?) => {
        $(
            impl CacheKey for $ty {
                fn is_unset(&self) -> bool {
                    false
                }
            }
        )*
    };
}

never_unset!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, char, bool);

/// Rejects the missing-key sentinel.
///
/// # Errors
///
/// Returns an invalid-argument error if `key` is unset.
pub fn ensure_key<K: CacheKey + ?Sized>(key: &K) -> Result<(), Error> {
    if key.is_unset() {
        Err(Error::invalid_argument("cache key must be set"))
    } else {
        Ok(())
    }
}

/// Returns an already-failed result if `key` is unset.
///
/// Cache implementations call this first so invalid keys fail before any work is dispatched:
///
/// ```
/// use stratum_tier::{AsyncResult, CacheKey, key::reject_unset};
///
/// fn get(key: &String) -> AsyncResult<Option<i32>> {
///     if let Some(rejected) = reject_unset(key) {
///         return rejected;
///     }
///     AsyncResult::ready(None)
/// }
///
/// assert!(get(&String::new()).join().unwrap_err().is_invalid_argument());
/// ```
pub fn reject_unset<K: CacheKey + ?Sized, T>(key: &K) -> Option<AsyncResult<T>> {
    ensure_key(key).err().map(AsyncResult::failed)
}
