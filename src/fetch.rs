//! Outcome of a best-effort fetch.
//!
//! Listing and default-selection reads never propagate store failures. They
//! resolve to a [`Fetch`], which keeps "no rows" and "store failed" apart so a
//! caller can decide whether both degrade the same way.

use crate::error::StoreError;
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "lowercase")]
pub enum Fetch<T> {
    Ok(T),
    Empty,
    Failed(String),
}

impl<T> Fetch<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, Fetch::Ok(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Fetch::Failed(_))
    }

    pub fn ok(self) -> Option<T> {
        match self {
            Fetch::Ok(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetch<U> {
        match self {
            Fetch::Ok(value) => Fetch::Ok(f(value)),
            Fetch::Empty => Fetch::Empty,
            Fetch::Failed(reason) => Fetch::Failed(reason),
        }
    }

    /// Degrade `Empty` and `Failed` to `T::default()`.
    pub fn into_inner_or_default(self) -> T
    where
        T: Default,
    {
        self.ok().unwrap_or_default()
    }
}

impl<T> Fetch<Vec<T>> {
    /// `Empty` when the list has no items.
    pub fn from_list(items: Vec<T>) -> Self {
        if items.is_empty() {
            Fetch::Empty
        } else {
            Fetch::Ok(items)
        }
    }

    /// Degrade a store result, logging the failure under `context`.
    pub fn from_result(context: &str, result: Result<Vec<T>, StoreError>) -> Self {
        match result {
            Ok(items) => Self::from_list(items),
            Err(e) => Self::failed(context, e),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Fetch::Ok(items) => items.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Fetch<T> {
    /// Record a failed best-effort read.
    pub fn failed(context: &str, error: StoreError) -> Self {
        if error.is_cancelled() {
            debug!("{} cancelled", context);
        } else {
            warn!("{} failed: {}", context, error);
        }
        Fetch::Failed(error.to_string())
    }
}

impl<T> Default for Fetch<T> {
    fn default() -> Self {
        Fetch::Empty
    }
}
