//! Convenience builder for HTTP query parameters.
//!
//! This module provides a lightweight helper for constructing URL query pairs
//! from optional values, and the [`Pagination`] window accepted by every list
//! operation.

use std::fmt::Display;
use url::form_urlencoded;

/// Builder for assembling query parameter pairs.
#[derive(Debug, Default, Clone)]
pub struct QueryParams {
    pairs: Vec<(&'static str, String)>,
}

impl QueryParams {
    /// Create a new, empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Append a key/value pair when the value is present.
    pub fn push_opt<T>(&mut self, key: &'static str, value: Option<T>)
    where
        T: ToString,
    {
        if let Some(value) = value {
            self.pairs.push((key, value.to_string()));
        }
    }

    /// Append a required key/value pair.
    pub fn push<T>(&mut self, key: &'static str, value: T)
    where
        T: Display,
    {
        self.pairs.push((key, value.to_string()));
    }

    /// Return the collected key/value pairs.
    #[must_use]
    pub fn into_pairs(self) -> Vec<(&'static str, String)> {
        self.pairs
    }

    /// Returns true if no parameters have been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Encodes the pairs as `k1=v1&k2=v2`, in insertion order.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.pairs {
            serializer.append_pair(key, value);
        }
        serializer.finish()
    }

    /// Appends the encoded pairs to `path`, or returns `path` unchanged when empty.
    #[must_use]
    pub fn append_to(&self, path: &str) -> String {
        if self.is_empty() {
            return path.to_string();
        }
        let separator = if path.contains('?') { '&' } else { '?' };
        format!("{path}{separator}{}", self.to_query_string())
    }
}

/// Window over a list operation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Maximum number of items to return
    pub limit: Option<u32>,
    /// Number of items to skip
    pub offset: Option<u32>,
}

impl Pagination {
    /// No limit and no offset.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            limit: None,
            offset: None,
        }
    }

    /// Set the page size.
    #[must_use]
    pub const fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the number of items to skip.
    #[must_use]
    pub const fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Query pairs for this window.
    #[must_use]
    pub fn to_params(self) -> QueryParams {
        let mut params = QueryParams::new();
        params.push_opt("limit", self.limit);
        params.push_opt("offset", self.offset);
        params
    }
}
