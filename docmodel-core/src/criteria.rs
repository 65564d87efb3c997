//! Typed equality criteria for read operations.
//!
//! Criteria are an ordered list of `(field, value)` equality pairs; they are
//! passed through to the store's query primitive unmodified. Richer query
//! operators are deliberately out of scope.

use bson::Bson;

use crate::client::RawRecord;

/// An ordered equality-criteria map.
///
/// # Example
///
/// ```ignore
/// use docmodel_core::criteria::Criteria;
///
/// let criteria = Criteria::new()
///     .eq("name", "Alice")
///     .eq("age", 30);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Criteria {
    pairs: Vec<(String, Bson)>,
}

impl Criteria {
    /// An empty criteria map. Empty criteria are legal and match everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality pair.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.pairs.push((field.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// The pairs in insertion order.
    pub fn pairs(&self) -> &[(String, Bson)] {
        &self.pairs
    }

    /// Renders the criteria as a raw store record, preserving pair order.
    pub fn to_record(&self) -> RawRecord {
        self.pairs
            .iter()
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect()
    }
}
