//! Attribute schema.

use serde::{Deserialize, Serialize};

use super::value::ValueType;

/// Cardinality of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// At most one value per entity; asserting a new value replaces the old one.
    One,
    /// Any number of distinct values per entity.
    Many,
}

impl Default for Cardinality {
    fn default() -> Self {
        Self::One
    }
}

/// Definition of an installed attribute.
///
/// Re-installing an attribute with an identical definition is a no-op;
/// a different definition under the same ident is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSpec {
    /// Attribute name, e.g. `user/email`.
    pub ident: String,
    /// Type of values this attribute holds.
    pub value_type: ValueType,
    /// Cardinality.
    #[serde(default)]
    pub cardinality: Cardinality,
    /// Whether a value may belong to at most one entity.
    #[serde(default)]
    pub unique: bool,
    /// Whether the attribute is kept in the attribute/value index.
    #[serde(default)]
    pub indexed: bool,
    /// Free-form documentation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

impl AttributeSpec {
    /// Create a cardinality-one, non-unique, unindexed attribute.
    pub fn new(ident: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            ident: ident.into(),
            value_type,
            cardinality: Cardinality::One,
            unique: false,
            indexed: false,
            doc: None,
        }
    }

    /// Make the attribute cardinality-many.
    pub fn many(mut self) -> Self {
        self.cardinality = Cardinality::Many;
        self
    }

    /// Make the attribute unique. Unique attributes are always indexed.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self.indexed = true;
        self
    }

    /// Keep the attribute in the attribute/value index.
    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    /// Attach documentation.
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Whether lookups by value can use the index.
    pub fn has_index(&self) -> bool {
        self.indexed || self.unique
    }

    /// The definition as the store keeps it: unique attributes are indexed
    /// whether or not `indexed` was set.
    pub fn effective(mut self) -> Self {
        self.indexed = self.has_index();
        self
    }
}
