//! Query filters for the data-listing endpoint.
//!
//! A [`Filter`] serializes to the wire shape `{"rel": .., "cond": [..]}`.
//! Conditions are built field-first with the fluent methods; the `type`
//! tag of each condition is left empty here and resolved against the
//! form's field schema just before a list request goes out, because the
//! remote requires numeric conditions on number fields and string
//! conditions everywhere else.

use crate::field::FieldType;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How the conditions of a filter combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    #[default]
    And,
    Or,
}

/// Comparison operator of a single condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMethod {
    NotEmpty,
    Empty,
    Eq,
    In,
    Range,
    Nin,
    Ne,
    Like,
    Verified,
    Unverified,
}

/// One filter condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    /// Resolved from the form schema right before sending; `None` until then.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<FieldType>,
    pub method: FilterMethod,
    /// Operands. Absent for operand-less methods; `range` bounds may be
    /// null to express an open end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Vec<Value>>,
}

/// A filter over the rows of one form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(rename = "rel")]
    pub relation: Relation,
    #[serde(rename = "cond")]
    pub conditions: Vec<Condition>,
}

impl Filter {
    /// A filter whose conditions must all hold.
    pub fn and() -> Self {
        Self::default()
    }

    /// A filter where any condition may hold.
    pub fn or() -> Self {
        Self {
            relation: Relation::Or,
            conditions: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    fn push(mut self, field: &str, method: FilterMethod, value: Option<Vec<Value>>) -> Self {
        self.conditions.push(Condition {
            field: field.to_string(),
            field_type: None,
            method,
            value,
        });
        self
    }

    pub fn eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.push(field, FilterMethod::Eq, Some(vec![value.into()]))
    }

    pub fn ne(self, field: &str, value: impl Into<Value>) -> Self {
        self.push(field, FilterMethod::Ne, Some(vec![value.into()]))
    }

    pub fn like(self, field: &str, value: impl Into<Value>) -> Self {
        self.push(field, FilterMethod::Like, Some(vec![value.into()]))
    }

    /// Matches rows whose field equals any of `values`. Nulls are dropped
    /// and duplicates collapsed; an empty set adds no condition.
    pub fn is_in<V: Into<Value>>(self, field: &str, values: impl IntoIterator<Item = V>) -> Self {
        match collect_operands(values) {
            Some(operands) => self.push(field, FilterMethod::In, Some(operands)),
            None => self,
        }
    }

    /// Matches rows whose field equals none of `values`; same operand
    /// handling as [`Filter::is_in`].
    pub fn not_in<V: Into<Value>>(self, field: &str, values: impl IntoIterator<Item = V>) -> Self {
        match collect_operands(values) {
            Some(operands) => self.push(field, FilterMethod::Nin, Some(operands)),
            None => self,
        }
    }

    /// Matches rows with `low <= field <= high`.
    pub fn range(self, field: &str, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        self.push(field, FilterMethod::Range, Some(vec![low.into(), high.into()]))
    }

    /// Matches rows with `field >= value` (an open-ended range).
    pub fn ge(self, field: &str, value: impl Into<Value>) -> Self {
        self.push(field, FilterMethod::Range, Some(vec![value.into(), Value::Null]))
    }

    /// Matches rows with `field <= value` (an open-ended range).
    pub fn le(self, field: &str, value: impl Into<Value>) -> Self {
        self.push(field, FilterMethod::Range, Some(vec![Value::Null, value.into()]))
    }

    pub fn empty(self, field: &str) -> Self {
        self.push(field, FilterMethod::Empty, None)
    }

    pub fn not_empty(self, field: &str) -> Self {
        self.push(field, FilterMethod::NotEmpty, None)
    }

    /// Phone fields only: rows whose number passed verification.
    pub fn verified(self, field: &str) -> Self {
        self.push(field, FilterMethod::Verified, None)
    }

    /// Phone fields only: rows whose number did not pass verification.
    pub fn unverified(self, field: &str) -> Self {
        self.push(field, FilterMethod::Unverified, None)
    }
}

/// Dedups set operands, drops nulls; `None` when nothing is left.
fn collect_operands<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Option<Vec<Value>> {
    let mut operands: Vec<Value> = Vec::new();
    for value in values {
        let value = value.into();
        if value.is_null() || operands.contains(&value) {
            continue;
        }
        operands.push(value);
    }
    if operands.is_empty() {
        None
    } else {
        Some(operands)
    }
}
