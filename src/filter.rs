//! Client-side filtering over snapshot documents.
//!
//! Filters are evaluated in memory against a cached snapshot; nothing is
//! pushed down to the store.

use crate::document::Document;
use serde_json::Value;

/// One condition on a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field equals the value. Numbers compare by numeric value, so `100`
    /// matches `100.0`.
    Equals { field: String, value: Value },
    /// String field contains the needle, ignoring case.
    Contains { field: String, needle: String },
    /// Numeric field lies within the inclusive bounds.
    Range {
        field: String,
        min: Option<f64>,
        max: Option<f64>,
    },
}

impl Condition {
    /// Whether `doc` satisfies this condition. A missing field never does.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Condition::Equals { field, value } => {
                doc.get(field).is_some_and(|actual| values_equal(actual, value))
            }
            Condition::Contains { field, needle } => doc
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|s| s.to_lowercase().contains(&needle.to_lowercase())),
            Condition::Range { field, min, max } => {
                doc.get(field).and_then(Value::as_f64).is_some_and(|n| {
                    min.map_or(true, |lo| n >= lo) && max.map_or(true, |hi| n <= hi)
                })
            }
        }
    }
}

fn values_equal(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        _ => actual == expected,
    }
}

/// Conjunction of conditions; an empty filter matches everything.
///
/// # Example
///
/// ```
/// use geodata_cache::filter::Filter;
///
/// let filter = Filter::new()
///     .equals("state_code", "NC")
///     .contains("name", "ape")
///     .at_least("population", 50.0);
/// assert_eq!(filter.conditions().len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field == value`.
    pub fn equals(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Equals {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Require the string `field` to contain `needle` (case-insensitive).
    pub fn contains(mut self, field: impl Into<String>, needle: impl Into<String>) -> Self {
        self.conditions.push(Condition::Contains {
            field: field.into(),
            needle: needle.into(),
        });
        self
    }

    /// Require the numeric `field` to be at least `min`.
    pub fn at_least(self, field: impl Into<String>, min: f64) -> Self {
        self.range(field, Some(min), None)
    }

    /// Require the numeric `field` to be at most `max`.
    pub fn at_most(self, field: impl Into<String>, max: f64) -> Self {
        self.range(field, None, Some(max))
    }

    /// Require the numeric `field` to lie within the inclusive bounds.
    pub fn range(mut self, field: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        self.conditions.push(Condition::Range {
            field: field.into(),
            min,
            max,
        });
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Whether `doc` satisfies every condition.
    pub fn matches(&self, doc: &Document) -> bool {
        self.conditions.iter().all(|c| c.matches(doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_empty_filter_matches_all() {
        assert!(Filter::new().matches(&doc(json!({}))));
        assert!(Filter::new().is_empty());
    }

    #[test]
    fn test_equals() {
        let apex = doc(json!({"name": "Apex", "state_code": "NC", "population": 100}));

        assert!(Filter::new().equals("state_code", "NC").matches(&apex));
        assert!(!Filter::new().equals("state_code", "NY").matches(&apex));
        assert!(Filter::new().equals("population", 100.0).matches(&apex));
        assert!(!Filter::new().equals("missing", "x").matches(&apex));
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        let city = doc(json!({"name": "New York", "population": 8_000_000}));

        assert!(Filter::new().contains("name", "york").matches(&city));
        assert!(Filter::new().contains("name", "NEW").matches(&city));
        assert!(!Filter::new().contains("name", "jersey").matches(&city));
        assert!(!Filter::new().contains("population", "8").matches(&city));
    }

    #[test]
    fn test_range() {
        let city = doc(json!({"name": "Apex", "population": 100}));

        assert!(Filter::new().at_least("population", 100.0).matches(&city));
        assert!(!Filter::new().at_least("population", 101.0).matches(&city));
        assert!(Filter::new().at_most("population", 100.0).matches(&city));
        assert!(Filter::new()
            .range("population", Some(50.0), Some(150.0))
            .matches(&city));
        assert!(!Filter::new().at_most("name", 5.0).matches(&city));
    }

    #[test]
    fn test_conditions_are_conjunctive() {
        let city = doc(json!({"name": "Apex", "state_code": "NC", "population": 100}));

        let filter = Filter::new().equals("state_code", "NC").at_least("population", 1_000.0);
        assert!(!filter.matches(&city));
    }
}
