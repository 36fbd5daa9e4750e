//! # Filter Tree
//!
//! Typed representation of list filters. A predicate maps top-level field
//! names (dot paths allowed) to filter nodes, and serializes to the store's
//! document form, e.g. `{"price": {"$gt": "100"}}`.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::geo::RadiusQuery;

/// Comparison operators accepted as nested keys in a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonOperator {
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

impl ComparisonOperator {
    /// Get the bare operator token
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOperator::Gt => "gt",
            ComparisonOperator::Gte => "gte",
            ComparisonOperator::Lt => "lt",
            ComparisonOperator::Lte => "lte",
            ComparisonOperator::In => "in",
        }
    }

    /// Get the prefixed form used in store documents
    pub fn store_key(&self) -> &'static str {
        match self {
            ComparisonOperator::Gt => "$gt",
            ComparisonOperator::Gte => "$gte",
            ComparisonOperator::Lt => "$lt",
            ComparisonOperator::Lte => "$lte",
            ComparisonOperator::In => "$in",
        }
    }

    /// Match a whole token against the operator set.
    ///
    /// `gtx` or `Gt` are not operators.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "gt" => Some(ComparisonOperator::Gt),
            "gte" => Some(ComparisonOperator::Gte),
            "lt" => Some(ComparisonOperator::Lt),
            "lte" => Some(ComparisonOperator::Lte),
            "in" => Some(ComparisonOperator::In),
            _ => None,
        }
    }

    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            ComparisonOperator::Gt => ordering == Ordering::Greater,
            ComparisonOperator::Gte => ordering != Ordering::Less,
            ComparisonOperator::Lt => ordering == Ordering::Less,
            ComparisonOperator::Lte => ordering != Ordering::Greater,
            ComparisonOperator::In => ordering == Ordering::Equal,
        }
    }
}

/// A node of the filter tree
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    /// Exact match against a raw query value
    Literal(String),

    /// Operator comparison. `In` carries an array operand, the others a string.
    Comparison(ComparisonOperator, Value),

    /// Nested object; comparison children are keyed by their prefixed form
    Composite(BTreeMap<String, FilterNode>),

    /// Geospatial containment within a spherical cap
    GeoWithin(RadiusQuery),
}

impl FilterNode {
    /// Create a literal node
    pub fn literal(value: impl Into<String>) -> Self {
        FilterNode::Literal(value.into())
    }

    /// Create a comparison node with a single operand
    pub fn compare(operator: ComparisonOperator, value: impl Into<String>) -> Self {
        FilterNode::Comparison(operator, Value::String(value.into()))
    }

    /// Create an "in list" node
    pub fn in_list<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        FilterNode::Comparison(
            ComparisonOperator::In,
            Value::Array(values.into_iter().map(|v| Value::String(v.into())).collect()),
        )
    }

    /// Render the node in store document form
    pub fn to_document(&self) -> Value {
        match self {
            FilterNode::Literal(value) => Value::String(value.clone()),
            FilterNode::Comparison(op, operand) => {
                let mut obj = Map::new();
                obj.insert(op.store_key().to_string(), operand.clone());
                Value::Object(obj)
            }
            FilterNode::Composite(children) => {
                let mut obj = Map::new();
                for (key, child) in children {
                    match child {
                        FilterNode::Comparison(op, operand) => {
                            obj.insert(op.store_key().to_string(), operand.clone());
                        }
                        other => {
                            obj.insert(key.clone(), other.to_document());
                        }
                    }
                }
                Value::Object(obj)
            }
            FilterNode::GeoWithin(radius) => radius.to_document(),
        }
    }

    /// Check whether a document value (absent when `None`) satisfies this node
    pub fn matches(&self, value: Option<&Value>) -> bool {
        match self {
            FilterNode::Literal(expected) => {
                value.map_or(false, |v| any_element(v, &|item| literal_eq(item, expected)))
            }
            FilterNode::Comparison(op, operand) => {
                let Some(value) = value else {
                    return false;
                };
                match (op, operand) {
                    (ComparisonOperator::In, Value::Array(items)) => any_element(value, &|item| {
                        items
                            .iter()
                            .filter_map(Value::as_str)
                            .any(|candidate| literal_eq(item, candidate))
                    }),
                    (_, Value::String(operand)) => any_element(value, &|item| {
                        compare_to_operand(item, operand).map_or(false, |ord| op.accepts(ord))
                    }),
                    _ => false,
                }
            }
            FilterNode::Composite(children) => children.iter().all(|(key, child)| match child {
                FilterNode::Comparison(..) => child.matches(value),
                _ => child.matches(value.and_then(|v| lookup_path(v, key))),
            }),
            FilterNode::GeoWithin(radius) => value
                .and_then(point_of)
                .map_or(false, |(lng, lat)| radius.contains(lng, lat)),
        }
    }
}

/// Conjunction of per-field filter nodes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    fields: BTreeMap<String, FilterNode>,
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Predicate matching a single field exactly
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new().and(field, FilterNode::literal(value))
    }

    /// Add a field constraint, replacing any previous one on that field
    pub fn and(mut self, field: impl Into<String>, node: FilterNode) -> Self {
        self.fields.insert(field.into(), node);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, node: FilterNode) {
        self.fields.insert(field.into(), node);
    }

    pub fn get(&self, field: &str) -> Option<&FilterNode> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FilterNode)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Check if a document matches every field constraint
    pub fn matches(&self, doc: &Value) -> bool {
        self.fields
            .iter()
            .all(|(field, node)| node.matches(lookup_path(doc, field)))
    }

    /// Render in store document form
    pub fn to_document(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_document()))
                .collect(),
        )
    }
}

impl Serialize for Predicate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_document().serialize(serializer)
    }
}

/// Resolve a dot path inside a document.
///
/// An exact key wins over path splitting, so `{"a.b": 1}` still resolves `a.b`.
pub fn lookup_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    if let Some(v) = doc.get(path) {
        return Some(v);
    }
    let mut current = doc;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

/// Array fields match when any element does
fn any_element(value: &Value, test: &dyn Fn(&Value) -> bool) -> bool {
    match value {
        Value::Array(items) => items.iter().any(test),
        other => test(other),
    }
}

/// Equality between a stored value and a raw query string, casting the
/// query string to the stored value's type.
fn literal_eq(value: &Value, raw: &str) -> bool {
    match value {
        Value::String(s) => s == raw,
        Value::Number(n) => match (n.as_f64(), raw.trim().parse::<f64>()) {
            (Some(a), Ok(b)) => a == b,
            _ => false,
        },
        Value::Bool(b) => raw.parse::<bool>().map_or(false, |r| r == *b),
        Value::Null => raw == "null",
        _ => false,
    }
}

fn compare_to_operand(value: &Value, raw: &str) -> Option<Ordering> {
    match value {
        Value::Number(n) => {
            let b = raw.trim().parse::<f64>().ok()?;
            n.as_f64()?.partial_cmp(&b)
        }
        Value::String(s) => Some(s.as_str().cmp(raw)),
        _ => None,
    }
}

/// Extract `(longitude, latitude)` from a GeoJSON point or a bare pair
fn point_of(value: &Value) -> Option<(f64, f64)> {
    let coords = value.get("coordinates").unwrap_or(value).as_array()?;
    match coords.as_slice() {
        [lng, lat, ..] => Some((lng.as_f64()?, lat.as_f64()?)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operator_tokens() {
        assert_eq!(ComparisonOperator::from_token("gte"), Some(ComparisonOperator::Gte));
        assert_eq!(ComparisonOperator::from_token("in"), Some(ComparisonOperator::In));
        assert_eq!(ComparisonOperator::from_token("gtx"), None);
        assert_eq!(ComparisonOperator::from_token("$gt"), None);
        assert_eq!(ComparisonOperator::Lte.store_key(), "$lte");
    }

    #[test]
    fn test_literal_casts_to_stored_type() {
        let node = FilterNode::literal("100");
        assert!(node.matches(Some(&json!(100))));
        assert!(node.matches(Some(&json!(100.0))));
        assert!(node.matches(Some(&json!("100"))));
        assert!(!node.matches(Some(&json!(101))));
        assert!(!node.matches(None));

        assert!(FilterNode::literal("true").matches(Some(&json!(true))));
        assert!(!FilterNode::literal("yes").matches(Some(&json!(true))));
    }

    #[test]
    fn test_literal_matches_any_array_element() {
        let node = FilterNode::literal("Web Development");
        assert!(node.matches(Some(&json!(["Mobile Development", "Web Development"]))));
        assert!(!node.matches(Some(&json!(["Business"]))));
    }

    #[test]
    fn test_numeric_comparison() {
        let gt = FilterNode::compare(ComparisonOperator::Gt, "18");
        assert!(gt.matches(Some(&json!(21))));
        assert!(!gt.matches(Some(&json!(18))));

        let lte = FilterNode::compare(ComparisonOperator::Lte, "18");
        assert!(lte.matches(Some(&json!(18))));
        assert!(!lte.matches(Some(&json!(19))));

        // non-numeric operand against a number never matches
        assert!(!FilterNode::compare(ComparisonOperator::Gt, "x").matches(Some(&json!(5))));
    }

    #[test]
    fn test_string_comparison() {
        let node = FilterNode::compare(ComparisonOperator::Gte, "2024-01-01");
        assert!(node.matches(Some(&json!("2024-06-01T00:00:00Z"))));
        assert!(!node.matches(Some(&json!("2023-12-31T00:00:00Z"))));
    }

    #[test]
    fn test_in_list() {
        let node = FilterNode::in_list(["Business", "UI/UX"]);
        assert!(node.matches(Some(&json!("UI/UX"))));
        assert!(node.matches(Some(&json!(["Web Development", "Business"]))));
        assert!(!node.matches(Some(&json!(["Data Science"]))));
    }

    #[test]
    fn test_composite_range_and_nested_field() {
        let mut children = BTreeMap::new();
        children.insert(
            "$gte".to_string(),
            FilterNode::compare(ComparisonOperator::Gte, "5000"),
        );
        children.insert(
            "$lt".to_string(),
            FilterNode::compare(ComparisonOperator::Lt, "10000"),
        );
        let range = FilterNode::Composite(children);
        assert!(range.matches(Some(&json!(5000))));
        assert!(!range.matches(Some(&json!(10000))));

        let mut nested = BTreeMap::new();
        nested.insert("state".to_string(), FilterNode::literal("MA"));
        let location = FilterNode::Composite(nested);
        assert!(location.matches(Some(&json!({"state": "MA", "city": "Boston"}))));
        assert!(!location.matches(Some(&json!({"state": "VT"}))));
    }

    #[test]
    fn test_predicate_document_form() {
        let mut children = BTreeMap::new();
        children.insert(
            "$gt".to_string(),
            FilterNode::compare(ComparisonOperator::Gt, "18"),
        );
        let predicate = Predicate::new()
            .and("age", FilterNode::Composite(children))
            .and("name", FilterNode::literal("gtx"));

        assert_eq!(
            predicate.to_document(),
            json!({"age": {"$gt": "18"}, "name": "gtx"})
        );
        assert_eq!(serde_json::to_value(&predicate).unwrap(), predicate.to_document());
    }

    #[test]
    fn test_predicate_dot_path() {
        let predicate = Predicate::eq("location.state", "MA");
        assert!(predicate.matches(&json!({"location": {"state": "MA"}})));
        assert!(!predicate.matches(&json!({"location": {"state": "NY"}})));
        assert!(!predicate.matches(&json!({"name": "x"})));
    }

    #[test]
    fn test_empty_predicate_matches_everything() {
        assert!(Predicate::new().matches(&json!({"anything": 1})));
    }

    #[test]
    fn test_geo_within() {
        // Boston, 10 mile radius
        let radius = RadiusQuery::new(42.3601, -71.0589, 10.0);
        let node = FilterNode::GeoWithin(radius);

        let cambridge = json!({"type": "Point", "coordinates": [-71.1097, 42.3736]});
        let new_york = json!({"type": "Point", "coordinates": [-74.0060, 40.7128]});
        assert!(node.matches(Some(&cambridge)));
        assert!(!node.matches(Some(&new_york)));
        assert!(!node.matches(Some(&json!({"type": "Point"}))));
    }
}
