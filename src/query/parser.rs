//! # Query Parameter Translator
//!
//! Turns raw list query parameters into a [`QueryPlan`].
//!
//! - `select=name,price` restricts the returned fields
//! - `sort=-price,name` orders results (`-` = descending)
//! - `page=2&limit=10` selects a page
//! - every other key is a filter; bracket keys nest, and the nested keys
//!   `gt`, `gte`, `lt`, `lte`, `in` become comparisons: `price[lte]=1000`

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use super::errors::{QueryError, QueryResult};
use super::filter::{ComparisonOperator, FilterNode, Predicate};
use super::pagination::{PaginationMetadata, PaginationWindow, DEFAULT_LIMIT, DEFAULT_PAGE};

/// Control keys removed before filter construction
pub const RESERVED_KEYS: [&str; 4] = ["select", "sort", "page", "limit"];

/// Field sorted on when no `sort` is given
pub const DEFAULT_SORT_FIELD: &str = "createdAt";

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SortDirection {
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

/// One sort key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// Fields returned for each matched record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Projection {
    All,
    Fields(Vec<String>),
}

/// Executable plan for a list query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryPlan {
    pub predicate: Predicate,
    pub projection: Projection,
    pub sort: Vec<SortKey>,
    pub page: u64,
    pub limit: u64,
}

impl Default for QueryPlan {
    fn default() -> Self {
        Self {
            predicate: Predicate::new(),
            projection: Projection::All,
            sort: vec![SortKey::desc(DEFAULT_SORT_FIELD)],
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl QueryPlan {
    /// Translate raw query parameters.
    ///
    /// Deterministic and free of I/O. Fails only on filter keys whose
    /// structure cannot be built.
    pub fn translate(params: &HashMap<String, String>) -> QueryResult<Self> {
        let mut filter_base = params.clone();
        let select = filter_base.remove("select");
        let sort = filter_base.remove("sort");
        let page = filter_base.remove("page");
        let limit = filter_base.remove("limit");

        Ok(Self {
            predicate: build_predicate(&filter_base)?,
            projection: select.as_deref().map_or(Projection::All, parse_select),
            sort: sort.as_deref().map(parse_sort).unwrap_or_default(),
            page: parse_positive(page.as_deref(), DEFAULT_PAGE),
            limit: parse_positive(limit.as_deref(), DEFAULT_LIMIT),
        }
        .with_default_sort())
    }

    /// Plan matching `predicate` with default projection, sort and paging
    pub fn with_predicate(predicate: Predicate) -> Self {
        Self {
            predicate,
            ..Default::default()
        }
    }

    /// Plan returning every match in one page, for internal lookups
    pub fn unbounded(predicate: Predicate) -> Self {
        Self {
            predicate,
            limit: u64::MAX,
            ..Default::default()
        }
    }

    /// Offset/limit for the requested page
    pub fn window(&self) -> PaginationWindow {
        PaginationWindow::new(self.page, self.limit)
    }

    /// Page links given the number of records matching the predicate
    pub fn pagination(&self, total: u64) -> PaginationMetadata {
        PaginationMetadata::derive(self.page, self.window(), total)
    }

    fn with_default_sort(mut self) -> Self {
        if self.sort.is_empty() {
            self.sort.push(SortKey::desc(DEFAULT_SORT_FIELD));
        }
        self
    }
}

/// Free-function form of [`QueryPlan::translate`]
pub fn translate(params: &HashMap<String, String>) -> QueryResult<QueryPlan> {
    QueryPlan::translate(params)
}

/// Parse select parameter (comma-separated field list)
fn parse_select(value: &str) -> Projection {
    let fields: Vec<String> = value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if fields.is_empty() {
        Projection::All
    } else {
        Projection::Fields(fields)
    }
}

/// Parse sort parameter (comma-separated, `-` prefix for descending)
fn parse_sort(value: &str) -> Vec<SortKey> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty() && *part != "-")
        .map(|part| match part.strip_prefix('-') {
            Some(field) => SortKey::desc(field),
            None => SortKey::asc(part),
        })
        .collect()
}

/// Parse page/limit; anything but a positive integer yields the default
fn parse_positive(value: Option<&str>, default: u64) -> u64 {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}

/// Intermediate tree built from bracket keys before operator rewrite
#[derive(Debug)]
enum RawNode {
    Value(String),
    Object(BTreeMap<String, RawNode>),
}

fn build_predicate(filter_base: &HashMap<String, String>) -> QueryResult<Predicate> {
    // Sorted so conflicts are reported the same way on every call
    let sorted: BTreeMap<&String, &String> = filter_base.iter().collect();

    let mut roots: BTreeMap<String, RawNode> = BTreeMap::new();
    for (key, value) in sorted {
        let path = split_key(key)?;
        insert_raw(&mut roots, &path, key, value)?;
    }

    let mut predicate = Predicate::new();
    for (field, raw) in roots {
        let node = rewrite(&field, raw)?;
        predicate.insert(field, node);
    }
    Ok(predicate)
}

/// Split `a[b][c]` into `["a", "b", "c"]`
fn split_key(key: &str) -> QueryResult<Vec<String>> {
    let invalid = |reason: &str| QueryError::InvalidQuery(format!("filter key `{}`: {}", key, reason));

    let (base, mut rest) = match key.find('[') {
        Some(pos) => (&key[..pos], &key[pos..]),
        None => (key, ""),
    };
    if base.is_empty() {
        return Err(invalid("missing field name"));
    }
    if base.contains(']') {
        return Err(invalid("unbalanced brackets"));
    }

    let mut path = vec![base.to_string()];
    while !rest.is_empty() {
        let inner = rest
            .strip_prefix('[')
            .ok_or_else(|| invalid("unexpected text after `]`"))?;
        let close = inner
            .find(']')
            .ok_or_else(|| invalid("unbalanced brackets"))?;
        let segment = &inner[..close];
        if segment.is_empty() {
            return Err(invalid("empty segment"));
        }
        if segment.contains('[') {
            return Err(invalid("unbalanced brackets"));
        }
        path.push(segment.to_string());
        rest = &inner[close + 1..];
    }

    // Store operators are only ever produced by the rewrite
    if path.iter().any(|segment| segment.starts_with('$')) {
        return Err(invalid("segments must not start with `$`"));
    }
    Ok(path)
}

fn insert_raw(
    level: &mut BTreeMap<String, RawNode>,
    path: &[String],
    key: &str,
    value: &str,
) -> QueryResult<()> {
    let conflict = || {
        QueryError::InvalidQuery(format!(
            "filter key `{}` conflicts with another filter on the same field",
            key
        ))
    };

    let (head, tail) = match path.split_first() {
        Some(split) => split,
        None => return Ok(()),
    };

    if tail.is_empty() {
        if level.contains_key(head) {
            return Err(conflict());
        }
        level.insert(head.clone(), RawNode::Value(value.to_string()));
        return Ok(());
    }

    match level
        .entry(head.clone())
        .or_insert_with(|| RawNode::Object(BTreeMap::new()))
    {
        RawNode::Object(children) => insert_raw(children, tail, key, value),
        RawNode::Value(_) => Err(conflict()),
    }
}

/// Turn a raw node into a filter node, rewriting operator keys
fn rewrite(field: &str, raw: RawNode) -> QueryResult<FilterNode> {
    match raw {
        RawNode::Value(value) => Ok(FilterNode::Literal(value)),
        RawNode::Object(children) => {
            let mut out = BTreeMap::new();
            for (key, child) in children {
                match ComparisonOperator::from_token(&key) {
                    Some(op) => {
                        let RawNode::Value(value) = child else {
                            return Err(QueryError::InvalidQuery(format!(
                                "operator `{}` on `{}` expects a value",
                                key, field
                            )));
                        };
                        out.insert(op.store_key().to_string(), comparison(op, value));
                    }
                    None => {
                        let node = rewrite(&format!("{}.{}", field, key), child)?;
                        out.insert(key, node);
                    }
                }
            }
            Ok(FilterNode::Composite(out))
        }
    }
}

fn comparison(op: ComparisonOperator, value: String) -> FilterNode {
    match op {
        ComparisonOperator::In => FilterNode::in_list(
            value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        ),
        _ => FilterNode::Comparison(op, serde_json::Value::String(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_select() {
        assert_eq!(
            parse_select("name, description"),
            Projection::Fields(vec!["name".to_string(), "description".to_string()])
        );
        assert_eq!(parse_select(" , "), Projection::All);
    }

    #[test]
    fn test_parse_sort() {
        let keys = parse_sort("-averageCost,name");
        assert_eq!(keys, vec![SortKey::desc("averageCost"), SortKey::asc("name")]);
        assert!(parse_sort(",, -").is_empty());
    }

    #[test]
    fn test_parse_positive() {
        assert_eq!(parse_positive(Some("3"), 1), 3);
        assert_eq!(parse_positive(Some("0"), 1), 1);
        assert_eq!(parse_positive(Some("-2"), 25), 25);
        assert_eq!(parse_positive(Some("ten"), 25), 25);
        assert_eq!(parse_positive(None, 25), 25);
    }

    #[test]
    fn test_split_key() {
        assert_eq!(split_key("price").unwrap(), vec!["price"]);
        assert_eq!(split_key("price[gt]").unwrap(), vec!["price", "gt"]);
        assert_eq!(
            split_key("location[zipcode][in]").unwrap(),
            vec!["location", "zipcode", "in"]
        );
        assert_eq!(split_key("location.state").unwrap(), vec!["location.state"]);

        for bad in [
            "[gt]",
            "price[gt",
            "price[]",
            "price[gt]x",
            "price]",
            "price[a[b]]",
            "price[$ne]",
            "$where",
            "location[$near][x]",
        ] {
            assert!(
                matches!(split_key(bad), Err(QueryError::InvalidQuery(_))),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_dollar_keys_rejected() {
        let err = QueryPlan::translate(&params(&[("price[$ne]", "x")])).unwrap_err();
        assert!(matches!(err, QueryError::InvalidQuery(_)));

        // Must not collapse onto the rewritten `$gt` of the same field
        let err = QueryPlan::translate(&params(&[("price[gt]", "5"), ("price[$gt]", "9")]))
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidQuery(_)));

        assert!(QueryPlan::translate(&params(&[("$or", "1")])).is_err());
    }

    #[test]
    fn test_defaults() {
        let plan = QueryPlan::translate(&HashMap::new()).unwrap();
        assert!(plan.predicate.is_empty());
        assert_eq!(plan.projection, Projection::All);
        assert_eq!(plan.sort, vec![SortKey::desc("createdAt")]);
        assert_eq!(plan.page, 1);
        assert_eq!(plan.limit, 25);
        assert_eq!(plan.window(), PaginationWindow { offset: 0, limit: 25 });
    }

    #[test]
    fn test_operator_rewrite() {
        let plan = QueryPlan::translate(&params(&[("age[gt]", "18")])).unwrap();
        assert_eq!(plan.predicate.to_document(), json!({"age": {"$gt": "18"}}));
    }

    #[test]
    fn test_non_operator_keys_untouched() {
        let plan = QueryPlan::translate(&params(&[
            ("gtx", "1"),
            ("in", "2"),
            ("meta[gtx]", "3"),
            ("title", "lte"),
        ]))
        .unwrap();
        assert_eq!(
            plan.predicate.to_document(),
            json!({"gtx": "1", "in": "2", "meta": {"gtx": "3"}, "title": "lte"})
        );
    }

    #[test]
    fn test_in_operand_is_a_list() {
        let plan = QueryPlan::translate(&params(&[("careers[in]", "Business, UI/UX")])).unwrap();
        assert_eq!(
            plan.predicate.to_document(),
            json!({"careers": {"$in": ["Business", "UI/UX"]}})
        );
    }

    #[test]
    fn test_range_on_one_field() {
        let plan = QueryPlan::translate(&params(&[
            ("averageCost[gte]", "5000"),
            ("averageCost[lt]", "10000"),
        ]))
        .unwrap();
        assert_eq!(
            plan.predicate.to_document(),
            json!({"averageCost": {"$gte": "5000", "$lt": "10000"}})
        );
    }

    #[test]
    fn test_nested_operator() {
        let plan =
            QueryPlan::translate(&params(&[("location[zipcode][gte]", "02000")])).unwrap();
        assert_eq!(
            plan.predicate.to_document(),
            json!({"location": {"zipcode": {"$gte": "02000"}}})
        );
    }

    #[test]
    fn test_reserved_keys_never_filter() {
        let plan = QueryPlan::translate(&params(&[
            ("select", "name"),
            ("sort", "name"),
            ("page", "2"),
            ("limit", "5"),
            ("housing", "true"),
        ]))
        .unwrap();
        assert_eq!(plan.predicate.len(), 1);
        for key in RESERVED_KEYS {
            assert!(plan.predicate.get(key).is_none());
        }
    }

    #[test]
    fn test_conflicting_structure_rejected() {
        let result = QueryPlan::translate(&params(&[("price", "100"), ("price[gt]", "5")]));
        assert!(matches!(result, Err(QueryError::InvalidQuery(_))));

        let result = QueryPlan::translate(&params(&[("price[gt][x]", "5")]));
        assert!(matches!(result, Err(QueryError::InvalidQuery(_))));
    }

    #[test]
    fn test_translation_is_deterministic() {
        let input = params(&[
            ("averageCost[lte]", "10000"),
            ("careers[in]", "Business"),
            ("select", "name"),
            ("sort", "-name"),
        ]);
        let first = QueryPlan::translate(&input).unwrap();
        for _ in 0..20 {
            assert_eq!(QueryPlan::translate(&input).unwrap(), first);
        }
    }

    #[test]
    fn test_plan_serializes() {
        let plan = QueryPlan::translate(&params(&[("select", "name"), ("sort", "-name")])).unwrap();
        let value = serde_json::to_value(&plan).unwrap();
        assert_eq!(value["projection"], json!({"fields": ["name"]}));
        assert_eq!(value["sort"], json!([{"field": "name", "direction": "desc"}]));
        assert_eq!(value["predicate"], json!({}));
    }
}
