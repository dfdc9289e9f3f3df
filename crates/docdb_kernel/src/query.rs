//! Predicate language for document queries
//!
//! Predicates are built from `Field` comparisons and combined with `and`,
//! `or` and `!`. A predicate can be rendered to a parameterized SQL query for
//! the document database, or evaluated directly against a JSON document.
//!
//! Evaluation follows the store's three-valued logic: comparing a missing
//! field, or values of different JSON types, is *undefined*, and a document
//! only matches when the whole predicate is `true`.
//!
//! ```rust
//! use docdb_kernel::{Field, SqlQuerySpec};
//!
//! let predicate = Field::new("x").eq(1).and(Field::new("owner.region").ne("us"));
//! let spec = SqlQuerySpec::select_where(&predicate);
//!
//! assert_eq!(
//!     spec.query,
//!     r#"SELECT * FROM root r WHERE (r["x"] = @p0 AND r["owner"]["region"] != @p1)"#
//! );
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::ops::Not;

/// Comparison operators supported in predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }

    fn holds(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
        }
    }
}

/// A (possibly nested) field of a document, written with dots: `owner.region`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    segments: Vec<String>,
}

impl Field {
    pub fn new(path: &str) -> Self {
        Self {
            segments: path.split('.').map(str::to_string).collect(),
        }
    }

    /// Renders the field as a property access on the query alias `r`
    fn sql(&self) -> String {
        self.segments.iter().fold(String::from("r"), |mut acc, segment| {
            acc.push('[');
            acc.push_str(&Value::String(segment.clone()).to_string());
            acc.push(']');
            acc
        })
    }

    fn resolve<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(document, |value, segment| value.get(segment))
    }

    pub fn eq(self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Eq, value)
    }

    pub fn ne(self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Ne, value)
    }

    pub fn lt(self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Lt, value)
    }

    pub fn le(self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Le, value)
    }

    pub fn gt(self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Gt, value)
    }

    pub fn ge(self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Ge, value)
    }

    pub fn compare(self, op: CompareOp, value: impl Into<Value>) -> Predicate {
        Predicate::Compare {
            field: self,
            op,
            value: value.into(),
        }
    }

    /// Substring match on a string field
    pub fn contains(self, value: impl Into<String>) -> Predicate {
        Predicate::Contains {
            field: self,
            value: value.into(),
        }
    }

    /// Prefix match on a string field
    pub fn starts_with(self, value: impl Into<String>) -> Predicate {
        Predicate::StartsWith {
            field: self,
            value: value.into(),
        }
    }

    /// Matches documents that carry this field at all
    pub fn is_defined(self) -> Predicate {
        Predicate::IsDefined(self)
    }

    /// Matches when the field equals any of `values`
    pub fn in_values<I, V>(self, values: I) -> Predicate
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Predicate::In {
            field: self,
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// A boolean condition over document fields
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every document
    All,
    Compare {
        field: Field,
        op: CompareOp,
        value: Value,
    },
    Contains {
        field: Field,
        value: String,
    },
    StartsWith {
        field: Field,
        value: String,
    },
    IsDefined(Field),
    In {
        field: Field,
        values: Vec<Value>,
    },
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    /// A predicate that matches every document
    pub fn all() -> Self {
        Predicate::All
    }

    pub fn and(self, other: Predicate) -> Self {
        Predicate::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Predicate) -> Self {
        Predicate::Or(Box::new(self), Box::new(other))
    }

    /// Returns true when `document` satisfies the predicate
    pub fn matches(&self, document: &Value) -> bool {
        self.evaluate(document) == Some(true)
    }

    /// Three-valued evaluation; `None` is the store's *undefined*
    fn evaluate(&self, document: &Value) -> Option<bool> {
        match self {
            Predicate::All => Some(true),
            Predicate::Compare { field, op, value } => {
                let actual = field.resolve(document)?;
                compare_values(actual, value).map(|ordering| op.holds(ordering))
            }
            Predicate::Contains { field, value } => field
                .resolve(document)?
                .as_str()
                .map(|actual| actual.contains(value.as_str())),
            Predicate::StartsWith { field, value } => field
                .resolve(document)?
                .as_str()
                .map(|actual| actual.starts_with(value.as_str())),
            Predicate::IsDefined(field) => Some(field.resolve(document).is_some()),
            Predicate::In { values, .. } if values.is_empty() => Some(false),
            Predicate::In { field, values } => {
                let actual = field.resolve(document)?;
                // Same folding as a chain of `OR`ed equality comparisons
                values.iter().fold(Some(false), |acc, candidate| {
                    let equal = compare_values(actual, candidate)
                        .map(|ordering| ordering == Ordering::Equal);
                    match (acc, equal) {
                        (Some(true), _) | (_, Some(true)) => Some(true),
                        (Some(false), Some(false)) => Some(false),
                        _ => None,
                    }
                })
            }
            Predicate::And(left, right) => {
                match (left.evaluate(document), right.evaluate(document)) {
                    (Some(false), _) | (_, Some(false)) => Some(false),
                    (Some(true), Some(true)) => Some(true),
                    _ => None,
                }
            }
            Predicate::Or(left, right) => {
                match (left.evaluate(document), right.evaluate(document)) {
                    (Some(true), _) | (_, Some(true)) => Some(true),
                    (Some(false), Some(false)) => Some(false),
                    _ => None,
                }
            }
            Predicate::Not(inner) => inner.evaluate(document).map(|b| !b),
        }
    }

    fn render(&self, parameters: &mut Vec<SqlParameter>) -> String {
        match self {
            Predicate::All => "true".to_string(),
            Predicate::Compare { field, op, value } => format!(
                "{} {} {}",
                field.sql(),
                op.sql(),
                bind(parameters, value.clone())
            ),
            Predicate::Contains { field, value } => format!(
                "CONTAINS({}, {})",
                field.sql(),
                bind(parameters, Value::String(value.clone()))
            ),
            Predicate::StartsWith { field, value } => format!(
                "STARTSWITH({}, {})",
                field.sql(),
                bind(parameters, Value::String(value.clone()))
            ),
            Predicate::IsDefined(field) => format!("IS_DEFINED({})", field.sql()),
            Predicate::In { values, .. } if values.is_empty() => "false".to_string(),
            Predicate::In { field, values } => {
                let names: Vec<String> = values
                    .iter()
                    .map(|value| bind(parameters, value.clone()))
                    .collect();
                format!("{} IN ({})", field.sql(), names.join(", "))
            }
            Predicate::And(left, right) => {
                let left = left.render(parameters);
                let right = right.render(parameters);
                format!("({} AND {})", left, right)
            }
            Predicate::Or(left, right) => {
                let left = left.render(parameters);
                let right = right.render(parameters);
                format!("({} OR {})", left, right)
            }
            Predicate::Not(inner) => format!("(NOT {})", inner.render(parameters)),
        }
    }
}

impl Not for Predicate {
    type Output = Predicate;

    fn not(self) -> Self::Output {
        Predicate::Not(Box::new(self))
    }
}

fn bind(parameters: &mut Vec<SqlParameter>, value: Value) -> String {
    let name = format!("@p{}", parameters.len());
    parameters.push(SqlParameter {
        name: name.clone(),
        value,
    });
    name
}

/// Orders two JSON values the way the store does; `None` when the types differ
fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            if left == right {
                Some(Ordering::Equal)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// A named query parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlParameter {
    pub name: String,
    pub value: Value,
}

/// A parameterized SQL query as sent to the document database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlQuerySpec {
    pub query: String,
    pub parameters: Vec<SqlParameter>,
}

impl SqlQuerySpec {
    /// Builds `SELECT * FROM root r WHERE <predicate>`
    pub fn select_where(predicate: &Predicate) -> Self {
        let mut parameters = Vec::new();
        let clause = predicate.render(&mut parameters);
        Self {
            query: format!("SELECT * FROM root r WHERE {}", clause),
            parameters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_render_single_comparison() {
        let spec = SqlQuerySpec::select_where(&Field::new("x").eq(1));

        assert_eq!(spec.query, r#"SELECT * FROM root r WHERE r["x"] = @p0"#);
        assert_eq!(spec.parameters.len(), 1);
        assert_eq!(spec.parameters[0].name, "@p0");
        assert_eq!(spec.parameters[0].value, json!(1));
    }

    #[test]
    fn test_render_functions_and_negation() {
        let predicate = (!Field::new("name").starts_with("wid"))
            .or(Field::new("tags").is_defined())
            .or(Field::new("name").contains("get"));
        let spec = SqlQuerySpec::select_where(&predicate);

        assert_eq!(
            spec.query,
            r#"SELECT * FROM root r WHERE (((NOT STARTSWITH(r["name"], @p0)) OR IS_DEFINED(r["tags"])) OR CONTAINS(r["name"], @p1))"#
        );
        assert_eq!(spec.parameters[1].value, json!("get"));
    }

    #[test]
    fn test_render_in_list() {
        let spec = SqlQuerySpec::select_where(&Field::new("category").in_values(["a", "b"]));
        assert_eq!(spec.query, r#"SELECT * FROM root r WHERE r["category"] IN (@p0, @p1)"#);

        let empty = SqlQuerySpec::select_where(&Field::new("category").in_values(Vec::<String>::new()));
        assert_eq!(empty.query, "SELECT * FROM root r WHERE false");
        assert!(empty.parameters.is_empty());
    }

    #[test]
    fn test_field_names_are_escaped() {
        let spec = SqlQuerySpec::select_where(&Field::new(r#"we"ird"#).eq(true));
        assert_eq!(spec.query, r#"SELECT * FROM root r WHERE r["we\"ird"] = @p0"#);
    }

    #[test]
    fn test_matches_nested_field() {
        let document = json!({ "owner": { "region": "eu" }, "x": 1 });

        assert!(Field::new("owner.region").eq("eu").matches(&document));
        assert!(!Field::new("owner.region").eq("us").matches(&document));
        assert!(Field::new("x").eq(1.0).matches(&document));
    }

    #[test]
    fn test_undefined_never_matches() {
        let document = json!({ "x": "1" });

        // Type mismatch is undefined, and so is its negation
        assert!(!Field::new("x").eq(1).matches(&document));
        assert!(!(!Field::new("x").eq(1)).matches(&document));
        assert!(!Field::new("missing").ne(1).matches(&document));

        // Undefined OR true is true
        assert!(Field::new("missing").eq(1).or(Field::new("x").eq("1")).matches(&document));
        // Undefined AND false is false, so its negation matches
        assert!((!Field::new("missing").eq(1).and(Field::new("x").eq("2"))).matches(&document));
    }

    #[test]
    fn test_in_list_evaluates_like_or_chain() {
        let x = Field::new("x");
        let in_list = x.clone().in_values([json!("a"), json!(1)]);
        let or_chain = x.clone().eq("a").or(x.eq(1));

        for document in [json!({ "x": "a" }), json!({ "x": 1 }), json!({ "x": "b" }), json!({})] {
            assert_eq!(in_list.matches(&document), or_chain.matches(&document));
            assert_eq!(
                (!in_list.clone()).matches(&document),
                (!or_chain.clone()).matches(&document),
                "negation disagrees on {}",
                document
            );
        }

        // A mismatched candidate leaves the negation undefined
        assert!(!(!in_list).matches(&json!({ "x": "b" })));
        assert!((!Field::new("x").in_values(["a", "c"])).matches(&json!({ "x": "b" })));
    }

    #[test]
    fn test_negated_empty_in_list_matches_everything() {
        let predicate = !Field::new("missing").in_values(Vec::<i64>::new());

        assert_eq!(
            SqlQuerySpec::select_where(&predicate).query,
            "SELECT * FROM root r WHERE (NOT false)"
        );
        assert!(predicate.matches(&json!({})));
        assert!(predicate.matches(&json!({ "missing": 1 })));
        assert!(!Field::new("missing").in_values(Vec::<i64>::new()).matches(&json!({ "missing": 1 })));
    }

    #[test]
    fn test_all_matches_everything() {
        assert!(Predicate::all().matches(&json!({})));
        assert_eq!(
            SqlQuerySpec::select_where(&Predicate::all()).query,
            "SELECT * FROM root r WHERE true"
        );
    }

    proptest! {
        #[test]
        fn prop_numeric_comparisons_agree_with_rust(x in -1000i64..1000, threshold in -1000i64..1000) {
            let document = json!({ "x": x });

            prop_assert_eq!(Field::new("x").gt(threshold).matches(&document), x > threshold);
            prop_assert_eq!(Field::new("x").le(threshold).matches(&document), x <= threshold);
            prop_assert_eq!(Field::new("x").ne(threshold).matches(&document), x != threshold);
        }

        #[test]
        fn prop_negation_flips_defined_comparisons(x in any::<i32>(), threshold in any::<i32>()) {
            let document = json!({ "x": x });
            let predicate = Field::new("x").lt(threshold);

            prop_assert_ne!(predicate.matches(&document), (!predicate).matches(&document));
        }

        #[test]
        fn prop_in_list_agrees_with_or_chain(
            x in prop_oneof![(-3i64..3).prop_map(Value::from), "[ab]".prop_map(Value::from)],
            candidates in proptest::collection::vec(
                prop_oneof![(-3i64..3).prop_map(Value::from), "[ab]".prop_map(Value::from)],
                1..5,
            ),
        ) {
            let document = json!({ "x": x });
            let in_list = Field::new("x").in_values(candidates.clone());
            let or_chain = candidates
                .into_iter()
                .map(|candidate| Field::new("x").eq(candidate))
                .reduce(Predicate::or)
                .unwrap();

            prop_assert_eq!(in_list.matches(&document), or_chain.matches(&document));
            prop_assert_eq!((!in_list).matches(&document), (!or_chain).matches(&document));
        }

        #[test]
        fn prop_one_parameter_per_bound_value(values in proptest::collection::vec(any::<i64>(), 1..8)) {
            let predicate = values
                .iter()
                .map(|v| Field::new("x").eq(*v))
                .reduce(Predicate::or)
                .unwrap();
            let spec = SqlQuerySpec::select_where(&predicate);

            prop_assert_eq!(spec.parameters.len(), values.len());
            for (index, parameter) in spec.parameters.iter().enumerate() {
                let expected_name = format!("@p{}", index);
                prop_assert_eq!(&parameter.name, &expected_name);
                prop_assert!(spec.query.contains(parameter.name.as_str()));
            }
        }
    }
}
