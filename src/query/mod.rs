// src/query/mod.rs
//! Filter, sort, and pagination construction for database queries.
//!
//! Filters are built as an expression tree and validated against the
//! target schema before anything touches the network: unknown property
//! names and operator/type mismatches fail locally, naming the offending
//! leaf. The service's filter grammar has no negation node, so `Not` is
//! compiled away by pushing negation down to the operators.

use crate::api::RequestEnvelope;
use crate::constants::NOTION_API_PAGE_SIZE;
use crate::error::ClientError;
use crate::types::{NotionId, PropertyKind, RecordSchema};
use serde_json::{json, Value};
use std::fmt;

/// Comparison operand for a filter leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Text(String),
    Number(f64),
    Bool(bool),
    /// For `is_empty` / `is_not_empty`, which take no operand.
    None,
}

impl Operand {
    fn to_json(&self) -> Value {
        match self {
            Operand::Text(s) => json!(s),
            Operand::Number(n) => json!(n),
            Operand::Bool(b) => json!(b),
            Operand::None => json!(true),
        }
    }
}

/// Comparison operators for filter leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Equals,
    DoesNotEqual,
    Contains,
    DoesNotContain,
    StartsWith,
    EndsWith,
    GreaterThan,
    GreaterThanOrEqualTo,
    LessThan,
    LessThanOrEqualTo,
    Before,
    After,
    OnOrBefore,
    OnOrAfter,
    IsEmpty,
    IsNotEmpty,
}

impl FilterOperator {
    /// The service's condition key for this operator.
    pub fn as_remote(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::DoesNotEqual => "does_not_equal",
            Self::Contains => "contains",
            Self::DoesNotContain => "does_not_contain",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::GreaterThan => "greater_than",
            Self::GreaterThanOrEqualTo => "greater_than_or_equal_to",
            Self::LessThan => "less_than",
            Self::LessThanOrEqualTo => "less_than_or_equal_to",
            Self::Before => "before",
            Self::After => "after",
            Self::OnOrBefore => "on_or_before",
            Self::OnOrAfter => "on_or_after",
            Self::IsEmpty => "is_empty",
            Self::IsNotEmpty => "is_not_empty",
        }
    }

    /// Operator/type compatibility matrix.
    ///
    /// Substring operators apply to text-shaped kinds, containment to
    /// multi-valued kinds, ordering to numbers and dates. Computed kinds
    /// are not queryable through this builder.
    pub fn supports(&self, kind: PropertyKind) -> bool {
        use PropertyKind::*;

        if kind.is_computed() {
            return false;
        }

        match self {
            Self::Equals | Self::DoesNotEqual => !matches!(kind, Files),
            Self::Contains | Self::DoesNotContain => matches!(
                kind,
                Title | RichText | MultiSelect | People | Relation | Url | Email | PhoneNumber
            ),
            Self::StartsWith | Self::EndsWith => {
                matches!(kind, Title | RichText | Url | Email | PhoneNumber)
            }
            Self::GreaterThan
            | Self::GreaterThanOrEqualTo
            | Self::LessThan
            | Self::LessThanOrEqualTo => matches!(kind, Number | Date),
            Self::Before | Self::After | Self::OnOrBefore | Self::OnOrAfter => {
                matches!(kind, Date)
            }
            Self::IsEmpty | Self::IsNotEmpty => !matches!(kind, Checkbox),
        }
    }

    /// The operator expressing the negation of this one, if the grammar
    /// has it. `starts_with`/`ends_with` have no complement.
    fn negated(&self) -> Option<Self> {
        Some(match self {
            Self::Equals => Self::DoesNotEqual,
            Self::DoesNotEqual => Self::Equals,
            Self::Contains => Self::DoesNotContain,
            Self::DoesNotContain => Self::Contains,
            Self::GreaterThan => Self::LessThanOrEqualTo,
            Self::GreaterThanOrEqualTo => Self::LessThan,
            Self::LessThan => Self::GreaterThanOrEqualTo,
            Self::LessThanOrEqualTo => Self::GreaterThan,
            Self::Before => Self::OnOrAfter,
            Self::After => Self::OnOrBefore,
            Self::OnOrBefore => Self::After,
            Self::OnOrAfter => Self::Before,
            Self::IsEmpty => Self::IsNotEmpty,
            Self::IsNotEmpty => Self::IsEmpty,
            Self::StartsWith | Self::EndsWith => return None,
        })
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_remote())
    }
}

/// A boolean tree of filter conditions.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpression {
    Leaf {
        property: String,
        operator: FilterOperator,
        operand: Operand,
    },
    And(Vec<FilterExpression>),
    Or(Vec<FilterExpression>),
    Not(Box<FilterExpression>),
}

impl FilterExpression {
    /// A single comparison condition.
    pub fn leaf(
        property: impl Into<String>,
        operator: FilterOperator,
        operand: Operand,
    ) -> Self {
        Self::Leaf {
            property: property.into(),
            operator,
            operand,
        }
    }

    pub fn and(children: Vec<FilterExpression>) -> Self {
        Self::And(children)
    }

    pub fn or(children: Vec<FilterExpression>) -> Self {
        Self::Or(children)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(child: FilterExpression) -> Self {
        Self::Not(Box::new(child))
    }

    /// Validate every leaf against the schema: the property must exist
    /// (case-sensitive) and the operator must fit its declared kind.
    /// Runs before compilation, so no invalid filter ever reaches the
    /// network.
    pub fn validate(&self, schema: &RecordSchema) -> Result<(), ClientError> {
        match self {
            Self::Leaf {
                property, operator, ..
            } => {
                let spec = schema.get(property).ok_or_else(|| {
                    ClientError::validation(format!(
                        "filter references unknown property '{}'",
                        property
                    ))
                })?;
                if !operator.supports(spec.kind) {
                    return Err(ClientError::validation(format!(
                        "operator '{}' cannot be applied to property '{}' of type {}",
                        operator, property, spec.kind
                    )));
                }
                Ok(())
            }
            Self::And(children) | Self::Or(children) => {
                for child in children {
                    child.validate(schema)?;
                }
                Ok(())
            }
            Self::Not(child) => child.validate(schema),
        }
    }

    /// Compile to the service's filter JSON, validating first.
    ///
    /// Negation is pushed down: `Not(Leaf)` flips the operator,
    /// `Not(And/Or)` applies De Morgan, `Not(Not(x))` cancels. A leaf
    /// under negation whose operator has no complement is rejected.
    pub fn to_remote(&self, schema: &RecordSchema) -> Result<Value, ClientError> {
        self.validate(schema)?;
        self.compile(schema, false)
    }

    fn compile(&self, schema: &RecordSchema, negate: bool) -> Result<Value, ClientError> {
        match self {
            Self::Leaf {
                property,
                operator,
                operand,
            } => {
                let operator = if negate {
                    operator.negated().ok_or_else(|| {
                        ClientError::validation(format!(
                            "operator '{}' on property '{}' cannot be negated",
                            operator, property
                        ))
                    })?
                } else {
                    *operator
                };

                // validate() ran before compile, so the property exists.
                let spec = schema.get(property).expect("validated leaf");
                Ok(json!({
                    "property": property,
                    (spec.kind.as_remote()): { (operator.as_remote()): operand.to_json() }
                }))
            }
            Self::And(children) => {
                let compiled = children
                    .iter()
                    .map(|c| c.compile(schema, negate))
                    .collect::<Result<Vec<_>, _>>()?;
                // ¬(a ∧ b) = ¬a ∨ ¬b
                let key = if negate { "or" } else { "and" };
                Ok(json!({ (key): compiled }))
            }
            Self::Or(children) => {
                let compiled = children
                    .iter()
                    .map(|c| c.compile(schema, negate))
                    .collect::<Result<Vec<_>, _>>()?;
                let key = if negate { "and" } else { "or" };
                Ok(json!({ (key): compiled }))
            }
            Self::Not(child) => child.compile(schema, !negate),
        }
    }
}

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_remote(&self) -> &'static str {
        match self {
            Self::Ascending => "ascending",
            Self::Descending => "descending",
        }
    }
}

/// What a sort orders by: a schema property or one of the two intrinsic
/// timestamps every record carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKey {
    Property(String),
    CreatedTime,
    LastEditedTime,
}

/// One sort criterion. When two records tie, their relative order is
/// whatever the service returns — no implicit secondary tiebreak.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Sort {
    pub fn by_property(name: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            key: SortKey::Property(name.into()),
            direction,
        }
    }

    pub fn by_created_time(direction: SortDirection) -> Self {
        Self {
            key: SortKey::CreatedTime,
            direction,
        }
    }

    pub fn by_last_edited_time(direction: SortDirection) -> Self {
        Self {
            key: SortKey::LastEditedTime,
            direction,
        }
    }

    fn validate(&self, schema: &RecordSchema) -> Result<(), ClientError> {
        if let SortKey::Property(name) = &self.key {
            if !schema.contains(name) {
                return Err(ClientError::validation(format!(
                    "sort references unknown property '{}'",
                    name
                )));
            }
        }
        Ok(())
    }

    fn to_remote(&self) -> Value {
        match &self.key {
            SortKey::Property(name) => json!({
                "property": name,
                "direction": self.direction.as_remote()
            }),
            SortKey::CreatedTime => json!({
                "timestamp": "created_time",
                "direction": self.direction.as_remote()
            }),
            SortKey::LastEditedTime => json!({
                "timestamp": "last_edited_time",
                "direction": self.direction.as_remote()
            }),
        }
    }
}

/// Build the request envelope for one page of a database query.
///
/// Validation happens here, synchronously: an invalid filter or sort never
/// produces an envelope, so the transport is never invoked for it.
pub fn build_query(
    database_id: &NotionId,
    schema: &RecordSchema,
    filter: Option<&FilterExpression>,
    sorts: &[Sort],
    cursor: Option<&str>,
    page_size: Option<u32>,
) -> Result<RequestEnvelope, ClientError> {
    let mut body = serde_json::Map::new();

    if let Some(filter) = filter {
        body.insert("filter".to_string(), filter.to_remote(schema)?);
    }

    if !sorts.is_empty() {
        for sort in sorts {
            sort.validate(schema)?;
        }
        let compiled: Vec<Value> = sorts.iter().map(Sort::to_remote).collect();
        body.insert("sorts".to_string(), Value::Array(compiled));
    }

    if let Some(token) = cursor {
        body.insert("start_cursor".to_string(), json!(token));
    }

    let page_size = page_size
        .unwrap_or(NOTION_API_PAGE_SIZE)
        .clamp(1, NOTION_API_PAGE_SIZE);
    body.insert("page_size".to_string(), json!(page_size));

    Ok(RequestEnvelope::post(
        format!("databases/{}/query", database_id.to_hyphenated()),
        Value::Object(body),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn schema() -> RecordSchema {
        RecordSchema::new()
            .with("Name", PropertyKind::Title)
            .with("Score", PropertyKind::Number)
            .with("Due", PropertyKind::Date)
            .with_options(
                "Tags",
                PropertyKind::MultiSelect,
                vec!["anime".to_string(), "thesis".to_string()],
            )
            .with("Done", PropertyKind::Checkbox)
            .with("Total", PropertyKind::Formula)
    }

    #[test]
    fn unknown_property_is_rejected_before_compilation() {
        let filter = FilterExpression::leaf(
            "Nope",
            FilterOperator::Equals,
            Operand::Text("x".into()),
        );
        let err = filter.to_remote(&schema()).unwrap_err();
        assert!(err.to_string().contains("Nope"));
    }

    #[test]
    fn operator_type_mismatch_names_the_leaf() {
        let filter = FilterExpression::leaf(
            "Score",
            FilterOperator::Contains,
            Operand::Text("5".into()),
        );
        let err = filter.to_remote(&schema()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("contains"));
        assert!(message.contains("Score"));
    }

    #[test]
    fn computed_properties_are_not_queryable() {
        let filter = FilterExpression::leaf(
            "Total",
            FilterOperator::Equals,
            Operand::Number(1.0),
        );
        assert!(filter.to_remote(&schema()).is_err());
    }

    #[test]
    fn leaf_compiles_to_typed_condition() {
        let filter = FilterExpression::leaf(
            "Score",
            FilterOperator::GreaterThan,
            Operand::Number(90.0),
        );
        let compiled = filter.to_remote(&schema()).unwrap();
        assert_eq!(
            compiled,
            json!({ "property": "Score", "number": { "greater_than": 90.0 } })
        );
    }

    #[test]
    fn negation_is_pushed_down_with_de_morgan() {
        let filter = FilterExpression::not(FilterExpression::and(vec![
            FilterExpression::leaf("Done", FilterOperator::Equals, Operand::Bool(true)),
            FilterExpression::leaf(
                "Tags",
                FilterOperator::Contains,
                Operand::Text("anime".into()),
            ),
        ]));

        let compiled = filter.to_remote(&schema()).unwrap();
        assert_eq!(
            compiled,
            json!({ "or": [
                { "property": "Done", "checkbox": { "does_not_equal": true } },
                { "property": "Tags", "multi_select": { "does_not_contain": "anime" } }
            ]})
        );
    }

    #[test]
    fn double_negation_cancels() {
        let inner = FilterExpression::leaf(
            "Name",
            FilterOperator::StartsWith,
            Operand::Text("Dr.".into()),
        );
        let filter = FilterExpression::not(FilterExpression::not(inner.clone()));
        assert_eq!(
            filter.to_remote(&schema()).unwrap(),
            inner.to_remote(&schema()).unwrap()
        );
    }

    #[test]
    fn unnegatable_operator_under_not_is_rejected() {
        let filter = FilterExpression::not(FilterExpression::leaf(
            "Name",
            FilterOperator::StartsWith,
            Operand::Text("Dr.".into()),
        ));
        let err = filter.to_remote(&schema()).unwrap_err();
        assert!(err.to_string().contains("starts_with"));
    }

    #[test]
    fn build_query_assembles_body_and_clamps_page_size() {
        let db = NotionId::parse("550e8400e29b41d4a716446655440000").unwrap();
        let filter = FilterExpression::leaf(
            "Due",
            FilterOperator::After,
            Operand::Text("2025-01-01".into()),
        );
        let sorts = vec![
            Sort::by_property("Score", SortDirection::Descending),
            Sort::by_created_time(SortDirection::Ascending),
        ];

        let envelope = build_query(
            &db,
            &schema(),
            Some(&filter),
            &sorts,
            Some("cursor-token"),
            Some(500),
        )
        .unwrap();

        assert_eq!(
            envelope.path,
            "databases/550e8400-e29b-41d4-a716-446655440000/query"
        );
        let body = envelope.body.unwrap();
        assert_eq!(body["page_size"], json!(100));
        assert_eq!(body["start_cursor"], json!("cursor-token"));
        assert_eq!(
            body["sorts"],
            json!([
                { "property": "Score", "direction": "descending" },
                { "timestamp": "created_time", "direction": "ascending" }
            ])
        );
    }

    #[test]
    fn sort_on_unknown_property_is_rejected() {
        let db = NotionId::parse("550e8400e29b41d4a716446655440000").unwrap();
        let sorts = vec![Sort::by_property("Ghost", SortDirection::Ascending)];
        assert!(build_query(&db, &schema(), None, &sorts, None, None).is_err());
    }
}
