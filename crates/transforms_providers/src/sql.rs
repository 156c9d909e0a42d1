//! SQL-backed transforms.
//!
//! The query is parsed when the transform is built, so syntax errors and
//! references to collections that are not inputs fail pipeline assembly
//! instead of surfacing at execution time. Planning and execution belong to
//! the engine; only the parse happens here.

use crate::{require, require_each, require_name};
use datafusion::sql::sqlparser::ast::{ObjectName, Query, SetExpr, Statement, Visit, Visitor};
use datafusion::sql::sqlparser::dialect::GenericDialect;
use datafusion::sql::sqlparser::parser::Parser;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeSet;
use std::convert::Infallible;
use std::ops::ControlFlow;
use tracing::{debug, warn};
use transforms_core::{
    RecordSchema, Result, SchemaDerivation, Transform, TransformBuilder, TransformError,
    TransformFactory,
};

/// URN of SQL-backed transforms.
pub const SQL_URN: &str = "stx:transform:sql:v1";

/// Table name a query may use for its input when exactly one is declared.
pub const PCOLLECTION: &str = "PCOLLECTION";

/// Factory for transforms defined by a SQL query over the input collections.
///
/// Every relation the query reads (other than its own CTEs) must be one of the
/// declared input tags, compared case-insensitively. When a single input is
/// declared the query may also refer to it as `PCOLLECTION`. Output schemas
/// are never inferred and must be declared.
///
/// # Example
///
/// ```rust
/// use transforms_core::{FieldType, RecordSchemaBuilder, TransformFactory};
/// use transforms_providers::SqlTransformFactory;
///
/// let schema = RecordSchemaBuilder::new()
///     .field("user_id", FieldType::String)
///     .field("clicks", FieldType::Int64)
///     .build()
///     .unwrap();
///
/// let factory = SqlTransformFactory::new(
///     "clicks_per_user",
///     "SELECT user_id, COUNT(*) AS clicks FROM PCOLLECTION GROUP BY user_id",
///     ["events"],
///     "clicks",
///     schema,
/// );
/// let transform = factory.build().unwrap();
/// assert_eq!(transform.output_tags().collect::<Vec<_>>(), vec!["clicks"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlTransformFactory {
    #[serde(skip)]
    name: String,

    /// SQL query text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,

    /// Input tags the query reads
    #[serde(default)]
    pub inputs: Vec<String>,

    /// Output tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Schema of the query result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<RecordSchema>,
}

impl SqlTransformFactory {
    /// Creates a SQL transform factory.
    pub fn new<I, S>(
        name: impl Into<String>,
        query: impl Into<String>,
        inputs: I,
        output: impl Into<String>,
        output_schema: RecordSchema,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            query: Some(query.into()),
            inputs: inputs.into_iter().map(Into::into).collect(),
            output: Some(output.into()),
            output_schema: Some(output_schema),
        }
    }

    /// Sets the factory name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns the factory name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parses the query and returns the relations it reads, lowercased.
    fn referenced_relations(&self, name: &str, query: &str) -> Result<BTreeSet<String>> {
        let statements = Parser::parse_sql(&GenericDialect {}, query)
            .map_err(|e| TransformError::configuration(name, format!("invalid SQL: {}", e)))?;

        let query = match statements.as_slice() {
            [Statement::Query(query)] => query,
            [_] => {
                return Err(TransformError::configuration(
                    name,
                    "only queries are supported, not DDL or DML statements",
                ));
            }
            other => {
                return Err(TransformError::configuration(
                    name,
                    format!("expected exactly one SQL statement, found {}", other.len()),
                ));
            }
        };

        Ok(Relations::collect(query))
    }
}

impl TransformFactory for SqlTransformFactory {
    fn build(&self) -> Result<Transform> {
        let name = require_name(&self.name)?;
        let query = require(name, &self.query, "query")?;
        if self.inputs.is_empty() {
            return Err(TransformError::configuration(
                name,
                "at least one input tag is required",
            ));
        }
        let inputs = require_each(name, &self.inputs, "input tag")?;
        let output = require(name, &self.output, "output tag")?;
        let output_schema = self.output_schema.clone().ok_or_else(|| {
            TransformError::configuration(
                name,
                "output_schema is required; query result schemas are not inferred",
            )
        })?;

        let relations = self.referenced_relations(name, query)?;
        debug!(factory = %name, ?relations, "Resolved SQL relations");

        let single_input = inputs.len() == 1;
        let mut used = BTreeSet::new();
        for relation in &relations {
            let tag = inputs
                .iter()
                .copied()
                .find(|tag| tag.to_lowercase() == *relation)
                .or_else(|| {
                    (single_input && relation.eq_ignore_ascii_case(PCOLLECTION)).then(|| inputs[0])
                })
                .ok_or_else(|| {
                    TransformError::configuration(
                        name,
                        format!("query reads from '{}' which is not a declared input", relation),
                    )
                })?;
            used.insert(tag);
        }
        for tag in &inputs {
            if !used.contains(tag) {
                warn!(factory = %name, tag = %tag, "Declared SQL input is never read by the query");
            }
        }

        TransformBuilder::new(name, SQL_URN)
            .inputs(inputs.iter().copied())
            .output(output, SchemaDerivation::fixed(output_schema))
            .payload(json!({
                "query": query,
                "dialect": "generic",
                "relations": relations,
            }))
            .build()
    }
}

/// Relations read by a query, wherever they appear: FROM and JOIN clauses,
/// subqueries in expressions, `TABLE t` and pivoted tables.
///
/// CTE names are scoped to the query defining them, so a CTE only hides
/// relations of the same name inside that query.
#[derive(Default)]
struct Relations {
    scopes: Vec<BTreeSet<String>>,
    tables: BTreeSet<String>,
}

impl Relations {
    fn collect(query: &Query) -> BTreeSet<String> {
        let mut relations = Relations::default();
        let _ = query.visit(&mut relations);
        relations.tables
    }

    fn record(&mut self, relation: &str) {
        let relation = normalize(relation);
        if !self.scopes.iter().any(|ctes| ctes.contains(&relation)) {
            self.tables.insert(relation);
        }
    }

    /// `TABLE t` bodies name their relation without an `ObjectName`.
    fn record_table_bodies(&mut self, expr: &SetExpr) {
        match expr {
            SetExpr::Table(table) => {
                if let Some(table_name) = &table.table_name {
                    match &table.schema_name {
                        Some(schema) => self.record(&format!("{}.{}", schema, table_name)),
                        None => self.record(table_name),
                    }
                }
            }
            SetExpr::SetOperation { left, right, .. } => {
                self.record_table_bodies(left);
                self.record_table_bodies(right);
            }
            _ => {}
        }
    }
}

impl Visitor for Relations {
    type Break = Infallible;

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        let ctes = query
            .with
            .iter()
            .flat_map(|with| &with.cte_tables)
            .map(|cte| normalize(&cte.alias.name.value))
            .collect();
        self.scopes.push(ctes);
        self.record_table_bodies(&query.body);
        ControlFlow::Continue(())
    }

    fn post_visit_query(&mut self, _query: &Query) -> ControlFlow<Self::Break> {
        self.scopes.pop();
        ControlFlow::Continue(())
    }

    fn pre_visit_relation(&mut self, relation: &ObjectName) -> ControlFlow<Self::Break> {
        self.record(&relation.to_string());
        ControlFlow::Continue(())
    }
}

fn normalize(identifier: &str) -> String {
    identifier
        .chars()
        .filter(|c| !matches!(c, '"' | '`' | '[' | ']'))
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use transforms_core::{FieldType, NamedCollectionBundle, RecordCollection, RecordSchemaBuilder};

    fn result_schema() -> RecordSchema {
        RecordSchemaBuilder::new()
            .field("user_id", FieldType::String)
            .field("total", FieldType::Int64)
            .build()
            .unwrap()
    }

    fn factory(query: &str, inputs: &[&str]) -> SqlTransformFactory {
        SqlTransformFactory::new(
            "sql",
            query,
            inputs.iter().copied(),
            "result",
            result_schema(),
        )
    }

    fn config_error(factory: SqlTransformFactory) -> String {
        let err = factory.build().unwrap_err();
        assert!(err.is_configuration(), "expected configuration error: {}", err);
        err.to_string()
    }

    #[test]
    fn test_single_input_query() {
        let transform = factory("SELECT user_id, COUNT(*) AS total FROM events GROUP BY user_id", &["events"])
            .build()
            .unwrap();

        assert_eq!(transform.urn(), SQL_URN);
        assert_eq!(transform.input_tags().collect::<Vec<_>>(), vec!["events"]);
        assert_eq!(
            transform.output("result"),
            Some(&SchemaDerivation::fixed(result_schema()))
        );
        assert_eq!(transform.payload()["relations"], json!(["events"]));
    }

    #[test]
    fn test_pcollection_alias() {
        let transform = factory("SELECT * FROM PCOLLECTION", &["events"]).build().unwrap();
        assert_eq!(transform.payload()["relations"], json!(["pcollection"]));
    }

    #[test]
    fn test_pcollection_requires_single_input() {
        let message = config_error(factory("SELECT * FROM PCOLLECTION", &["a", "b"]));
        assert!(message.contains("'pcollection' which is not a declared input"));
    }

    #[test]
    fn test_join_of_inputs() {
        let query = "SELECT o.user_id, SUM(o.amount) AS total \
                     FROM orders o JOIN \"Users\" u ON o.user_id = u.id \
                     GROUP BY o.user_id";
        let transform = factory(query, &["orders", "users"]).build().unwrap();
        assert_eq!(transform.input_tags().count(), 2);
    }

    #[test]
    fn test_unknown_relation() {
        let message = config_error(factory("SELECT * FROM payments", &["events"]));
        assert!(message.contains("'payments'"));
    }

    #[test]
    fn test_cte_and_subquery() {
        let query = "WITH recent AS (SELECT * FROM events WHERE ts > '2024-01-01') \
                     SELECT user_id, COUNT(*) AS total FROM (SELECT * FROM recent) r GROUP BY user_id";
        assert!(factory(query, &["events"]).build().is_ok());
    }

    #[test]
    fn test_union_reads_both_sides() {
        let query = "SELECT user_id, 1 AS total FROM eu UNION ALL SELECT user_id, 1 AS total FROM apac";
        let message = config_error(factory(query, &["eu"]));
        assert!(message.contains("'apac'"));
    }

    #[test]
    fn test_where_subquery_relation() {
        let query = "SELECT user_id, 1 AS total FROM events \
                     WHERE user_id IN (SELECT user_id FROM secret_payments)";
        let message = config_error(factory(query, &["events"]));
        assert!(message.contains("'secret_payments'"));
    }

    #[test]
    fn test_scalar_subquery_relation() {
        let query = "SELECT (SELECT COUNT(*) FROM audit) AS total, user_id FROM events";
        let message = config_error(factory(query, &["events"]));
        assert!(message.contains("'audit'"));
    }

    #[test]
    fn test_exists_and_having_subqueries() {
        let query = "SELECT user_id, COUNT(*) AS total FROM events e \
                     WHERE EXISTS (SELECT 1 FROM users u WHERE u.id = e.user_id) \
                     GROUP BY user_id \
                     HAVING COUNT(*) > (SELECT MIN(total) FROM thresholds)";

        let transform = factory(query, &["events", "users", "thresholds"])
            .build()
            .unwrap();
        assert_eq!(
            transform.payload()["relations"],
            json!(["events", "thresholds", "users"])
        );

        let message = config_error(factory(query, &["events", "users"]));
        assert!(message.contains("'thresholds'"));
    }

    #[test]
    fn test_table_statement_body() {
        let message = config_error(factory("TABLE archive", &["events"]));
        assert!(message.contains("'archive'"));
    }

    #[test]
    fn test_cte_scope_is_local() {
        let query = "SELECT user_id, 1 AS total \
                     FROM (WITH ledger AS (SELECT * FROM events) SELECT * FROM ledger) inner_q \
                     JOIN ledger l ON l.user_id = inner_q.user_id";
        let message = config_error(factory(query, &["events"]));
        assert!(message.contains("'ledger'"));
    }

    #[test]
    fn test_blank_input_tag() {
        let message = config_error(factory("SELECT * FROM events", &["events", "  "]));
        assert!(message.contains("input tag 2 is blank"));
    }

    #[test]
    fn test_invalid_sql() {
        let message = config_error(factory("SELEC user_id FROM", &["events"]));
        assert!(message.contains("invalid SQL"));
    }

    #[test]
    fn test_rejects_dml() {
        let message = config_error(factory("DELETE FROM events", &["events"]));
        assert!(message.contains("only queries are supported"));
    }

    #[test]
    fn test_rejects_multiple_statements() {
        let message = config_error(factory("SELECT 1; SELECT 2", &["events"]));
        assert!(message.contains("found 2"));
    }

    #[test]
    fn test_requires_output_schema() {
        let factory = SqlTransformFactory {
            output_schema: None,
            ..factory("SELECT * FROM events", &["events"])
        };
        assert!(config_error(factory).contains("output_schema is required"));
    }

    #[test]
    fn test_requires_query() {
        let factory = SqlTransformFactory {
            query: None,
            ..factory("SELECT * FROM events", &["events"])
        };
        assert!(config_error(factory).contains("query is required"));
    }

    #[test]
    fn test_requires_inputs() {
        assert!(config_error(factory("SELECT 1", &[])).contains("at least one input tag"));
    }

    #[test]
    fn test_expand_uses_declared_schema() {
        let events = RecordSchemaBuilder::new()
            .field("user_id", FieldType::String)
            .build()
            .unwrap();
        let input =
            NamedCollectionBundle::of("events", RecordCollection::new("src/events", events)).unwrap();

        let transform = factory("SELECT user_id, 1 AS total FROM events", &["events"])
            .build()
            .unwrap();
        let out = transform.expand(&input).unwrap();
        assert_eq!(**out.get("result").unwrap().schema(), result_schema());
    }
}
