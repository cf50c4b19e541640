//! Deferred query representation and the SOQL translator.
//!
//! [`QueryOps`] is an immutable accumulation of operators: every operator
//! method returns a new value, so a representation can be shared and
//! extended along independent composition chains without interference.
//! [`build_soql`] lowers a representation into the remote dialect; it is a
//! pure function of its inputs, no I/O.

use forceql_client::security::soql as escape;

use crate::error::TranslateError;
use crate::metadata::EntityMetadata;
use crate::predicate::{Literal, Predicate};

/// Output mode of a translated query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryMode {
    /// Fetch rows.
    #[default]
    Rows,
    /// Fetch the matching-record count only.
    Count,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    fn soql(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// One projected output column.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    /// Source field (local or remote name; resolved through metadata).
    pub field: String,
    /// Output name override. The remote dialect has no column aliasing for
    /// plain fields, so the rename is applied to the mapped result rows.
    pub alias: Option<String>,
}

/// One ordering term.
#[derive(Debug, Clone, PartialEq)]
pub struct Ordering {
    pub field: String,
    pub direction: SortDirection,
}

/// The accumulated operators of one query.
#[derive(Debug, Clone, Default)]
pub struct QueryOps {
    /// Filters compose conjunctively, in call order.
    pub filters: Vec<Predicate>,
    /// Explicit projection; `None` selects all declared fields.
    pub projection: Option<Vec<SelectItem>>,
    /// Ordering terms, in call order.
    pub order: Vec<Ordering>,
    /// Row offset; successive skips accumulate.
    pub skip: Option<u32>,
    /// Row limit; successive takes intersect (minimum wins).
    pub take: Option<u32>,
    /// Output mode.
    pub mode: QueryMode,
}

impl QueryOps {
    /// Add a filter (ANDed with any existing filters).
    pub fn filter(&self, predicate: Predicate) -> Self {
        let mut next = self.clone();
        next.filters.push(predicate);
        next
    }

    /// Project the given fields.
    pub fn select<S: Into<String>>(&self, fields: impl IntoIterator<Item = S>) -> Self {
        let mut next = self.clone();
        next.projection = Some(
            fields
                .into_iter()
                .map(|f| SelectItem {
                    field: f.into(),
                    alias: None,
                })
                .collect(),
        );
        next
    }

    /// Project with renamed outputs: `(output_name, source_field)` pairs.
    pub fn select_as<A: Into<String>, F: Into<String>>(
        &self,
        pairs: impl IntoIterator<Item = (A, F)>,
    ) -> Self {
        let mut next = self.clone();
        next.projection = Some(
            pairs
                .into_iter()
                .map(|(alias, field)| SelectItem {
                    field: field.into(),
                    alias: Some(alias.into()),
                })
                .collect(),
        );
        next
    }

    /// Append an ordering term.
    pub fn order_by(&self, field: impl Into<String>, direction: SortDirection) -> Self {
        let mut next = self.clone();
        next.order.push(Ordering {
            field: field.into(),
            direction,
        });
        next
    }

    /// Skip `n` rows. Successive skips accumulate: `skip(3).skip(4)` skips 7.
    pub fn skip(&self, n: u32) -> Self {
        let mut next = self.clone();
        next.skip = Some(next.skip.unwrap_or(0).saturating_add(n));
        next
    }

    /// Limit to `n` rows. Successive takes intersect: `take(10).take(5)`
    /// yields at most 5.
    pub fn take(&self, n: u32) -> Self {
        let mut next = self.clone();
        next.take = Some(next.take.map_or(n, |prev| prev.min(n)));
        next
    }

    /// Switch to count mode.
    pub fn count(&self) -> Self {
        let mut next = self.clone();
        next.mode = QueryMode::Count;
        next
    }
}

/// What the target deployment supports.
///
/// `OFFSET` is not honored by every remote API version. With
/// `supports_offset` set (the default) the clause is emitted and an
/// unsupporting server rejects it; unset, translation fails fast with
/// [`TranslateError::OffsetNotSupported`]. The clause is never dropped
/// silently.
#[derive(Debug, Clone, Copy)]
pub struct Capabilities {
    pub supports_offset: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            supports_offset: true,
        }
    }
}

/// Dialect policy for the pattern-match operator.
///
/// The translator escapes the caller's text and asks the dialect where the
/// wildcards go, so other LIKE-style dialects can be targeted.
pub trait Dialect: Send + Sync {
    /// Pattern matching the value anywhere in the field.
    fn contains_pattern(&self, escaped: &str) -> String;
    /// Pattern matching the value as a prefix.
    fn prefix_pattern(&self, escaped: &str) -> String;
}

/// The SOQL dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct Soql;

impl Dialect for Soql {
    fn contains_pattern(&self, escaped: &str) -> String {
        format!("%{}%", escaped)
    }

    fn prefix_pattern(&self, escaped: &str) -> String {
        format!("{}%", escaped)
    }
}

/// Translate a query representation into a SOQL string.
///
/// Pure and deterministic: the same metadata and representation always
/// produce the same string.
pub fn build_soql(
    meta: &EntityMetadata,
    ops: &QueryOps,
    dialect: &dyn Dialect,
    capabilities: &Capabilities,
) -> Result<String, TranslateError> {
    let select = match ops.mode {
        QueryMode::Count => "COUNT()".to_string(),
        QueryMode::Rows => match &ops.projection {
            None => {
                let names: Vec<&str> = meta.field_names().collect();
                names.join(", ")
            }
            Some(items) => {
                let mut names = Vec::with_capacity(items.len());
                for item in items {
                    names.push(resolve(meta, &item.field)?);
                }
                names.join(", ")
            }
        },
    };

    let mut soql = format!("SELECT {} FROM {}", select, meta.object_name());

    if !ops.filters.is_empty() {
        let mut clauses = Vec::with_capacity(ops.filters.len());
        for predicate in &ops.filters {
            clauses.push(render_grouped(meta, predicate, dialect)?);
        }
        soql.push_str(" WHERE ");
        soql.push_str(&clauses.join(" AND "));
    }

    if ops.mode == QueryMode::Count {
        return Ok(soql);
    }

    if !ops.order.is_empty() {
        let mut terms = Vec::with_capacity(ops.order.len());
        for ordering in &ops.order {
            terms.push(format!(
                "{} {}",
                resolve(meta, &ordering.field)?,
                ordering.direction.soql()
            ));
        }
        soql.push_str(" ORDER BY ");
        soql.push_str(&terms.join(", "));
    }

    if let Some(limit) = ops.take {
        soql.push_str(&format!(" LIMIT {}", limit));
    }

    if let Some(offset) = ops.skip {
        if offset > 0 {
            if !capabilities.supports_offset {
                return Err(TranslateError::OffsetNotSupported { skip: offset });
            }
            soql.push_str(&format!(" OFFSET {}", offset));
        }
    }

    Ok(soql)
}

fn resolve<'m>(meta: &'m EntityMetadata, name: &str) -> Result<&'m str, TranslateError> {
    meta.resolve(name)
        .map(|f| f.remote_name)
        .ok_or_else(|| TranslateError::UnknownField {
            object: meta.object_name(),
            field: name.to_string(),
        })
}

fn render_predicate(
    meta: &EntityMetadata,
    predicate: &Predicate,
    dialect: &dyn Dialect,
) -> Result<String, TranslateError> {
    Ok(match predicate {
        Predicate::Compare { field, op, value } => format!(
            "{} {} {}",
            resolve(meta, field)?,
            op.soql(),
            render_literal(value)
        ),
        Predicate::Contains { field, value } => format!(
            "{} LIKE '{}'",
            resolve(meta, field)?,
            dialect.contains_pattern(&escape::escape_like(value))
        ),
        Predicate::StartsWith { field, value } => format!(
            "{} LIKE '{}'",
            resolve(meta, field)?,
            dialect.prefix_pattern(&escape::escape_like(value))
        ),
        Predicate::In { field, values } => {
            if values.is_empty() {
                return Err(TranslateError::EmptyMembership {
                    field: field.clone(),
                });
            }
            let rendered: Vec<String> = values.iter().map(render_literal).collect();
            format!("{} IN ({})", resolve(meta, field)?, rendered.join(", "))
        }
        Predicate::Includes { field, labels } => {
            if labels.is_empty() {
                return Err(TranslateError::EmptyMembership {
                    field: field.clone(),
                });
            }
            let rendered: Vec<String> = labels
                .iter()
                .map(|label| format!("'{}'", escape::escape_string(label)))
                .collect();
            format!(
                "{} INCLUDES ({})",
                resolve(meta, field)?,
                rendered.join(", ")
            )
        }
        Predicate::IsNull { field, negated } => format!(
            "{} {} null",
            resolve(meta, field)?,
            if *negated { "!=" } else { "=" }
        ),
        Predicate::And(a, b) => format!(
            "{} AND {}",
            render_grouped(meta, a, dialect)?,
            render_grouped(meta, b, dialect)?
        ),
        Predicate::Or(a, b) => format!(
            "{} OR {}",
            render_grouped(meta, a, dialect)?,
            render_grouped(meta, b, dialect)?
        ),
        Predicate::Not(inner) => {
            format!("NOT ({})", render_predicate(meta, inner, dialect)?)
        }
    })
}

/// Render a predicate, parenthesizing boolean combinators so nesting under
/// an enclosing AND keeps its meaning.
fn render_grouped(
    meta: &EntityMetadata,
    predicate: &Predicate,
    dialect: &dyn Dialect,
) -> Result<String, TranslateError> {
    let rendered = render_predicate(meta, predicate, dialect)?;
    Ok(match predicate {
        Predicate::And(_, _) | Predicate::Or(_, _) => format!("({})", rendered),
        _ => rendered,
    })
}

fn render_literal(literal: &Literal) -> String {
    match literal {
        Literal::Null => "null".to_string(),
        Literal::Boolean(b) => b.to_string(),
        Literal::Int(i) => i.to_string(),
        Literal::Number(n) => n.to_string(),
        Literal::Text(s) => format!("'{}'", escape::escape_string(s)),
        // Date and datetime literals are unquoted in SOQL.
        Literal::Date(d) => d.format("%Y-%m-%d").to_string(),
        Literal::DateTime(dt) => dt.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        Literal::PicklistLabel(label) => format!("'{}'", escape::escape_string(label)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::WireType;
    use crate::predicate::field;
    use chrono::{TimeZone, Utc};

    fn account_meta() -> EntityMetadata {
        EntityMetadata::builder("Account")
            .field("id", "Id", WireType::Id)
            .field("name", "Name", WireType::Text)
            .field("industry", "Industry", WireType::Picklist)
            .field("employees", "NumberOfEmployees", WireType::Number)
            .field("created_date", "CreatedDate", WireType::DateTime)
            .field("activity_type", "ActivityType__c", WireType::MultiPicklist)
            .child("Cases", "Case", "AccountId")
            .build()
    }

    fn soql(ops: &QueryOps) -> String {
        build_soql(&account_meta(), ops, &Soql, &Capabilities::default()).unwrap()
    }

    crate::picklist! {
        enum Industry {
            Biotechnology => "Biotechnology",
            Banking => "Banking",
        }
    }

    #[test]
    fn test_default_projection_lists_all_declared_fields() {
        let ops = QueryOps::default();
        assert_eq!(
            soql(&ops),
            "SELECT Id, Name, Industry, NumberOfEmployees, CreatedDate, ActivityType__c FROM Account"
        );
    }

    #[test]
    fn test_translation_is_deterministic() {
        let ops = QueryOps::default()
            .filter(field("Name").contains("cool"))
            .order_by("Name", SortDirection::Ascending)
            .take(5);
        assert_eq!(soql(&ops), soql(&ops));
    }

    #[test]
    fn test_filters_compose_conjunctively_in_call_order() {
        let ops = QueryOps::default()
            .filter(field("Name").contains("cool"))
            .filter(field("Industry").eq(Literal::picklist(Industry::Biotechnology)));

        assert_eq!(
            soql(&ops),
            "SELECT Id, Name, Industry, NumberOfEmployees, CreatedDate, ActivityType__c \
             FROM Account WHERE Name LIKE '%cool%' AND Industry = 'Biotechnology'"
        );

        // Equivalent to a single ANDed filter
        let combined = QueryOps::default().filter(
            field("Name")
                .contains("cool")
                .and(field("Industry").eq(Literal::picklist(Industry::Biotechnology))),
        );
        assert!(soql(&combined).contains("Name LIKE '%cool%' AND Industry = 'Biotechnology'"));
    }

    #[test]
    fn test_take_intersects_and_skip_accumulates() {
        let ops = QueryOps::default().take(10).take(5);
        assert_eq!(ops.take, Some(5));

        let ops = QueryOps::default().take(5).take(10);
        assert_eq!(ops.take, Some(5));

        let ops = QueryOps::default().skip(3).skip(4);
        assert_eq!(ops.skip, Some(7));
        assert!(soql(&ops).ends_with("OFFSET 7"));
    }

    #[test]
    fn test_clause_order_where_order_limit_offset() {
        let ops = QueryOps::default()
            .filter(field("name").starts_with("Company"))
            .order_by("created_date", SortDirection::Descending)
            .order_by("name", SortDirection::Ascending)
            .skip(3)
            .take(4);

        assert_eq!(
            soql(&ops),
            "SELECT Id, Name, Industry, NumberOfEmployees, CreatedDate, ActivityType__c \
             FROM Account WHERE Name LIKE 'Company%' \
             ORDER BY CreatedDate DESC, Name ASC LIMIT 4 OFFSET 3"
        );
    }

    #[test]
    fn test_offset_requires_capability() {
        let ops = QueryOps::default().skip(3);
        let err = build_soql(
            &account_meta(),
            &ops,
            &Soql,
            &Capabilities {
                supports_offset: false,
            },
        )
        .unwrap_err();
        assert!(matches!(
            err,
            TranslateError::OffsetNotSupported { skip: 3 }
        ));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let ops = QueryOps::default().filter(field("Bogus").eq(1));
        let err = build_soql(&account_meta(), &ops, &Soql, &Capabilities::default()).unwrap_err();
        assert!(matches!(err, TranslateError::UnknownField { field, .. } if field == "Bogus"));

        let ops = QueryOps::default().select(["Bogus"]);
        assert!(build_soql(&account_meta(), &ops, &Soql, &Capabilities::default()).is_err());
    }

    #[test]
    fn test_count_mode_keeps_filters_only() {
        let ops = QueryOps::default()
            .filter(field("Name").contains("Company"))
            .order_by("Name", SortDirection::Ascending)
            .take(5)
            .count();

        assert_eq!(
            soql(&ops),
            "SELECT COUNT() FROM Account WHERE Name LIKE '%Company%'"
        );
    }

    #[test]
    fn test_explicit_projection_resolves_local_names() {
        let ops = QueryOps::default().select(["id", "name"]);
        assert_eq!(soql(&ops), "SELECT Id, Name FROM Account");

        let ops = QueryOps::default().select_as([("Nom", "name")]);
        assert_eq!(soql(&ops), "SELECT Name FROM Account");
    }

    #[test]
    fn test_string_literals_are_escaped() {
        let ops = QueryOps::default().filter(field("Name").eq("O'Brien"));
        assert!(soql(&ops).contains("Name = 'O\\'Brien'"));

        // LIKE wildcards in caller text match literally
        let ops = QueryOps::default().filter(field("Name").contains("100%"));
        assert!(soql(&ops).contains("Name LIKE '%100\\%%'"));
    }

    #[test]
    fn test_boolean_combinators_parenthesize() {
        let ops = QueryOps::default()
            .filter(
                field("Name")
                    .starts_with("Company")
                    .not()
                    .and(field("Industry").eq(Literal::picklist(Industry::Biotechnology))),
            )
            .filter(field("employees").ge(10).or(field("employees").is_null()));

        assert_eq!(
            soql(&ops),
            "SELECT Id, Name, Industry, NumberOfEmployees, CreatedDate, ActivityType__c \
             FROM Account \
             WHERE (NOT (Name LIKE 'Company%') AND Industry = 'Biotechnology') \
             AND (NumberOfEmployees >= 10 OR NumberOfEmployees = null)"
        );
    }

    #[test]
    fn test_in_and_includes() {
        let ops = QueryOps::default().filter(field("Industry").is_in(["Banking", "Energy"]));
        assert!(soql(&ops).contains("Industry IN ('Banking', 'Energy')"));

        let ops = QueryOps::default().filter(
            field("activity_type").includes([Industry::Banking, Industry::Biotechnology]),
        );
        assert!(soql(&ops).contains("ActivityType__c INCLUDES ('Banking', 'Biotechnology')"));

        let ops = QueryOps::default().filter(field("Industry").is_in(Vec::<Literal>::new()));
        assert!(matches!(
            build_soql(&account_meta(), &ops, &Soql, &Capabilities::default()),
            Err(TranslateError::EmptyMembership { .. })
        ));
    }

    #[test]
    fn test_datetime_literals_are_unquoted() {
        let when = Utc.with_ymd_and_hms(2023, 4, 1, 12, 30, 0).unwrap();
        let ops = QueryOps::default().filter(field("created_date").ge(when));
        assert!(soql(&ops).contains("CreatedDate >= 2023-04-01T12:30:00Z"));
    }

    #[test]
    fn test_operator_calls_do_not_mutate_the_source() {
        let base = QueryOps::default().filter(field("Name").contains("a"));
        let extended = base.filter(field("Name").contains("b"));

        assert_eq!(base.filters.len(), 1);
        assert_eq!(extended.filters.len(), 2);
    }
}
