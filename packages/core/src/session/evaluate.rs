//! Query object model evaluation over an in-memory tree

use super::error::{SessionError, SessionResult};
use super::memory::{NodeRecord, Tree};
use super::qom::{Constraint, DynamicOperand, Operator, Order, QueryObjectModel, StaticOperand};
use super::{NodeId, Row, JCR_PRIMARY_TYPE, NT_UNSTRUCTURED};
use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering as CmpOrdering;
use std::collections::BTreeMap;

struct Candidate<'a> {
    id: NodeId,
    path: String,
    record: &'a NodeRecord,
}

pub(super) fn execute(
    tree: &Tree,
    query: &QueryObjectModel,
    bindings: &BTreeMap<String, Value>,
    limit: Option<usize>,
    offset: usize,
) -> SessionResult<Vec<Row>> {
    let selector = &query.source.name;
    let mut matches = Vec::new();

    for id in tree.walk() {
        let record = tree.get(id)?;
        if !matches_node_type(record, &query.source.node_type) {
            continue;
        }
        let candidate = Candidate {
            id,
            path: tree.path_of(id)?,
            record,
        };
        let accepted = match &query.constraint {
            Some(constraint) => evaluate(constraint, &candidate, selector, bindings)?,
            None => true,
        };
        if accepted {
            matches.push(candidate);
        }
    }

    if !query.orderings.is_empty() {
        // sort keys are computed up front so that errors surface before sorting
        let mut keyed = Vec::with_capacity(matches.len());
        for candidate in matches {
            let keys = query
                .orderings
                .iter()
                .map(|ordering| operand_values(&ordering.operand, &candidate).map(|v| v.into_iter().next()))
                .collect::<SessionResult<Vec<Option<Value>>>>()?;
            keyed.push((keys, candidate));
        }
        keyed.sort_by(|(left, _), (right, _)| {
            for (index, ordering) in query.orderings.iter().enumerate() {
                let ordered = compare_optional(&left[index], &right[index]);
                let ordered = match ordering.order {
                    Order::Ascending => ordered,
                    Order::Descending => ordered.reverse(),
                };
                if ordered != CmpOrdering::Equal {
                    return ordered;
                }
            }
            CmpOrdering::Equal
        });
        matches = keyed.into_iter().map(|(_, candidate)| candidate).collect();
    }

    Ok(matches
        .into_iter()
        .skip(offset)
        .take(limit.unwrap_or(usize::MAX))
        .map(|candidate| {
            let values = query
                .columns
                .iter()
                .map(|column| {
                    (
                        column.name.clone(),
                        candidate.record.value(&column.property).cloned().unwrap_or(Value::Null),
                    )
                })
                .collect();
            Row {
                node: candidate.id,
                path: candidate.path,
                selector: selector.clone(),
                values,
            }
        })
        .collect())
}

fn matches_node_type(record: &NodeRecord, node_type: &str) -> bool {
    if node_type == "nt:base" || node_type == NT_UNSTRUCTURED {
        return true;
    }
    record.value(JCR_PRIMARY_TYPE).and_then(Value::as_str) == Some(node_type)
        || record.mixins().contains(&node_type)
}

fn check_selector(selector: &str, expected: &str) -> SessionResult<()> {
    if selector != expected {
        return Err(SessionError::invalid_query(format!(
            "Unknown selector \"{}\", the query only defines \"{}\"",
            selector, expected
        )));
    }
    Ok(())
}

fn evaluate(
    constraint: &Constraint,
    candidate: &Candidate<'_>,
    selector: &str,
    bindings: &BTreeMap<String, Value>,
) -> SessionResult<bool> {
    Ok(match constraint {
        Constraint::And(left, right) => {
            evaluate(left, candidate, selector, bindings)?
                && evaluate(right, candidate, selector, bindings)?
        }
        Constraint::Or(left, right) => {
            evaluate(left, candidate, selector, bindings)?
                || evaluate(right, candidate, selector, bindings)?
        }
        Constraint::Not(inner) => !evaluate(inner, candidate, selector, bindings)?,
        Constraint::Comparison {
            operand1,
            operator,
            operand2,
        } => {
            let expected = match operand2 {
                StaticOperand::Literal(value) => value.clone(),
                StaticOperand::BindVariable(name) => bindings.get(name).cloned().ok_or_else(|| {
                    SessionError::invalid_query(format!("Variable \"${}\" is not bound", name))
                })?,
            };
            let actual = operand_values(operand1, candidate)?;
            actual.iter().any(|value| compare(value, *operator, &expected))
        }
        Constraint::PropertyExistence {
            selector: name,
            property,
        } => {
            check_selector(name, selector)?;
            candidate.record.properties.contains_key(property)
        }
        Constraint::FullTextSearch {
            selector: name,
            property,
            expression,
        } => {
            check_selector(name, selector)?;
            let needle = expression.to_lowercase();
            let haystack: Vec<&Value> = match property {
                Some(property) => candidate.record.value(property).into_iter().collect(),
                None => candidate
                    .record
                    .properties
                    .values()
                    .map(|property| &property.value)
                    .collect(),
            };
            haystack
                .into_iter()
                .flat_map(flatten)
                .any(|value| value.to_lowercase().contains(&needle))
        }
        Constraint::SameNode { selector: name, path } => {
            check_selector(name, selector)?;
            candidate.path == *path
        }
        Constraint::ChildNode { selector: name, path } => {
            check_selector(name, selector)?;
            let trimmed = path.trim_end_matches('/');
            let expected = if trimmed.is_empty() { "/" } else { trimmed };
            super::parent_path(&candidate.path) == expected
        }
        Constraint::DescendantNode { selector: name, path } => {
            check_selector(name, selector)?;
            let base = path.trim_end_matches('/');
            base.is_empty() || candidate.path.starts_with(&format!("{}/", base))
        }
    })
}

fn flatten(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(values) => values.iter().flat_map(flatten).collect(),
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}

/// All values a dynamic operand takes on a node (multi-valued properties yield several)
fn operand_values(operand: &DynamicOperand, candidate: &Candidate<'_>) -> SessionResult<Vec<Value>> {
    Ok(match operand {
        DynamicOperand::PropertyValue { property, .. } => match candidate.record.value(property) {
            Some(Value::Array(values)) => values.clone(),
            Some(value) => vec![value.clone()],
            None => Vec::new(),
        },
        DynamicOperand::NodeName { .. } => vec![Value::String(candidate.record.name.clone())],
        DynamicOperand::NodeLocalName { .. } => {
            let name = &candidate.record.name;
            let local = name.rsplit(':').next().unwrap_or(name);
            vec![Value::String(local.to_string())]
        }
        DynamicOperand::LowerCase(inner) => operand_values(inner, candidate)?
            .into_iter()
            .map(|value| match value {
                Value::String(s) => Value::String(s.to_lowercase()),
                other => other,
            })
            .collect(),
        DynamicOperand::UpperCase(inner) => operand_values(inner, candidate)?
            .into_iter()
            .map(|value| match value {
                Value::String(s) => Value::String(s.to_uppercase()),
                other => other,
            })
            .collect(),
    })
}

fn compare(actual: &Value, operator: Operator, expected: &Value) -> bool {
    if operator == Operator::Like {
        return match (actual.as_str(), expected.as_str()) {
            (Some(actual), Some(pattern)) => like(actual, pattern),
            _ => false,
        };
    }

    let ordering = compare_values(actual, expected);
    match operator {
        Operator::EqualTo => ordering == Some(CmpOrdering::Equal),
        Operator::NotEqualTo => ordering != Some(CmpOrdering::Equal),
        Operator::LessThan => ordering == Some(CmpOrdering::Less),
        Operator::LessThanOrEqualTo => {
            matches!(ordering, Some(CmpOrdering::Less) | Some(CmpOrdering::Equal))
        }
        Operator::GreaterThan => ordering == Some(CmpOrdering::Greater),
        Operator::GreaterThanOrEqualTo => {
            matches!(ordering, Some(CmpOrdering::Greater) | Some(CmpOrdering::Equal))
        }
        Operator::Like => false,
    }
}

fn like(actual: &str, pattern: &str) -> bool {
    let mut expression = String::from("^");
    for c in pattern.chars() {
        match c {
            '%' => expression.push_str(".*"),
            '_' => expression.push('.'),
            other => expression.push_str(&regex::escape(&other.to_string())),
        }
    }
    expression.push('$');
    Regex::new(&expression)
        .map(|regex| regex.is_match(actual))
        .unwrap_or(false)
}

fn compare_values(left: &Value, right: &Value) -> Option<CmpOrdering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Number(a), Value::String(b)) => a.as_f64()?.partial_cmp(&b.parse::<f64>().ok()?),
        (Value::String(a), Value::Number(b)) => a.parse::<f64>().ok()?.partial_cmp(&b.as_f64()?),
        (Value::Null, Value::Null) => Some(CmpOrdering::Equal),
        _ => None,
    }
}

/// Missing values sort first
fn compare_optional(left: &Option<Value>, right: &Option<Value>) -> CmpOrdering {
    match (left, right) {
        (None, None) => CmpOrdering::Equal,
        (None, Some(_)) => CmpOrdering::Less,
        (Some(_), None) => CmpOrdering::Greater,
        (Some(a), Some(b)) => compare_values(a, b).unwrap_or(CmpOrdering::Equal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_like_patterns() {
        assert!(like("hello world", "hello%"));
        assert!(like("hello", "h_llo"));
        assert!(!like("hello", "h_lo"));
        assert!(like("a.b", "a.b"));
        assert!(!like("axb", "a.b"));
    }

    #[test]
    fn test_compare_values() {
        assert_eq!(compare_values(&json!(1), &json!(2.5)), Some(CmpOrdering::Less));
        assert_eq!(compare_values(&json!("b"), &json!("a")), Some(CmpOrdering::Greater));
        assert_eq!(compare_values(&json!("10"), &json!(10)), Some(CmpOrdering::Equal));
        assert_eq!(compare_values(&json!(true), &json!("true")), None);
    }

    #[test]
    fn test_compare_operators() {
        assert!(compare(&json!(3), Operator::GreaterThanOrEqualTo, &json!(3)));
        assert!(compare(&json!("a"), Operator::NotEqualTo, &json!("b")));
        assert!(!compare(&json!("a"), Operator::LessThan, &json!(1)));
        assert!(compare(&json!("Article"), Operator::Like, &json!("Art%")));
    }

    #[test]
    fn test_compare_optional_sorts_missing_first() {
        assert_eq!(compare_optional(&None, &Some(json!(1))), CmpOrdering::Less);
        assert_eq!(compare_optional(&Some(json!(2)), &Some(json!(1))), CmpOrdering::Greater);
    }
}
