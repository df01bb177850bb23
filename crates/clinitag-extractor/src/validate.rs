//! Validation of extracted tag objects
//!
//! Turns loosely-typed JSON from the generator into typed candidates.
//! Problems are reported as `RejectionReason`s: a nameless tag is dropped
//! entirely, a bad condition is dropped from its tag, and neither fails the
//! chunk that produced it.

use clinitag_domain::{
    ComparisonOperator, Condition, ConditionKind, EventCondition, FieldCondition,
    NaturalLanguageCondition, TagReference,
};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Why an extracted tag or condition was dropped
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum RejectionReason {
    /// Array element is not a JSON object
    #[error("tag entry is not an object")]
    NotAnObject,

    /// Tag name missing, empty, or not a string
    #[error("tag has no name")]
    MissingTagName,

    /// `conditions` present but not an array
    #[error("conditions is not an array")]
    ConditionsNotAList,

    /// Condition entry is not a JSON object
    #[error("condition is not an object")]
    ConditionNotAnObject,

    /// Condition without a `type`
    #[error("condition has no type")]
    MissingConditionType,

    /// `type` is not one of field, tag, event, natural_language
    #[error("unknown condition type '{0}'")]
    UnknownConditionType(String),

    /// field/tag/event condition without a name
    #[error("{0} condition has no name")]
    MissingConditionName(String),

    /// natural_language condition without an expression
    #[error("natural_language condition has no expression")]
    MissingExpression,

    /// Operator outside `< > <= >= == !=`
    #[error("unknown operator '{0}'")]
    UnknownOperator(String),

    /// Value present but not numeric
    #[error("value '{0}' is not numeric")]
    NonNumericValue(String),
}

/// A validated tag as extracted from one chunk
#[derive(Debug, Clone, PartialEq)]
pub struct TagCandidate {
    /// Tag name, trimmed
    pub name: String,
    /// Display name, if given
    pub display_name: Option<String>,
    /// Description, if given
    pub description: Option<String>,
    /// Category, if given
    pub category: Option<String>,
    /// Valid conditions, in extraction order
    pub conditions: Vec<Condition>,
}

/// Validate one extracted tag object.
///
/// Returns the candidate (or `None` when the whole tag was dropped) together
/// with every rejection encountered.
pub fn validate_tag(raw: &Value) -> (Option<TagCandidate>, Vec<RejectionReason>) {
    let Some(obj) = raw.as_object() else {
        return (None, vec![RejectionReason::NotAnObject]);
    };

    let Some(name) = non_empty_str(obj, "name") else {
        return (None, vec![RejectionReason::MissingTagName]);
    };

    let mut rejections = Vec::new();
    let mut conditions = Vec::new();

    match obj.get("conditions") {
        None | Some(Value::Null) => {}
        Some(Value::Array(items)) => {
            for item in items {
                match parse_condition(item) {
                    Ok(condition) => conditions.push(condition),
                    Err(reason) => rejections.push(reason),
                }
            }
        }
        Some(_) => rejections.push(RejectionReason::ConditionsNotAList),
    }

    let candidate = TagCandidate {
        name,
        display_name: non_empty_str(obj, "display_name"),
        description: non_empty_str(obj, "description"),
        category: non_empty_str(obj, "category"),
        conditions,
    };
    (Some(candidate), rejections)
}

/// Parse one condition object into its typed variant
pub fn parse_condition(raw: &Value) -> Result<Condition, RejectionReason> {
    let obj = raw.as_object().ok_or(RejectionReason::ConditionNotAnObject)?;

    let type_str = non_empty_str(obj, "type").ok_or(RejectionReason::MissingConditionType)?;
    let kind = ConditionKind::parse(&type_str)
        .ok_or_else(|| RejectionReason::UnknownConditionType(type_str.clone()))?;

    let required_name =
        || non_empty_str(obj, "name").ok_or_else(|| RejectionReason::MissingConditionName(kind.to_string()));

    let condition = match kind {
        ConditionKind::Field => Condition::Field(FieldCondition {
            name: required_name()?,
            field_path: non_empty_str(obj, "field_path"),
            operator: parse_operator(obj)?,
            value: parse_value(obj)?,
        }),
        ConditionKind::Tag => Condition::Tag(TagReference {
            name: required_name()?,
        }),
        ConditionKind::Event => Condition::Event(EventCondition {
            name: required_name()?,
            status: non_empty_str(obj, "status"),
            time_relation: non_empty_str(obj, "time_relation"),
        }),
        ConditionKind::NaturalLanguage => Condition::NaturalLanguage(NaturalLanguageCondition {
            expression: non_empty_str(obj, "expression").ok_or(RejectionReason::MissingExpression)?,
        }),
    };
    Ok(condition)
}

fn non_empty_str(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_operator(obj: &Map<String, Value>) -> Result<Option<ComparisonOperator>, RejectionReason> {
    match obj.get("operator") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => ComparisonOperator::parse(s)
            .map(Some)
            .ok_or_else(|| RejectionReason::UnknownOperator(s.clone())),
        Some(other) => Err(RejectionReason::UnknownOperator(other.to_string())),
    }
}

fn parse_value(obj: &Map<String, Value>) -> Result<Option<f64>, RejectionReason> {
    match obj.get("value") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| RejectionReason::NonNumericValue(n.to_string())),
        // Models often quote numbers, sometimes with a decimal comma
        Some(Value::String(s)) => s
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| RejectionReason::NonNumericValue(s.clone())),
        Some(other) => Err(RejectionReason::NonNumericValue(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_tag() {
        let raw = json!({
            "name": " hipotensao ",
            "display_name": "Hipotensão",
            "description": "PAS abaixo de 90 mmHg",
            "category": "sepse",
            "conditions": [{
                "type": "field",
                "name": "pressao_sistolica",
                "field_path": "vitals.pressao.sistolica",
                "operator": "<",
                "value": 90,
                "status": null,
                "time_relation": null
            }]
        });

        let (candidate, rejections) = validate_tag(&raw);
        let candidate = candidate.unwrap();
        assert!(rejections.is_empty());
        assert_eq!(candidate.name, "hipotensao");
        assert_eq!(candidate.category.as_deref(), Some("sepse"));
        assert_eq!(
            candidate.conditions,
            vec![Condition::Field(FieldCondition {
                name: "pressao_sistolica".to_string(),
                field_path: Some("vitals.pressao.sistolica".to_string()),
                operator: Some(ComparisonOperator::LessThan),
                value: Some(90.0),
            })]
        );
    }

    #[test]
    fn test_nameless_tag_is_dropped() {
        for raw in [json!({"display_name": "X"}), json!({"name": "  "}), json!({"name": 7})] {
            let (candidate, rejections) = validate_tag(&raw);
            assert!(candidate.is_none());
            assert_eq!(rejections, vec![RejectionReason::MissingTagName]);
        }
    }

    #[test]
    fn test_non_object_is_dropped() {
        let (candidate, rejections) = validate_tag(&json!("hipotensao"));
        assert!(candidate.is_none());
        assert_eq!(rejections, vec![RejectionReason::NotAnObject]);
    }

    #[test]
    fn test_bad_condition_keeps_tag() {
        let raw = json!({
            "name": "febre",
            "conditions": [
                {"type": "lab", "name": "x"},
                {"type": "field"},
                {"type": "tag", "name": "sepse_suspeita"}
            ]
        });

        let (candidate, rejections) = validate_tag(&raw);
        assert_eq!(candidate.unwrap().conditions.len(), 1);
        assert_eq!(
            rejections,
            vec![
                RejectionReason::UnknownConditionType("lab".to_string()),
                RejectionReason::MissingConditionName("field".to_string()),
            ]
        );
    }

    #[test]
    fn test_conditions_not_a_list() {
        let (candidate, rejections) = validate_tag(&json!({"name": "febre", "conditions": "x"}));
        assert!(candidate.unwrap().conditions.is_empty());
        assert_eq!(rejections, vec![RejectionReason::ConditionsNotAList]);
    }

    #[test]
    fn test_natural_language_needs_expression_only() {
        let ok = parse_condition(&json!({"type": "natural_language", "expression": "foco infeccioso"}));
        assert_eq!(
            ok,
            Ok(Condition::NaturalLanguage(NaturalLanguageCondition {
                expression: "foco infeccioso".to_string()
            }))
        );

        let missing = parse_condition(&json!({"type": "natural_language", "name": "x"}));
        assert_eq!(missing, Err(RejectionReason::MissingExpression));
    }

    #[test]
    fn test_event_optional_attributes() {
        let condition = parse_condition(&json!({
            "type": "event",
            "name": "coleta_hemocultura",
            "status": "completed"
        }))
        .unwrap();
        assert_eq!(
            condition,
            Condition::Event(EventCondition {
                name: "coleta_hemocultura".to_string(),
                status: Some("completed".to_string()),
                time_relation: None,
            })
        );
    }

    #[test]
    fn test_quoted_values_and_operators() {
        let condition = parse_condition(&json!({
            "type": "field", "name": "lactato", "operator": ">=", "value": "2,5"
        }))
        .unwrap();
        assert_eq!(
            condition,
            Condition::Field(FieldCondition {
                name: "lactato".to_string(),
                field_path: None,
                operator: Some(ComparisonOperator::GreaterOrEqual),
                value: Some(2.5),
            })
        );

        assert_eq!(
            parse_condition(&json!({"type": "field", "name": "x", "operator": "~"})),
            Err(RejectionReason::UnknownOperator("~".to_string()))
        );
        assert_eq!(
            parse_condition(&json!({"type": "field", "name": "x", "value": "alto"})),
            Err(RejectionReason::NonNumericValue("alto".to_string()))
        );
    }

    #[test]
    fn test_rejection_serializes_with_reason_tag() {
        let value = serde_json::to_value(RejectionReason::UnknownOperator("~".into())).unwrap();
        assert_eq!(value, json!({"reason": "unknown_operator", "detail": "~"}));
        let value = serde_json::to_value(RejectionReason::MissingTagName).unwrap();
        assert_eq!(value, json!({"reason": "missing_tag_name"}));
    }
}
