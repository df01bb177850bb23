//! Tag activation conditions
//!
//! A condition is a tagged union over four variants. Each variant carries
//! exactly the payload its type needs, so a `field` condition can never
//! hold a free-text expression and a `natural_language` condition never
//! needs a name.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name stored for natural-language conditions, which carry no name of their own
pub const NATURAL_LANGUAGE_NAME: &str = "natural_expression";

/// Declared type of a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    /// Comparison against a patient data field
    Field,
    /// Reference to another tag
    Tag,
    /// Clinical event occurrence
    Event,
    /// Free-text rule with no structured comparison
    NaturalLanguage,
}

impl ConditionKind {
    /// Get the kind as its wire string
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionKind::Field => "field",
            ConditionKind::Tag => "tag",
            ConditionKind::Event => "event",
            ConditionKind::NaturalLanguage => "natural_language",
        }
    }

    /// Parse a kind from its wire string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "field" => Some(ConditionKind::Field),
            "tag" => Some(ConditionKind::Tag),
            "event" => Some(ConditionKind::Event),
            "natural_language" => Some(ConditionKind::NaturalLanguage),
            _ => None,
        }
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison operator of a field condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOperator {
    /// `<`
    #[serde(rename = "<")]
    LessThan,
    /// `>`
    #[serde(rename = ">")]
    GreaterThan,
    /// `<=`
    #[serde(rename = "<=")]
    LessOrEqual,
    /// `>=`
    #[serde(rename = ">=")]
    GreaterOrEqual,
    /// `==`
    #[serde(rename = "==")]
    Equal,
    /// `!=`
    #[serde(rename = "!=")]
    NotEqual,
}

impl ComparisonOperator {
    /// Get the operator symbol
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOperator::LessThan => "<",
            ComparisonOperator::GreaterThan => ">",
            ComparisonOperator::LessOrEqual => "<=",
            ComparisonOperator::GreaterOrEqual => ">=",
            ComparisonOperator::Equal => "==",
            ComparisonOperator::NotEqual => "!=",
        }
    }

    /// Parse an operator symbol. A lone `=` is read as `==`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "<" => Some(ComparisonOperator::LessThan),
            ">" => Some(ComparisonOperator::GreaterThan),
            "<=" | "=<" => Some(ComparisonOperator::LessOrEqual),
            ">=" | "=>" => Some(ComparisonOperator::GreaterOrEqual),
            "==" | "=" => Some(ComparisonOperator::Equal),
            "!=" | "<>" => Some(ComparisonOperator::NotEqual),
            _ => None,
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison against a patient data field, e.g. `pressao_sistolica < 90`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCondition {
    /// Field name
    pub name: String,
    /// Dotted path into the patient record (e.g. `vitals.pressao_sistolica`)
    pub field_path: Option<String>,
    /// Comparison operator
    pub operator: Option<ComparisonOperator>,
    /// Numeric threshold
    pub value: Option<f64>,
}

/// Reference to another tag by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagReference {
    /// Referenced tag name
    pub name: String,
}

/// Occurrence of a clinical event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventCondition {
    /// Event name
    pub name: String,
    /// Event status (e.g. "completed")
    pub status: Option<String>,
    /// Time relation (e.g. "last_24h")
    pub time_relation: Option<String>,
}

/// Free-text rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NaturalLanguageCondition {
    /// The expression, verbatim
    pub expression: String,
}

/// A typed rule that can trigger a tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// Field comparison
    Field(FieldCondition),
    /// Tag reference
    Tag(TagReference),
    /// Event occurrence
    Event(EventCondition),
    /// Free-text expression
    NaturalLanguage(NaturalLanguageCondition),
}

impl Condition {
    /// Declared type of this condition
    pub fn kind(&self) -> ConditionKind {
        match self {
            Condition::Field(_) => ConditionKind::Field,
            Condition::Tag(_) => ConditionKind::Tag,
            Condition::Event(_) => ConditionKind::Event,
            Condition::NaturalLanguage(_) => ConditionKind::NaturalLanguage,
        }
    }

    /// Declared name, if the variant has one
    pub fn name(&self) -> Option<&str> {
        match self {
            Condition::Field(c) => Some(&c.name),
            Condition::Tag(c) => Some(&c.name),
            Condition::Event(c) => Some(&c.name),
            Condition::NaturalLanguage(_) => None,
        }
    }

    /// Name as persisted; natural-language conditions get a synthesized one
    pub fn stored_name(&self) -> &str {
        self.name().unwrap_or(NATURAL_LANGUAGE_NAME)
    }

    /// Canonical, key-sorted JSON representation.
    ///
    /// Two conditions are structurally identical exactly when their canonical
    /// keys are equal; this is what condition union is computed on.
    ///
    /// # Examples
    ///
    /// ```
    /// use clinitag_domain::{Condition, TagReference};
    ///
    /// let c = Condition::Tag(TagReference { name: "sepse_suspeita".into() });
    /// assert_eq!(c.canonical_key(), r#"{"name":"sepse_suspeita","type":"tag"}"#);
    /// ```
    pub fn canonical_key(&self) -> String {
        // serde_json maps are ordered by key, so going through Value sorts them
        serde_json::to_value(self)
            .map(|v| v.to_string())
            .unwrap_or_else(|_| format!("{}:{}", self.kind(), self.stored_name()))
    }
}
