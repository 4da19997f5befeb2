//! Loading event rules and computed value definitions.
//!
//! The rule document is JSON:
//!
//! ```json
//! {
//!   "state_change_events": {
//!     "combat": {
//!       "battle_start": {
//!         "condition": "battle_started",
//!         "description": "A battle began",
//!         "priority": 1,
//!         "data_extract": ["curr.monster.id"]
//!       }
//!     }
//!   },
//!   "computed_values": {
//!     "low_hp": "hp_ratio < 0.3",
//!     "gold_per_kill": { "expression": "gold_delta / curr.character.total_kills" }
//!   }
//! }
//! ```
//!
//! Category and rule keys starting with `_` are reserved and skipped. A
//! missing file loads as an empty [`RuleSet`]. The loaded set is immutable
//! and meant to be shared as `Arc<RuleSet>`.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::computed::BUILTIN_VALUES;
use crate::error::RuleError;
use crate::expression::{Expr, compile};

const DEFAULT_PRIORITY: i64 = 10;

/// One `data_extract` entry of a rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// Key the value is stored under: the last dotted segment of the
    /// expression with parentheses removed.
    pub key: String,
    /// The expression as written.
    pub source: String,
    /// The compiled expression.
    pub expr: Expr,
}

impl Extraction {
    fn new(source: String) -> Self {
        let last = source.rsplit('.').next().unwrap_or(&source);
        let key = last.replace(['(', ')'], "");
        let expr = compile(&source);
        Self { key, source, expr }
    }
}

/// A declarative event rule.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRule {
    /// Id of the event this rule infers.
    pub event_id: String,
    /// The condition as written.
    pub condition: String,
    /// The compiled condition.
    pub compiled: Expr,
    /// Human-readable description.
    pub description: String,
    /// Lower fires earlier. Only affects output order.
    pub priority: i64,
    /// Category the rule was declared under.
    pub category: String,
    /// Values recorded with the event when it fires.
    pub data_extract: Vec<Extraction>,
}

/// A named derived value declared in the rule document.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedDefinition {
    /// Name the value is stored under.
    pub name: String,
    /// The expression as written.
    pub expression: String,
    /// The compiled expression.
    pub compiled: Expr,
}

/// All rules and computed value definitions from one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    categories: Vec<String>,
    rules: Vec<EventRule>,
    computed: Vec<ComputedDefinition>,
}

#[derive(Debug, Default, Deserialize)]
struct RuleDocument {
    #[serde(default)]
    state_change_events: serde_json::Map<String, Value>,
    #[serde(default)]
    computed_values: serde_json::Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawRule {
    #[serde(default)]
    condition: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_priority")]
    priority: i64,
    #[serde(default)]
    data_extract: Vec<String>,
}

const fn default_priority() -> i64 {
    DEFAULT_PRIORITY
}

impl RuleSet {
    /// A rule set with no rules.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the rule document at `path`.
    ///
    /// A missing file is not an error: it logs a warning and yields an empty
    /// rule set.
    pub fn load(path: &Path) -> Result<Self, RuleError> {
        if !path.exists() {
            warn!(path = %path.display(), "Event rules file not found, no rules loaded");
            return Ok(Self::empty());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| RuleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let rules = Self::parse(&contents)?;
        info!(
            path = %path.display(),
            categories = rules.categories.len(),
            rules = rules.rules.len(),
            computed_values = rules.computed.len(),
            "Event rules loaded"
        );
        Ok(rules)
    }

    /// Parse a rule document from a JSON string.
    pub fn parse(json: &str) -> Result<Self, RuleError> {
        let document: RuleDocument = serde_json::from_str(json)?;
        Self::from_document(document)
    }

    fn from_document(document: RuleDocument) -> Result<Self, RuleError> {
        let mut categories = Vec::new();
        let mut rules = Vec::new();

        for (category, events) in document.state_change_events {
            if category.starts_with('_') {
                continue;
            }
            let Value::Object(events) = events else {
                return Err(RuleError::InvalidCategory { category });
            };
            for (event_id, definition) in events {
                if event_id.starts_with('_') {
                    continue;
                }
                let raw: RawRule =
                    serde_json::from_value(definition).map_err(|source| RuleError::InvalidRule {
                        category: category.clone(),
                        event_id: event_id.clone(),
                        source,
                    })?;
                rules.push(EventRule {
                    compiled: compile(&raw.condition),
                    event_id,
                    condition: raw.condition,
                    description: raw.description,
                    priority: raw.priority,
                    category: category.clone(),
                    data_extract: raw.data_extract.into_iter().map(Extraction::new).collect(),
                });
            }
            categories.push(category);
        }

        // Stable: equal priorities keep document order.
        rules.sort_by_key(|rule| rule.priority);

        let mut computed = Vec::new();
        for (name, definition) in document.computed_values {
            let expression = match definition {
                Value::String(expression) => expression,
                Value::Object(mut fields) => match fields.remove("expression") {
                    Some(Value::String(expression)) => expression,
                    _ => return Err(RuleError::InvalidComputed { name }),
                },
                _ => return Err(RuleError::InvalidComputed { name }),
            };
            if BUILTIN_VALUES.contains(&name.as_str()) {
                warn!(name, "Computed value shadows a builtin and is ignored");
                continue;
            }
            computed.push(ComputedDefinition {
                compiled: compile(&expression),
                name,
                expression,
            });
        }

        Ok(Self {
            categories,
            rules,
            computed,
        })
    }

    /// Every rule, ordered by ascending priority.
    pub fn rules(&self) -> &[EventRule] {
        &self.rules
    }

    /// Rules declared under `category`, in priority order.
    pub fn rules_in<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a EventRule> + 'a {
        self.rules.iter().filter(move |rule| rule.category == category)
    }

    /// Category names in document order.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Declared computed values, in document order.
    pub fn computed_definitions(&self) -> &[ComputedDefinition] {
        &self.computed
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether there are no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
