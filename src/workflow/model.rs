//! Workflow data model: steps, options, connections, and the workflow itself.
//!
//! Field names on the wire follow the backend (`flujoBot`, `stepId`,
//! `fieldName`, `dependsOn`, `showWhen`).

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// The kind of answer a step collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    Text,
    Email,
    Phone,
    Number,
    Select,
}

impl std::fmt::Display for StepType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Text => "text",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Number => "number",
            Self::Select => "select",
        };
        write!(f, "{s}")
    }
}

/// How an answer to a step is checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRule {
    pub required: bool,
    #[serde(rename = "type")]
    pub kind: StepType,
    /// Extra regular expression the answer must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<Pattern>,
}

/// A user-supplied regular expression, compiled once on first use.
///
/// Serialized as its source string. Equality compares sources only.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    compiled: OnceLock<Result<Regex, regex::Error>>,
}

impl Pattern {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            compiled: OnceLock::new(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The compiled expression, or why the source does not compile.
    pub fn regex(&self) -> Result<&Regex, &regex::Error> {
        self.compiled
            .get_or_init(|| Regex::new(&self.source))
            .as_ref()
    }
}

impl std::fmt::Debug for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Pattern").field(&self.source).finish()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Pattern {}

impl From<&str> for Pattern {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}

impl From<String> for Pattern {
    fn from(source: String) -> Self {
        Self::new(source)
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

impl ValidationRule {
    /// A required rule of the given kind.
    pub fn required(kind: StepType) -> Self {
        Self {
            required: true,
            kind,
            pattern: None,
        }
    }
}

/// One choice of a select step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOption {
    pub id: String,
    /// Shown to the user.
    pub label: String,
    /// Stored as the answer.
    pub value: String,
}

impl StepOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: format!("opt-{}", Uuid::new_v4().simple()),
            label: label.into(),
            value: value.into(),
        }
    }
}

/// A single question in a bot workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub step_id: String,
    /// Variable the answer is written into.
    pub field_name: String,
    #[serde(rename = "type")]
    pub step_type: StepType,
    pub question: String,
    pub validation: ValidationRule,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<StepOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Field name of the step whose answer gates this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<String>,
    /// Answer value of `depends_on` that makes this step eligible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_when: Option<String>,
}

impl Step {
    /// Create a step with a fresh id and a required validation rule matching its type.
    pub fn new(
        field_name: impl Into<String>,
        step_type: StepType,
        question: impl Into<String>,
    ) -> Self {
        Self {
            step_id: format!("step-{}", Uuid::new_v4().simple()),
            field_name: field_name.into(),
            step_type,
            question: question.into(),
            validation: ValidationRule::required(step_type),
            options: Vec::new(),
            error_message: None,
            depends_on: None,
            show_when: None,
        }
    }

    /// Builder: set an explicit step id.
    pub fn with_id(mut self, step_id: impl Into<String>) -> Self {
        self.step_id = step_id.into();
        self
    }

    /// Builder: append an option.
    pub fn with_option(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push(StepOption::new(label, value));
        self
    }

    /// Builder: gate this step on another field's answer.
    pub fn shown_when(mut self, depends_on: impl Into<String>, value: impl Into<String>) -> Self {
        self.depends_on = Some(depends_on.into());
        self.show_when = Some(value.into());
        self
    }

    /// Builder: override the failure message.
    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Builder: replace the validation rule.
    pub fn with_validation(mut self, validation: ValidationRule) -> Self {
        self.validation = validation;
        self
    }

    /// Whether this step carries a visibility gate.
    pub fn is_conditional(&self) -> bool {
        self.depends_on.is_some()
    }

    /// Find the option whose `value` equals `value`.
    pub fn option_by_value(&self, value: &str) -> Option<&StepOption> {
        self.options.iter().find(|o| o.value == value)
    }
}

/// Partial update for a step. `None` leaves a field unchanged.
///
/// The nested options carry their own `Option` so a gate or an override
/// message can be cleared with `Some(None)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepPatch {
    #[serde(default)]
    pub field_name: Option<String>,
    #[serde(default, rename = "type")]
    pub step_type: Option<StepType>,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub validation: Option<ValidationRule>,
    #[serde(default)]
    pub options: Option<Vec<StepOption>>,
    #[serde(default)]
    pub error_message: Option<Option<String>>,
    #[serde(default)]
    pub depends_on: Option<Option<String>>,
    #[serde(default)]
    pub show_when: Option<Option<String>>,
}

impl StepPatch {
    /// Merge the set fields into `step`. The step id never changes.
    ///
    /// A new `step_type` without a new `validation` also retargets the
    /// existing rule to that type.
    pub fn apply_to(self, step: &mut Step) {
        if let Some(f) = self.field_name {
            step.field_name = f;
        }
        if let Some(t) = self.step_type {
            step.step_type = t;
            step.validation.kind = t;
        }
        if let Some(q) = self.question {
            step.question = q;
        }
        if let Some(v) = self.validation {
            step.validation = v;
        }
        if let Some(o) = self.options {
            step.options = o;
        }
        if let Some(m) = self.error_message {
            step.error_message = m;
        }
        if let Some(d) = self.depends_on {
            step.depends_on = d;
        }
        if let Some(s) = self.show_when {
            step.show_when = s;
        }
    }
}

/// A visual edge between two steps. Never used for execution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,
    pub source_step_id: String,
    pub target_step_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl Connection {
    pub fn new(source_step_id: impl Into<String>, target_step_id: impl Into<String>) -> Self {
        Self {
            id: format!("conn-{}", Uuid::new_v4().simple()),
            source_step_id: source_step_id.into(),
            target_step_id: target_step_id.into(),
            label: None,
            condition: None,
        }
    }

    /// Builder: set the edge label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// An ordered questionnaire owned by one company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub id: String,
    pub company_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Authoritative execution order.
    #[serde(rename = "flujoBot", default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workflow {
    /// Create an empty, inactive workflow.
    pub fn new(
        id: impl Into<String>,
        company_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            company_id: company_id.into(),
            name: name.into(),
            description: String::new(),
            steps: Vec::new(),
            connections: Vec::new(),
            active: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder: set description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder: append a step.
    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn step(&self, step_id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.step_id == step_id)
    }

    /// Position of a step in the execution order.
    pub fn position(&self, step_id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.step_id == step_id)
    }

    /// Whether any step writes into `field_name`.
    pub fn produces(&self, field_name: &str) -> bool {
        self.steps.iter().any(|s| s.field_name == field_name)
    }
}

/// Metadata update for a workflow (name, description, active flag).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl WorkflowPatch {
    pub fn apply_to(&self, workflow: &mut Workflow) {
        if let Some(n) = &self.name {
            workflow.name = n.clone();
        }
        if let Some(d) = &self.description {
            workflow.description = d.clone();
        }
        if let Some(a) = self.active {
            workflow.active = a;
        }
    }
}
