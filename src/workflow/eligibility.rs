//! Conditional visibility: which step a bot asks next.
//!
//! A step is eligible when it has no gate, or when the collected answer for
//! its `depends_on` field equals its `show_when` value. Gates that can never
//! be resolved (no other step produces the field, or no `show_when`) fail
//! open. The scan is strictly forward over the step order; connections are
//! never consulted.

use std::collections::HashMap;

use super::model::{Step, Workflow};

/// Collected answers, keyed by field name.
pub type Variables = HashMap<String, String>;

/// Precomputed view of which fields a step list produces.
pub struct Eligibility<'a> {
    steps: &'a [Step],
    producers: HashMap<&'a str, usize>,
}

impl<'a> Eligibility<'a> {
    pub fn new(steps: &'a [Step]) -> Self {
        let mut producers = HashMap::new();
        for step in steps {
            *producers.entry(step.field_name.as_str()).or_insert(0) += 1;
        }
        Self { steps, producers }
    }

    /// Whether `step`'s gate refers to a field some other step produces.
    fn gate_resolves(&self, step: &Step, depends_on: &str) -> bool {
        let count = self.producers.get(depends_on).copied().unwrap_or(0);
        let own = usize::from(step.field_name == depends_on);
        count > own
    }

    /// Whether `step` should be presented given `variables`.
    pub fn is_eligible(&self, step: &Step, variables: &Variables) -> bool {
        let Some(depends_on) = step.depends_on.as_deref() else {
            return true;
        };
        let Some(show_when) = step.show_when.as_deref() else {
            return true;
        };
        if !self.gate_resolves(step, depends_on) {
            return true;
        }
        variables.get(depends_on).map(String::as_str) == Some(show_when)
    }

    /// Index of the first eligible step at or after `from`.
    pub fn next_from(&self, from: usize, variables: &Variables) -> Option<usize> {
        self.steps
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, step)| self.is_eligible(step, variables))
            .map(|(idx, _)| idx)
    }
}

impl Workflow {
    /// First eligible step at index `from` or later.
    pub fn next_eligible(&self, from: usize, variables: &Variables) -> Option<(usize, &Step)> {
        let idx = Eligibility::new(&self.steps).next_from(from, variables)?;
        Some((idx, &self.steps[idx]))
    }

    /// Every step that would be presented for a fixed set of answers, in order.
    pub fn eligible_steps(&self, variables: &Variables) -> Vec<&Step> {
        let eligibility = Eligibility::new(&self.steps);
        self.steps
            .iter()
            .filter(|step| eligibility.is_eligible(step, variables))
            .collect()
    }
}
