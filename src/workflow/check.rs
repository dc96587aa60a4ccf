//! Construction checks run before a workflow may be saved.

use std::collections::HashSet;

use super::model::{Step, StepType, Workflow};
use crate::error::StepError;

impl Step {
    /// Check the construction rules of a single step.
    ///
    /// Returns every problem found, not just the first.
    pub fn check(&self) -> Vec<StepError> {
        let mut problems = Vec::new();
        let step_id = || self.step_id.clone();

        if self.field_name.trim().is_empty() {
            problems.push(StepError::MissingFieldName { step_id: step_id() });
        }
        if self.question.trim().is_empty() {
            problems.push(StepError::MissingQuestion { step_id: step_id() });
        }

        let is_select =
            self.step_type == StepType::Select || self.validation.kind == StepType::Select;
        if is_select && self.options.is_empty() {
            problems.push(StepError::NoOptions { step_id: step_id() });
        }

        let mut seen = HashSet::new();
        for option in &self.options {
            if !seen.insert(option.value.as_str()) {
                problems.push(StepError::DuplicateOptionValue {
                    step_id: step_id(),
                    value: option.value.clone(),
                });
            }
        }

        if let Some(depends_on) = &self.depends_on {
            if self.show_when.is_none() {
                problems.push(StepError::MissingShowWhen {
                    step_id: step_id(),
                    depends_on: depends_on.clone(),
                });
            }
            if *depends_on == self.field_name {
                problems.push(StepError::SelfDependency {
                    step_id: step_id(),
                    field_name: self.field_name.clone(),
                });
            }
        }

        if let Some(pattern) = &self.validation.pattern {
            if let Err(e) = pattern.regex() {
                problems.push(StepError::InvalidPattern {
                    step_id: step_id(),
                    reason: e.to_string(),
                });
            }
        }

        problems
    }
}

impl Workflow {
    /// Check every step. An empty result means the workflow may be saved.
    pub fn check(&self) -> Vec<StepError> {
        self.steps.iter().flat_map(Step::check).collect()
    }

    /// Steps whose gate points at a field no other step produces.
    ///
    /// These are shown unconditionally during evaluation. Listed for editor
    /// warnings only; they never block a save.
    pub fn dangling_dependencies(&self) -> Vec<&Step> {
        self.steps
            .iter()
            .filter(|step| match &step.depends_on {
                Some(field) => !self
                    .steps
                    .iter()
                    .any(|other| other.step_id != step.step_id && other.field_name == *field),
                None => false,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::model::{StepOption, ValidationRule};

    #[test]
    fn valid_step_has_no_problems() {
        let step = Step::new("name", StepType::Text, "Name?");
        assert!(step.check().is_empty());
    }

    #[test]
    fn blank_field_name_and_question() {
        let step = Step::new("  ", StepType::Text, "").with_id("s1");
        let problems = step.check();
        assert!(problems.contains(&StepError::MissingFieldName {
            step_id: "s1".into()
        }));
        assert!(problems.contains(&StepError::MissingQuestion {
            step_id: "s1".into()
        }));
    }

    #[test]
    fn select_without_options() {
        let step = Step::new("pick", StepType::Select, "Pick?").with_id("s1");
        assert_eq!(
            step.check(),
            vec![StepError::NoOptions {
                step_id: "s1".into()
            }]
        );
    }

    #[test]
    fn select_validation_kind_also_needs_options() {
        let step = Step::new("pick", StepType::Text, "Pick?")
            .with_validation(ValidationRule::required(StepType::Select));
        assert_eq!(step.check().len(), 1);
    }

    #[test]
    fn duplicate_option_values() {
        let mut step = Step::new("pick", StepType::Select, "Pick?").with_id("s1");
        step.options.push(StepOption::new("One", "1"));
        step.options.push(StepOption::new("Uno", "1"));
        assert_eq!(
            step.check(),
            vec![StepError::DuplicateOptionValue {
                step_id: "s1".into(),
                value: "1".into()
            }]
        );
    }

    #[test]
    fn depends_on_requires_show_when() {
        let mut step = Step::new("qty", StepType::Number, "Qty?").with_id("s1");
        step.depends_on = Some("business".into());
        assert!(matches!(
            step.check().as_slice(),
            [StepError::MissingShowWhen { .. }]
        ));
    }

    #[test]
    fn self_dependency_rejected() {
        let step = Step::new("qty", StepType::Number, "Qty?").shown_when("qty", "1");
        assert!(matches!(
            step.check().as_slice(),
            [StepError::SelfDependency { .. }]
        ));
    }

    #[test]
    fn invalid_pattern_rejected() {
        let step = Step::new("code", StepType::Text, "Code?").with_validation(ValidationRule {
            required: true,
            kind: StepType::Text,
            pattern: Some("([a-z".into()),
        });
        assert!(matches!(
            step.check().as_slice(),
            [StepError::InvalidPattern { .. }]
        ));
    }

    #[test]
    fn workflow_check_collects_all_steps() {
        let wf = Workflow::new("wf", "c", "n")
            .with_step(Step::new("", StepType::Text, "A?"))
            .with_step(Step::new("b", StepType::Select, "B?"));
        assert_eq!(wf.check().len(), 2);
    }

    #[test]
    fn dangling_dependencies_listed() {
        let wf = Workflow::new("wf", "c", "n")
            .with_step(Step::new("business", StepType::Text, "B?"))
            .with_step(Step::new("ok", StepType::Text, "Ok?").shown_when("business", "x"))
            .with_step(
                Step::new("orphan", StepType::Text, "Orphan?")
                    .with_id("s-orphan")
                    .shown_when("gone", "x"),
            );
        let dangling = wf.dangling_dependencies();
        assert_eq!(dangling.len(), 1);
        assert_eq!(dangling[0].step_id, "s-orphan");
        // Advisory only.
        assert!(wf.check().is_empty());
    }
}
