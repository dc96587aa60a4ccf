//! Workflow definitions and their conditional evaluation.
//!
//! A workflow is an ordered list of steps. Each step may be gated on an
//! earlier answer (`depends_on` / `show_when`); evaluation walks the list
//! forward and skips steps whose gate does not match.

pub mod answer;
pub mod check;
pub mod editing;
pub mod eligibility;
pub mod model;
pub mod session;

pub use answer::AnswerError;
pub use eligibility::{Eligibility, Variables};
pub use model::{
    Connection, Pattern, Step, StepOption, StepPatch, StepType, ValidationRule, Workflow,
    WorkflowPatch,
};
pub use session::{FlowSession, Progress, Rejection};
