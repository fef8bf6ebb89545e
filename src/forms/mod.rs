//! Client-side form orchestration shared with the web front end.

pub mod captcha_gate;
pub mod wizard;

pub use captcha_gate::{CaptchaGate, GateError, GateState, SubmitDecision};
pub use wizard::{IssueReportWizard, WizardStep};
