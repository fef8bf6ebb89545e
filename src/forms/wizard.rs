//! Multi-step issue report form.

use crate::drive::AttachmentInput;
use crate::queries::models::TechnicalIssueInput;
use crate::security::validation::{Validate, ValidationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    Details,
    Environment,
    Attachments,
    Review,
}

impl WizardStep {
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Details => Some(Self::Environment),
            Self::Environment => Some(Self::Attachments),
            Self::Attachments => Some(Self::Review),
            Self::Review => None,
        }
    }

    pub fn previous(self) -> Option<Self> {
        match self {
            Self::Details => None,
            Self::Environment => Some(Self::Details),
            Self::Attachments => Some(Self::Environment),
            Self::Review => Some(Self::Attachments),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IssueReportWizard {
    step: WizardStep,
    pub draft: TechnicalIssueInput,
}

impl Default for IssueReportWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl IssueReportWizard {
    pub fn new() -> Self {
        Self {
            step: WizardStep::Details,
            draft: TechnicalIssueInput::default(),
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    /// Checks only the fields owned by the current step. The review step
    /// re-checks everything.
    pub fn validate_step(&self) -> ValidationResult {
        match self.step {
            WizardStep::Details => self.draft.validate_details(),
            WizardStep::Environment => self.draft.validate_environment(),
            WizardStep::Attachments => self.draft.validate_attachments(),
            WizardStep::Review => self.draft.validate(),
        }
    }

    /// Advances when the current step is valid. On the last step this only
    /// validates.
    pub fn next(&mut self) -> Result<WizardStep, ValidationResult> {
        self.validate_step().into_result()?;
        if let Some(step) = self.step.next() {
            self.step = step;
        }
        Ok(self.step)
    }

    pub fn back(&mut self) -> WizardStep {
        if let Some(step) = self.step.previous() {
            self.step = step;
        }
        self.step
    }

    pub fn add_attachment(&mut self, attachment: AttachmentInput) {
        self.draft.attachments.push(attachment);
    }

    pub fn remove_attachment(&mut self, index: usize) -> Option<AttachmentInput> {
        (index < self.draft.attachments.len()).then(|| self.draft.attachments.remove(index))
    }

    /// The submission body, once every step passes.
    pub fn finish(&self, captcha_token: Option<String>) -> Result<TechnicalIssueInput, ValidationResult> {
        self.draft.validate().into_result()?;
        Ok(TechnicalIssueInput {
            captcha_token,
            ..self.draft.clone()
        })
    }
}
