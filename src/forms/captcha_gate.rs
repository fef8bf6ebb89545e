//! Captcha challenge state for a client form.
//!
//! The challenge is only requested after the first submit attempt. Once
//! solved, the token is tied to the values of the tracked fields at that
//! moment: editing any of them drops the token, and a failed submission
//! discards it as well.

use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Editing,
    ChallengeRequired,
    ChallengeSatisfied,
    Submitting,
}

/// Outcome of a submit attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitDecision {
    /// Show the challenge widget; nothing is sent yet.
    ShowChallenge,
    /// The challenge is visible but unsolved.
    AwaitChallenge,
    /// Send the form with this token.
    Send(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("a submission is already in flight")]
    AlreadySubmitting,
    #[error("no challenge is pending in state {0:?}")]
    NoPendingChallenge(GateState),
    #[error("no submission is in flight")]
    NotSubmitting,
}

#[derive(Debug, Clone)]
pub struct CaptchaGate {
    state: GateState,
    tracked: Vec<String>,
    values: HashMap<String, String>,
    snapshot: HashMap<String, String>,
    token: Option<String>,
}

impl CaptchaGate {
    pub fn new<I, S>(tracked: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            state: GateState::Editing,
            tracked: tracked.into_iter().map(Into::into).collect(),
            values: HashMap::new(),
            snapshot: HashMap::new(),
            token: None,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_tracked(&self, field: &str) -> bool {
        self.tracked.iter().any(|f| f == field)
    }

    pub fn submit_attempted(&mut self) -> Result<SubmitDecision, GateError> {
        match self.state {
            GateState::Editing => {
                self.state = GateState::ChallengeRequired;
                Ok(SubmitDecision::ShowChallenge)
            }
            GateState::ChallengeRequired => Ok(SubmitDecision::AwaitChallenge),
            GateState::ChallengeSatisfied => match self.token.clone() {
                Some(token) => {
                    self.state = GateState::Submitting;
                    Ok(SubmitDecision::Send(token))
                }
                None => {
                    self.state = GateState::ChallengeRequired;
                    Ok(SubmitDecision::AwaitChallenge)
                }
            },
            GateState::Submitting => Err(GateError::AlreadySubmitting),
        }
    }

    pub fn challenge_completed(&mut self, token: impl Into<String>) -> Result<(), GateError> {
        if self.state != GateState::ChallengeRequired {
            return Err(GateError::NoPendingChallenge(self.state));
        }
        self.snapshot = self
            .tracked
            .iter()
            .map(|field| (field.clone(), self.values.get(field).cloned().unwrap_or_default()))
            .collect();
        self.token = Some(token.into());
        self.state = GateState::ChallengeSatisfied;
        Ok(())
    }

    /// Records a field edit. Returns true when the edit invalidated the token.
    pub fn field_changed(&mut self, name: &str, value: impl Into<String>) -> bool {
        let value = value.into();
        let stale = self.state == GateState::ChallengeSatisfied
            && self.is_tracked(name)
            && self.snapshot.get(name).map(String::as_str).unwrap_or_default() != value;
        self.values.insert(name.to_string(), value);

        if stale {
            self.token = None;
            self.snapshot.clear();
            self.state = GateState::ChallengeRequired;
        }
        stale
    }

    pub fn submission_finished(&mut self, ok: bool) -> Result<(), GateError> {
        if self.state != GateState::Submitting {
            return Err(GateError::NotSubmitting);
        }
        self.token = None;
        self.snapshot.clear();
        if ok {
            self.values.clear();
            self.state = GateState::Editing;
        } else {
            self.state = GateState::ChallengeRequired;
        }
        Ok(())
    }
}
