use std::fmt;

use crate::error::{Result, StudioError};
use crate::studio::Mode;

/// Per-user state: the API credential and the picked example of each mode.
/// One instance lives for one session and is never persisted.
#[derive(Default)]
pub struct Session {
    credential: String,
    credential_set: bool,
    example_prompt: Option<String>,
    example_transform: Option<String>,
    last_example_selection: Option<Mode>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("credential", &"<redacted>")
            .field("credential_set", &self.credential_set)
            .field("example_prompt", &self.example_prompt)
            .field("example_transform", &self.example_transform)
            .finish()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the credential. It is checked against the service on first use,
    /// not here.
    pub fn set(&mut self, credential: impl Into<String>) -> Result<()> {
        let credential = credential.into().trim().to_string();
        if credential.is_empty() {
            return Err(StudioError::AuthConfigError(
                "Please enter an API key.".to_string(),
            ));
        }
        self.credential = credential;
        self.credential_set = true;
        Ok(())
    }

    /// Forgets the credential and any example selection.
    pub fn clear(&mut self) {
        self.credential.clear();
        self.credential_set = false;
        self.example_prompt = None;
        self.example_transform = None;
        self.last_example_selection = None;
    }

    pub fn is_configured(&self) -> bool {
        self.credential_set
    }

    pub fn credential(&self) -> Result<&str> {
        if self.credential_set {
            Ok(&self.credential)
        } else {
            Err(StudioError::AuthConfigError(
                "no API key saved for this session".to_string(),
            ))
        }
    }

    pub fn select_example(&mut self, mode: Mode, example: impl Into<String>) {
        let slot = match mode {
            Mode::Generation => &mut self.example_prompt,
            Mode::Transformation => &mut self.example_transform,
        };
        *slot = Some(example.into());
        self.last_example_selection = Some(mode);
    }

    /// The example picked for `mode`. Picks made in the other mode never show up here.
    pub fn example_for(&self, mode: Mode) -> Option<&str> {
        match mode {
            Mode::Generation => self.example_prompt.as_deref(),
            Mode::Transformation => self.example_transform.as_deref(),
        }
    }

    pub fn last_example_selection(&self) -> Option<&str> {
        self.last_example_selection
            .and_then(|mode| self.example_for(mode))
    }
}
