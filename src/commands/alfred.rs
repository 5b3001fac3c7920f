//! Alfred script filter output
//!
//! See Alfred's "Script Filter JSON Format": a top-level `items` array of
//! result rows.

use std::fmt::Display;

use serde::Serialize;

/// A single result row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Item {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    /// Passed to the workflow's next action when the row is chosen
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arg: Option<String>,
    /// Text put in the search box on Tab
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autocomplete: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,
}

impl Item {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.arg = Some(arg.into());
        self
    }

    pub fn autocomplete(mut self, autocomplete: impl Into<String>) -> Self {
        self.autocomplete = Some(autocomplete.into());
        self
    }

    /// Same text as the action argument and the Tab completion
    pub fn action(self, action: impl Into<String>) -> Self {
        let action = action.into();
        self.arg(action.clone()).autocomplete(action)
    }

    pub fn invalid(mut self) -> Self {
        self.valid = Some(false);
        self
    }
}

/// Complete script filter response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScriptFilter {
    pub items: Vec<Item>,
}

impl ScriptFilter {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    /// A single non-actionable row describing the error
    pub fn error(err: impl Display) -> Self {
        Self::new(vec![Item::new(err.to_string())
            .subtitle("alfred-ssh error")
            .invalid()])
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
