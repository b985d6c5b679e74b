//! Modal prompts as a synchronous request/response.
//!
//! The engine describes what to ask with a [`Prompt`] and the host answers
//! through a [`Prompter`], blocking (or awaiting) until the user picks an
//! option. A prompt has up to three buttons: a primary action, an optional
//! alternate (typically "Delete" or "No"), and an optional cancel. It may also
//! carry a text input, a colour picker, and a list of selectable items.

#[cfg(test)]
#[path = "dialog_test.rs"]
mod dialog_test;

/// A selectable list entry, such as a glyph in the gallery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptItem {
    pub label: String,
    /// Preview image URL.
    pub image: Option<String>,
    /// Caller-defined identifier.
    pub id: Option<String>,
}

/// What to ask the user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Prompt {
    pub message: String,
    /// Initial text when a text input is shown.
    pub input: Option<String>,
    /// Label and initial value when a colour picker is shown.
    pub colour: Option<(String, String)>,
    pub primary: String,
    pub alternate: Option<String>,
    pub cancel: Option<String>,
    pub items: Vec<PromptItem>,
}

/// The user's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserChoice {
    /// Primary button, with the final input text and colour when those were shown.
    Confirm { text: Option<String>, colour: Option<String> },
    /// Alternate button.
    Alternate,
    /// Cancel button, or the dialog was dismissed.
    Cancel,
    /// A list item was chosen, by index into [`Prompt::items`].
    ListItem(usize),
}

impl UserChoice {
    /// Confirm with no input.
    #[must_use]
    pub fn ok() -> Self {
        Self::Confirm { text: None, colour: None }
    }

    /// Confirm with typed text.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Confirm { text: Some(text.into()), colour: None }
    }

    /// Trimmed, non-empty input text of a confirmation.
    #[must_use]
    pub fn confirmed_text(&self) -> Option<&str> {
        match self {
            Self::Confirm { text: Some(text), .. } => Some(text.trim()).filter(|t| !t.is_empty()),
            _ => None,
        }
    }

    /// Non-empty colour of a confirmation.
    #[must_use]
    pub fn confirmed_colour(&self) -> Option<&str> {
        match self {
            Self::Confirm { colour: Some(colour), .. } => Some(colour.as_str()).filter(|c| !c.is_empty()),
            _ => None,
        }
    }
}

impl Prompt {
    /// An acknowledgement-only message box.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self { message: message.into(), primary: "OK".into(), ..Self::default() }
    }

    /// A text prompt with OK/Cancel.
    #[must_use]
    pub fn text(message: impl Into<String>, initial: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            input: Some(initial.into()),
            primary: "OK".into(),
            cancel: Some("Cancel".into()),
            ..Self::default()
        }
    }

    /// A Yes/No/Cancel question.
    #[must_use]
    pub fn yes_no_cancel(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            primary: "Yes".into(),
            alternate: Some("No".into()),
            cancel: Some("Cancel".into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_primary(mut self, label: impl Into<String>) -> Self {
        self.primary = label.into();
        self
    }

    #[must_use]
    pub fn with_alternate(mut self, label: impl Into<String>) -> Self {
        self.alternate = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, label: impl Into<String>) -> Self {
        self.cancel = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_colour(mut self, label: impl Into<String>, initial: impl Into<String>) -> Self {
        self.colour = Some((label.into(), initial.into()));
        self
    }

    #[must_use]
    pub fn with_items(mut self, items: Vec<PromptItem>) -> Self {
        self.items = items;
        self
    }

    /// Map a key press to a choice: Enter triggers the primary button and
    /// Escape the cancel button, when shown.
    #[must_use]
    pub fn choice_for_key(&self, key: &str, text: Option<&str>, colour: Option<&str>) -> Option<UserChoice> {
        match key {
            "Enter" if !self.primary.is_empty() => Some(UserChoice::Confirm {
                text: self.input.as_ref().map(|initial| text.unwrap_or(initial).to_owned()),
                colour: self.colour.as_ref().map(|(_, initial)| colour.unwrap_or(initial).to_owned()),
            }),
            "Escape" | "Esc" if self.cancel.is_some() => Some(UserChoice::Cancel),
            _ => None,
        }
    }
}

/// Answers prompts on behalf of the user.
pub trait Prompter {
    fn prompt(&mut self, prompt: &Prompt) -> UserChoice;
}

impl<F> Prompter for F
where
    F: FnMut(&Prompt) -> UserChoice,
{
    fn prompt(&mut self, prompt: &Prompt) -> UserChoice {
        self(prompt)
    }
}
