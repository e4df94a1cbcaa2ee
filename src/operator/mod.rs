mod console;

use std::future::Future;

pub use console::ConsoleOperator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// Yes/no question.
    Confirm,
    /// Information acknowledged with OK.
    Notice,
    /// Free text with a pre-filled default, OK or cancel.
    Text
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub title: String,
    pub message: String,
    pub kind: PromptKind,
    pub default_value: String
}

impl Prompt {
    pub fn confirm(title: &str, message: impl Into<String>) -> Self {
        Self::new(title, message.into(), PromptKind::Confirm, String::new())
    }

    pub fn notice(title: &str, message: impl Into<String>) -> Self {
        Self::new(title, message.into(), PromptKind::Notice, String::new())
    }

    pub fn text(title: &str, message: impl Into<String>, default_value: &str) -> Self {
        Self::new(title, message.into(), PromptKind::Text, default_value.to_string())
    }

    fn new(title: &str, message: String, kind: PromptKind, default_value: String) -> Self {
        Self { title: title.to_string(), message, kind, default_value }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Yes,
    No,
    Ok,
    Cancel
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub button: Button,
    pub text: String
}

impl Response {
    pub fn button(button: Button) -> Self {
        Self { button, text: String::new() }
    }

    pub fn text(text: &str) -> Self {
        Self { button: Button::Ok, text: text.to_string() }
    }

    pub fn is_yes(&self) -> bool {
        self.button == Button::Yes
    }
}

/// A human who can be asked questions mid-run.
///
/// Implementations may block for as long as they like; the engine bounds every
/// call with its prompt timeout and treats silence as "no".
pub trait Operator {
    /// `None` when the prompt was closed without an answer.
    fn ask(&self, prompt: Prompt) -> impl Future<Output = Option<Response>> + Send;
}

/// Operator for unattended runs: never answers.
pub struct SilentOperator;

impl Operator for SilentOperator {
    async fn ask(&self, _prompt: Prompt) -> Option<Response> {
        None
    }
}

#[cfg(test)]
impl<T: Operator + Sync> Operator for &T {
    fn ask(&self, prompt: Prompt) -> impl Future<Output = Option<Response>> + Send {
        (**self).ask(prompt)
    }
}

/// Operator replaying canned answers, recording what it was asked.
#[cfg(test)]
pub struct ScriptedOperator {
    answers: std::sync::Mutex<std::collections::VecDeque<Option<Response>>>,
    asked: std::sync::Mutex<Vec<Prompt>>
}

#[cfg(test)]
impl ScriptedOperator {
    pub fn new(answers: Vec<Option<Response>>) -> Self {
        Self {
            answers: std::sync::Mutex::new(answers.into()),
            asked: std::sync::Mutex::new(Vec::new())
        }
    }

    pub fn asked(&self) -> Vec<Prompt> {
        self.asked.lock().map(|asked| asked.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
impl Operator for ScriptedOperator {
    async fn ask(&self, prompt: Prompt) -> Option<Response> {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push(prompt);
        }

        self.answers.lock().ok().and_then(|mut answers| answers.pop_front()).flatten()
    }
}
