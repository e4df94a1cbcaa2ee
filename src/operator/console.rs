use std::io::{stdin, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use crate::operator::{Button, Operator, Prompt, PromptKind, Response};

const CANCEL: &str = "-";

/// Asks questions on stderr and reads answers from stdin.
///
/// Stdin is read on a detached thread feeding a channel, so a prompt that
/// times out leaves no read in flight. Lines that arrive for an abandoned
/// prompt are discarded before the next question.
pub struct ConsoleOperator {
    lines: Mutex<mpsc::Receiver<String>>,
    abandoned: AtomicBool
}

impl ConsoleOperator {
    pub fn spawn() -> Self {
        let (sender, receiver) = mpsc::channel(16);

        thread::spawn(move || {
            for line in stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };

                if sender.blocking_send(line).is_err() {
                    break;
                }
            }

            debug!("Console input closed");
        });

        Self::from_receiver(receiver)
    }

    pub fn from_receiver(receiver: mpsc::Receiver<String>) -> Self {
        Self {
            lines: Mutex::new(receiver),
            abandoned: AtomicBool::new(false)
        }
    }
}

impl Operator for ConsoleOperator {
    async fn ask(&self, prompt: Prompt) -> Option<Response> {
        let mut lines = self.lines.lock().await;

        if self.abandoned.swap(false, Ordering::Relaxed) {
            while lines.try_recv().is_ok() {}
        }

        let choices = match prompt.kind {
            PromptKind::Confirm => "[y/n]".to_string(),
            PromptKind::Notice => "[enter]".to_string(),
            PromptKind::Text => format!("[{}] ('{CANCEL}' to cancel)", prompt.default_value)
        };
        eprintln!("\n== {} ==\n{}\n{choices}", prompt.title, prompt.message);

        self.abandoned.store(true, Ordering::Relaxed);
        let line = lines.recv().await;
        self.abandoned.store(false, Ordering::Relaxed);

        parse_reply(&prompt, &line?)
    }
}

fn parse_reply(prompt: &Prompt, line: &str) -> Option<Response> {
    let reply = line.trim();

    match prompt.kind {
        PromptKind::Notice => Some(Response::button(Button::Ok)),
        PromptKind::Text if reply == CANCEL => Some(Response::button(Button::Cancel)),
        PromptKind::Text if reply.is_empty() => Some(Response::text(&prompt.default_value)),
        PromptKind::Text => Some(Response::text(reply)),
        PromptKind::Confirm => match reply.to_lowercase().as_str() {
            "y" | "yes" | "д" | "да" => Some(Response::button(Button::Yes)),
            "n" | "no" | "н" | "нет" => Some(Response::button(Button::No)),
            _ => None
        }
    }
}
