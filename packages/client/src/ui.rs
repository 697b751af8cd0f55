//! Terminal helpers shared by the interactive clients.

use std::io::Write;

use rustyline::{DefaultEditor, error::ReadlineError};

pub const CHAT_PROMPT: &str = "> ";
pub const FILE_PROMPT: &str = "command> ";

/// Redisplay the prompt after printing a message received in the background
pub fn redisplay_prompt(prompt: &str) {
    print!("{}", prompt);
    std::io::stdout().flush().ok();
}

/// Rewrite the current terminal line with a download percentage
pub fn show_progress(received: u64, total: u64) {
    let percent = if total == 0 {
        100.0
    } else {
        received as f64 / total as f64 * 100.0
    };
    print!("\rProgress: {:.1}%", percent);
    std::io::stdout().flush().ok();
}

/// Line editor running on its own thread, asked for one line at a time.
///
/// rustyline blocks, so it lives outside the async runtime; the session only
/// asks for the next line once the previous reply has been printed.
pub struct Prompter {
    requests: std::sync::mpsc::Sender<()>,
    lines: tokio::sync::mpsc::UnboundedReceiver<Result<String, ReadlineError>>,
}

impl Prompter {
    pub fn spawn(prompt: &'static str) -> Self {
        let (requests, request_rx) = std::sync::mpsc::channel::<()>();
        let (line_tx, lines) = tokio::sync::mpsc::unbounded_channel();

        std::thread::spawn(move || {
            let mut rl = match DefaultEditor::new() {
                Ok(rl) => rl,
                Err(e) => {
                    let _ = line_tx.send(Err(e));
                    return;
                }
            };

            while request_rx.recv().is_ok() {
                let line = rl.readline(prompt);
                if let Ok(line) = &line {
                    rl.add_history_entry(line.trim()).ok();
                }
                let failed = line.is_err();
                if line_tx.send(line).is_err() || failed {
                    break;
                }
            }
        });

        Self { requests, lines }
    }

    /// Prompt for the next line; Ctrl+C and Ctrl+D come back as errors.
    pub async fn next_line(&mut self) -> Result<String, ReadlineError> {
        if self.requests.send(()).is_err() {
            return Err(ReadlineError::Eof);
        }
        self.lines.recv().await.unwrap_or(Err(ReadlineError::Eof))
    }
}
