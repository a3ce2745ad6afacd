use crate::modules::traits::OverwritePolicy;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::sync::mpsc::{self, Receiver};
use std::sync::{Mutex, OnceLock};
use std::thread;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_PROMPT_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysOverwrite;

impl OverwritePolicy for AlwaysOverwrite {
    fn confirm_overwrite(&self, _path: &Path) -> bool {
        true
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NeverOverwrite;

impl OverwritePolicy for NeverOverwrite {
    fn confirm_overwrite(&self, _path: &Path) -> bool {
        false
    }
}

/// Asks on the terminal and treats silence past `timeout` as "no".
#[derive(Debug, Clone, Copy)]
pub struct PromptOverwrite {
    pub timeout: Duration,
}

impl Default for PromptOverwrite {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_PROMPT_TIMEOUT,
        }
    }
}

impl OverwritePolicy for PromptOverwrite {
    fn confirm_overwrite(&self, path: &Path) -> bool {
        let answers = stdin_answers();
        answers.discard_pending();

        let mut stderr = std::io::stderr().lock();
        let _ = write!(
            stderr,
            "Path [{}] exists. Overwrite? [y/N] ({} sec)\n > ",
            path.display(),
            self.timeout.as_secs()
        );
        let _ = stderr.flush();
        drop(stderr);

        let answer = answers.next_answer(self.timeout).unwrap_or_default();
        debug!(answer = %answer.trim(), "overwrite prompt answered");
        is_yes(&answer)
    }
}

/// Lines read from one input by a single background thread.
///
/// A prompt that times out leaves the reader blocked; the next prompt picks
/// up whatever it reads instead of racing a second reader.
struct AnswerChannel {
    lines: Mutex<Receiver<String>>,
}

impl AnswerChannel {
    fn spawn<R>(mut input: R) -> Self
    where
        R: BufRead + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            loop {
                let mut line = String::new();
                match input.read_line(&mut line) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                }
            }
        });
        Self {
            lines: Mutex::new(rx),
        }
    }

    /// Drops lines typed while no prompt was waiting.
    fn discard_pending(&self) {
        if let Ok(lines) = self.lines.lock() {
            while lines.try_recv().is_ok() {}
        }
    }

    fn next_answer(&self, timeout: Duration) -> Option<String> {
        let lines = self.lines.lock().ok()?;
        lines.recv_timeout(timeout).ok()
    }
}

fn stdin_answers() -> &'static AnswerChannel {
    static STDIN_ANSWERS: OnceLock<AnswerChannel> = OnceLock::new();
    STDIN_ANSWERS.get_or_init(|| AnswerChannel::spawn(BufReader::new(std::io::stdin())))
}

fn is_yes(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("y")
}
