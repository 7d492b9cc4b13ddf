use std::io::Write;
use std::process::{Command, Stdio};

use crate::error::ClipboardError;

pub trait Clipboard: Send + Sync {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Pipes text into a system clipboard command.
#[derive(Debug, Clone)]
pub struct CommandClipboard {
    candidates: Vec<Vec<String>>,
}

const DEFAULT_COMMANDS: [&[&str]; 5] = [
    &["pbcopy"],
    &["wl-copy"],
    &["xclip", "-selection", "clipboard"],
    &["xsel", "--clipboard", "--input"],
    &["clip"],
];

impl CommandClipboard {
    /// Uses `command` (split on whitespace) when given, otherwise the first
    /// platform command that runs.
    pub fn new(command: Option<&str>) -> Self {
        let candidates = match command.map(str::trim).filter(|value| !value.is_empty()) {
            Some(command) => vec![command.split_whitespace().map(str::to_string).collect()],
            None => DEFAULT_COMMANDS
                .iter()
                .map(|argv| argv.iter().map(|arg| arg.to_string()).collect())
                .collect(),
        };
        Self { candidates }
    }
}

impl Clipboard for CommandClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        for argv in &self.candidates {
            let Some((program, args)) = argv.split_first() else {
                continue;
            };
            let child = Command::new(program)
                .args(args)
                .stdin(Stdio::piped())
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .spawn();
            let mut child = match child {
                Ok(child) => child,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => return Err(ClipboardError::Failed(format!("{}: {}", program, err))),
            };
            if let Some(mut stdin) = child.stdin.take()
                && let Err(err) = stdin.write_all(text.as_bytes())
            {
                drop(stdin);
                let _ = child.kill();
                let _ = child.wait();
                return Err(ClipboardError::Failed(format!("{}: {}", program, err)));
            }
            let output = child
                .wait_with_output()
                .map_err(|err| ClipboardError::Failed(format!("{}: {}", program, err)))?;
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(ClipboardError::Failed(format!(
                    "{} exited with {}: {}",
                    program,
                    output.status,
                    stderr.trim()
                )));
            }
            return Ok(());
        }
        Err(ClipboardError::Unavailable)
    }
}
