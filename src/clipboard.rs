//! Clipboard backends.
//!
//! The engine only ever writes plain text. [`MemoryClipboard`] keeps the last
//! payload in memory; [`CommandClipboard`] pipes it into an external program
//! such as `wl-copy`, `pbcopy` or `xclip -selection clipboard`.

use std::process::Stdio;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::io::AsyncWriteExt;

use crate::error::ClipboardError;

/// Asynchronous text clipboard.
pub trait Clipboard: Send + Sync {
    /// Write `text` to the clipboard.
    fn write_text(&self, text: String) -> BoxFuture<'static, Result<(), ClipboardError>>;
}

#[derive(Debug, Default)]
struct MemoryState {
    contents: Option<String>,
    writes: usize,
    failing: bool,
}

/// In-memory clipboard.
///
/// Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryClipboard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A clipboard that rejects every write.
    #[must_use]
    pub fn failing() -> Self {
        let clipboard = Self::default();
        clipboard.set_failing(true);
        clipboard
    }

    pub fn set_failing(&self, failing: bool) {
        self.state.lock().failing = failing;
    }

    /// Last text written.
    #[must_use]
    pub fn contents(&self) -> Option<String> {
        self.state.lock().contents.clone()
    }

    /// Number of successful writes.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.state.lock().writes
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&self, text: String) -> BoxFuture<'static, Result<(), ClipboardError>> {
        let result = {
            let mut state = self.state.lock();
            if state.failing {
                Err(ClipboardError::WriteFailed("clipboard rejected write".to_string()))
            } else {
                state.contents = Some(text);
                state.writes += 1;
                Ok(())
            }
        };
        futures::future::ready(result).boxed()
    }
}

/// Clipboard backed by an external command reading from stdin.
#[derive(Debug, Clone)]
pub struct CommandClipboard {
    program: String,
    args: Vec<String>,
}

impl CommandClipboard {
    /// Parse a whitespace-separated command line.
    ///
    /// # Errors
    ///
    /// Returns an error if the command line is empty.
    pub fn parse(command: &str) -> Result<Self, ClipboardError> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| ClipboardError::Unavailable("empty clipboard command".to_string()))?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl Clipboard for CommandClipboard {
    fn write_text(&self, text: String) -> BoxFuture<'static, Result<(), ClipboardError>> {
        let program = self.program.clone();
        let args = self.args.clone();
        async move {
            let mut child = tokio::process::Command::new(&program)
                .args(&args)
                .stdin(Stdio::piped())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
                .map_err(|e| ClipboardError::Unavailable(format!("{program}: {e}")))?;

            if let Some(mut stdin) = child.stdin.take() {
                stdin
                    .write_all(text.as_bytes())
                    .await
                    .map_err(|e| ClipboardError::WriteFailed(e.to_string()))?;
            }

            let status = child
                .wait()
                .await
                .map_err(|e| ClipboardError::WriteFailed(e.to_string()))?;
            if status.success() {
                Ok(())
            } else {
                Err(ClipboardError::WriteFailed(format!("{program} exited with {status}")))
            }
        }
        .boxed()
    }
}
