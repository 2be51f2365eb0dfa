//! Console input and output.
//!
//! User-facing results go to stdout through a [`Console`] so they can be
//! piped; diagnostics go through `tracing` to stderr.

use async_trait::async_trait;
use std::io::{self, BufRead, Write};
use tracing::debug;

/// A key answer to an interactive prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Yes,
    No,
    Enter,
    /// Anything that is not a single known key.
    Other,
}

impl Key {
    /// Interprets a line of input as a single key press.
    ///
    /// Only an empty line or a lone `y`/`n` is recognized.
    pub fn from_line(line: &str) -> Self {
        match line.trim() {
            "" => Self::Enter,
            "y" | "Y" => Self::Yes,
            "n" | "N" => Self::No,
            _ => Self::Other,
        }
    }
}

/// Side-effecting console service.
#[async_trait]
pub trait Console: Send + Sync {
    /// Writes text without a trailing newline.
    fn write(&self, text: &str);

    fn write_line(&self, text: &str);

    fn write_error_line(&self, text: &str);

    /// Waits for a key answer from the user.
    async fn read_key(&self) -> io::Result<Key>;
}

/// Console over the process stdin, stdout and stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdConsole;

#[async_trait]
impl Console for StdConsole {
    fn write(&self, text: &str) {
        emit(io::stdout().lock(), text, false, "stdout");
    }

    fn write_line(&self, text: &str) {
        emit(io::stdout().lock(), text, true, "stdout");
    }

    fn write_error_line(&self, text: &str) {
        emit(io::stderr().lock(), text, true, "stderr");
    }

    async fn read_key(&self) -> io::Result<Key> {
        tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            let read = io::stdin().lock().read_line(&mut line)?;
            if read == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stdin closed while waiting for an answer",
                ));
            }
            Ok(Key::from_line(&line))
        })
        .await
        .map_err(io::Error::other)?
    }
}

/// Writes `text` and flushes. Failures such as a closed pipe are logged and
/// otherwise ignored. Returns whether the write succeeded.
fn emit(mut out: impl Write, text: &str, newline: bool, stream: &'static str) -> bool {
    let result = out
        .write_all(text.as_bytes())
        .and_then(|()| if newline { out.write_all(b"\n") } else { Ok(()) })
        .and_then(|()| out.flush());
    match result {
        Ok(()) => true,
        Err(e) => {
            debug!(stream, error = %e, "Console write failed");
            false
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
mod memory {
    use super::{Console, Key};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::{collections::VecDeque, io, sync::Arc};

    #[derive(Debug, Default)]
    struct Inner {
        keys: VecDeque<Key>,
        out: String,
        err: Vec<String>,
        prompts: usize,
    }

    /// Console double with scripted key answers and captured output.
    #[derive(Debug, Clone, Default)]
    pub struct MemoryConsole {
        inner: Arc<Mutex<Inner>>,
    }

    impl MemoryConsole {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queues key answers returned by successive `read_key` calls.
        pub fn with_keys(keys: impl IntoIterator<Item = Key>) -> Self {
            let console = Self::default();
            console.inner.lock().keys.extend(keys);
            console
        }

        /// Everything written to the output stream.
        pub fn output(&self) -> String {
            self.inner.lock().out.clone()
        }

        pub fn output_lines(&self) -> Vec<String> {
            self.inner.lock().out.lines().map(str::to_string).collect()
        }

        pub fn error_lines(&self) -> Vec<String> {
            self.inner.lock().err.clone()
        }

        /// Number of `read_key` calls made.
        pub fn prompts(&self) -> usize {
            self.inner.lock().prompts
        }
    }

    #[async_trait]
    impl Console for MemoryConsole {
        fn write(&self, text: &str) {
            self.inner.lock().out.push_str(text);
        }

        fn write_line(&self, text: &str) {
            let mut inner = self.inner.lock();
            inner.out.push_str(text);
            inner.out.push('\n');
        }

        fn write_error_line(&self, text: &str) {
            self.inner.lock().err.push(text.to_string());
        }

        async fn read_key(&self) -> io::Result<Key> {
            let mut inner = self.inner.lock();
            inner.prompts += 1;
            inner
                .keys
                .pop_front()
                .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted keys"))
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryConsole;
