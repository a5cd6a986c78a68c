//! Gemini CLI subprocess adapter.
//!
//! The executable is invoked as `<cmd> stream -m <model> -p <prompt>`.
//! stdout and stderr are merged line-wise; every non-empty line becomes one
//! response record.

use std::io;
use std::process::Stdio;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio_stream::wrappers::LinesStream;
use tracing::{debug, info, warn};

use super::{single_record, ChatBackend, RecordStream};
use crate::normalizer::cli_line_record;
use crate::{BridgeError, ChatRequest, OutputRecord};

pub const DEFAULT_COMMAND: &str = "gemini";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Executable name or path.
    pub command: String,
    pub model: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_COMMAND.to_owned(),
            model: DEFAULT_MODEL.to_owned(),
        }
    }
}

/// Owns a running child and kills it exactly once, either explicitly
/// through [`ChildGuard::terminate`] or on drop.
#[derive(Debug)]
pub struct ChildGuard {
    child: Option<Child>,
    pid: Option<u32>,
}

impl ChildGuard {
    pub fn new(child: Child) -> Self {
        let pid = child.id();
        Self {
            child: Some(child),
            pid,
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Kill the child. Returns `true` on the first call only.
    ///
    /// This is [`Child::start_kill`], i.e. SIGKILL on unix: the CLI gets no
    /// chance to shut down cleanly. A failing kill (the process already
    /// exited and was reaped) is logged and otherwise ignored. The child
    /// handle is released to tokio, which reaps it in the background.
    pub fn terminate(&mut self) -> bool {
        let Some(mut child) = self.child.take() else {
            return false;
        };
        match child.start_kill() {
            Ok(()) => debug!(pid = ?self.pid, "kill signal sent"),
            Err(e) => debug!(pid = ?self.pid, error = %e, "kill signal failed"),
        }
        true
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        self.terminate();
    }
}

type OutputLines = BoxStream<'static, io::Result<String>>;

pub struct CliBackend {
    config: CliConfig,
}

impl CliBackend {
    pub fn new(config: CliConfig) -> Self {
        Self { config }
    }

    fn command(&self, prompt: &str) -> Command {
        let mut cmd = Command::new(&self.config.command);
        cmd.arg("stream")
            .arg("-m")
            .arg(&self.config.model)
            .arg("-p")
            .arg(prompt)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    /// Launch the CLI and return its guard together with the merged
    /// stdout/stderr line stream.
    pub fn spawn(&self, prompt: &str) -> Result<(ChildGuard, OutputLines), BridgeError> {
        let mut child = self.command(prompt).spawn().map_err(|e| {
            warn!(command = %self.config.command, error = %e, "gemini cli failed to start");
            BridgeError::Launch(e.to_string())
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let guard = ChildGuard::new(child);
        let (Some(stdout), Some(stderr)) = (stdout, stderr) else {
            return Err(BridgeError::Launch("output pipes were not captured".into()));
        };

        info!(
            command = %self.config.command,
            model = %self.config.model,
            pid = ?guard.pid(),
            "gemini cli started"
        );

        let stdout = LinesStream::new(BufReader::new(stdout).lines());
        let stderr = LinesStream::new(BufReader::new(stderr).lines());
        Ok((guard, stream::select(stdout, stderr).boxed()))
    }

    pub fn open_stream(&self, prompt: &str) -> RecordStream {
        match self.spawn(prompt) {
            Ok((guard, lines)) => process_stream(guard, lines),
            Err(e) => single_record(OutputRecord::error(e.to_string())),
        }
    }
}

struct ProcessState {
    guard: ChildGuard,
    lines: OutputLines,
    finished: bool,
}

/// The guard lives inside the stream state, so dropping the stream at any
/// point terminates the process.
fn process_stream(guard: ChildGuard, lines: OutputLines) -> RecordStream {
    let state = ProcessState {
        guard,
        lines,
        finished: false,
    };

    stream::unfold(state, |mut st| async move {
        if st.finished {
            return None;
        }
        loop {
            match st.lines.next().await {
                Some(Ok(line)) => {
                    if let Some(record) = cli_line_record(line) {
                        return Some((record, st));
                    }
                }
                Some(Err(e)) => {
                    st.finished = true;
                    st.guard.terminate();
                    let record = OutputRecord::error(BridgeError::OutputRead(e.to_string()).to_string());
                    return Some((record, st));
                }
                None => {
                    debug!(pid = ?st.guard.pid(), "gemini cli output closed");
                    st.guard.terminate();
                    return None;
                }
            }
        }
    })
    .boxed()
}

#[async_trait]
impl ChatBackend for CliBackend {
    fn name(&self) -> &'static str {
        "gemini-cli"
    }

    async fn stream(&self, request: &ChatRequest) -> RecordStream {
        self.open_stream(request.prompt())
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, BridgeError> {
        let (mut guard, mut lines) = self.spawn(request.prompt())?;
        let mut reply: Vec<String> = Vec::new();
        while let Some(line) = lines.next().await {
            let line = line.map_err(|e| BridgeError::OutputRead(e.to_string()))?;
            if !line.is_empty() {
                reply.push(line);
            }
        }
        guard.terminate();
        Ok(reply.join("\n"))
    }
}
