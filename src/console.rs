//! Bounded-time execution of external commands.
use anyhow::{anyhow, Context, Result};
use std::io::Read;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Program invocation: program, arguments, extra environment and cwd.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            cwd: None,
        }
    }

    /// Spec for a program found on `PATH`.
    pub fn locate(name: &str) -> Result<Self> {
        let program = which::which(name).with_context(|| format!("locate {name} on PATH"))?;
        Ok(Self::new(program))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy())
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Shell-quoted command line for logs and error messages.
    pub fn display(&self) -> String {
        let mut words = vec![self.program.to_string_lossy().into_owned()];
        words.extend(self.args.iter().cloned());
        shell_words::join(words)
    }
}

/// Captured result of a finished (or killed) command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub exit_code: Option<i32>,
    pub killed: bool,
}

impl CommandOutput {
    pub fn failed(&self) -> bool {
        self.killed || self.exit_code != Some(0)
    }

    /// Short reason for a failed command.
    pub fn failure_reason(&self) -> String {
        if self.killed {
            return "killed after timeout".to_string();
        }
        let code = self
            .exit_code
            .map(|code| code.to_string())
            .unwrap_or_else(|| "signal".to_string());
        let stderr = self.stderr.join("\n");
        if stderr.trim().is_empty() {
            format!("exit code {code}")
        } else {
            format!("exit code {code}: {}", crate::util::truncate_string(stderr.trim(), 2000))
        }
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut bytes = Vec::new();
        let _ = pipe.read_to_end(&mut bytes);
        bytes
    })
}

fn lines(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<String> {
    let bytes = handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();
    String::from_utf8_lossy(&bytes)
        .lines()
        .map(str::to_string)
        .collect()
}

fn kill_group(child: &mut Child) {
    let Ok(pid) = libc::pid_t::try_from(child.id()) else {
        let _ = child.kill();
        return;
    };
    // The child leads its own process group, so this also reaches grandchildren.
    let result = unsafe { libc::killpg(pid, libc::SIGKILL) };
    if result != 0 {
        let _ = child.kill();
    }
}

/// Run `spec`, killing its process group once `timeout` elapses.
pub fn run(spec: &CommandSpec, timeout: Duration) -> Result<CommandOutput> {
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .envs(spec.envs.iter().map(|(key, value)| (key, value)))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0);
    if let Some(cwd) = spec.cwd.as_ref() {
        cmd.current_dir(cwd);
    }

    tracing::debug!(command = %spec.display(), timeout_secs = timeout.as_secs(), "running command");
    let start = Instant::now();
    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawn {}", spec.display()))?;
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let mut killed = false;
    let status = loop {
        if let Some(status) = child.try_wait().context("check command status")? {
            break status;
        }
        if start.elapsed() > timeout {
            killed = true;
            kill_group(&mut child);
            break child.wait().context("wait for killed command")?;
        }
        thread::sleep(POLL_INTERVAL);
    };

    let output = CommandOutput {
        stdout: lines(stdout),
        stderr: lines(stderr),
        exit_code: status.code(),
        killed,
    };
    tracing::debug!(
        command = %spec.display(),
        exit_code = ?output.exit_code,
        killed,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "command finished"
    );
    Ok(output)
}

/// Run `spec` and turn a failed run into an error naming `what`.
pub fn run_checked(spec: &CommandSpec, timeout: Duration, what: &str) -> Result<CommandOutput> {
    let output = run(spec, timeout)?;
    for line in &output.stdout {
        tracing::debug!(target: "appdev::console", "{line}");
    }
    if output.failed() {
        return Err(anyhow!(
            "{what} failed ({}): {}",
            spec.display(),
            output.failure_reason()
        ));
    }
    Ok(output)
}
