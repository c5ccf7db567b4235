//! Control channel to the audio server's command-line utility.
//!
//! The server exposes no structured API to this engine, only `pactl`'s text
//! protocol. Every interaction funnels through [`CommandRunner`] so tests
//! can substitute canned transcripts for a live server.

use std::cell::RefCell;
use std::collections::HashMap;
use std::process::Command;
use std::rc::Rc;

/// The server's nominal "full volume" linear scalar (PA_VOLUME_NORM).
/// 100% maps to this; percents convert with [`percent_to_linear`].
pub const FULL_VOLUME: u32 = 65536;

/// Captured result of one control command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub succeeded: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// A successful invocation with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed invocation with the given stderr.
    pub fn err(stderr: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Runs one external command synchronously, blocking until it exits.
///
/// Implementations never panic: a spawn or transport failure comes back as
/// `succeeded == false` with empty output.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> CommandOutput;
}

/// Runs commands against the real system utilities.
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> CommandOutput {
        match Command::new(program).args(args).output() {
            Ok(out) => CommandOutput {
                succeeded: out.status.success(),
                stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
            },
            Err(e) => {
                log::error!("Failed to run {}: {}", program, e);
                CommandOutput::default()
            }
        }
    }
}

/// Run a `pactl` subcommand.
pub fn pactl(runner: &dyn CommandRunner, args: &[&str]) -> CommandOutput {
    runner.run("pactl", args)
}

/// Load a server module and parse the new module id from stdout.
///
/// The server acknowledges success only by printing the id; anything else
/// is a failure.
pub fn load_module(runner: &dyn CommandRunner, args: &[&str]) -> Result<u32, String> {
    let mut full = vec!["load-module"];
    full.extend_from_slice(args);
    let out = pactl(runner, &full);
    if !out.succeeded {
        let detail = out.stderr.trim();
        return Err(if detail.is_empty() {
            "command failed".to_string()
        } else {
            detail.to_string()
        });
    }
    out.stdout
        .trim()
        .parse()
        .map_err(|_| format!("unexpected load-module output: {:?}", out.stdout.trim()))
}

/// Unload a module, tolerating absence. A module that is already gone is a
/// benign race with the external server, not an error.
pub fn unload_module(runner: &dyn CommandRunner, module_id: u32) {
    let id = module_id.to_string();
    let out = pactl(runner, &["unload-module", &id]);
    if !out.succeeded {
        log::debug!(
            "unload-module {} failed (already gone?): {}",
            module_id,
            out.stderr.trim()
        );
    }
}

/// Convert a 0..=100 percent into the server's linear volume scalar.
pub fn percent_to_linear(percent: u32) -> u32 {
    (f64::from(percent.min(100)) / 100.0 * f64::from(FULL_VOLUME)).round() as u32
}

#[derive(Default)]
struct FakeInner {
    responses: HashMap<String, CommandOutput>,
    calls: Vec<String>,
}

/// Scripted runner for tests: replays canned transcripts keyed by the full
/// command line and records every command it is asked to run.
///
/// Unstubbed commands succeed with empty output, which matches the real
/// utility's silence on mutations like `unload-module`.
#[derive(Clone, Default)]
pub struct FakeRunner {
    inner: Rc<RefCell<FakeInner>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stub a command line (e.g. `"pactl list sinks"`) to succeed with the
    /// given stdout. Restubbing replaces the previous response.
    pub fn stub(&self, command_line: &str, stdout: &str) {
        self.inner
            .borrow_mut()
            .responses
            .insert(command_line.to_string(), CommandOutput::ok(stdout));
    }

    /// Stub a command line to fail with the given stderr.
    pub fn fail(&self, command_line: &str, stderr: &str) {
        self.inner
            .borrow_mut()
            .responses
            .insert(command_line.to_string(), CommandOutput::err(stderr));
    }

    /// Every command line run so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.inner.borrow().calls.clone()
    }

    /// The recorded command lines starting with `prefix`.
    pub fn calls_matching(&self, prefix: &str) -> Vec<String> {
        self.inner
            .borrow()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.inner.borrow_mut().calls.clear();
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, program: &str, args: &[&str]) -> CommandOutput {
        let line = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        let mut inner = self.inner.borrow_mut();
        inner.calls.push(line.clone());
        inner
            .responses
            .get(&line)
            .cloned()
            .unwrap_or_else(|| CommandOutput::ok(""))
    }
}
