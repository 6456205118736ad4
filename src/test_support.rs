//! Test support utilities shared across unit and integration tests.

use std::cell::RefCell;
use std::collections::{BTreeSet, VecDeque};
use std::env;
use std::ffi::OsString;
use std::rc::Rc;

use camino::{Utf8Path, Utf8PathBuf};
use tokio::sync::{Mutex, MutexGuard};

use crate::command::{CommandError, CommandOutput, CommandRunner};
use crate::grow::{FilesystemResizer, GrowError};
use crate::space::{FreeSpaceProvider, SpaceError};

/// Scripted command runner that returns pre-seeded outputs in FIFO order.
///
/// Used to drive deterministic command outcomes without spawning processes.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRunner {
    responses: Rc<RefCell<VecDeque<CommandOutput>>>,
    invocations: Rc<RefCell<Vec<CommandInvocation>>>,
}

/// Records a single invocation made through [`ScriptedRunner`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandInvocation {
    /// Program name as passed to the runner.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
}

impl CommandInvocation {
    /// Returns a shell-like command string for assertions.
    #[must_use]
    pub fn command_string(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        parts.extend(
            self.args
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned()),
        );
        parts.join(" ")
    }
}

impl ScriptedRunner {
    /// Creates a new runner with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        self.invocations.borrow().clone()
    }

    /// Pushes a successful exit status with the given stdout.
    pub fn push_stdout(&self, stdout: impl Into<String>) {
        self.push_output(Some(0), stdout, "");
    }

    /// Pushes a failing exit code with stderr text.
    pub fn push_failure(&self, code: i32, stderr: impl Into<String>) {
        self.push_output(Some(code), "", stderr);
    }

    /// Pushes an explicit command output response.
    pub fn push_output(
        &self,
        code: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) {
        self.responses.borrow_mut().push_back(CommandOutput {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        });
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, CommandError> {
        self.invocations.borrow_mut().push(CommandInvocation {
            program: program.to_owned(),
            args: args.to_vec(),
        });
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| CommandError::Spawn {
                program: program.to_owned(),
                message: String::from("no scripted response available"),
            })
    }
}

/// Produces `df -k --output=avail` output reporting `kib` available.
#[must_use]
pub fn df_avail_output(kib: u64) -> String {
    format!("    Avail\n{kib:>9}\n")
}

/// Free-space provider that replays readings in FIFO order.
///
/// The last reading repeats once the queue is drained so idempotence
/// scenarios can re-run the orchestrator without re-seeding.
#[derive(Clone, Debug)]
pub struct ScriptedSpace {
    readings: Rc<RefCell<VecDeque<u64>>>,
    last: Rc<RefCell<Option<u64>>>,
    device: Utf8PathBuf,
    queries: Rc<RefCell<u32>>,
}

impl ScriptedSpace {
    /// Creates a provider that resolves every path to `device`.
    #[must_use]
    pub fn new(device: impl Into<Utf8PathBuf>) -> Self {
        Self {
            readings: Rc::default(),
            last: Rc::default(),
            device: device.into(),
            queries: Rc::default(),
        }
    }

    /// Queues a free-space reading in whole GB.
    pub fn push_reading(&self, free_gb: u64) {
        self.readings.borrow_mut().push_back(free_gb);
    }

    /// Number of free-space queries answered so far.
    #[must_use]
    pub fn queries(&self) -> u32 {
        *self.queries.borrow()
    }
}

impl FreeSpaceProvider for ScriptedSpace {
    fn free_space_gb(&self, path: &Utf8Path) -> Result<u64, SpaceError> {
        *self.queries.borrow_mut() += 1;
        let next = self.readings.borrow_mut().pop_front();
        let reading = next.or(*self.last.borrow());
        let free_gb = reading.ok_or_else(|| SpaceError::NotMounted {
            path: path.to_path_buf(),
        })?;
        *self.last.borrow_mut() = Some(free_gb);
        Ok(free_gb)
    }

    fn resolve_device(&self, _path: &Utf8Path) -> Result<Utf8PathBuf, SpaceError> {
        Ok(self.device.clone())
    }
}

/// Filesystem resizer that records the devices it was asked to grow.
#[derive(Clone, Debug, Default)]
pub struct RecordingGrower {
    grown: Rc<RefCell<Vec<Utf8PathBuf>>>,
    failure: Rc<RefCell<Option<GrowError>>>,
}

impl RecordingGrower {
    /// Creates a grower that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent grow calls fail with `error`.
    pub fn fail_with(&self, error: GrowError) {
        *self.failure.borrow_mut() = Some(error);
    }

    /// Devices passed to [`FilesystemResizer::grow_filesystem`] so far.
    #[must_use]
    pub fn grown(&self) -> Vec<Utf8PathBuf> {
        self.grown.borrow().clone()
    }
}

impl FilesystemResizer for RecordingGrower {
    fn grow_filesystem(&self, device: &Utf8Path) -> Result<(), GrowError> {
        self.grown.borrow_mut().push(device.to_path_buf());
        self.failure.borrow().clone().map_or(Ok(()), Err)
    }
}

/// Global lock serialising environment mutation across tests.
pub static ENV_LOCK: Mutex<()> = Mutex::const_new(());

/// Guard that holds [`ENV_LOCK`] and restores variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets (`Some`) or removes (`None`) environment variables while holding
    /// the global lock.
    pub async fn set_vars(pairs: &[(&str, Option<&str>)]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                pairs.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard::set_vars"
        );

        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            previous.push(((*key).to_owned(), env::var_os(key)));
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`.
            unsafe {
                match value {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
