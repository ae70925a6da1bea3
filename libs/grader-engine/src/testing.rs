// In-memory execution host for exercising the pipeline without SSH
use crate::error::TransportError;
use crate::transport::{SessionGate, SessionState, Transport};
use async_trait::async_trait;
use grader_common::types::ExecutionOutput;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

type Program = Box<dyn Fn(Option<&str>) -> ExecutionOutput + Send + Sync>;
type Delay = Box<dyn Fn(Option<&str>) -> Duration + Send + Sync>;

pub fn output(exit_code: i32, stdout: &str) -> ExecutionOutput {
    ExecutionOutput {
        exit_code,
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

/// Models the remote filesystem plus a compiler and the compiled program.
///
/// Compiling (`<compiler> <src> -o <exe>`) succeeds with `compile_output`;
/// on exit code 0 the executable appears on the fake filesystem. Running
/// `<exe> [args]` calls `program` with the unsplit argument string.
pub struct FakeHost {
    gate: SessionGate<()>,
    connects: AtomicUsize,
    compiler: String,
    compile_output: ExecutionOutput,
    program: Program,
    delay: Delay,
    directories: Mutex<HashSet<String>>,
    files: Mutex<HashMap<String, String>>,
    runs: Mutex<Vec<Option<String>>>,
    fail_connects: AtomicBool,
    fail_uploads: AtomicBool,
    fail_removals: AtomicBool,
    fail_runs: AtomicBool,
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            gate: SessionGate::new(),
            connects: AtomicUsize::new(0),
            compiler: "gcc".to_string(),
            compile_output: output(0, ""),
            program: Box::new(|_| output(0, "")),
            delay: Box::new(|_| Duration::ZERO),
            directories: Mutex::new(HashSet::new()),
            files: Mutex::new(HashMap::new()),
            runs: Mutex::new(Vec::new()),
            fail_connects: AtomicBool::new(false),
            fail_uploads: AtomicBool::new(false),
            fail_removals: AtomicBool::new(false),
            fail_runs: AtomicBool::new(false),
        }
    }

    pub fn compile_output(mut self, compile_output: ExecutionOutput) -> Self {
        self.compile_output = compile_output;
        self
    }

    pub fn program<F>(mut self, program: F) -> Self
    where
        F: Fn(Option<&str>) -> ExecutionOutput + Send + Sync + 'static,
    {
        self.program = Box::new(program);
        self
    }

    pub fn delay<F>(mut self, delay: F) -> Self
    where
        F: Fn(Option<&str>) -> Duration + Send + Sync + 'static,
    {
        self.delay = Box::new(delay);
        self
    }

    pub fn fail_connects(&self) {
        self.fail_connects.store(true, Ordering::SeqCst);
    }

    pub fn fail_uploads(&self) {
        self.fail_uploads.store(true, Ordering::SeqCst);
    }

    pub fn fail_removals(&self) {
        self.fail_removals.store(true, Ordering::SeqCst);
    }

    /// Program executions fail at the transport level (connection dropped).
    pub fn fail_runs(&self) {
        self.fail_runs.store(true, Ordering::SeqCst);
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn has_directory(&self, path: &str) -> bool {
        self.directories.lock().unwrap().contains(path)
    }

    pub fn directories(&self) -> Vec<String> {
        self.directories.lock().unwrap().iter().cloned().collect()
    }

    pub fn file_contents(&self, path: &str) -> Option<String> {
        self.files.lock().unwrap().get(path).cloned()
    }

    /// Argument strings of every program execution, in dispatch order.
    pub fn runs(&self) -> Vec<Option<String>> {
        self.runs.lock().unwrap().clone()
    }

    fn parent_exists(&self, path: &str) -> bool {
        match path.rsplit_once('/') {
            Some((parent, _)) => self.has_directory(parent),
            None => false,
        }
    }

    fn compile(&self, command: &str) -> ExecutionOutput {
        let words = shell_words::split(command).unwrap_or_default();
        let source = words.get(1).cloned().unwrap_or_default();
        let executable = words
            .iter()
            .position(|w| w == "-o")
            .and_then(|i| words.get(i + 1))
            .cloned()
            .unwrap_or_default();

        if self.file_contents(&source).is_none() {
            return output(1, "");
        }
        if self.compile_output.exit_code == 0 && self.parent_exists(&executable) {
            self.files
                .lock()
                .unwrap()
                .insert(executable, "<binary>".to_string());
        }
        self.compile_output.clone()
    }
}

impl Default for FakeHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for FakeHost {
    async fn connect(&self) -> Result<(), TransportError> {
        self.gate
            .get_or_connect(move || async move {
                self.connects.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                if self.fail_connects.load(Ordering::SeqCst) {
                    Err(TransportError::NotConnected)
                } else {
                    Ok(())
                }
            })
            .await?;
        Ok(())
    }

    fn state(&self) -> SessionState {
        self.gate.state()
    }

    async fn upload_file(&self, local: &Path, remote: &str) -> Result<(), TransportError> {
        self.gate.get()?;
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(TransportError::RemoteCommand {
                command: format!("cat > {}", remote),
                exit_code: 1,
                stderr: "Permission denied".to_string(),
            });
        }
        if !self.parent_exists(remote) {
            return Err(TransportError::RemoteCommand {
                command: format!("cat > {}", remote),
                exit_code: 1,
                stderr: "No such file or directory".to_string(),
            });
        }

        let contents = tokio::fs::read_to_string(local).await?;
        self.files
            .lock()
            .unwrap()
            .insert(remote.to_string(), contents);
        Ok(())
    }

    async fn make_directory(&self, remote: &str) -> Result<(), TransportError> {
        self.gate.get()?;
        self.directories.lock().unwrap().insert(remote.to_string());
        Ok(())
    }

    async fn remove_directory(&self, remote: &str) -> Result<(), TransportError> {
        self.gate.get()?;
        if self.fail_removals.load(Ordering::SeqCst) {
            return Err(TransportError::RemoteCommand {
                command: format!("rm -rf {}", remote),
                exit_code: 1,
                stderr: "Device or resource busy".to_string(),
            });
        }

        let prefix = format!("{}/", remote);
        self.directories
            .lock()
            .unwrap()
            .retain(|d| d != remote && !d.starts_with(&prefix));
        self.files
            .lock()
            .unwrap()
            .retain(|f, _| !f.starts_with(&prefix));
        Ok(())
    }

    async fn execute(&self, command: &str) -> Result<ExecutionOutput, TransportError> {
        self.gate.get()?;

        if command.starts_with(&format!("{} ", self.compiler)) {
            return Ok(self.compile(command));
        }

        let (program, args) = match command.split_once(' ') {
            Some((program, args)) => (program, Some(args)),
            None => (command, None),
        };
        let program = shell_words::split(program)
            .ok()
            .and_then(|mut words| words.pop())
            .unwrap_or_default();

        if self.file_contents(&program).is_none() {
            return Ok(ExecutionOutput {
                exit_code: 127,
                stdout: String::new(),
                stderr: format!("{}: not found", program),
            });
        }

        self.runs.lock().unwrap().push(args.map(str::to_string));
        if self.fail_runs.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }

        let delay = (self.delay)(args);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok((self.program)(args))
    }
}

/// Number of entries left in a staging directory.
pub fn staged_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}
