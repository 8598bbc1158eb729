#![allow(dead_code)]

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use buildmon::build::{ProcessOutput, ProcessRunner, ProcessSpec};
use buildmon::fs::FileSystem;
use tokio::sync::Notify;

fn is_version_probe(spec: &ProcessSpec) -> bool {
    spec.args.len() == 1 && spec.args[0] == "--version"
}

fn version_output() -> ProcessOutput {
    ProcessOutput {
        status_code: Some(0),
        stdout: "emcc (fake) 3.1.0\n".to_string(),
        stderr: String::new(),
    }
}

fn output_path(spec: &ProcessSpec) -> Option<PathBuf> {
    let idx = spec.args.iter().position(|a| a == "-o")?;
    spec.args.get(idx + 1).map(PathBuf::from)
}

/// How the fake compiler answers `--version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toolchain {
    Available,
    /// Every probe fails to start.
    Missing,
    /// Only answers once an activation dir is prepended to `PATH`.
    AfterActivation,
}

/// A fake compiler with a fixed answer for every compile.
///
/// Records every spec it receives. When `artifacts` is set, a successful
/// compile writes `<output>.js` and `<output>.wasm` of the given sizes
/// through the given filesystem.
pub struct ScriptedRunner {
    toolchain: Toolchain,
    compile: ProcessOutput,
    artifacts: Option<(Arc<dyn FileSystem>, usize, usize)>,
    calls: Arc<Mutex<Vec<ProcessSpec>>>,
}

impl ScriptedRunner {
    pub fn succeeding() -> Self {
        Self::with_output(ProcessOutput {
            status_code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
        })
    }

    pub fn failing(status: i32, stderr: &str) -> Self {
        Self::with_output(ProcessOutput {
            status_code: Some(status),
            stdout: String::new(),
            stderr: stderr.to_string(),
        })
    }

    pub fn with_output(compile: ProcessOutput) -> Self {
        Self {
            toolchain: Toolchain::Available,
            compile,
            artifacts: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn toolchain(mut self, toolchain: Toolchain) -> Self {
        self.toolchain = toolchain;
        self
    }

    pub fn writes_artifacts(mut self, fs: Arc<dyn FileSystem>, js: usize, wasm: usize) -> Self {
        self.artifacts = Some((fs, js, wasm));
        self
    }

    /// Shared handle to the recorded specs.
    pub fn calls(&self) -> Arc<Mutex<Vec<ProcessSpec>>> {
        Arc::clone(&self.calls)
    }

    /// Recorded compile specs (version probes excluded).
    pub fn compiles(&self) -> Vec<ProcessSpec> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|s| !is_version_probe(s))
            .cloned()
            .collect()
    }

    fn probe(&self, spec: &ProcessSpec) -> Result<ProcessOutput> {
        match (self.toolchain, &spec.path_prefix) {
            (Toolchain::Available, _) | (Toolchain::AfterActivation, Some(_)) => {
                Ok(version_output())
            }
            _ => Err(anyhow!("No such file or directory (os error 2)")),
        }
    }

    fn compile(&self, spec: &ProcessSpec) -> Result<ProcessOutput> {
        if self.toolchain == Toolchain::Missing {
            return Err(anyhow!("No such file or directory (os error 2)"));
        }
        if self.compile.success() {
            if let (Some((fs, js, wasm)), Some(script)) = (&self.artifacts, output_path(spec)) {
                fs.write(&script, &vec![b'j'; *js])?;
                fs.write(&script.with_extension("wasm"), &vec![0u8; *wasm])?;
            }
        }
        Ok(self.compile.clone())
    }
}

impl ProcessRunner for ScriptedRunner {
    fn run(
        &self,
        spec: ProcessSpec,
    ) -> Pin<Box<dyn Future<Output = Result<ProcessOutput>> + Send + '_>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(spec.clone());
            if is_version_probe(&spec) {
                self.probe(&spec)
            } else {
                self.compile(&spec)
            }
        })
    }
}

/// A fake compiler whose compile step blocks until released.
///
/// `started()` resolves once a compile is running; `release()` lets exactly
/// one compile finish successfully.
#[derive(Default)]
pub struct GatedRunner {
    started: Notify,
    gate: Notify,
    compiles: AtomicUsize,
}

impl GatedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn started(&self) {
        self.started.notified().await;
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }

    pub fn compile_count(&self) -> usize {
        self.compiles.load(Ordering::SeqCst)
    }
}

impl ProcessRunner for GatedRunner {
    fn run(
        &self,
        spec: ProcessSpec,
    ) -> Pin<Box<dyn Future<Output = Result<ProcessOutput>> + Send + '_>> {
        Box::pin(async move {
            if is_version_probe(&spec) {
                return Ok(version_output());
            }
            self.compiles.fetch_add(1, Ordering::SeqCst);
            self.started.notify_one();
            self.gate.notified().await;
            Ok(ProcessOutput {
                status_code: Some(0),
                stdout: String::new(),
                stderr: String::new(),
            })
        })
    }
}

/// A fake compiler that panics mid-compile.
#[derive(Debug, Default)]
pub struct PanickingRunner;

impl ProcessRunner for PanickingRunner {
    fn run(
        &self,
        spec: ProcessSpec,
    ) -> Pin<Box<dyn Future<Output = Result<ProcessOutput>> + Send + '_>> {
        Box::pin(async move {
            if is_version_probe(&spec) {
                return Ok(version_output());
            }
            panic!("linker exploded");
        })
    }
}
