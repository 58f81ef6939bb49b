//! Python environment probe.
//!
//! A background task locates the interpreter and the generator script, then
//! imports every required module in a child interpreter.  Until all of that
//! passes the environment stays blocked and the probe repeats; once ready it
//! stays ready for the life of the daemon.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use imagegen_proto::config::GeneratorConfig;
use imagegen_proto::platform;
use imagegen_proto::protocol::ReadinessStatus;
use tokio::process::Command;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::log_layer::INSTALL_LOG;

pub const PROBING_MESSAGE: &str = "Checking the Python environment...";
pub const READY_MESSAGE: &str = "Python environment ready";

/// torch builds without XPU support raise this on import even though the
/// module is usable.
const BENIGN_IMPORT_ERROR: &str = "has no attribute 'xpu'";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvState {
    /// No probe has finished yet.
    Probing,
    /// Something is missing; the message says what.
    Blocked(String),
    Ready { python: PathBuf, script: PathBuf },
}

impl EnvState {
    pub fn is_ready(&self) -> bool {
        matches!(self, EnvState::Ready { .. })
    }

    pub fn readiness(&self) -> ReadinessStatus {
        match self {
            EnvState::Probing => ReadinessStatus::not_ready(PROBING_MESSAGE),
            EnvState::Blocked(message) => ReadinessStatus::not_ready(message.clone()),
            EnvState::Ready { .. } => ReadinessStatus::ready(READY_MESSAGE),
        }
    }
}

/// Shared view of the probe result.
pub struct Environment {
    state: RwLock<EnvState>,
}

impl Environment {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(EnvState::Probing),
        }
    }

    pub async fn readiness(&self) -> ReadinessStatus {
        self.state.read().await.readiness()
    }

    /// Interpreter and script, when ready.
    pub async fn runner(&self) -> Option<(PathBuf, PathBuf)> {
        match &*self.state.read().await {
            EnvState::Ready { python, script } => Some((python.clone(), script.clone())),
            _ => None,
        }
    }

    /// Record a probe result.  Ready never regresses.
    pub async fn set(&self, next: EnvState) {
        let mut state = self.state.write().await;
        if state.is_ready() || *state == next {
            return;
        }
        match &next {
            EnvState::Ready { python, script } => info!(
                target: INSTALL_LOG,
                "Python environment ready ({}, {})",
                python.display(),
                script.display()
            ),
            EnvState::Blocked(message) => warn!(target: INSTALL_LOG, "{}", message),
            EnvState::Probing => {}
        }
        *state = next;
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

/// Probe until ready or cancelled.
pub async fn run_probe_loop(
    env: Arc<Environment>,
    config: GeneratorConfig,
    cancel: CancellationToken,
) {
    let interval = Duration::from_secs(config.probe_interval_secs.max(1));
    loop {
        let state = tokio::select! {
            _ = cancel.cancelled() => break,
            state = probe(&config) => state,
        };
        let ready = state.is_ready();
        env.set(state).await;
        if ready {
            break;
        }
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
    debug!("environment probe loop finished");
}

/// One full probe.
pub async fn probe(config: &GeneratorConfig) -> EnvState {
    let python = match config.python.clone().or_else(platform::find_python_binary) {
        Some(p) => p,
        None => return EnvState::Blocked("Python 3 was not found, install Python 3 first".into()),
    };

    let script = match &config.script {
        Some(p) if p.is_file() => p.clone(),
        Some(p) => {
            return EnvState::Blocked(format!(
                "Generator script not found at {}",
                p.display()
            ))
        }
        None => match platform::find_generator_script() {
            Some(p) => p,
            None => {
                return EnvState::Blocked(format!(
                    "Generator script {} not found",
                    platform::GENERATOR_SCRIPT_NAME
                ))
            }
        },
    };

    let mut missing = Vec::new();
    for module in &config.required_modules {
        match check_module(&python, module).await {
            Ok(()) => debug!("module {} imports", module),
            Err(reason) => {
                debug!("module {} unavailable: {}", module, reason);
                missing.push(module.as_str());
            }
        }
    }
    if !missing.is_empty() {
        return EnvState::Blocked(format!(
            "Installing dependencies, missing Python modules: {}",
            missing.join(", ")
        ));
    }

    EnvState::Ready { python, script }
}

/// Import `module` in a child interpreter.
async fn check_module(python: &Path, module: &str) -> Result<(), String> {
    if !is_module_name(module) {
        return Err(format!("invalid module name {:?}", module));
    }
    let output = Command::new(python)
        .arg("-c")
        .arg(format!("import {}", module))
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| format!("failed to run {}: {}", python.display(), e))?;

    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    if stderr.contains(BENIGN_IMPORT_ERROR) {
        info!(target: INSTALL_LOG, "{} imports with warnings", module);
        return Ok(());
    }
    Err(stderr.lines().last().unwrap_or("import failed").to_string())
}

fn is_module_name(module: &str) -> bool {
    !module.is_empty()
        && module
            .split('.')
            .all(|part| {
                part.chars().next().map_or(false, |c| c.is_ascii_alphabetic() || c == '_')
                    && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_names() {
        assert!(is_module_name("torch"));
        assert!(is_module_name("google.protobuf"));
        assert!(is_module_name("_ssl"));
        assert!(!is_module_name(""));
        assert!(!is_module_name("os; import shutil"));
        assert!(!is_module_name("9lives"));
        assert!(!is_module_name("a..b"));
    }

    #[tokio::test]
    async fn test_ready_never_regresses() {
        let env = Environment::new();
        assert_eq!(env.readiness().await.message, PROBING_MESSAGE);
        env.set(EnvState::Ready {
            python: "/usr/bin/python3".into(),
            script: "/opt/gen_image.py".into(),
        })
        .await;
        env.set(EnvState::Blocked("gone".into())).await;
        assert!(env.readiness().await.ready);
        assert!(env.runner().await.is_some());
    }

    #[tokio::test]
    async fn test_missing_script_blocks() {
        let config = GeneratorConfig {
            python: Some("/bin/sh".into()),
            script: Some("/definitely/not/here/gen_image.py".into()),
            ..GeneratorConfig::default()
        };
        match probe(&config).await {
            EnvState::Blocked(message) => assert!(message.contains("/definitely/not/here")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_probe_with_fake_interpreter() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("gen_image.py");
        std::fs::write(&script, "").unwrap();

        // Stand-in interpreter: `-c "import X"` succeeds unless X is diffusers.
        let python = dir.path().join("python3");
        std::fs::write(
            &python,
            "#!/bin/sh\ncase \"$2\" in\n  *diffusers*) echo \"ModuleNotFoundError: No module named 'diffusers'\" >&2; exit 1;;\n  *) exit 0;;\nesac\n",
        )
        .unwrap();
        std::fs::set_permissions(&python, std::fs::Permissions::from_mode(0o755)).unwrap();

        let mut config = GeneratorConfig {
            python: Some(python.clone()),
            script: Some(script.clone()),
            ..GeneratorConfig::default()
        };
        match probe(&config).await {
            EnvState::Blocked(message) => {
                assert!(message.contains("diffusers"));
                assert!(!message.contains("torch"));
            }
            other => panic!("unexpected {:?}", other),
        }

        config.required_modules.retain(|m| m != "diffusers");
        assert_eq!(probe(&config).await, EnvState::Ready { python, script });
    }
}
