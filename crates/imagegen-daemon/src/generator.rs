//! Runs the generator script for one prompt.
//!
//! Only one generation runs at a time; a second request while one is running
//! is refused instead of queued.  Every outcome, including spawn failures, is
//! reported as a `GenerationResult` so the client sees a message rather than
//! a transport error.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use imagegen_proto::config::GeneratorConfig;
use imagegen_proto::protocol::{GenerationOptions, GenerationResult};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::environment::Environment;
use crate::log_layer::INSTALL_LOG;

/// Marker the script prints on stdout once the image is written.
const SUCCESS_MARKER: &str = "SUCCESS";

pub const NOT_READY: &str = "Python environment is not ready yet, please try again later";
pub const BUSY: &str = "Another image is being generated, please wait";

pub struct Generator {
    env: Arc<Environment>,
    output_dir: PathBuf,
    model_cache_dir: PathBuf,
    running: Mutex<()>,
}

impl Generator {
    pub fn new(env: Arc<Environment>, config: &GeneratorConfig) -> Self {
        Self {
            env,
            output_dir: config.output_dir.clone(),
            model_cache_dir: config.model_cache_dir.clone(),
            running: Mutex::new(()),
        }
    }

    pub async fn generate(&self, prompt: &str, options: &GenerationOptions) -> GenerationResult {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return GenerationResult::failed("Prompt is empty");
        }
        let Some((python, script)) = self.env.runner().await else {
            return GenerationResult::failed(NOT_READY);
        };
        let Ok(_guard) = self.running.try_lock() else {
            warn!("generation refused: another one is running");
            return GenerationResult::failed(BUSY);
        };

        if let Err(e) = tokio::fs::create_dir_all(&self.output_dir).await {
            return GenerationResult::failed(format!(
                "Failed to create output directory {}: {}",
                self.output_dir.display(),
                e
            ));
        }
        let output = self.output_dir.join(format!(
            "generated_{}.png",
            chrono::Utc::now().timestamp_millis()
        ));

        info!(target: INSTALL_LOG, "Generating with {}", script.display());
        let cmd = build_command(
            &python,
            &script,
            prompt,
            &output,
            options,
            &self.model_cache_dir,
        );
        run(cmd, &output).await
    }
}

/// `<python> <script> <prompt> --output <file> --steps N --cache-dir <dir>`
///
/// `gen_image.py` only declares those arguments and exits on anything else,
/// so the remaining options stay on this side and are only logged.
pub fn build_command(
    python: &Path,
    script: &Path,
    prompt: &str,
    output: &Path,
    options: &GenerationOptions,
    cache_dir: &Path,
) -> Command {
    debug!(
        "generator ignores guidance={} size={}x{} seed={} speed={} memory={}",
        options.guidance_scale,
        options.width,
        options.height,
        options.seed,
        options.optimize_speed,
        options.optimize_memory
    );
    let mut cmd = Command::new(python);
    cmd.arg(script)
        .arg(prompt)
        .arg("--output")
        .arg(output)
        .arg("--steps")
        .arg(options.steps.to_string())
        .arg("--cache-dir")
        .arg(cache_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

async fn run(mut cmd: Command, output: &Path) -> GenerationResult {
    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            error!(target: INSTALL_LOG, "Failed to start the generator: {}", e);
            return GenerationResult::failed(format!("Failed to start the generator: {}", e));
        }
    };

    let stdout = child.stdout.take().map(|s| forward_lines(s, false));
    let stderr = child.stderr.take().map(|s| forward_lines(s, true));

    let status = match child.wait().await {
        Ok(status) => status,
        Err(e) => return GenerationResult::failed(format!("Failed to wait for the generator: {}", e)),
    };
    let stdout_lines = collect(stdout).await;
    let stderr_lines = collect(stderr).await;
    debug!(
        "generator exited with {} ({} stdout, {} stderr lines)",
        status,
        stdout_lines.len(),
        stderr_lines.len()
    );

    if !status.success() {
        let detail = if stderr_lines.is_empty() {
            status.to_string()
        } else {
            stderr_lines.join("\n")
        };
        return GenerationResult::failed(format!("Image generation failed ({}): {}", status, detail));
    }

    let reported = stdout_lines.iter().any(|l| l.contains(SUCCESS_MARKER));
    if reported || tokio::fs::metadata(output).await.is_ok() {
        let path = output.to_string_lossy().to_string();
        info!(target: INSTALL_LOG, "Image written to {}", path);
        return GenerationResult::succeeded(path, "Image generated successfully");
    }
    GenerationResult::failed("Image generation failed, no output file was produced")
}

/// Copy each line into the install log and keep it for the final verdict.
fn forward_lines<R>(reader: R, is_stderr: bool) -> JoinHandle<Vec<String>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        let mut seen = Vec::new();
        while let Ok(Some(line)) = lines.next_line().await {
            if is_stderr {
                error!(target: INSTALL_LOG, "{}", line);
            } else {
                info!(target: INSTALL_LOG, "{}", line);
            }
            seen.push(line);
        }
        seen
    })
}

async fn collect(task: Option<JoinHandle<Vec<String>>>) -> Vec<String> {
    match task {
        Some(task) => task.await.unwrap_or_default(),
        None => Vec::new(),
    }
}
