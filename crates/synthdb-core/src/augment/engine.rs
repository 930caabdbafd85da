//! The generate → execute → validate → repair loop for one database.
//!
//! ```text
//! INIT ─► EXECUTE ─┬─ timeout / error / wrong token ─► REPAIR_EXEC ─► EXECUTE
//!                  └─ "True" ─► VALIDATE ─┬─ ok ─────► SUCCESS
//!                                         └─ not ok ─► REPAIR_QUALITY ─► EXECUTE
//! EXECUTE with iteration > max_iterations ─► FAILED
//! ```
//!
//! Every attempt starts from a fresh copy of the template database at
//! `<workdir>/augment_dbs/<dbid>.sqlite`, so attempts never see each other's
//! rows and dbids never share a file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn, Instrument};

use super::attempt::{AttemptOutcome, GenerationAttempt, LoopState};
use super::error::{AugmentError, AugmentResult};
use super::oracle::{extract_program, CodeOracle};
use super::prompt::PromptTemplates;
use super::result::{AugmentationResult, TargetDatabase};
use crate::metrics::METRICS;
use crate::obs::{self, DbSpan};
use crate::quality::{DatabaseValidator, QualityReport};
use crate::sandbox::{Sandbox, SandboxOutput};

/// The only stdout accepted as a successful run.
pub const SUCCESS_TOKEN: &str = "True";

/// Error text sent back to the oracle when a completion held no code.
pub const NO_CODE_MESSAGE: &str = "No ```python code block was found in the previous reply.";

/// Loop settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentConfig {
    /// Upper bound on executions per dbid.
    pub max_iterations: u32,
    /// Exposed to the child as `MAX_ID`.
    pub max_id: u64,
    /// dbids processed at once by the batch runner.
    pub concurrency: usize,
    pub init_prompt_path: Option<PathBuf>,
    pub exec_repair_prompt_path: Option<PathBuf>,
    pub quality_repair_prompt_path: Option<PathBuf>,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            max_id: 1200,
            concurrency: 1,
            init_prompt_path: None,
            exec_repair_prompt_path: None,
            quality_repair_prompt_path: None,
        }
    }
}

impl AugmentConfig {
    pub fn validate(&self) -> AugmentResult<()> {
        if self.max_iterations < 1 {
            return Err(AugmentError::InvalidConfig(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if self.concurrency < 1 {
            return Err(AugmentError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn prompts(&self) -> AugmentResult<PromptTemplates> {
        PromptTemplates::load(
            self.init_prompt_path.as_deref(),
            self.exec_repair_prompt_path.as_deref(),
            self.quality_repair_prompt_path.as_deref(),
        )
    }
}

/// Everything one loop run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopReport {
    pub dbid: String,
    pub result: AugmentationResult,
    pub attempts: Vec<GenerationAttempt>,
    /// States in the order they were entered.
    pub trace: Vec<LoopState>,
}

impl LoopReport {
    /// Number of programs handed to the sandbox or skipped as empty.
    pub fn executions(&self) -> usize {
        self.trace
            .iter()
            .filter(|s| **s == LoopState::Execute)
            .count()
    }

    pub fn entered(&self, state: LoopState) -> bool {
        self.trace.contains(&state)
    }
}

/// Drives one dbid from schema-only template to a populated database.
pub struct AugmentationLoop {
    oracle: Arc<dyn CodeOracle>,
    sandbox: Arc<dyn Sandbox>,
    validator: Arc<dyn DatabaseValidator>,
    prompts: PromptTemplates,
    max_iterations: u32,
    max_id: u64,
    timeout: Duration,
    workdir: PathBuf,
    log_dir: Option<PathBuf>,
}

impl AugmentationLoop {
    pub fn new(
        oracle: Arc<dyn CodeOracle>,
        sandbox: Arc<dyn Sandbox>,
        validator: Arc<dyn DatabaseValidator>,
        workdir: impl Into<PathBuf>,
    ) -> Self {
        let defaults = AugmentConfig::default();
        Self {
            oracle,
            sandbox,
            validator,
            prompts: PromptTemplates::default(),
            max_iterations: defaults.max_iterations,
            max_id: defaults.max_id,
            timeout: Duration::from_secs(300),
            workdir: workdir.into(),
            log_dir: None,
        }
    }

    /// Apply iteration budget, id cap and prompt files from `config`.
    pub fn configure(mut self, config: &AugmentConfig) -> AugmentResult<Self> {
        config.validate()?;
        self.max_iterations = config.max_iterations;
        self.max_id = config.max_id;
        self.prompts = config.prompts()?;
        Ok(self)
    }

    pub fn with_prompts(mut self, prompts: PromptTemplates) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn with_max_id(mut self, max_id: u64) -> Self {
        self.max_id = max_id;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Append every attempt as a JSON line to `<dir>/<dbid>.jsonl`.
    pub fn with_attempt_log(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Private working copy for `dbid`.
    pub fn working_copy_path(&self, dbid: &str) -> PathBuf {
        self.workdir
            .join("augment_dbs")
            .join(format!("{dbid}.sqlite"))
    }

    /// Run the loop to a terminal state.
    ///
    /// Program failures of any kind end in a result; `Err` is reserved for
    /// infrastructure problems (missing template, unusable workdir, sandbox
    /// unable to spawn). Errors raised after the first completion arrive as
    /// [`AugmentError::Interrupted`] carrying the code held at that point.
    pub async fn run(&self, target: &TargetDatabase) -> AugmentResult<LoopReport> {
        self.drive(target)
            .instrument(obs::db_span(&target.dbid))
            .await
    }

    async fn drive(&self, target: &TargetDatabase) -> AugmentResult<LoopReport> {
        let started = Instant::now();
        obs::emit_augment_started(&target.dbid, self.max_iterations);

        if !target.template_path.exists() {
            return Err(AugmentError::TemplateMissing(target.template_path.clone()));
        }
        let schema = target.schema_text()?;
        let work_db = self.working_copy_path(&target.dbid);
        let log_path = self.prepare_log(&target.dbid).await;

        let mut trace = vec![LoopState::Init];
        let mut attempts = Vec::new();
        let mut code = self.ask(&self.prompts.initial(&schema)).await;
        let mut iteration: u32 = 0;

        let result = loop {
            iteration += 1;
            if iteration > self.max_iterations {
                trace.push(LoopState::Failed);
                break AugmentationResult::failed(code);
            }
            trace.push(LoopState::Execute);
            let attempt_start = Instant::now();
            let started_at = Utc::now();

            if code.trim().is_empty() {
                let attempt = GenerationAttempt {
                    iteration,
                    code: code.clone(),
                    stdout: None,
                    stderr: NO_CODE_MESSAGE.to_string(),
                    outcome: AttemptOutcome::EmptyCode,
                    report: None,
                    started_at,
                    duration_ms: 0,
                };
                self.record(&target.dbid, log_path.as_deref(), &mut attempts, attempt)
                    .await;
                trace.push(LoopState::RepairExec);
                code = self
                    .ask(&self.prompts.exec_repair(&schema, NO_CODE_MESSAGE, &code))
                    .await;
                continue;
            }

            self.reset_working_copy(&target.template_path, &work_db)
                .map_err(|e| e.interrupted(&code))?;
            let env = self.child_env(&work_db).map_err(|e| e.interrupted(&code))?;
            let output = self
                .sandbox
                .execute(&code, &env, self.timeout)
                .await
                .map_err(|e| AugmentError::from(e).interrupted(&code))?;

            if !is_success(&output) {
                let error_text = failure_text(&output);
                let attempt = GenerationAttempt {
                    iteration,
                    code: code.clone(),
                    stdout: output.stdout.clone(),
                    stderr: output.stderr.clone(),
                    outcome: if output.timed_out {
                        AttemptOutcome::Timeout
                    } else {
                        AttemptOutcome::RuntimeError
                    },
                    report: None,
                    started_at,
                    duration_ms: elapsed_ms(attempt_start),
                };
                self.record(&target.dbid, log_path.as_deref(), &mut attempts, attempt)
                    .await;
                trace.push(LoopState::RepairExec);
                code = self
                    .ask(&self.prompts.exec_repair(&schema, &error_text, &code))
                    .await;
                continue;
            }

            trace.push(LoopState::Validate);
            let report = self
                .validate(&target.dbid, &work_db)
                .await
                .map_err(|e| e.interrupted(&code))?;
            let ok = report.ok();
            let attempt = GenerationAttempt {
                iteration,
                code: code.clone(),
                stdout: output.stdout.clone(),
                stderr: output.stderr.clone(),
                outcome: if ok {
                    AttemptOutcome::Ok
                } else {
                    AttemptOutcome::QualityFailed
                },
                report: if ok { None } else { Some(report.clone()) },
                started_at,
                duration_ms: elapsed_ms(attempt_start),
            };
            self.record(&target.dbid, log_path.as_deref(), &mut attempts, attempt)
                .await;

            if ok {
                trace.push(LoopState::Success);
                break AugmentationResult::succeeded(code);
            }
            trace.push(LoopState::RepairQuality);
            code = self
                .ask(
                    &self
                        .prompts
                        .quality_repair(&schema, &report.to_pretty_json(), &code),
                )
                .await;
        };

        METRICS.record_augment_outcome(result.success);
        obs::emit_augment_finished(
            &target.dbid,
            result.success,
            attempts.len() as u32,
            elapsed_ms(started),
        );
        Ok(LoopReport {
            dbid: target.dbid.clone(),
            result,
            attempts,
            trace,
        })
    }

    async fn ask(&self, prompt: &str) -> String {
        METRICS.inc_oracle_calls();
        let completion = self.oracle.complete(prompt).await;
        let program = extract_program(&completion);
        if program.is_empty() {
            debug!(chars = completion.len(), "completion held no code block");
        }
        program
    }

    async fn validate(&self, dbid: &str, db: &Path) -> AugmentResult<QualityReport> {
        let validator = Arc::clone(&self.validator);
        let dbid = dbid.to_string();
        let db = db.to_path_buf();
        let report = tokio::task::spawn_blocking(move || {
            let _span = DbSpan::enter(&dbid);
            validator.validate(&db)
        })
        .await?;
        Ok(report)
    }

    fn reset_working_copy(&self, template: &Path, work_db: &Path) -> AugmentResult<()> {
        let wrap = |source: std::io::Error| AugmentError::WorkingCopy {
            path: work_db.to_path_buf(),
            source,
        };
        if let Some(parent) = work_db.parent() {
            std::fs::create_dir_all(parent).map_err(wrap)?;
        }
        // A killed attempt can leave a WAL or hot journal that SQLite would
        // replay onto the fresh copy.
        for sidecar in sqlite_sidecars(work_db) {
            match std::fs::remove_file(&sidecar) {
                Ok(()) => debug!(path = %sidecar.display(), "removed stale sqlite sidecar"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(wrap(e)),
            }
        }
        std::fs::copy(template, work_db).map_err(wrap)?;
        Ok(())
    }

    fn child_env(&self, work_db: &Path) -> AugmentResult<BTreeMap<String, String>> {
        let absolute = work_db
            .canonicalize()
            .map_err(|source| AugmentError::WorkingCopy {
                path: work_db.to_path_buf(),
                source,
            })?;
        Ok(BTreeMap::from([
            ("SQLITE_PATH".to_string(), absolute.display().to_string()),
            ("PYTHONNOUSERSITE".to_string(), "1".to_string()),
            ("MAX_ID".to_string(), self.max_id.to_string()),
        ]))
    }

    /// Truncate the attempt log for a fresh run. Logging problems never
    /// abort the loop.
    async fn prepare_log(&self, dbid: &str) -> Option<PathBuf> {
        let dir = self.log_dir.as_ref()?;
        let path = dir.join(format!("{dbid}.jsonl"));
        let prepared = async {
            tokio::fs::create_dir_all(dir).await?;
            tokio::fs::write(&path, b"").await
        }
        .await;
        match prepared {
            Ok(()) => Some(path),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "attempt log disabled");
                None
            }
        }
    }

    async fn record(
        &self,
        dbid: &str,
        log_path: Option<&Path>,
        attempts: &mut Vec<GenerationAttempt>,
        attempt: GenerationAttempt,
    ) {
        obs::emit_augment_attempt(
            dbid,
            attempt.iteration,
            attempt.outcome.as_str(),
            attempt.duration_ms,
        );
        if let Some(path) = log_path {
            if let Err(e) = append_json_line(path, &attempt).await {
                warn!(path = %path.display(), error = %e, "failed to append attempt log");
            }
        }
        attempts.push(attempt);
    }
}

fn is_success(output: &SandboxOutput) -> bool {
    output.exited_cleanly() && output.stdout.as_deref().map(str::trim) == Some(SUCCESS_TOKEN)
}

/// Error text for the execution-repair prompt.
fn failure_text(output: &SandboxOutput) -> String {
    if !output.stderr.trim().is_empty() {
        return output.stderr.clone();
    }
    match output.exit_code {
        Some(code) if code != 0 => format!("Process exited with status {code} and no error output."),
        None if !output.timed_out => "Process was terminated by a signal.".to_string(),
        _ => format!(
            "Expected the program to print exactly {SUCCESS_TOKEN}, but it printed: {:?}",
            output.stdout.as_deref().unwrap_or_default()
        ),
    }
}

/// `<db>-wal`, `<db>-shm` and `<db>-journal`.
fn sqlite_sidecars(db: &Path) -> [PathBuf; 3] {
    ["-wal", "-shm", "-journal"].map(|suffix| {
        let mut name = db.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    })
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

async fn append_json_line(path: &Path, attempt: &GenerationAttempt) -> std::io::Result<()> {
    let mut line = serde_json::to_vec(attempt)?;
    line.push(b'\n');
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(&line).await?;
    file.flush().await
}
