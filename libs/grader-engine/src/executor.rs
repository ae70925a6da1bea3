/// Submission Executor - High-Level Orchestration
///
/// **Responsibility:**
/// Drive one submission through validate → connect → stage → compile →
/// run groups → aggregate, and always tear the workspace down afterwards.
///
/// This module is the glue layer; it knows nothing about:
/// - How commands reach the host (transport's job)
/// - How results are judged (evaluator's job)
use crate::compiler::{self, Toolchain};
use crate::error::GradeError;
use crate::evaluator;
use crate::runner;
use crate::transport::Transport;
use crate::validation::validate_submission;
use crate::workspace::{Workspace, WorkspaceLayout};
use grader_common::config::GraderConfig;
use grader_common::types::{RunId, Submission, TestGroup, Verdict};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Everything a submission needs, built once at startup and shared by all
/// concurrent submissions.
#[derive(Clone)]
pub struct GraderEngine {
    transport: Arc<dyn Transport>,
    layout: WorkspaceLayout,
    toolchain: Toolchain,
    max_parallel_runs: usize,
}

impl GraderEngine {
    pub fn new(transport: Arc<dyn Transport>, config: &GraderConfig) -> Self {
        Self {
            transport,
            layout: WorkspaceLayout::from_config(config),
            toolchain: Toolchain::new(config.compiler.clone()),
            max_parallel_runs: config.max_parallel_runs,
        }
    }

    pub fn with_parts(
        transport: Arc<dyn Transport>,
        layout: WorkspaceLayout,
        toolchain: Toolchain,
        max_parallel_runs: usize,
    ) -> Self {
        Self {
            transport,
            layout,
            toolchain,
            max_parallel_runs,
        }
    }

    pub fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }

    /// Grade one submission.
    ///
    /// Compile failures and failing runs come back inside the verdict.
    /// Validation, transport and staging failures come back as errors,
    /// with no partial verdict. Workspace cleanup runs on every path and
    /// its own failures are only logged.
    #[instrument(skip_all, fields(run_id = tracing::field::Empty))]
    pub async fn process_submission(&self, submission: &Submission) -> Result<Verdict, GradeError> {
        validate_submission(submission)?;
        self.transport.connect().await?;

        let run_id = RunId::generate();
        tracing::Span::current().record("run_id", tracing::field::display(&run_id));
        info!(
            source_size = submission.code.len(),
            visible_tests = submission.test_data.as_ref().map_or(1, Vec::len),
            hidden_tests = submission.hidden_test_data.as_ref().map_or(0, Vec::len),
            "Processing submission"
        );

        let start = Instant::now();
        let workspace =
            Workspace::create(self.transport.clone(), &self.layout, run_id, &submission.code)
                .await?;

        let outcome = self.grade(&workspace, submission).await;

        let failures = workspace.destroy().await;
        if !failures.is_empty() {
            warn!(failures = failures.len(), "Workspace left partially behind");
        }

        match &outcome {
            Ok(verdict) => info!(
                overall_success = verdict.overall_success,
                visible = verdict.visible_results.len(),
                hidden = verdict.hidden_results.len(),
                execution_ms = start.elapsed().as_millis() as u64,
                "Submission graded"
            ),
            Err(e) => warn!(error = %e, "Submission failed"),
        }

        outcome
    }

    async fn grade(&self, workspace: &Workspace, submission: &Submission) -> Result<Verdict, GradeError> {
        let transport = self.transport.as_ref();
        let compile_result = compiler::compile(transport, &self.toolchain, workspace).await?;
        if compile_result.exit_code() != 0 {
            return Ok(evaluator::aggregate(compile_result, None, None));
        }

        let executable = workspace.remote_executable_path();
        let (visible_args, visible_expected) = submission.group(TestGroup::Visible);
        let visible = runner::run_group(
            transport,
            TestGroup::Visible,
            executable,
            visible_args,
            visible_expected,
            self.max_parallel_runs,
        );

        let hidden = async {
            if !submission.has_hidden_group() {
                return Ok(None);
            }
            let (hidden_args, hidden_expected) = submission.group(TestGroup::Hidden);
            runner::run_group(
                transport,
                TestGroup::Hidden,
                executable,
                hidden_args,
                hidden_expected,
                self.max_parallel_runs,
            )
            .await
            .map(Some)
        };

        let (visible_results, hidden_results) = tokio::try_join!(visible, hidden)?;

        Ok(evaluator::aggregate(
            compile_result,
            Some(visible_results),
            hidden_results,
        ))
    }
}
