use anyhow::{Context, Result};
use grader_common::config::GraderConfig;
use grader_common::types::Submission;
use grader_engine::{GraderEngine, SshSession, Transport};
use std::path::Path;
use std::sync::Arc;

pub fn load_config(path: Option<&Path>) -> Result<GraderConfig> {
    match path {
        Some(path) => GraderConfig::load(path),
        None => GraderConfig::from_env().context("No --config given and environment is incomplete"),
    }
}

/// Assemble a submission from CLI arguments. With no `--test` flags the
/// program runs once without arguments against the first `--expect`.
pub async fn build_submission(
    source: &Path,
    tests: Vec<String>,
    expects: Vec<String>,
    hidden_tests: Vec<String>,
    hidden_expects: Vec<String>,
) -> Result<Submission> {
    let code = tokio::fs::read_to_string(source)
        .await
        .with_context(|| format!("Failed to read {}", source.display()))?;

    Ok(Submission {
        code,
        test_data: (!tests.is_empty()).then_some(tests),
        expected_output: expects,
        hidden_test_data: (!hidden_tests.is_empty()).then_some(hidden_tests),
        hidden_expected_output: hidden_expects,
    })
}

/// Grade one submission and print the verdict. Returns `overall_success`.
pub async fn run_submission(config: &GraderConfig, submission: Submission) -> Result<bool> {
    let session = Arc::new(SshSession::new(config.ssh.clone()));
    let engine = GraderEngine::new(session.clone(), config);

    engine
        .layout()
        .prepare_staging_dir()
        .await
        .with_context(|| format!("Failed to create staging directory {}", config.staging_dir.display()))?;

    println!("→ Submitting to {}@{}", config.ssh.username, config.ssh.host);

    let outcome = engine.process_submission(&submission).await;
    drop(engine);
    close_session(session).await;

    let verdict = outcome.context("Submission could not be graded")?;
    println!("{}", serde_json::to_string_pretty(&verdict)?);

    let matched = verdict
        .visible_results
        .iter()
        .chain(verdict.hidden_results.iter())
        .filter(|r| r.output_matches_expectation == Some(true))
        .count();
    let total = verdict.visible_results.len() + verdict.hidden_results.len();

    if verdict.overall_success {
        println!("✓ All runs exited cleanly ({}/{} outputs matched)", matched, total);
    } else {
        println!("✗ Submission failed ({}/{} outputs matched)", matched, total);
    }

    Ok(verdict.overall_success)
}

pub async fn ping(config: &GraderConfig) -> Result<()> {
    let session = SshSession::new(config.ssh.clone());

    println!("→ Connecting to {}@{}", config.ssh.username, config.ssh.host);
    session.connect().await.context("Connection failed")?;
    let output = session.execute("uname -a").await?;
    print!("{}", output.stdout);
    println!("✓ Connected (state: {})", session.state());

    session.close().await?;
    Ok(())
}

async fn close_session(session: Arc<SshSession>) {
    if let Ok(session) = Arc::try_unwrap(session) {
        if let Err(e) = session.close().await {
            tracing::warn!(error = %e, "Failed to close SSH connection cleanly");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_submission_without_tests() {
        let source = tempfile::NamedTempFile::new().unwrap();
        tokio::fs::write(source.path(), "int main() { return 0; }").await.unwrap();

        let submission = build_submission(
            source.path(),
            Vec::new(),
            vec!["Hello World!".to_string()],
            Vec::new(),
            Vec::new(),
        )
        .await
        .unwrap();

        assert_eq!(submission.code, "int main() { return 0; }");
        assert!(submission.test_data.is_none());
        assert_eq!(submission.expected_output, vec!["Hello World!"]);
        assert!(submission.hidden_test_data.is_none());
        assert!(!submission.has_hidden_group());
    }

    #[tokio::test]
    async fn test_build_submission_with_groups() {
        let source = tempfile::NamedTempFile::new().unwrap();
        tokio::fs::write(source.path(), "/* sum */").await.unwrap();

        let submission = build_submission(
            source.path(),
            vec!["3 4".to_string()],
            vec!["7".to_string()],
            vec!["1 1".to_string()],
            vec!["2".to_string()],
        )
        .await
        .unwrap();

        assert_eq!(submission.test_data, Some(vec!["3 4".to_string()]));
        assert_eq!(submission.hidden_test_data, Some(vec!["1 1".to_string()]));
        assert_eq!(submission.hidden_expected_output, vec!["2"]);
    }

    #[tokio::test]
    async fn test_build_submission_missing_file() {
        let err = build_submission(
            Path::new("/nonexistent/source.c"),
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
