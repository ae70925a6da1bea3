use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// One client submission: source code plus the visible and hidden test groups.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_data: Option<Vec<String>>,
    #[serde(default)]
    pub expected_output: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden_test_data: Option<Vec<String>>,
    #[serde(default)]
    pub hidden_expected_output: Vec<String>,
}

impl Submission {
    /// Test arguments and expected outputs for one group.
    pub fn group(&self, group: TestGroup) -> (Option<&[String]>, &[String]) {
        match group {
            TestGroup::Visible => (self.test_data.as_deref(), &self.expected_output),
            TestGroup::Hidden => (
                self.hidden_test_data.as_deref(),
                &self.hidden_expected_output,
            ),
        }
    }

    /// The hidden group only runs when the submission actually carries one.
    pub fn has_hidden_group(&self) -> bool {
        self.hidden_test_data.is_some() || !self.hidden_expected_output.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestGroup {
    Visible,
    Hidden,
}

impl fmt::Display for TestGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestGroup::Visible => write!(f, "visible"),
            TestGroup::Hidden => write!(f, "hidden"),
        }
    }
}

/// Raw result of one remote command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionOutput {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// One graded execution: a test case run, the single no-argument run,
/// or a failed compile (which carries neither `args` nor a comparison).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    #[serde(flatten)]
    pub output: ExecutionOutput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_matches_expectation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<String>,
}

impl ExecutionResult {
    pub fn exit_code(&self) -> i32 {
        self.output.exit_code
    }
}

impl From<ExecutionOutput> for ExecutionResult {
    fn from(output: ExecutionOutput) -> Self {
        Self {
            output,
            output_matches_expectation: None,
            args: None,
        }
    }
}

/// Final outcome returned for a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub visible_results: Vec<ExecutionResult>,
    #[serde(default)]
    pub hidden_results: Vec<ExecutionResult>,
    pub overall_success: bool,
}

/// Time-derived identifier naming one submission's local and remote artifacts.
///
/// Format is `<unix-millis>-<8 hex chars>`; the random suffix keeps two
/// submissions landing in the same millisecond apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(String);

impl RunId {
    pub fn generate() -> Self {
        let millis = chrono::Utc::now().timestamp_millis();
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("{}-{}", millis, &suffix[..8]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
