// Submission shape checks, run before any remote work
use crate::error::ValidationError;
use grader_common::types::{Submission, TestGroup};

pub fn validate_submission(submission: &Submission) -> Result<(), ValidationError> {
    validate_group(submission, TestGroup::Visible)?;
    if submission.has_hidden_group() {
        validate_group(submission, TestGroup::Hidden)?;
    }
    Ok(())
}

fn validate_group(submission: &Submission, group: TestGroup) -> Result<(), ValidationError> {
    let (args_list, expected) = submission.group(group);
    match args_list {
        Some(args_list) if expected.len() < args_list.len() => {
            Err(ValidationError::ExpectedOutputTooShort {
                group,
                tests: args_list.len(),
                expected: expected.len(),
            })
        }
        None if expected.is_empty() => Err(ValidationError::MissingExpectedOutput { group }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_valid_submission() {
        let submission = Submission {
            code: "int main(){}".to_string(),
            test_data: Some(strings(&["1", "2"])),
            expected_output: strings(&["1", "2", "extra"]),
            hidden_test_data: None,
            hidden_expected_output: strings(&["x"]),
        };
        assert_eq!(validate_submission(&submission), Ok(()));
    }

    #[test]
    fn test_short_expected_output_rejected() {
        let submission = Submission {
            test_data: Some(strings(&["1", "2"])),
            expected_output: strings(&["1"]),
            ..Default::default()
        };
        assert_eq!(
            validate_submission(&submission),
            Err(ValidationError::ExpectedOutputTooShort {
                group: TestGroup::Visible,
                tests: 2,
                expected: 1,
            })
        );
    }

    #[test]
    fn test_short_hidden_expected_output_rejected() {
        let submission = Submission {
            expected_output: strings(&["Hello World!"]),
            hidden_test_data: Some(strings(&["a", "b"])),
            hidden_expected_output: strings(&["a"]),
            ..Default::default()
        };
        assert!(matches!(
            validate_submission(&submission),
            Err(ValidationError::ExpectedOutputTooShort {
                group: TestGroup::Hidden,
                ..
            })
        ));
    }

    #[test]
    fn test_no_args_requires_expected_output() {
        let submission = Submission::default();
        assert_eq!(
            validate_submission(&submission),
            Err(ValidationError::MissingExpectedOutput {
                group: TestGroup::Visible
            })
        );
    }

    #[test]
    fn test_empty_test_data_needs_no_expected_output() {
        let submission = Submission {
            test_data: Some(Vec::new()),
            ..Default::default()
        };
        assert_eq!(validate_submission(&submission), Ok(()));
    }
}
