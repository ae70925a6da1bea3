/// Verdict Aggregator
///
/// **Success rule:** a submission succeeds when every run in every group
/// exited with code 0. Output mismatches do NOT affect `overall_success`;
/// they are reported per result through `output_matches_expectation` and
/// the caller grades on those separately.
///
/// **Comparison rule:** exact string equality. No trimming, no newline
/// normalization, case sensitive.
use grader_common::types::{ExecutionResult, Verdict};

pub fn outputs_match(stdout: &str, expected: &str) -> bool {
    stdout == expected
}

/// Combine the compile result with the group results.
///
/// A failed compile yields a verdict holding only the compile result; the
/// group results are not consulted (they were never produced).
pub fn aggregate(
    compile_result: ExecutionResult,
    visible_results: Option<Vec<ExecutionResult>>,
    hidden_results: Option<Vec<ExecutionResult>>,
) -> Verdict {
    if compile_result.exit_code() != 0 {
        return Verdict {
            visible_results: vec![compile_result],
            hidden_results: Vec::new(),
            overall_success: false,
        };
    }

    let visible_results = visible_results.unwrap_or_default();
    let hidden_results = hidden_results.unwrap_or_default();
    let overall_success = visible_results
        .iter()
        .chain(hidden_results.iter())
        .all(|result| result.exit_code() == 0);

    Verdict {
        visible_results,
        hidden_results,
        overall_success,
    }
}
