/// Test Runner
///
/// Executes the compiled binary once per argument string of a group (or
/// once with no arguments when the group has none) and tags each result
/// with whether stdout matched the expected value at the same index.
///
/// Runs are dispatched concurrently, bounded by `max_parallel`, through an
/// order-preserving buffer: result `i` always belongs to `args[i]` and
/// `expected[i]`, whatever order the remote processes finish in.
use crate::compiler::Toolchain;
use crate::error::TransportError;
use crate::evaluator::outputs_match;
use crate::transport::Transport;
use futures_util::stream::{self, StreamExt, TryStreamExt};
use grader_common::types::{ExecutionResult, TestGroup};
use tracing::{debug, info, instrument};

#[instrument(skip(transport, args_list, expected), fields(tests = args_list.map_or(1, |a| a.len())))]
pub async fn run_group(
    transport: &dyn Transport,
    group: TestGroup,
    executable: &str,
    args_list: Option<&[String]>,
    expected: &[String],
    max_parallel: usize,
) -> Result<Vec<ExecutionResult>, TransportError> {
    let results = match args_list {
        Some(args_list) => {
            // Build the case futures up front so the stream holds no borrowing closure
            let cases: Vec<_> = args_list
                .iter()
                .enumerate()
                .map(|(index, args)| run_case(transport, executable, Some(args), expected.get(index)))
                .collect();
            stream::iter(cases)
                .buffered(max_parallel.max(1))
                .try_collect::<Vec<_>>()
                .await?
        }
        None => vec![run_case(transport, executable, None, expected.first()).await?],
    };

    let matched = results
        .iter()
        .filter(|r| r.output_matches_expectation == Some(true))
        .count();
    info!(group = %group, matched, total = results.len(), "Group finished");

    Ok(results)
}

async fn run_case(
    transport: &dyn Transport,
    executable: &str,
    args: Option<&String>,
    expected: Option<&String>,
) -> Result<ExecutionResult, TransportError> {
    let command = Toolchain::run_command(executable, args.map(String::as_str));
    let output = transport.execute(&command).await?;

    let matches = expected.map_or(false, |expected| outputs_match(&output.stdout, expected));
    debug!(
        args = args.map(String::as_str).unwrap_or(""),
        exit_code = output.exit_code,
        matches,
        "Test case executed"
    );

    Ok(ExecutionResult {
        output,
        output_matches_expectation: Some(matches),
        args: args.cloned(),
    })
}
