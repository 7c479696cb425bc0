//! Subcommand implementations.

pub mod inbox;
pub mod runs;

use anyhow::{bail, Result};

use autonews::RunOutcome;

/// Prints one line per finished run and fails when any run did not complete.
pub fn report_outcomes(ids: &[u64], outcomes: &[RunOutcome]) -> Result<()> {
    let mut failed = 0;

    for (id, outcome) in ids.iter().zip(outcomes) {
        match outcome {
            RunOutcome::Completed(record) => {
                println!("#{} translated: {}", id, record.title_or_snippet());
            }
            RunOutcome::Failed(message) => {
                failed += 1;
                println!("#{} failed: {}", id, message);
            }
            RunOutcome::Rejected(reason) => {
                failed += 1;
                println!("#{} not started: {}", id, reason);
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} runs did not complete", failed, outcomes.len());
    }
    Ok(())
}
