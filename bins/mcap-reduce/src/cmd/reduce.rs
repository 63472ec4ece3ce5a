use std::fs::File;
use std::path::PathBuf;

use container_mcap::{McapSink, McapSource, SinkOptions};
use reduce_engine::{ReduceOptions, ReduceStats};

use super::config::Effective;
use super::error::CliError;
use super::output::{StagedOutput, output_path};

/// Outcome of a batch: how many inputs produced an output.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub reduced: usize,
    pub failed: usize,
}

/// One input → one output, everything needed to run off the async runtime.
#[derive(Debug, Clone)]
pub struct FileJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub options: ReduceOptions,
    pub sink: SinkOptions,
}

impl FileJob {
    pub fn new(input: PathBuf, eff: &Effective) -> Self {
        Self {
            output: output_path(&input, &eff.suffix),
            input,
            options: eff.reduce_options(),
            sink: eff.sink,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Batch
// ═══════════════════════════════════════════════════════════════

/// Reduce every input in order. A failed file is logged and skipped; the
/// batch itself never fails.
pub async fn run(eff: &Effective) -> BatchReport {
    run_with(eff, reduce_file).await
}

/// A panic inside `reduce_one` surfaces as a join error and counts as a
/// failed file.
async fn run_with<F>(eff: &Effective, reduce_one: F) -> BatchReport
where
    F: Fn(&FileJob) -> Result<ReduceStats, CliError> + Copy + Send + 'static,
{
    let mut report = BatchReport::default();

    for input in &eff.inputs {
        let job = FileJob::new(input.clone(), eff);

        match tokio::task::spawn_blocking(move || reduce_one(&job)).await {
            Ok(Ok(_)) => report.reduced += 1,
            Ok(Err(e)) => {
                tracing::error!(input = %input.display(), error = %e, "reduce failed");
                report.failed += 1;
            }
            Err(e) => {
                tracing::error!(input = %input.display(), error = %e, "reduce task aborted");
                report.failed += 1;
            }
        }
    }

    tracing::info!(reduced = report.reduced, failed = report.failed, "batch complete");
    report
}

// ═══════════════════════════════════════════════════════════════
//  Single file
// ═══════════════════════════════════════════════════════════════

/// Blocking. The output appears under its final name only when the whole
/// reduction, including the summary section, has been written.
pub fn reduce_file(job: &FileJob) -> Result<ReduceStats, CliError> {
    tracing::info!(
        input = %job.input.display(),
        output = %job.output.display(),
        policy = %job.options.policy.kind,
        max_frequency = job.options.policy.max_frequency,
        "reducing"
    );

    let source = McapSource::open(&job.input)?;
    let staged = StagedOutput::create(&job.output)?;
    tracing::debug!(staged = %staged.path().display(), "writing");

    let written = staged
        .file()
        .and_then(|file| write_reduced(&source, file, job));
    let stats = match written {
        Ok(stats) => {
            staged.commit()?;
            stats
        }
        Err(e) => {
            staged.discard();
            return Err(e);
        }
    };

    tracing::info!(
        output = %job.output.display(),
        channels = stats.channels,
        decimated = stats.decimated_channels,
        skipped = stats.skipped_channels,
        read = stats.messages.read,
        written = stats.messages.written,
        dropped = stats.messages.dropped(),
        "reduced"
    );
    Ok(stats)
}

fn write_reduced(source: &McapSource, file: File, job: &FileJob) -> Result<ReduceStats, CliError> {
    let mut sink = McapSink::from_file(file, job.sink);
    Ok(reduce_engine::reduce(source, &mut sink, &job.options)?)
}
