use anyhow::Context;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

pub const COMBINED_LOG_NAME: &str = "log.txt";

/// Concatenate every file under `output_dir` into `<output_dir>/log.txt`,
/// each followed by a blank line. Files are visited in name order; the
/// combined log itself is skipped.
pub fn concatenate_logs(output_dir: &Path) -> anyhow::Result<PathBuf> {
    let log_path = output_dir.join(COMBINED_LOG_NAME);
    let log_file = File::create(&log_path)
        .with_context(|| format!("error creating log file {}", log_path.display()))?;
    let mut writer = BufWriter::new(log_file);

    for entry in WalkDir::new(output_dir).sort_by_file_name() {
        let entry = entry
            .with_context(|| format!("error walking through directory {}", output_dir.display()))?;
        if entry.file_type().is_dir() || entry.path() == log_path {
            continue;
        }

        let path = entry.path();
        let mut file =
            File::open(path).with_context(|| format!("error opening file {}", path.display()))?;
        let copied = std::io::copy(&mut file, &mut writer)
            .with_context(|| format!("error copying {} to log file", path.display()))?;
        writer
            .write_all(b"\n\n")
            .context("error appending newline")?;
        debug!("Appended {} ({} bytes)", path.display(), copied);
    }

    writer
        .flush()
        .with_context(|| format!("error writing log file {}", log_path.display()))?;

    info!("Logs concatenated to file {}", log_path.display());
    Ok(log_path)
}
