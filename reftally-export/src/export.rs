//! Export orchestration
//!
//! Renders the selected documents for one group into
//! `{out}/{group}/{contestant}/`, one artifact set per
//! (contestant, referee) pair found in the logs.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use reftally_common::event_log::sanitize_component;

use crate::captions::{render_captions, CaptionMode};
use crate::error::Result;
use crate::loader::load_group;
use crate::timeline::render_plain_log;

/// Which documents to render
#[derive(Debug, Clone, Copy)]
pub struct ExportOptions {
    pub txt: bool,
    pub srt: bool,
    pub mode: CaptionMode,
}

/// What one export run produced
#[derive(Debug, Default)]
pub struct ExportSummary {
    /// (contestant, referee) pairs found in the logs
    pub pairs: usize,
    pub files: Vec<PathBuf>,
}

/// Reconstruct one group's logs into timeline documents
///
/// Directory names are sanitized the same way the live writer sanitizes
/// them, so an exported tree mirrors the log store layout.
pub fn export_group(
    data_dir: &Path,
    out_dir: &Path,
    group: &str,
    options: &ExportOptions,
) -> Result<ExportSummary> {
    let group_dir = data_dir.join(sanitize_component(group));
    let timelines = load_group(&group_dir)?;

    let mut summary = ExportSummary::default();
    for ((contestant, index), events) in &timelines {
        let dest = out_dir
            .join(sanitize_component(group))
            .join(sanitize_component(contestant));
        fs::create_dir_all(&dest)?;
        summary.pairs += 1;

        if options.txt {
            let path = dest.join(format!("Ref{index}_Log.txt"));
            fs::write(&path, render_plain_log(events))?;
            summary.files.push(path);
        }
        if options.srt {
            let path = dest.join(format!("Ref{}_{}.srt", index, options.mode.label()));
            fs::write(&path, render_captions(events, options.mode))?;
            summary.files.push(path);
        }
    }

    info!(
        group,
        pairs = summary.pairs,
        files = summary.files.len(),
        "export complete"
    );
    Ok(summary)
}
