//! Batch runner: one input line at a time through extract → dedup → insert.

use std::collections::HashSet;
use std::fmt;
use std::io::BufRead;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::info;

use crate::console;
use crate::gateway::{PlaylistGateway, Sleeper};
use crate::video_id::extract_video_id;
use crate::youtube::PlaylistApi;

/// Counters for one run.
///
/// Their sum equals the number of non-blank, non-comment lines processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub added: usize,
    pub skipped_invalid: usize,
    pub skipped_duplicate: usize,
    pub errored: usize,
}

impl RunSummary {
    pub fn processed(&self) -> usize {
        self.added + self.skipped_invalid + self.skipped_duplicate + self.errored
    }

    /// Every attempted insert failed.
    pub fn needs_hint(&self) -> bool {
        self.errored > 0 && self.added == 0
    }

    /// Troubleshooting text for the operator, when every insert failed.
    pub fn hint(&self) -> Option<&'static str> {
        self.needs_hint().then_some(
            "Hint: Errors occurred during the process. Please check the log messages above.\n\
             Common issues include incorrect playlist ID, lack of permissions, or invalid video IDs.",
        )
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Summary ---")?;
        writeln!(f, "Successfully added: {} videos.", self.added)?;
        writeln!(f, "Skipped (invalid URL/ID): {} lines.", self.skipped_invalid)?;
        writeln!(f, "Skipped (duplicate): {} videos.", self.skipped_duplicate)?;
        write!(f, "Errors during addition: {} videos.", self.errored)
    }
}

/// What a single input line turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// Blank or `#` comment.
    Ignored,
    Invalid,
    Video(String),
}

pub fn classify_line(line: &str) -> LineKind {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return LineKind::Ignored;
    }
    match extract_video_id(line) {
        Some(id) => LineKind::Video(id),
        None => LineKind::Invalid,
    }
}

/// Feeds input lines to a playlist, tracking what is already there.
pub struct BatchRunner<'a, A, S> {
    gateway: &'a PlaylistGateway<A, S>,
    playlist_id: &'a str,
    existing: HashSet<String>,
    summary: RunSummary,
}

impl<'a, A: PlaylistApi, S: Sleeper> BatchRunner<'a, A, S> {
    /// `existing` seeds the duplicate check; it is grown as inserts succeed.
    pub fn new(
        gateway: &'a PlaylistGateway<A, S>,
        playlist_id: &'a str,
        existing: HashSet<String>,
    ) -> Self {
        Self {
            gateway,
            playlist_id,
            existing,
            summary: RunSummary::default(),
        }
    }

    #[cfg(test)]
    fn existing(&self) -> &HashSet<String> {
        &self.existing
    }

    /// Process every line of `reader`.
    ///
    /// Per-line failures only move counters. A read error aborts the run.
    pub async fn run<R: BufRead>(&mut self, mut reader: R) -> Result<RunSummary> {
        let mut buf = Vec::new();
        let mut line_num = 0usize;
        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .with_context(|| format!("reading line {}", line_num + 1))?;
            if read == 0 {
                break;
            }
            line_num += 1;
            let line = String::from_utf8_lossy(&buf);
            self.process_line(line_num, &line).await;
        }
        info!(
            "Video adding process finished. {} lines processed.",
            self.summary.processed()
        );
        Ok(self.summary)
    }

    async fn process_line(&mut self, line_num: usize, raw: &str) {
        let url = raw.trim();
        let video_id = match classify_line(url) {
            LineKind::Ignored => return,
            LineKind::Invalid => {
                console::warn(format!(
                    "Could not extract video ID from line {line_num}: '{url}'"
                ));
                self.summary.skipped_invalid += 1;
                return;
            }
            LineKind::Video(id) => id,
        };

        if self.existing.contains(&video_id) {
            info!("Skipping duplicate video ID: {video_id} (already in playlist)");
            self.summary.skipped_duplicate += 1;
            return;
        }

        info!("Attempting to add video ID: {video_id} from URL: {url}");
        if self.gateway.insert(self.playlist_id, &video_id).await {
            self.summary.added += 1;
            self.existing.insert(video_id);
        } else {
            self.summary.errored += 1;
        }
    }
}

/// The playlist failed verification. The gateway has already told the
/// operator why, so this only carries the exit status.
#[derive(Debug, Error)]
#[error("playlist '{0}' could not be verified")]
pub struct PlaylistUnavailable(pub String);

/// Verify the playlist, seed the duplicate check from its current contents,
/// then feed `reader` through a [`BatchRunner`].
///
/// Verification failure stops before anything else is requested. A failed
/// listing of existing items degrades to an empty seed and the batch still runs.
pub async fn run_add<A, S, R>(
    gateway: &PlaylistGateway<A, S>,
    playlist_id: &str,
    reader: R,
) -> Result<RunSummary>
where
    A: PlaylistApi,
    S: Sleeper,
    R: BufRead,
{
    if !gateway.verify(playlist_id).await {
        return Err(PlaylistUnavailable(playlist_id.to_string()).into());
    }

    let existing = gateway.list_existing(playlist_id).await;
    BatchRunner::new(gateway, playlist_id, existing).run(reader).await
}
