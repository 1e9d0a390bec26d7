use super::DiffError;
use super::file::FileDiff;
use crate::header::HunkHeader;
use crate::model::{HunkAssignment, StackId, TreeChange};
use crate::uncommitted::HunkDiffs;
use serde::{Deserialize, Serialize};

/// A complete `git diff` covering any number of files.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Diff {
    pub files: Vec<FileDiff>,
}

/// The `(assignments, changes)` pair a refresh hands to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub assignments: Vec<HunkAssignment>,
    pub changes: Vec<TreeChange>,
}

impl Diff {
    /// Parse complete `git diff` output into per-file sections.
    ///
    /// Anything before the first `diff --git` line is ignored.
    pub fn parse(text: &str) -> Result<Self, DiffError> {
        let mut files = Vec::new();
        let mut current = String::new();

        for line in text.lines() {
            if line.starts_with("diff --git ") {
                if !current.is_empty() {
                    files.push(FileDiff::parse(&current)?);
                }
                current = line.to_string();
                current.push('\n');
            } else if !current.is_empty() {
                current.push_str(line);
                current.push('\n');
            }
        }

        if !current.is_empty() {
            files.push(FileDiff::parse(&current)?);
        }

        Ok(Diff { files })
    }

    pub fn file(&self, path: &str) -> Option<&FileDiff> {
        self.files.iter().find(|f| f.path == path)
    }

    /// One change per file and one assignment per hunk, all in `stack_id`.
    ///
    /// Files without hunks (binary files, pure renames and mode changes) get
    /// a single assignment without a header or line numbers.
    pub fn snapshot(&self, stack_id: Option<&StackId>) -> Snapshot {
        let mut snapshot = Snapshot::default();
        for file in &self.files {
            let change = TreeChange::new(file.path.clone(), file.status.clone());
            let assignment = |hunk_header, added, removed| HunkAssignment {
                id: None,
                hunk_header,
                path: file.path.clone(),
                path_bytes: change.path_bytes.clone(),
                stack_id: stack_id.cloned(),
                line_nums_added: added,
                line_nums_removed: removed,
            };

            if file.binary || file.hunks.is_empty() {
                snapshot.assignments.push(assignment(None, None, None));
            } else {
                snapshot.assignments.extend(file.hunks.iter().map(|hunk| {
                    assignment(
                        Some(hunk.header),
                        Some(hunk.line_nums_added()),
                        Some(hunk.line_nums_removed()),
                    )
                }));
            }
            snapshot.changes.push(change);
        }
        snapshot
    }
}

impl HunkDiffs for Diff {
    fn hunk_diff(&self, path: &str, header: &HunkHeader) -> Option<&str> {
        self.file(path)?
            .hunks
            .iter()
            .find(|h| h.header == *header)
            .map(|h| h.diff.as_str())
    }

    fn hunk_headers(&self, path: &str) -> Vec<HunkHeader> {
        self.file(path)
            .map(|f| f.hunks.iter().map(|h| h.header).collect())
            .unwrap_or_default()
    }
}
