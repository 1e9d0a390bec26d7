use super::Uncommitted;
use crate::group::{GroupError, PatchAction, diff_to_hunk_headers, line_ids_to_hunk_headers};
use crate::header::HunkHeader;
use crate::model::{DiffSpec, HunkSelection, LineSelection, StackId, TreeChange};
use crate::registry::KeyPrefix;
use error_set::error_set;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

error_set! {
    /// Errors while turning selections into commit requests
    CommitError := {
        /// A selected hunk has no diff text to group lines against
        #[display("No diff for hunk {header} of {path}")]
        MissingHunkDiff { path: String, header: String },
        /// A selection points at a path that is not a tree change
        #[display("No tree change for selected path {path}")]
        MissingChange { path: String },
        GroupError(GroupError),
    }
}

/// Diff text of the hunks in the worktree, supplied by the caller.
pub trait HunkDiffs {
    /// The header line and body of one hunk.
    fn hunk_diff(&self, path: &str, header: &HunkHeader) -> Option<&str>;

    /// Headers of every hunk the file currently has.
    fn hunk_headers(&self, path: &str) -> Vec<HunkHeader>;
}

impl Uncommitted {
    /// Selections of the stack, plus the unassigned lane when a stack is given.
    fn commit_selections(&self, stack_id: Option<&StackId>) -> Vec<&HunkSelection> {
        let mut prefixes = vec![KeyPrefix::stack(stack_id)];
        if stack_id.is_some() {
            prefixes.push(KeyPrefix::stack(None));
        }
        prefixes
            .iter()
            .flat_map(|prefix| {
                self.selections
                    .scan(prefix)
                    .map(|(_, s)| s)
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Tree changes with any selection in the stack or the unassigned lane.
    pub fn selected_changes(&self, stack_id: Option<&StackId>) -> Vec<&TreeChange> {
        let paths: BTreeSet<&str> = self
            .commit_selections(stack_id)
            .into_iter()
            .map(|s| s.path.as_str())
            .collect();
        paths
            .into_iter()
            .filter_map(|path| self.changes.get(path))
            .collect()
    }

    /// One [`DiffSpec`] per selected file, ready for the commit backend.
    ///
    /// Whole hunks contribute every changed line, partial selections only
    /// their lines. A file whose every hunk is selected in full, or which has
    /// no structured diff, gets an empty header list (the whole file).
    pub fn worktree_changes(
        &self,
        stack_id: Option<&StackId>,
        diffs: &impl HunkDiffs,
    ) -> Result<Vec<DiffSpec>, CommitError> {
        let mut by_path: BTreeMap<&str, Vec<&HunkSelection>> = BTreeMap::new();
        for selection in self.commit_selections(stack_id) {
            by_path.entry(&selection.path).or_default().push(selection);
        }

        let mut specs = Vec::with_capacity(by_path.len());
        for (path, selections) in by_path {
            let change = self
                .changes
                .get(path)
                .ok_or_else(|| CommitError::MissingChange {
                    path: path.to_string(),
                })?;

            let mut headers = Vec::new();
            let mut whole_file = false;
            let mut complete = BTreeSet::new();
            for selection in &selections {
                let Some(header) = selection.assignment_id.hunk_header else {
                    whole_file = true;
                    continue;
                };
                let diff = diffs
                    .hunk_diff(path, &header)
                    .ok_or_else(|| CommitError::MissingHunkDiff {
                        path: path.to_string(),
                        header: header.to_string(),
                    })?;
                match &selection.lines {
                    LineSelection::Full => {
                        complete.insert(header);
                        headers.extend(diff_to_hunk_headers(diff, PatchAction::Commit)?);
                    }
                    LineSelection::Partial(lines) => {
                        let lines: Vec<_> = lines.iter().copied().collect();
                        headers.extend(line_ids_to_hunk_headers(
                            &lines,
                            diff,
                            PatchAction::Commit,
                        )?);
                    }
                }
            }

            let all_complete = complete.len() == selections.len()
                && diffs
                    .hunk_headers(path)
                    .iter()
                    .all(|header| complete.contains(header));
            if whole_file || all_complete {
                headers.clear();
            } else {
                headers.sort();
            }

            specs.push(DiffSpec {
                path: path.to_string(),
                previous_path: change.status.previous_path().map(str::to_string),
                hunk_headers: headers,
            });
        }

        debug!(?stack_id, files = specs.len(), "assembled worktree changes");
        Ok(specs)
    }
}
