//! Hunk assignment and line-level selection for uncommitted changes.
//!
//! [`Uncommitted`] tracks which hunks of the working tree belong to which
//! stack and which of their lines are checked for the next commit. Feed it
//! snapshots with [`Uncommitted::update`], mutate the selection with the
//! `check_*` / `uncheck_*` operations, and turn the result into commit
//! requests with [`Uncommitted::worktree_changes`].

use error_set::error_set;
use std::process::Command;

pub mod config;
pub mod diff;
pub mod group;
pub mod header;
pub mod model;
pub mod parse;
pub mod registry;
pub mod uncommitted;

pub use config::{Config, ConfigError};
pub use diff::{Diff, DiffError, Snapshot, format_line_ids};
pub use group::{
    GroupError, LineGroup, PatchAction, diff_to_hunk_headers, extract_all_groups,
    extract_line_groups, line_ids_to_hunk_headers,
};
pub use header::{HunkHeader, LineId, LineIdError, LineKind};
pub use model::{
    CheckboxStatus, CompositeKey, DiffSpec, HunkAssignment, HunkCheckStatus, HunkSelection,
    Identity, LineSelection, StackId, TreeChange, TreeStatus,
};
pub use parse::ParseError;
pub use uncommitted::{CommitError, HunkDiffs, SelectionError, Uncommitted};

error_set! {
    /// Top-level error for hunk-select operations
    HunkSelectError := {
        #[display("Failed to read {source_name}: {message}")]
        ReadInput { source_name: String, message: String },
        #[display("Line {line} is not in any hunk of {path}")]
        LineNotInDiff { path: String, line: String },
        ParseError(ParseError),
        DiffError(DiffError),
        GroupError(GroupError),
        SelectionError(SelectionError),
        CommitError(CommitError),
        ConfigError(ConfigError),
    } || GitCommandError

    /// Errors from git command execution
    GitCommandError := {
        #[display("Failed to run git diff: {message}")]
        DiffFailed { message: String },
        #[display("git diff failed: {stderr}")]
        DiffExitError { stderr: String },
        #[display("Invalid UTF-8 in git diff output: {message}")]
        InvalidUtf8 { message: String },
    }
}

/// Reads the uncommitted changes of a repository through `git diff`.
pub struct Worktree<'a> {
    repo_path: &'a str,
}

impl<'a> Worktree<'a> {
    pub fn new(repo_path: &'a str) -> Self {
        Self { repo_path }
    }

    /// Parsed diff of the working tree against the index, limited to `files`
    /// when any are given.
    ///
    /// # Examples
    /// ```no_run
    /// # use hunk_select::{StackId, Worktree};
    /// let diff = Worktree::new(".").diff(&[]).unwrap();
    /// let snapshot = diff.snapshot(Some(&StackId::from("feature")));
    /// ```
    pub fn diff(&self, files: &[String]) -> Result<Diff, HunkSelectError> {
        Ok(Diff::parse(&self.raw_diff(files)?)?)
    }

    fn raw_diff(&self, files: &[String]) -> Result<String, GitCommandError> {
        let mut args = vec![
            "-C",
            self.repo_path,
            "diff",
            "--no-ext-diff",
            "-U3",
            "--no-color",
            "--",
        ];
        args.extend(files.iter().map(|s| s.as_str()));

        let output = Command::new("git")
            .args(&args)
            .output()
            .map_err(|e| GitCommandError::DiffFailed {
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GitCommandError::DiffExitError {
                stderr: stderr.into_owned(),
            });
        }

        String::from_utf8(output.stdout).map_err(|e| GitCommandError::InvalidUtf8 {
            message: e.to_string(),
        })
    }
}

/// Check `lines` of `path`, each in whichever hunk of the stack contains it.
///
/// # Errors
///
/// [`HunkSelectError::LineNotInDiff`] when no hunk of the file holds a line.
pub fn check_file_lines(
    uncommitted: &mut Uncommitted,
    stack_id: Option<&StackId>,
    path: &str,
    lines: &[LineId],
) -> Result<(), HunkSelectError> {
    for line in lines {
        let header = uncommitted
            .assignments_by_path(stack_id, path)
            .into_iter()
            .filter_map(|a| a.hunk_header)
            .find(|h| matches!(h.contains_line(line), Ok(true)))
            .ok_or_else(|| HunkSelectError::LineNotInDiff {
                path: path.to_string(),
                line: line.to_string(),
            })?;
        uncommitted.check_line(stack_id, path, Some(header), *line)?;
    }
    Ok(())
}
