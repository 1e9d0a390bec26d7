//! The uncommitted-change selection engine.
//!
//! Three collections live here and change together: the tree changes of the
//! last refresh, the hunk assignments keyed by `(stack, path, header)`, and
//! the line selections keyed the same way. A refresh replaces the first two
//! and carries the third forward (see [`Uncommitted::update`]); the check and
//! uncheck operations only ever touch selections.

mod commit;
mod reconcile;
mod status;

pub use commit::{CommitError, HunkDiffs};
pub use reconcile::{every_line_selected, update_lines};

use crate::config::Config;
use crate::header::{HunkHeader, LineId, LineIdError, LineKind};
use crate::model::{CompositeKey, HunkAssignment, HunkSelection, LineSelection, StackId, TreeChange};
use crate::registry::{KeyPrefix, Registry};
use error_set::error_set;
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

error_set! {
    /// Errors from check and uncheck operations
    SelectionError := {
        /// The target hunk has no assignment, usually a key from before the last refresh
        #[display("No hunk assignment for {key}")]
        MissingAssignment { key: String },
        /// The line is not one of the hunk's added or removed lines
        #[display("Line {line} is not part of hunk {key}")]
        LineNotInHunk { key: String, line: String },
        LineIdError(LineIdError),
    }
}

/// Tree changes, hunk assignments and hunk selections of the working tree.
#[derive(Debug, Clone, Default)]
pub struct Uncommitted {
    changes: BTreeMap<String, TreeChange>,
    assignments: Registry<HunkAssignment>,
    selections: Registry<HunkSelection>,
    config: Config,
}

impl Uncommitted {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn require(&self, key: &CompositeKey) -> Result<&HunkAssignment, SelectionError> {
        self.assignments
            .get(key)
            .ok_or_else(|| SelectionError::MissingAssignment {
                key: key.to_string(),
            })
    }

    fn dir_prefix(&self, stack_id: Option<&StackId>, dir: &str) -> KeyPrefix {
        KeyPrefix::dir(stack_id, dir, self.config.path_separator)
    }

    /// Check one line of a hunk.
    ///
    /// A selection that ends up covering every line of the hunk collapses to
    /// [`LineSelection::Full`]. Checking a line of a fully selected hunk is a
    /// no-op rather than narrowing the selection to that one line.
    pub fn check_line(
        &mut self,
        stack_id: Option<&StackId>,
        path: &str,
        hunk_header: Option<HunkHeader>,
        line: LineId,
    ) -> Result<(), SelectionError> {
        let key = CompositeKey::new(stack_id.cloned(), path, hunk_header);
        let assignment = self.require(&key)?;
        require_delta_line(assignment, &key, &line)?;

        let lines = match self.selections.get(&key).map(|s| &s.lines) {
            Some(LineSelection::Full) => LineSelection::Full,
            Some(LineSelection::Partial(lines)) => {
                let mut lines = lines.clone();
                lines.insert(line);
                canonical(assignment, lines)
            }
            None => canonical(assignment, BTreeSet::from([line])),
        };
        trace!(%key, %line, full = lines.is_full(), "check line");
        let selection = HunkSelection::new(assignment, lines);
        self.selections.insert(key, selection);
        Ok(())
    }

    /// Uncheck one line of a hunk.
    ///
    /// A fully selected hunk expands to `all_lines_in_hunk` minus `line`,
    /// keeping only the added and removed lines of the hunk. The selection is
    /// removed once no line is left.
    pub fn uncheck_line(
        &mut self,
        stack_id: Option<&StackId>,
        path: &str,
        hunk_header: Option<HunkHeader>,
        line: LineId,
        all_lines_in_hunk: &[LineId],
    ) -> Result<(), SelectionError> {
        let key = CompositeKey::new(stack_id.cloned(), path, hunk_header);
        let assignment = self.require(&key)?;
        require_delta_line(assignment, &key, &line)?;

        let mut remaining = match self.selections.get(&key).map(|s| &s.lines) {
            None => return Ok(()),
            Some(LineSelection::Full) => all_lines_in_hunk
                .iter()
                .copied()
                .filter(|l| is_delta_line(assignment, l))
                .collect::<BTreeSet<_>>(),
            Some(LineSelection::Partial(lines)) => lines.clone(),
        };
        remaining.remove(&line);

        trace!(%key, %line, remaining = remaining.len(), "uncheck line");
        if remaining.is_empty() {
            self.selections.remove(&key);
        } else {
            let selection = HunkSelection::new(assignment, canonical(assignment, remaining));
            self.selections.insert(key, selection);
        }
        Ok(())
    }

    pub fn check_hunk(
        &mut self,
        stack_id: Option<&StackId>,
        path: &str,
        hunk_header: Option<HunkHeader>,
    ) -> Result<(), SelectionError> {
        let key = CompositeKey::new(stack_id.cloned(), path, hunk_header);
        let selection = HunkSelection::whole(self.require(&key)?);
        trace!(%key, "check hunk");
        self.selections.insert(key, selection);
        Ok(())
    }

    pub fn uncheck_hunk(
        &mut self,
        stack_id: Option<&StackId>,
        path: &str,
        hunk_header: Option<HunkHeader>,
    ) -> Result<(), SelectionError> {
        let key = CompositeKey::new(stack_id.cloned(), path, hunk_header);
        self.require(&key)?;
        trace!(%key, "uncheck hunk");
        self.selections.remove(&key);
        Ok(())
    }

    pub fn check_file(&mut self, stack_id: Option<&StackId>, path: &str) {
        self.check_all(&KeyPrefix::file(stack_id, path));
    }

    pub fn check_files<'a>(
        &mut self,
        stack_id: Option<&StackId>,
        paths: impl IntoIterator<Item = &'a str>,
    ) {
        for path in paths {
            self.check_file(stack_id, path);
        }
    }

    pub fn uncheck_file(&mut self, stack_id: Option<&StackId>, path: &str) {
        self.uncheck_all(&KeyPrefix::file(stack_id, path));
    }

    pub fn check_dir(&mut self, stack_id: Option<&StackId>, dir: &str) {
        self.check_all(&self.dir_prefix(stack_id, dir));
    }

    pub fn uncheck_dir(&mut self, stack_id: Option<&StackId>, dir: &str) {
        self.uncheck_all(&self.dir_prefix(stack_id, dir));
    }

    pub fn check_stack(&mut self, stack_id: Option<&StackId>) {
        self.check_all(&KeyPrefix::stack(stack_id));
    }

    pub fn uncheck_stack(&mut self, stack_id: Option<&StackId>) {
        self.uncheck_all(&KeyPrefix::stack(stack_id));
    }

    fn check_all(&mut self, prefix: &KeyPrefix) {
        let selections: Vec<_> = self
            .assignments
            .scan(prefix)
            .map(|(key, assignment)| (key.clone(), HunkSelection::whole(assignment)))
            .collect();
        trace!(?prefix, count = selections.len(), "check all");
        for (key, selection) in selections {
            self.selections.insert(key, selection);
        }
    }

    fn uncheck_all(&mut self, prefix: &KeyPrefix) {
        let keys = self.assignments.keys_under(prefix);
        trace!(?prefix, count = keys.len(), "uncheck all");
        for key in &keys {
            self.selections.remove(key);
        }
    }

    /// Drop every selection of exactly this stack.
    pub fn clear_hunk_selection(&mut self, stack_id: Option<&StackId>) {
        let removed = self.selections.remove_under(&KeyPrefix::stack(stack_id));
        trace!(?stack_id, removed, "clear hunk selection");
    }

    /// Reset changes, assignments and selections together.
    pub fn clear(&mut self) {
        self.changes.clear();
        self.assignments.clear();
        self.selections.clear();
    }

    pub fn change(&self, path: &str) -> Option<&TreeChange> {
        self.changes.get(path)
    }

    /// All tree changes, sorted by path.
    pub fn changes(&self) -> impl Iterator<Item = &TreeChange> {
        self.changes.values()
    }

    pub fn assignment(
        &self,
        stack_id: Option<&StackId>,
        path: &str,
        hunk_header: Option<HunkHeader>,
    ) -> Option<&HunkAssignment> {
        self.assignments
            .get(&CompositeKey::new(stack_id.cloned(), path, hunk_header))
    }

    pub fn assignments(&self) -> &Registry<HunkAssignment> {
        &self.assignments
    }

    pub fn assignments_by_path(&self, stack_id: Option<&StackId>, path: &str) -> Vec<&HunkAssignment> {
        let prefix = KeyPrefix::file(stack_id, path);
        self.assignments.scan(&prefix).map(|(_, a)| a).collect()
    }

    pub fn assignments_by_stack(&self, stack_id: Option<&StackId>) -> Vec<&HunkAssignment> {
        let prefix = KeyPrefix::stack(stack_id);
        self.assignments.scan(&prefix).map(|(_, a)| a).collect()
    }

    pub fn selection(
        &self,
        stack_id: Option<&StackId>,
        path: &str,
        hunk_header: Option<HunkHeader>,
    ) -> Option<&HunkSelection> {
        self.selections
            .get(&CompositeKey::new(stack_id.cloned(), path, hunk_header))
    }

    pub fn selections(&self) -> &Registry<HunkSelection> {
        &self.selections
    }

    /// Tree changes with at least one hunk assigned to the stack.
    pub fn changes_by_stack_id(&self, stack_id: Option<&StackId>) -> Vec<&TreeChange> {
        self.changes_under(&self.assignments, stack_id)
    }

    /// Tree changes with at least one selected hunk in the stack.
    pub fn selected_by_stack_id(&self, stack_id: Option<&StackId>) -> Vec<&TreeChange> {
        self.changes_under(&self.selections, stack_id)
    }

    fn changes_under<T>(&self, registry: &Registry<T>, stack_id: Option<&StackId>) -> Vec<&TreeChange> {
        let prefix = KeyPrefix::stack(stack_id);
        let paths: BTreeSet<&str> = registry.scan(&prefix).map(|(k, _)| k.path.as_str()).collect();
        paths.into_iter().filter_map(|p| self.changes.get(p)).collect()
    }

    /// Whether there is anything to commit from the stack or the unassigned lane.
    pub fn start_commit_visible(&self, stack_id: Option<&StackId>) -> bool {
        let has_any = |stack| {
            self.assignments
                .scan(&KeyPrefix::stack(stack))
                .next()
                .is_some()
        };
        has_any(stack_id) || has_any(None)
    }
}

/// Whether `line` is one of the added or removed lines of the hunk.
fn is_delta_line(assignment: &HunkAssignment, line: &LineId) -> bool {
    matches!(line.kind(), Ok(LineKind::Added | LineKind::Removed))
        && matches!(assignment.has_line(line), Ok(true))
}

fn require_delta_line(
    assignment: &HunkAssignment,
    key: &CompositeKey,
    line: &LineId,
) -> Result<(), SelectionError> {
    line.kind()?;
    if is_delta_line(assignment, line) {
        Ok(())
    } else {
        Err(SelectionError::LineNotInHunk {
            key: key.to_string(),
            line: line.to_string(),
        })
    }
}

/// Collapse a selection that covers every line of the hunk.
fn canonical(assignment: &HunkAssignment, lines: BTreeSet<LineId>) -> LineSelection {
    if assignment.covers(&lines) {
        LineSelection::Full
    } else {
        LineSelection::Partial(lines)
    }
}
