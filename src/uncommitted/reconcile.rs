use super::{Uncommitted, canonical};
use crate::model::{HunkAssignment, HunkSelection, Identity, LineSelection, TreeChange};
use crate::registry::Registry;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, trace};

impl Uncommitted {
    /// Load a fresh snapshot and carry existing selections forward onto it.
    ///
    /// Changes and assignments are replaced wholesale. Each selection looks up
    /// its assignment by stable id, or by its old key when there is none; it
    /// is dropped when the assignment is gone or none of its lines survive.
    /// The selection registry is rebuilt from the survivors only.
    pub fn update(&mut self, assignments: Vec<HunkAssignment>, changes: Vec<TreeChange>) {
        let previous = std::mem::take(&mut self.assignments);
        let selections = std::mem::take(&mut self.selections);

        self.changes = changes.into_iter().map(|c| (c.path.clone(), c)).collect();
        self.assignments = assignments.into_iter().map(|a| (a.key(), a)).collect();

        let by_identity: HashMap<Identity, &HunkAssignment> = self
            .assignments
            .values()
            .map(|a| (a.identity(), a))
            .collect();

        let total = selections.len();
        let mut survivors: Registry<HunkSelection> = Registry::new();
        for (key, selection) in selections {
            let Some(&assignment) = by_identity.get(&selection.identity()) else {
                trace!(%key, "dropping selection, assignment is gone");
                continue;
            };
            let Some(lines) = update_lines(assignment, previous.get(&key), &selection.lines)
            else {
                trace!(%key, "dropping selection, no selected line survived");
                continue;
            };
            let new_key = assignment.key();
            let lines = match survivors.remove(&new_key) {
                Some(earlier) => merge(assignment, earlier.lines, lines),
                None => lines,
            };
            survivors.insert(new_key, HunkSelection::new(assignment, lines));
        }

        debug!(
            changes = self.changes.len(),
            assignments = self.assignments.len(),
            kept = survivors.len(),
            dropped = total - survivors.len(),
            "reconciled selections"
        );
        self.selections = survivors;
    }
}

/// Two selections that landed on the same hunk: the union of their lines.
fn merge(assignment: &HunkAssignment, a: LineSelection, b: LineSelection) -> LineSelection {
    match (a, b) {
        (LineSelection::Partial(mut a), LineSelection::Partial(b)) => {
            a.extend(b);
            canonical(assignment, a)
        }
        _ => LineSelection::Full,
    }
}

/// Re-derive `old_lines` against `new`, the successor of `old`.
///
/// Returns `None` when nothing of the old selection can be represented.
///
/// - A selection that covered everything of `old` (or had no `old` to compare
///   with) covers everything of `new`.
/// - Without line metadata on `new` there is nothing to filter by, so the
///   whole hunk stays selected.
/// - Otherwise only lines still present in `new` are kept.
pub fn update_lines(
    new: &HunkAssignment,
    old: Option<&HunkAssignment>,
    old_lines: &LineSelection,
) -> Option<LineSelection> {
    let Some(old) = old else {
        return Some(LineSelection::Full);
    };
    if every_line_selected(old, old_lines) || !new.has_line_metadata() {
        return Some(LineSelection::Full);
    }
    let LineSelection::Partial(lines) = old_lines else {
        return Some(LineSelection::Full);
    };

    let kept: BTreeSet<_> = lines
        .iter()
        .copied()
        .filter(|line| matches!(new.has_line(line), Ok(true)))
        .collect();
    (!kept.is_empty()).then(|| canonical(new, kept))
}

/// Whether `lines` selects all of `assignment`.
///
/// True for a full selection, for assignments without line metadata, and
/// for partial selections naming every added and removed line.
pub fn every_line_selected(assignment: &HunkAssignment, lines: &LineSelection) -> bool {
    match lines {
        LineSelection::Full => true,
        LineSelection::Partial(lines) => assignment.covers(lines),
    }
}
