//! Data carried between the watcher, the registries and the commit layer.

use crate::header::{HunkHeader, LineId, LineIdError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Identifier of a stack (an independently committable lane of changes).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StackId(String);

impl StackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StackId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for StackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a path changed in the working tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "subject", rename_all = "camelCase")]
pub enum TreeStatus {
    Addition,
    Deletion,
    Modification,
    #[serde(rename_all = "camelCase")]
    Rename { previous_path: String },
}

impl TreeStatus {
    pub fn previous_path(&self) -> Option<&str> {
        match self {
            TreeStatus::Rename { previous_path } => Some(previous_path),
            _ => None,
        }
    }
}

/// One modified path in the working tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeChange {
    pub path: String,
    #[serde(default)]
    pub path_bytes: Vec<u8>,
    pub status: TreeStatus,
}

impl TreeChange {
    pub fn new(path: impl Into<String>, status: TreeStatus) -> Self {
        let path = path.into();
        Self {
            path_bytes: path.as_bytes().to_vec(),
            path,
            status,
        }
    }
}

/// Which stack a hunk currently belongs to.
///
/// `stack_id: None` is the unassigned lane. `hunk_header: None` marks a file
/// without a structured diff (binary or too large), identified by path alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HunkAssignment {
    #[serde(default)]
    pub id: Option<String>,
    pub hunk_header: Option<HunkHeader>,
    pub path: String,
    #[serde(default)]
    pub path_bytes: Vec<u8>,
    pub stack_id: Option<StackId>,
    #[serde(default)]
    pub line_nums_added: Option<Vec<u32>>,
    #[serde(default)]
    pub line_nums_removed: Option<Vec<u32>>,
}

impl HunkAssignment {
    pub fn key(&self) -> CompositeKey {
        CompositeKey::new(self.stack_id.clone(), &self.path, self.hunk_header)
    }

    /// The stable id when the backend tracks one, the structural key otherwise.
    pub fn identity(&self) -> Identity {
        match &self.id {
            Some(id) if !id.is_empty() => Identity::Stable(id.clone()),
            _ => Identity::Structural(self.key()),
        }
    }

    pub fn has_line_metadata(&self) -> bool {
        self.line_nums_added.is_some() && self.line_nums_removed.is_some()
    }

    /// Every selectable line of the hunk, or `None` without line metadata.
    pub fn all_lines(&self) -> Option<BTreeSet<LineId>> {
        let (added, removed) = self.line_nums()?;
        Some(
            removed
                .iter()
                .map(|&n| LineId::removed(n))
                .chain(added.iter().map(|&n| LineId::added(n)))
                .collect(),
        )
    }

    /// Whether `line` is one of this hunk's delta lines.
    ///
    /// Each side set on `line` must be present on the matching side of the
    /// hunk. Without line metadata every line is accepted.
    pub fn has_line(&self, line: &LineId) -> Result<bool, LineIdError> {
        line.kind()?;
        let Some((added, removed)) = self.line_nums() else {
            return Ok(true);
        };
        let old_ok = line.old_line.is_none_or(|n| removed.contains(&n));
        let new_ok = line.new_line.is_none_or(|n| added.contains(&n));
        Ok(old_ok && new_ok)
    }

    /// Whether `lines` selects every added and every removed line.
    ///
    /// Vacuously true without line metadata.
    pub fn covers(&self, lines: &BTreeSet<LineId>) -> bool {
        let Some((added, removed)) = self.line_nums() else {
            return true;
        };
        let old: BTreeSet<u32> = lines.iter().filter_map(|l| l.old_line).collect();
        let new: BTreeSet<u32> = lines.iter().filter_map(|l| l.new_line).collect();
        removed.iter().all(|n| old.contains(n)) && added.iter().all(|n| new.contains(n))
    }

    fn line_nums(&self) -> Option<(&[u32], &[u32])> {
        match (&self.line_nums_added, &self.line_nums_removed) {
            (Some(added), Some(removed)) => Some((added, removed)),
            _ => None,
        }
    }
}

/// Primary key of both registries: `(stack, path, hunk header)`.
///
/// Ordering is lexicographic over the three parts, so every key of one stack,
/// one file, or one directory forms a contiguous range.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeKey {
    pub stack_id: Option<StackId>,
    pub path: String,
    pub hunk_header: Option<HunkHeader>,
}

impl CompositeKey {
    pub fn new(stack_id: Option<StackId>, path: &str, hunk_header: Option<HunkHeader>) -> Self {
        Self {
            stack_id,
            path: path.to_string(),
            hunk_header,
        }
    }
}

/// `stack::path::oldStart-oldLines-newStart-newLines`, `null` for absent parts.
impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.stack_id {
            Some(stack) => write!(f, "{stack}::")?,
            None => f.write_str("null::")?,
        }
        write!(f, "{}::", self.path)?;
        match &self.hunk_header {
            Some(h) => write!(
                f,
                "{}-{}-{}-{}",
                h.old_start, h.old_lines, h.new_start, h.new_lines
            ),
            None => f.write_str("null"),
        }
    }
}

/// How a selection finds its assignment again after a refresh.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    Stable(String),
    Structural(CompositeKey),
}

/// Which lines of a hunk are checked.
///
/// A partial selection is never empty; "nothing selected" is the absence of
/// a [`HunkSelection`]. On the wire an empty list means [`LineSelection::Full`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<LineId>", into = "Vec<LineId>")]
pub enum LineSelection {
    Full,
    Partial(BTreeSet<LineId>),
}

impl LineSelection {
    /// `None` when `lines` is empty.
    pub fn partial(lines: impl IntoIterator<Item = LineId>) -> Option<Self> {
        let lines: BTreeSet<LineId> = lines.into_iter().collect();
        (!lines.is_empty()).then_some(LineSelection::Partial(lines))
    }

    pub fn is_full(&self) -> bool {
        matches!(self, LineSelection::Full)
    }

    /// The selected lines, empty for a full selection.
    pub fn to_vec(&self) -> Vec<LineId> {
        match self {
            LineSelection::Full => Vec::new(),
            LineSelection::Partial(lines) => lines.iter().copied().collect(),
        }
    }
}

impl From<Vec<LineId>> for LineSelection {
    fn from(lines: Vec<LineId>) -> Self {
        LineSelection::partial(lines).unwrap_or(LineSelection::Full)
    }
}

impl From<LineSelection> for Vec<LineId> {
    fn from(selection: LineSelection) -> Self {
        selection.to_vec()
    }
}

/// The checked lines of one assigned hunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HunkSelection {
    #[serde(default)]
    pub stable_id: Option<String>,
    pub stack_id: Option<StackId>,
    pub path: String,
    pub assignment_id: CompositeKey,
    pub lines: LineSelection,
}

impl HunkSelection {
    pub fn new(assignment: &HunkAssignment, lines: LineSelection) -> Self {
        Self {
            stable_id: assignment.id.clone().filter(|id| !id.is_empty()),
            stack_id: assignment.stack_id.clone(),
            path: assignment.path.clone(),
            assignment_id: assignment.key(),
            lines,
        }
    }

    pub fn whole(assignment: &HunkAssignment) -> Self {
        Self::new(assignment, LineSelection::Full)
    }

    pub fn identity(&self) -> Identity {
        match &self.stable_id {
            Some(id) => Identity::Stable(id.clone()),
            None => Identity::Structural(self.assignment_id.clone()),
        }
    }
}

/// A file-level request for the commit backend.
///
/// An empty `hunk_headers` list means the whole file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffSpec {
    pub path: String,
    pub previous_path: Option<String>,
    pub hunk_headers: Vec<HunkHeader>,
}

/// Tri-state checkbox for files, folders and stacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckboxStatus {
    Checked,
    Indeterminate,
    Unchecked,
}

impl fmt::Display for CheckboxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CheckboxStatus::Checked => "checked",
            CheckboxStatus::Indeterminate => "indeterminate",
            CheckboxStatus::Unchecked => "unchecked",
        })
    }
}

/// Selection state of a single hunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HunkCheckStatus {
    Unselected,
    Selected(LineSelection),
}

impl HunkCheckStatus {
    pub fn is_selected(&self) -> bool {
        matches!(self, HunkCheckStatus::Selected(_))
    }
}
