//! Turning a line-level selection into the hunk headers a patch needs.
//!
//! Walking a hunk body in order, selected lines of the same kind that sit
//! next to each other form a group. Every group becomes one header whose
//! selected side spans exactly that group.

use crate::diff::{DiffError, DiffHunk, DiffLine};
use crate::header::{HunkHeader, LineId, LineIdError};
use crate::parse::ParseError;
use error_set::error_set;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

error_set! {
    /// Errors while grouping selected lines of a hunk
    GroupError := {
        LineIdError(LineIdError),
        DiffError(DiffError),
    }
}

/// What the produced headers will be applied for.
///
/// Discarding keeps the parent range on the side that is not touched, so the
/// patch applies against the worktree. Committing zeroes it, producing a pure
/// line-level header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchAction {
    #[default]
    Commit,
    Discard,
}

impl FromStr for PatchAction {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "commit" => Ok(PatchAction::Commit),
            "discard" => Ok(PatchAction::Discard),
            other => Err(ParseError::UnknownAction {
                action: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for PatchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PatchAction::Commit => "commit",
            PatchAction::Discard => "discard",
        })
    }
}

/// Which side a group of lines changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeltaKind {
    Added,
    Removed,
}

/// A run of adjacent selected lines of one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineGroup {
    pub kind: DeltaKind,
    /// Line number of the first line on the group's side
    pub start: u32,
    pub lines: Vec<LineId>,
}

impl LineGroup {
    pub fn to_header(&self, parent: &HunkHeader, action: PatchAction) -> HunkHeader {
        let len = self.lines.len() as u32;
        match (self.kind, action) {
            (DeltaKind::Removed, PatchAction::Discard) => {
                HunkHeader::new(self.start, len, parent.new_start, parent.new_lines)
            }
            (DeltaKind::Removed, PatchAction::Commit) => HunkHeader::new(self.start, len, 0, 0),
            (DeltaKind::Added, PatchAction::Discard) => {
                HunkHeader::new(parent.old_start, parent.old_lines, self.start, len)
            }
            (DeltaKind::Added, PatchAction::Commit) => HunkHeader::new(0, 0, self.start, len),
        }
    }
}

/// Groups of the selected `lines` in `diff`, plus the hunk's own header.
pub fn extract_line_groups(
    lines: &[LineId],
    diff: &str,
) -> Result<(Vec<LineGroup>, HunkHeader), GroupError> {
    let mut selected = HashSet::with_capacity(lines.len());
    for line in lines {
        line.kind()?;
        selected.insert(*line);
    }
    let hunk = DiffHunk::parse(diff)?;
    Ok((group_lines(&hunk, |id| selected.contains(id)), hunk.header))
}

/// Groups of every added and removed line in `diff`, plus the hunk's header.
pub fn extract_all_groups(diff: &str) -> Result<(Vec<LineGroup>, HunkHeader), GroupError> {
    let hunk = DiffHunk::parse(diff)?;
    Ok((group_lines(&hunk, |_| true), hunk.header))
}

fn group_lines(hunk: &DiffHunk, selected: impl Fn(&LineId) -> bool) -> Vec<LineGroup> {
    let mut groups = Vec::new();
    let mut current: Option<LineGroup> = None;

    for line in &hunk.lines {
        let id = line.id();
        let delta = match *line {
            DiffLine::Added { new_line, .. } if selected(&id) => Some((DeltaKind::Added, new_line)),
            DiffLine::Removed { old_line, .. } if selected(&id) => {
                Some((DeltaKind::Removed, old_line))
            }
            _ => None,
        };

        match (delta, &mut current) {
            (Some((kind, _)), Some(group)) if group.kind == kind => group.lines.push(id),
            (Some((kind, start)), slot) => groups.extend(slot.replace(LineGroup {
                kind,
                start,
                lines: vec![id],
            })),
            (None, slot) => groups.extend(slot.take()),
        }
    }

    groups.extend(current);
    groups
}

/// Headers covering exactly the selected `lines` of `diff`, in diff order.
///
/// An empty selection yields no headers without looking at `diff`.
///
/// # Examples
///
/// ```
/// use hunk_select::{HunkHeader, LineId, PatchAction, line_ids_to_hunk_headers};
///
/// let diff = "@@ -1,3 +1,2 @@\n  line 1\n- line 2\n  line 3\n";
/// let headers =
///     line_ids_to_hunk_headers(&[LineId::removed(2)], diff, PatchAction::Commit).unwrap();
/// assert_eq!(headers, vec![HunkHeader::new(2, 1, 0, 0)]);
/// ```
pub fn line_ids_to_hunk_headers(
    lines: &[LineId],
    diff: &str,
    action: PatchAction,
) -> Result<Vec<HunkHeader>, GroupError> {
    if lines.is_empty() {
        return Ok(Vec::new());
    }
    let (groups, parent) = extract_line_groups(lines, diff)?;
    Ok(groups.iter().map(|g| g.to_header(&parent, action)).collect())
}

/// Headers covering every changed line of `diff`.
pub fn diff_to_hunk_headers(diff: &str, action: PatchAction) -> Result<Vec<HunkHeader>, GroupError> {
    let (groups, parent) = extract_all_groups(diff)?;
    Ok(groups.iter().map(|g| g.to_header(&parent, action)).collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    const BIG_DIFF: &str = "@@ -1,10 +1,12 @@
 1
 2
 3
- 4
+ new 4
 5
- 6
- 7
+ new 6
+ new 7
+ an extra line
+ another extra line
 8
 9
 10
";

    const INTERLEAVED: &str = "@@ -1,4 +1,2 @@
- line 1
line 2
- line 3
+ new line 2
- line 4
";

    fn render(headers: &[HunkHeader]) -> String {
        headers
            .iter()
            .map(|h| h.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn empty_selection_yields_no_headers() {
        assert_eq!(
            line_ids_to_hunk_headers(&[], "", PatchAction::Discard).unwrap(),
            vec![]
        );
        assert_eq!(
            line_ids_to_hunk_headers(&[], "", PatchAction::Commit).unwrap(),
            vec![]
        );
    }

    #[test]
    fn single_removed_line() {
        let diff = "@@ -1,3 +1,2 @@\n  line 1\n- line 2\n  line 3\n";
        let lines = [LineId::removed(2)];
        assert_eq!(
            line_ids_to_hunk_headers(&lines, diff, PatchAction::Discard).unwrap(),
            vec![HunkHeader::new(2, 1, 1, 2)]
        );
        assert_eq!(
            line_ids_to_hunk_headers(&lines, diff, PatchAction::Commit).unwrap(),
            vec![HunkHeader::new(2, 1, 0, 0)]
        );
    }

    #[test]
    fn big_diff_neat_selection() {
        let lines = [LineId::removed(4), LineId::added(6), LineId::added(7)];
        assert_eq!(
            line_ids_to_hunk_headers(&lines, BIG_DIFF, PatchAction::Discard).unwrap(),
            vec![HunkHeader::new(4, 1, 1, 12), HunkHeader::new(1, 10, 6, 2)]
        );
        assert_eq!(
            line_ids_to_hunk_headers(&lines, BIG_DIFF, PatchAction::Commit).unwrap(),
            vec![HunkHeader::new(4, 1, 0, 0), HunkHeader::new(0, 0, 6, 2)]
        );
    }

    #[test]
    fn big_diff_overlapping_selection_in_any_order() {
        let lines = [
            LineId::added(7),
            LineId::added(4),
            LineId::removed(6),
            LineId::added(6),
            LineId::removed(4),
        ];
        insta::assert_snapshot!(
            render(&line_ids_to_hunk_headers(&lines, BIG_DIFF, PatchAction::Discard).unwrap()),
            @r"
        @@ -4 +1,12 @@
        @@ -1,10 +4 @@
        @@ -6 +1,12 @@
        @@ -1,10 +6,2 @@
        "
        );
        insta::assert_snapshot!(
            render(&line_ids_to_hunk_headers(&lines, BIG_DIFF, PatchAction::Commit).unwrap()),
            @r"
        @@ -4 +0,0 @@
        @@ -0,0 +4 @@
        @@ -6 +0,0 @@
        @@ -0,0 +6,2 @@
        "
        );
    }

    #[test]
    fn deleted_file_discard() {
        let diff = "@@ -1,3 +0,0 @@\n-a\n-b\n-c\n";
        let lines = [LineId::removed(1), LineId::removed(2), LineId::removed(3)];
        assert_eq!(
            line_ids_to_hunk_headers(&lines, diff, PatchAction::Discard).unwrap(),
            vec![HunkHeader::new(1, 3, 0, 0)]
        );
    }

    #[test]
    fn no_line_ids_gives_no_groups() {
        let diff = "@@ -1,4 +1,2 @@\n- line 1\n- line 2\n+ new line 1\n+ new line 2\n- line 3\n- line 4\n";
        assert_eq!(
            extract_line_groups(&[], diff).unwrap(),
            (vec![], HunkHeader::new(1, 4, 1, 2))
        );
    }

    #[test]
    fn groups_split_on_kind_change() {
        let diff = "@@ -1,4 +1,2 @@\n- line 1\n- line 2\n+ new line 1\n+ new line 2\n- line 3\n- line 4\n";
        let (groups, _) = extract_all_groups(diff).unwrap();
        assert_eq!(
            groups,
            vec![
                LineGroup {
                    kind: DeltaKind::Removed,
                    start: 1,
                    lines: vec![LineId::removed(1), LineId::removed(2)],
                },
                LineGroup {
                    kind: DeltaKind::Added,
                    start: 1,
                    lines: vec![LineId::added(1), LineId::added(2)],
                },
                LineGroup {
                    kind: DeltaKind::Removed,
                    start: 3,
                    lines: vec![LineId::removed(3), LineId::removed(4)],
                },
            ]
        );
    }

    #[test]
    fn groups_split_on_context_and_follow_diff_order() {
        let lines = [
            LineId::removed(3),
            LineId::removed(4),
            LineId::added(2),
            LineId::removed(1),
        ];
        let (groups, header) = extract_line_groups(&lines, INTERLEAVED).unwrap();
        assert_eq!(header, HunkHeader::new(1, 4, 1, 2));
        assert_eq!(
            groups.iter().map(|g| g.lines.clone()).collect::<Vec<_>>(),
            vec![
                vec![LineId::removed(1)],
                vec![LineId::removed(3)],
                vec![LineId::added(2)],
                vec![LineId::removed(4)],
            ]
        );
    }

    #[test]
    fn unselected_line_closes_group() {
        let lines = [LineId::removed(6)];
        let (groups, _) = extract_line_groups(&lines, BIG_DIFF).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].lines, vec![LineId::removed(6)]);
    }

    #[test]
    fn diff_to_headers_selects_every_line() {
        assert_eq!(
            diff_to_hunk_headers(BIG_DIFF, PatchAction::Commit).unwrap(),
            vec![
                HunkHeader::new(4, 1, 0, 0),
                HunkHeader::new(0, 0, 4, 1),
                HunkHeader::new(6, 2, 0, 0),
                HunkHeader::new(0, 0, 6, 4),
            ]
        );
    }

    #[test]
    fn empty_line_id_is_rejected() {
        let empty = LineId {
            old_line: None,
            new_line: None,
        };
        let err = line_ids_to_hunk_headers(&[empty], BIG_DIFF, PatchAction::Commit).unwrap_err();
        assert!(matches!(err, GroupError::LineIdError(LineIdError::EmptyLineId)));
    }

    #[test]
    fn malformed_diff_is_rejected() {
        let err =
            line_ids_to_hunk_headers(&[LineId::added(1)], "+x\n", PatchAction::Commit).unwrap_err();
        assert!(matches!(err, GroupError::DiffError(DiffError::InvalidHeader { .. })));
    }

    #[test]
    fn range_past_u32_max_is_rejected() {
        let diff = "@@ -4294967295,2 +1 @@\n-a\n+b\n";
        let err =
            line_ids_to_hunk_headers(&[LineId::added(1)], diff, PatchAction::Commit).unwrap_err();
        assert!(matches!(err, GroupError::DiffError(DiffError::InvalidHeader { .. })));
    }

    #[test]
    fn action_from_str() {
        assert_eq!("discard".parse::<PatchAction>().unwrap(), PatchAction::Discard);
        assert!("stash".parse::<PatchAction>().is_err());
        assert_eq!(PatchAction::default(), PatchAction::Commit);
    }
}
