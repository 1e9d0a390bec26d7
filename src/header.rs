//! Hunk headers and the line identifiers that live inside them.
//!
//! A [`HunkHeader`] is the `@@ -a,b +c,d @@` part of a unified diff. A
//! [`LineId`] names one line of a hunk body by its position in the old file,
//! the new file, or both.

use error_set::error_set;
use nom::{
    IResult, Parser,
    bytes::complete::tag,
    character::complete::{char, u32 as number},
    combinator::opt,
    sequence::preceded,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

error_set! {
    /// Errors from malformed line identifiers
    LineIdError := {
        /// Neither the old nor the new line number is set
        #[display("Line id has neither an old nor a new line number")]
        EmptyLineId,
    }
}

/// A contiguous region of a unified diff.
///
/// Headers produced for line-level patches zero out the side they do not
/// touch, so ordering looks at whichever start is non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HunkHeader {
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
}

impl HunkHeader {
    pub const fn new(old_start: u32, old_lines: u32, new_start: u32, new_lines: u32) -> Self {
        Self {
            old_start,
            old_lines,
            new_start,
            new_lines,
        }
    }

    /// Parse a hunk header line such as `@@ -10,2 +10,3 @@ fn main() {`.
    ///
    /// A missing count means one line, as git writes it. Anything after the
    /// closing `@@` is ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use hunk_select::HunkHeader;
    ///
    /// let header = HunkHeader::parse("@@ -15 +14,0 @@ line 14").unwrap();
    /// assert_eq!(header, HunkHeader::new(15, 1, 14, 0));
    /// ```
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        header_line(line).ok().map(|(_, header)| header)
    }

    /// Whether both ranges of `other` lie inside the matching ranges of `self`.
    pub fn contains(&self, other: &HunkHeader) -> bool {
        let end = |start: u32, len: u32| u64::from(start) + u64::from(len);
        self.old_start <= other.old_start
            && end(other.old_start, other.old_lines) <= end(self.old_start, self.old_lines)
            && self.new_start <= other.new_start
            && end(other.new_start, other.new_lines) <= end(self.new_start, self.new_lines)
    }

    /// Whether `line` falls inside this header.
    ///
    /// Only the sides that are set on `line` are checked.
    pub fn contains_line(&self, line: &LineId) -> Result<bool, LineIdError> {
        let old = |n| in_range(self.old_start, self.old_lines, n);
        let new = |n| in_range(self.new_start, self.new_lines, n);
        match (line.old_line, line.new_line) {
            (None, None) => Err(LineIdError::EmptyLineId),
            (Some(o), None) => Ok(old(o)),
            (None, Some(n)) => Ok(new(n)),
            (Some(o), Some(n)) => Ok(old(o) && new(n)),
        }
    }

    /// The line this header starts at, top to bottom in the file.
    pub fn anchor(&self) -> u32 {
        if self.old_start != 0 {
            self.old_start
        } else {
            self.new_start
        }
    }
}

fn in_range(start: u32, len: u32, n: u32) -> bool {
    n >= start && u64::from(n) < u64::from(start) + u64::from(len)
}

impl Ord for HunkHeader {
    fn cmp(&self, other: &Self) -> Ordering {
        self.anchor().cmp(&other.anchor()).then_with(|| {
            (self.old_start, self.old_lines, self.new_start, self.new_lines).cmp(&(
                other.old_start,
                other.old_lines,
                other.new_start,
                other.new_lines,
            ))
        })
    }
}

impl PartialOrd for HunkHeader {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for HunkHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let old_part = match self.old_lines {
            1 => format!("-{}", self.old_start),
            n => format!("-{},{}", self.old_start, n),
        };
        let new_part = match self.new_lines {
            1 => format!("+{}", self.new_start),
            n => format!("+{},{}", self.new_start, n),
        };
        write!(f, "@@ {} {} @@", old_part, new_part)
    }
}

/// `start[,count]`
fn range(input: &str) -> IResult<&str, (u32, u32)> {
    (number, opt(preceded(char(','), number)))
        .map(|(start, count)| (start, count.unwrap_or(1)))
        .parse(input)
}

fn header_line(input: &str) -> IResult<&str, HunkHeader> {
    (
        preceded(tag("@@ -"), range),
        preceded(tag(" +"), range),
        tag(" @@"),
    )
        .map(|((old_start, old_lines), (new_start, new_lines), _)| {
            HunkHeader::new(old_start, old_lines, new_start, new_lines)
        })
        .parse(input)
}

/// What a line of a hunk body does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineKind {
    /// Only present in the new file
    Added,
    /// Only present in the old file
    Removed,
    /// Present in both
    Context,
}

/// Identifies one line of a hunk by its old and/or new line number.
///
/// Removed lines carry only `old_line`, added lines only `new_line`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineId {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_line: Option<u32>,
}

impl LineId {
    pub const fn removed(old_line: u32) -> Self {
        Self {
            old_line: Some(old_line),
            new_line: None,
        }
    }

    pub const fn added(new_line: u32) -> Self {
        Self {
            old_line: None,
            new_line: Some(new_line),
        }
    }

    pub const fn context(old_line: u32, new_line: u32) -> Self {
        Self {
            old_line: Some(old_line),
            new_line: Some(new_line),
        }
    }

    /// Classify by which side is absent.
    pub fn kind(&self) -> Result<LineKind, LineIdError> {
        match (self.old_line, self.new_line) {
            (Some(_), None) => Ok(LineKind::Removed),
            (None, Some(_)) => Ok(LineKind::Added),
            (Some(_), Some(_)) => Ok(LineKind::Context),
            (None, None) => Err(LineIdError::EmptyLineId),
        }
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.old_line, self.new_line) {
            (Some(o), None) => write!(f, "-{o}"),
            (None, Some(n)) => write!(f, "+{n}"),
            (Some(o), Some(n)) => write!(f, "{o}/{n}"),
            (None, None) => write!(f, "?"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    const BASE: HunkHeader = HunkHeader::new(10, 10, 20, 10);

    #[test]
    fn parse_full_header() {
        assert_eq!(
            HunkHeader::parse("@@ -10,2 +10,3 @@").unwrap(),
            HunkHeader::new(10, 2, 10, 3)
        );
    }

    #[test]
    fn parse_header_with_section_text() {
        assert_eq!(
            HunkHeader::parse("@@ -38,0 +39,5 @@ line 38").unwrap(),
            HunkHeader::new(38, 0, 39, 5)
        );
    }

    #[test]
    fn parse_header_implicit_counts() {
        assert_eq!(
            HunkHeader::parse("@@ -136,0 +137 @@").unwrap(),
            HunkHeader::new(136, 0, 137, 1)
        );
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(HunkHeader::parse("diff --git a/x b/x").is_none());
        assert!(HunkHeader::parse("@@ -a,1 +1 @@").is_none());
        assert!(HunkHeader::parse("@@ -1,1 +1").is_none());
    }

    #[test]
    fn render_omits_single_counts() {
        assert_eq!(HunkHeader::new(15, 1, 14, 0).to_string(), "@@ -15 +14,0 @@");
        assert_eq!(HunkHeader::new(10, 2, 10, 3).to_string(), "@@ -10,2 +10,3 @@");
    }

    #[test]
    fn contains_inner_hunk() {
        assert!(BASE.contains(&HunkHeader::new(12, 5, 22, 5)));
    }

    #[test]
    fn does_not_contain_outer_hunk() {
        assert!(!BASE.contains(&HunkHeader::new(5, 20, 15, 20)));
    }

    #[test]
    fn contains_hunk_ending_on_same_line() {
        assert!(BASE.contains(&HunkHeader::new(15, 5, 25, 5)));
    }

    #[test]
    fn does_not_contain_hunk_one_line_past_end() {
        assert!(!BASE.contains(&HunkHeader::new(15, 6, 25, 6)));
    }

    #[test]
    fn contains_itself() {
        assert!(BASE.contains(&BASE));
    }

    #[test]
    fn contains_line_checks_set_sides() {
        let hunk = HunkHeader::new(5, 5, 10, 5);
        assert!(hunk.contains_line(&LineId::removed(7)).unwrap());
        assert!(hunk.contains_line(&LineId::added(12)).unwrap());
        assert!(!hunk.contains_line(&LineId::removed(20)).unwrap());
        assert!(hunk.contains_line(&LineId::context(6, 11)).unwrap());
        assert!(!hunk.contains_line(&LineId::context(1, 1)).unwrap());
        assert!(!hunk.contains_line(&LineId::context(6, 1)).unwrap());
    }

    #[test]
    fn contains_line_rejects_empty_line_id() {
        let empty = LineId {
            old_line: None,
            new_line: None,
        };
        assert!(matches!(
            BASE.contains_line(&empty),
            Err(LineIdError::EmptyLineId)
        ));
    }

    #[test]
    fn containment_near_u32_max() {
        let top = HunkHeader::new(u32::MAX, 1, u32::MAX, 1);
        assert!(top.contains(&top));
        assert!(!top.contains(&HunkHeader::new(u32::MAX, 2, u32::MAX, 1)));
        assert!(top.contains_line(&LineId::removed(u32::MAX)).unwrap());
        assert!(!top.contains_line(&LineId::added(1)).unwrap());
    }

    #[test]
    fn order_by_non_zero_start() {
        let mut headers = vec![
            HunkHeader::new(0, 0, 3, 1),
            HunkHeader::new(0, 0, 5, 1),
            HunkHeader::new(3, 1, 0, 0),
            HunkHeader::new(5, 1, 0, 0),
        ];
        headers.sort();
        assert_eq!(
            headers,
            vec![
                HunkHeader::new(0, 0, 3, 1),
                HunkHeader::new(3, 1, 0, 0),
                HunkHeader::new(0, 0, 5, 1),
                HunkHeader::new(5, 1, 0, 0),
            ]
        );
    }

    #[test]
    fn order_mixed_zeroed_starts() {
        let mut headers = vec![
            HunkHeader::new(0, 0, 10, 2),
            HunkHeader::new(2, 1, 0, 0),
            HunkHeader::new(0, 0, 1, 1),
            HunkHeader::new(5, 2, 0, 0),
        ];
        headers.sort();
        assert_eq!(
            headers,
            vec![
                HunkHeader::new(0, 0, 1, 1),
                HunkHeader::new(2, 1, 0, 0),
                HunkHeader::new(5, 2, 0, 0),
                HunkHeader::new(0, 0, 10, 2),
            ]
        );
    }

    #[test]
    fn classify_line_ids() {
        assert_eq!(LineId::removed(3).kind().unwrap(), LineKind::Removed);
        assert_eq!(LineId::added(3).kind().unwrap(), LineKind::Added);
        assert_eq!(LineId::context(3, 4).kind().unwrap(), LineKind::Context);
        let empty = LineId {
            old_line: None,
            new_line: None,
        };
        assert!(empty.kind().is_err());
    }

    #[test]
    fn line_id_json_omits_absent_side() {
        let json = serde_json::to_string(&LineId::added(12)).unwrap();
        assert_eq!(json, r#"{"newLine":12}"#);
        let parsed: LineId = serde_json::from_str(r#"{"oldLine":4}"#).unwrap();
        assert_eq!(parsed, LineId::removed(4));
    }
}
