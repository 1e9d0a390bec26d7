use super::DiffError;
use crate::header::{HunkHeader, LineId};

/// One line of a hunk body, numbered against the old and new file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine {
    Added { new_line: u32, content: String },
    Removed { old_line: u32, content: String },
    Context {
        old_line: u32,
        new_line: u32,
        content: String,
    },
}

impl DiffLine {
    pub fn id(&self) -> LineId {
        match *self {
            DiffLine::Added { new_line, .. } => LineId::added(new_line),
            DiffLine::Removed { old_line, .. } => LineId::removed(old_line),
            DiffLine::Context {
                old_line, new_line, ..
            } => LineId::context(old_line, new_line),
        }
    }

    pub fn content(&self) -> &str {
        match self {
            DiffLine::Added { content, .. }
            | DiffLine::Removed { content, .. }
            | DiffLine::Context { content, .. } => content,
        }
    }
}

/// A single hunk: its header, the text it was parsed from, and its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffHunk {
    pub header: HunkHeader,
    /// Header line plus body, exactly as given to [`DiffHunk::parse`]
    pub diff: String,
    pub lines: Vec<DiffLine>,
}

impl DiffHunk {
    /// Parse a hunk from diff text (header line + body lines).
    ///
    /// Context lines past the end of either range are ignored, as are
    /// `\ No newline at end of file` markers.
    pub fn parse(text: &str) -> Result<Self, DiffError> {
        let mut body = text.lines();
        let header_line = body.next().ok_or(DiffError::MissingHeader)?;
        let header = HunkHeader::parse(header_line).ok_or_else(|| DiffError::InvalidHeader {
            header: header_line.to_string(),
        })?;

        // Ranges or bodies running past u32::MAX cannot be numbered.
        let overflow = || DiffError::InvalidHeader {
            header: header_line.to_string(),
        };
        let old_end = header.old_start.checked_add(header.old_lines).ok_or_else(overflow)?;
        let new_end = header.new_start.checked_add(header.new_lines).ok_or_else(overflow)?;
        let mut old_line = header.old_start;
        let mut new_line = header.new_start;
        let mut lines = Vec::new();

        for line in body {
            if line.starts_with('\\') {
                continue;
            } else if let Some(content) = line.strip_prefix('+') {
                lines.push(DiffLine::Added {
                    new_line,
                    content: content.to_string(),
                });
                new_line = new_line.checked_add(1).ok_or_else(overflow)?;
            } else if let Some(content) = line.strip_prefix('-') {
                lines.push(DiffLine::Removed {
                    old_line,
                    content: content.to_string(),
                });
                old_line = old_line.checked_add(1).ok_or_else(overflow)?;
            } else {
                if old_line >= old_end || new_line >= new_end {
                    continue;
                }
                lines.push(DiffLine::Context {
                    old_line,
                    new_line,
                    content: line.strip_prefix(' ').unwrap_or(line).to_string(),
                });
                old_line = old_line.checked_add(1).ok_or_else(overflow)?;
                new_line = new_line.checked_add(1).ok_or_else(overflow)?;
            }
        }

        Ok(DiffHunk {
            header,
            diff: text.to_string(),
            lines,
        })
    }

    /// New line numbers of every added line, in diff order.
    pub fn line_nums_added(&self) -> Vec<u32> {
        self.lines
            .iter()
            .filter_map(|line| match line {
                DiffLine::Added { new_line, .. } => Some(*new_line),
                _ => None,
            })
            .collect()
    }

    /// Old line numbers of every removed line, in diff order.
    pub fn line_nums_removed(&self) -> Vec<u32> {
        self.lines
            .iter()
            .filter_map(|line| match line {
                DiffLine::Removed { old_line, .. } => Some(*old_line),
                _ => None,
            })
            .collect()
    }

    /// Ids of every added or removed line, in diff order.
    pub fn delta_line_ids(&self) -> Vec<LineId> {
        self.lines
            .iter()
            .filter(|line| !matches!(line, DiffLine::Context { .. }))
            .map(DiffLine::id)
            .collect()
    }
}
