//! Textual line selections.
//!
//! A selection is a comma-separated list of line references:
//!
//! - `N` or `+N` - added line N (new file numbering)
//! - `-N` - removed line N (old file numbering)
//! - `N..M` - added lines N through M
//! - `-N..-M` - removed lines N through M
//!
//! `path:refs` prefixes the list with the file it applies to.
//!
//! # Examples
//!
//! ```
//! use hunk_select::LineId;
//! use hunk_select::parse::{parse_file_refs, parse_line_ids};
//!
//! assert_eq!(
//!     parse_line_ids("-4,6..7").unwrap(),
//!     vec![LineId::removed(4), LineId::added(6), LineId::added(7)]
//! );
//!
//! let refs = parse_file_refs("src/a.ts:12").unwrap();
//! assert_eq!(refs.path, "src/a.ts");
//! assert_eq!(refs.lines, vec![LineId::added(12)]);
//! ```

use crate::header::LineId;
use error_set::error_set;
use std::num::NonZeroU32;

error_set! {
    /// Errors from parsing textual line selections
    ParseError := {
        /// Input string does not contain a colon separator
        #[display("Invalid format '{input}': expected 'path:refs'")]
        InvalidFormat { input: String },
        /// Path before the colon is empty or whitespace
        #[display("Invalid format '{input}': path cannot be empty")]
        EmptyPath { input: String },
        /// No line references provided
        #[display("No line references provided")]
        EmptyRefs,
        /// Line number could not be parsed as a non-zero u32
        #[display("Invalid line number '{value}'")]
        InvalidLineNumber { value: String },
        /// Range has start greater than end
        #[display("Invalid range {start}..{end}: start must be <= end")]
        InvalidRange { start: u32, end: u32 },
        /// Range mixes removed and added ends, as in `-3..5`
        #[display("Range '{value}' mixes removed and added lines")]
        MixedRange { value: String },
        /// Not `commit` or `discard`
        #[display("Unknown action '{action}': expected 'commit' or 'discard'")]
        UnknownAction { action: String },
    }
}

/// Line selection for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLineIds {
    pub path: String,
    pub lines: Vec<LineId>,
}

/// Parse `path:refs`.
///
/// The split happens at the last colon, so paths may contain colons.
pub fn parse_file_refs(input: &str) -> Result<FileLineIds, ParseError> {
    let (path, refs) = input
        .rsplit_once(':')
        .ok_or_else(|| ParseError::InvalidFormat {
            input: input.to_string(),
        })?;

    let path = path.trim();
    if path.is_empty() {
        return Err(ParseError::EmptyPath {
            input: input.to_string(),
        });
    }

    Ok(FileLineIds {
        path: path.to_string(),
        lines: parse_line_ids(refs)?,
    })
}

/// Parse a comma-separated list of line references, expanding ranges.
pub fn parse_line_ids(input: &str) -> Result<Vec<LineId>, ParseError> {
    let mut lines = Vec::new();
    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        parse_single_ref(part, &mut lines)?;
    }

    if lines.is_empty() {
        return Err(ParseError::EmptyRefs);
    }

    Ok(lines)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Side {
    Removed,
    Added,
}

fn parse_single_ref(input: &str, out: &mut Vec<LineId>) -> Result<(), ParseError> {
    let (start, end) = match input.split_once("..") {
        Some((start, end)) => (parse_number(start)?, parse_number(end)?),
        None => {
            let single = parse_number(input)?;
            (single, single)
        }
    };

    if start.0 != end.0 {
        return Err(ParseError::MixedRange {
            value: input.to_string(),
        });
    }
    if start.1 > end.1 {
        return Err(ParseError::InvalidRange {
            start: start.1.get(),
            end: end.1.get(),
        });
    }

    out.extend((start.1.get()..=end.1.get()).map(|n| match start.0 {
        Side::Removed => LineId::removed(n),
        Side::Added => LineId::added(n),
    }));
    Ok(())
}

fn parse_number(input: &str) -> Result<(Side, NonZeroU32), ParseError> {
    let (side, digits) = match input.as_bytes().first() {
        Some(b'-') => (Side::Removed, &input[1..]),
        Some(b'+') => (Side::Added, &input[1..]),
        _ => (Side::Added, input),
    };
    digits
        .parse::<NonZeroU32>()
        .map(|n| (side, n))
        .map_err(|_| ParseError::InvalidLineNumber {
            value: input.to_string(),
        })
}
