pub mod file;
pub mod full;
pub mod hunk;

use error_set::error_set;

pub use file::FileDiff;
pub use full::{Diff, Snapshot};
pub use hunk::{DiffHunk, DiffLine};

error_set! {
    /// Errors from malformed unified diff text
    DiffError := {
        /// The text does not start with a hunk header line
        #[display("Diff text is empty, expected a hunk header")]
        MissingHeader,
        /// The hunk header line could not be parsed
        #[display("Invalid hunk header: {header}")]
        InvalidHeader { header: String },
        /// A `diff --git` section names no file
        #[display("No file path in diff section: {section}")]
        MissingPath { section: String },
    }
}

/// Format a diff for display with the line id of every changed line.
///
/// Removed lines print as `-N`, added lines as `N`, the same syntax the
/// `headers` command accepts.
pub fn format_line_ids(diff: &Diff) -> String {
    let mut result = String::new();

    for file in &diff.files {
        result.push_str(&file.path);
        result.push_str(":\n");

        if file.binary {
            result.push_str("  (binary)\n\n");
            continue;
        }

        for hunk in &file.hunks {
            result.push_str(&format!("  {}\n", hunk.header));
            for line in &hunk.lines {
                match line {
                    DiffLine::Removed { old_line, content } => {
                        result.push_str(&format!("  -{}:\t{}\n", old_line, content));
                    }
                    DiffLine::Added { new_line, content } => {
                        result.push_str(&format!("  {}:\t{}\n", new_line, content));
                    }
                    DiffLine::Context { .. } => {}
                }
            }
            result.push('\n');
        }
    }

    if result.ends_with("\n\n") {
        result.pop();
    }

    result
}
