use super::DiffError;
use super::hunk::DiffHunk;
use crate::model::TreeStatus;

/// The `diff --git` section of a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    /// Path in the new tree (old path for deletions)
    pub path: String,
    pub status: TreeStatus,
    /// Set for `Binary files ... differ` sections, which carry no hunks
    pub binary: bool,
    pub hunks: Vec<DiffHunk>,
}

impl FileDiff {
    /// Parse one file section of `git diff` output.
    ///
    /// Expects input starting with `diff --git a/... b/...`. The path comes
    /// from the `+++ b/` line, falling back to `--- a/` for deletions and to
    /// the `diff --git` line for sections without hunks.
    pub fn parse(text: &str) -> Result<Self, DiffError> {
        let first_hunk = text
            .find("\n@@ ")
            .map(|i| i + 1)
            .unwrap_or(text.len());
        let preamble = &text[..first_hunk];

        let mut old_path = None;
        let mut new_path = None;
        let mut rename_from = None;
        let mut rename_to = None;
        let mut added = false;
        let mut deleted = false;
        let mut binary = false;

        for line in preamble.lines() {
            if let Some(p) = line.strip_prefix("--- a/") {
                old_path = Some(p);
            } else if let Some(p) = line.strip_prefix("+++ b/") {
                new_path = Some(p);
            } else if let Some(p) = line.strip_prefix("rename from ") {
                rename_from = Some(p);
            } else if let Some(p) = line.strip_prefix("rename to ") {
                rename_to = Some(p);
            } else if line.starts_with("new file mode") || line == "--- /dev/null" {
                added = true;
            } else if line.starts_with("deleted file mode") || line == "+++ /dev/null" {
                deleted = true;
            } else if line.starts_with("Binary files ") {
                binary = true;
            }
        }

        let path = new_path
            .or(rename_to)
            .or(old_path)
            .or_else(|| git_line_path(preamble))
            .filter(|p| !p.is_empty())
            .ok_or_else(|| DiffError::MissingPath {
                section: preamble.lines().next().unwrap_or_default().to_string(),
            })?
            .to_string();

        let status = if added {
            TreeStatus::Addition
        } else if deleted {
            TreeStatus::Deletion
        } else if let Some(previous_path) = rename_from.or(old_path).filter(|p| *p != path) {
            TreeStatus::Rename {
                previous_path: previous_path.to_string(),
            }
        } else {
            TreeStatus::Modification
        };

        let mut indices = Vec::new();
        let mut search_start = first_hunk;
        while search_start < text.len() {
            indices.push(search_start);
            match text[search_start + 1..].find("\n@@ ") {
                Some(pos) => search_start = search_start + 1 + pos + 1,
                None => break,
            }
        }

        let hunks = indices
            .iter()
            .enumerate()
            .map(|(i, &start)| {
                let end = indices.get(i + 1).copied().unwrap_or(text.len());
                DiffHunk::parse(&text[start..end])
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FileDiff {
            path,
            status,
            binary,
            hunks,
        })
    }

    pub fn previous_path(&self) -> Option<&str> {
        self.status.previous_path()
    }
}

/// `b/` path of a `diff --git a/x b/x` line.
fn git_line_path(preamble: &str) -> Option<&str> {
    let header = preamble.lines().next()?.strip_prefix("diff --git ")?;
    header.rsplit_once(" b/").map(|(_, path)| path)
}
