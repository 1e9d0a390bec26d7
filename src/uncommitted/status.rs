use super::Uncommitted;
use crate::header::HunkHeader;
use crate::model::{CheckboxStatus, CompositeKey, HunkCheckStatus, StackId};
use crate::registry::KeyPrefix;

impl Uncommitted {
    pub fn hunk_check_status(
        &self,
        stack_id: Option<&StackId>,
        path: &str,
        hunk_header: Option<HunkHeader>,
    ) -> HunkCheckStatus {
        let key = CompositeKey::new(stack_id.cloned(), path, hunk_header);
        match self.selections.get(&key) {
            Some(selection) => HunkCheckStatus::Selected(selection.lines.clone()),
            None => HunkCheckStatus::Unselected,
        }
    }

    /// Checked only when every hunk of the file is selected in full.
    pub fn file_check_status(&self, stack_id: Option<&StackId>, path: &str) -> CheckboxStatus {
        let prefix = KeyPrefix::file(stack_id, path);
        if self.selections.scan(&prefix).next().is_none() {
            return CheckboxStatus::Unchecked;
        }
        let all_full = self.assignments.scan(&prefix).all(|(key, _)| {
            self.selections
                .get(key)
                .is_some_and(|selection| selection.lines.is_full())
        });
        if all_full {
            CheckboxStatus::Checked
        } else {
            CheckboxStatus::Indeterminate
        }
    }

    /// Checked when every hunk below `dir` has a selection, partial or not.
    pub fn folder_check_status(&self, stack_id: Option<&StackId>, dir: &str) -> CheckboxStatus {
        self.presence_status(&self.dir_prefix(stack_id, dir))
    }

    /// Checked when every hunk of the stack has a selection, partial or not.
    pub fn stack_check_status(&self, stack_id: Option<&StackId>) -> CheckboxStatus {
        self.presence_status(&KeyPrefix::stack(stack_id))
    }

    fn presence_status(&self, prefix: &KeyPrefix) -> CheckboxStatus {
        let (selected, total) = self
            .assignments
            .scan(prefix)
            .fold((0usize, 0usize), |(selected, total), (key, _)| {
                let hit = usize::from(self.selections.contains_key(key));
                (selected + hit, total + 1)
            });
        match selected {
            0 => CheckboxStatus::Unchecked,
            n if n == total => CheckboxStatus::Checked,
            _ => CheckboxStatus::Indeterminate,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::header::LineId;
    use crate::model::HunkAssignment;
    use crate::uncommitted::tests::{HEADER, assignment, engine};
    use proptest::prelude::*;
    use similar_asserts::assert_eq;

    const LOWER: HunkHeader = HunkHeader::new(40, 1, 41, 1);

    fn two_hunk_file() -> Uncommitted {
        engine(vec![
            assignment(Some("S1"), "src/a.rs", HEADER),
            assignment(Some("S1"), "src/a.rs", LOWER),
        ])
    }

    #[test]
    fn file_status_requires_whole_hunks() {
        let s1 = StackId::from("S1");
        let mut engine = two_hunk_file();
        assert_eq!(engine.file_check_status(Some(&s1), "src/a.rs"), CheckboxStatus::Unchecked);

        engine
            .check_line(Some(&s1), "src/a.rs", Some(HEADER), LineId::added(10))
            .unwrap();
        engine.check_hunk(Some(&s1), "src/a.rs", Some(LOWER)).unwrap();
        assert_eq!(
            engine.file_check_status(Some(&s1), "src/a.rs"),
            CheckboxStatus::Indeterminate
        );

        engine.check_hunk(Some(&s1), "src/a.rs", Some(HEADER)).unwrap();
        assert_eq!(engine.file_check_status(Some(&s1), "src/a.rs"), CheckboxStatus::Checked);
    }

    #[test]
    fn stack_status_counts_partial_as_present() {
        let s1 = StackId::from("S1");
        let mut engine = two_hunk_file();
        engine
            .check_line(Some(&s1), "src/a.rs", Some(HEADER), LineId::added(10))
            .unwrap();
        assert_eq!(engine.stack_check_status(Some(&s1)), CheckboxStatus::Indeterminate);

        engine
            .check_line(Some(&s1), "src/a.rs", Some(LOWER), LineId::added(41))
            .unwrap();
        assert_eq!(engine.stack_check_status(Some(&s1)), CheckboxStatus::Checked);
        assert_eq!(
            engine.file_check_status(Some(&s1), "src/a.rs"),
            CheckboxStatus::Indeterminate
        );
    }

    #[test]
    fn folder_status_stays_inside_folder() {
        let s1 = StackId::from("S1");
        let mut engine = engine(vec![
            assignment(Some("S1"), "src/a.rs", HEADER),
            assignment(Some("S1"), "src2/b.rs", HEADER),
        ]);
        engine.check_file(Some(&s1), "src2/b.rs");
        assert_eq!(engine.folder_check_status(Some(&s1), "src"), CheckboxStatus::Unchecked);
        assert_eq!(engine.folder_check_status(Some(&s1), "src2"), CheckboxStatus::Checked);
        assert_eq!(
            engine.folder_check_status(Some(&s1), ""),
            CheckboxStatus::Indeterminate
        );
    }

    #[test]
    fn folder_status_honors_configured_separator() {
        let s1 = StackId::from("S1");
        let mut engine = Uncommitted::with_config(Config {
            path_separator: '\\',
            ..Config::default()
        });
        let assignments = vec![
            assignment(Some("S1"), "src\\a.rs", HEADER),
            assignment(Some("S1"), "src\\b.rs", HEADER),
        ];
        engine.update(assignments, vec![]);
        engine.check_dir(Some(&s1), "src");
        assert_eq!(engine.folder_check_status(Some(&s1), "src"), CheckboxStatus::Checked);
    }

    #[test]
    fn hunk_status_reports_lines() {
        let s1 = StackId::from("S1");
        let mut engine = two_hunk_file();
        assert!(!engine.hunk_check_status(Some(&s1), "src/a.rs", Some(HEADER)).is_selected());
        engine.check_hunk(Some(&s1), "src/a.rs", Some(HEADER)).unwrap();
        assert!(engine.hunk_check_status(Some(&s1), "src/a.rs", Some(HEADER)).is_selected());
    }

    fn arb_assignments() -> impl Strategy<Value = Vec<HunkAssignment>> {
        prop::collection::btree_set(1..500u32, 1..12).prop_map(|starts| {
            starts
                .into_iter()
                .map(|start| assignment(Some("S1"), "f.rs", HunkHeader::new(start, 1, start, 1)))
                .collect()
        })
    }

    proptest! {
        /// The three states partition every reachable selection state
        #[test]
        fn stack_status_partitions_states(
            assignments in arb_assignments(),
            picks in prop::collection::vec(any::<bool>(), 12),
        ) {
            let s1 = StackId::from("S1");
            let headers: Vec<_> = assignments.iter().filter_map(|a| a.hunk_header).collect();
            let mut engine = engine(assignments);
            let mut selected = 0;
            for (header, pick) in headers.iter().zip(&picks) {
                if *pick {
                    engine.check_hunk(Some(&s1), "f.rs", Some(*header)).unwrap();
                    selected += 1;
                }
            }

            let expected = if selected == 0 {
                CheckboxStatus::Unchecked
            } else if selected == headers.len() {
                CheckboxStatus::Checked
            } else {
                CheckboxStatus::Indeterminate
            };
            prop_assert_eq!(engine.stack_check_status(Some(&s1)), expected);
        }
    }
}
