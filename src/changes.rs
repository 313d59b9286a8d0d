//! Working tree snapshots and the changes selected for a commit

use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// How a path differs from the last commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// New file git does not know about yet
    Untracked,
    /// Tracked file whose contents changed
    Modified,
    /// Tracked file missing from disk
    Deleted,
    /// Anything else (type changes, conflicts, index-only changes)
    Other,
}

impl ChangeKind {
    /// Returns true if the sync loop stages this kind of change
    pub fn is_stageable(self) -> bool {
        !matches!(self, ChangeKind::Other)
    }

    /// Verb used in commit message lines
    fn verb(self) -> Option<&'static str> {
        match self {
            ChangeKind::Untracked => Some("Add"),
            ChangeKind::Modified => Some("Update"),
            ChangeKind::Deleted => Some("Remove"),
            ChangeKind::Other => None,
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChangeKind::Untracked => "untracked",
            ChangeKind::Modified => "modified",
            ChangeKind::Deleted => "deleted",
            ChangeKind::Other => "other",
        };
        f.write_str(label)
    }
}

/// Point-in-time view of every changed path in the working tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorktreeState {
    entries: BTreeMap<String, ChangeKind>,
}

impl WorktreeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a path; a later insert for the same path replaces the earlier one
    pub fn insert(&mut self, path: impl Into<String>, kind: ChangeKind) {
        self.entries.insert(path.into(), kind);
    }

    pub fn get(&self, path: &str) -> Option<ChangeKind> {
        self.entries.get(path).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ChangeKind)> {
        self.entries.iter().map(|(path, kind)| (path.as_str(), *kind))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<P: Into<String>> FromIterator<(P, ChangeKind)> for WorktreeState {
    fn from_iter<I: IntoIterator<Item = (P, ChangeKind)>>(iter: I) -> Self {
        let mut state = Self::new();
        for (path, kind) in iter {
            state.insert(path, kind);
        }
        state
    }
}

/// A change that has been staged this cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChange {
    pub path: String,
    pub kind: ChangeKind,
}

impl PendingChange {
    /// One commit message line, e.g. `"Add notes.md."`
    pub fn message_line(&self) -> String {
        let verb = self.kind.verb().unwrap_or("Change");
        format!("{} {}.", verb, self.path)
    }
}

/// Ordered set of staged changes; feeds the commit message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changes: Vec<PendingChange>,
    paths: HashSet<String>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a staged change. Returns false if the path is already present
    /// or the kind is never staged.
    pub fn push(&mut self, path: impl Into<String>, kind: ChangeKind) -> bool {
        let path = path.into();
        if !kind.is_stageable() || !self.paths.insert(path.clone()) {
            return false;
        }
        self.changes.push(PendingChange { path, kind });
        true
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingChange> {
        self.changes.iter()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Commit message: one newline-terminated line per change
    pub fn message(&self) -> String {
        self.changes
            .iter()
            .map(|change| change.message_line() + "\n")
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_lines() {
        let mut set = ChangeSet::new();
        set.push("a.txt", ChangeKind::Untracked);
        set.push("b.txt", ChangeKind::Modified);
        set.push("c.txt", ChangeKind::Deleted);

        assert_eq!(set.message(), "Add a.txt.\nUpdate b.txt.\nRemove c.txt.\n");
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_empty_set_has_empty_message() {
        let set = ChangeSet::new();
        assert!(set.is_empty());
        assert_eq!(set.message(), "");
    }

    #[test]
    fn test_change_set_rejects_duplicates_and_other() {
        let mut set = ChangeSet::new();
        assert!(set.push("a.txt", ChangeKind::Untracked));
        assert!(!set.push("a.txt", ChangeKind::Modified));
        assert!(!set.push("weird", ChangeKind::Other));
        assert_eq!(set.len(), 1);
        assert!(!set.contains("weird"));
    }

    #[test]
    fn test_large_change_set_keeps_order_and_uniqueness() {
        let mut set = ChangeSet::new();
        for i in 0..20_000 {
            assert!(set.push(format!("notes/{:05}.md", i), ChangeKind::Untracked));
        }
        assert!(!set.push("notes/00042.md", ChangeKind::Modified));

        assert_eq!(set.len(), 20_000);
        assert!(set.contains("notes/19999.md"));
        assert_eq!(
            set.iter().next().map(|c| c.path.as_str()),
            Some("notes/00000.md")
        );
    }

    #[test]
    fn test_worktree_state_is_keyed_by_path() {
        let state: WorktreeState = vec![
            ("dir/x.md", ChangeKind::Modified),
            ("dir/x.md", ChangeKind::Deleted),
            ("y.md", ChangeKind::Untracked),
        ]
        .into_iter()
        .collect();

        assert_eq!(state.len(), 2);
        assert_eq!(state.get("dir/x.md"), Some(ChangeKind::Deleted));
        assert_eq!(state.get("missing"), None);
    }
}
