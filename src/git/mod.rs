//! Git backend for gitomatic
//!
//! The sync loop talks to version control only through the [`Repository`]
//! trait. [`GitRepository`] implements it on top of libgit2.
//!
//! # Status Model
//!
//! Each changed path is reduced to a single [`ChangeKind`] from its
//! working-tree flags, with precedence Untracked > Modified > Deleted.
//! Everything else (type changes, conflicts, changes that only exist in the
//! index) is reported as [`ChangeKind::Other`].

use chrono::{DateTime, Local};
use git2::{Commit, ErrorCode, Oid, Repository as Git2Repo, Signature, Status, StatusOptions};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::auth::Credential;
use crate::changes::{ChangeKind, WorktreeState};
use crate::config::Identity;
use crate::error::{Error, Result};

mod sync;

pub use sync::PullOutcome;
use sync::Tracking;

/// Operations the sync loop needs from a version-controlled working tree
pub trait Repository {
    /// Root of the working tree
    fn root(&self) -> &Path;

    /// Names of all configured remotes
    fn remotes(&self) -> Result<Vec<String>>;

    /// Snapshot of every changed path
    fn status(&self) -> Result<WorktreeState>;

    /// Stage a new or modified file
    fn add(&mut self, path: &str) -> Result<()>;

    /// Stage the removal of a deleted file
    fn remove(&mut self, path: &str) -> Result<()>;

    /// Commit the index on top of HEAD
    fn commit(&mut self, message: &str, author: &Identity, when: DateTime<Local>) -> Result<Oid>;

    /// Fetch from `remote` and fast-forward the current branch to the
    /// remote's default branch
    fn pull(&mut self, remote: &str, credential: &Credential) -> Result<PullOutcome>;

    /// Push every local branch to `remote`; the current branch goes to the
    /// upstream the last pull followed
    fn push(&mut self, remote: &str, credential: &Credential) -> Result<()>;
}

/// libgit2-backed repository handle
pub struct GitRepository {
    inner: Git2Repo,
    root: PathBuf,
    /// Upstream branch chosen by the last pull, per remote
    tracking: HashMap<String, Tracking>,
}

impl GitRepository {
    /// Open an existing, non-bare repository rooted at `path`
    pub fn open(path: &Path) -> Result<Self> {
        let open_err = |source| Error::RepositoryOpen {
            path: path.to_path_buf(),
            source,
        };

        let inner = Git2Repo::open(path).map_err(open_err)?;
        let root = inner
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| open_err(git2::Error::from_str("repository has no working tree")))?;

        Ok(Self {
            inner,
            root,
            tracking: HashMap::new(),
        })
    }

    /// Get the current HEAD commit hash
    pub fn head_hash(&self) -> Result<String> {
        let head = self.inner.head()?;
        let commit = head.peel_to_commit()?;
        Ok(commit.id().to_string())
    }

    /// Get the underlying git2 repository (for advanced operations)
    pub fn inner(&self) -> &Git2Repo {
        &self.inner
    }

    /// HEAD commit, or `None` while the current branch has no commits
    fn head_commit(&self) -> std::result::Result<Option<Commit<'_>>, git2::Error> {
        match self.inner.head() {
            Ok(head) => head.peel_to_commit().map(Some),
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn update_index<F>(&self, path: &str, op: F) -> Result<()>
    where
        F: FnOnce(&mut git2::Index, &Path) -> std::result::Result<(), git2::Error>,
    {
        let stage_err = |source| Error::Stage {
            path: path.to_string(),
            source,
        };

        let mut index = self.inner.index().map_err(stage_err)?;
        op(&mut index, Path::new(path)).map_err(stage_err)?;
        index.write().map_err(stage_err)
    }
}

impl Repository for GitRepository {
    fn root(&self) -> &Path {
        &self.root
    }

    fn remotes(&self) -> Result<Vec<String>> {
        let remotes = self
            .inner
            .remotes()
            .map_err(|source| Error::RemoteList { source })?;

        let mut names: Vec<String> = remotes.iter().flatten().map(String::from).collect();
        names.sort();
        Ok(names)
    }

    fn status(&self) -> Result<WorktreeState> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false);

        let statuses = self
            .inner
            .statuses(Some(&mut opts))
            .map_err(|source| Error::Status { source })?;

        let mut state = WorktreeState::new();
        for entry in statuses.iter() {
            let Some(path) = entry.path() else {
                tracing::warn!("Skipping path that is not valid UTF-8");
                continue;
            };
            if let Some(kind) = classify(entry.status()) {
                state.insert(path, kind);
            }
        }

        Ok(state)
    }

    fn add(&mut self, path: &str) -> Result<()> {
        tracing::info!("Adding file to work-tree: {}", path);
        self.update_index(path, |index, path| index.add_path(path))
    }

    fn remove(&mut self, path: &str) -> Result<()> {
        tracing::info!("Removing file from work-tree: {}", path);
        self.update_index(path, |index, path| index.remove_path(path))
    }

    fn commit(&mut self, message: &str, author: &Identity, when: DateTime<Local>) -> Result<Oid> {
        let commit_err = |source| Error::Commit { source };

        let time = git2::Time::new(when.timestamp(), when.offset().local_minus_utc() / 60);
        let sig = Signature::new(&author.name, &author.email, &time).map_err(commit_err)?;

        let mut index = self.inner.index().map_err(commit_err)?;
        let tree_id = index.write_tree().map_err(commit_err)?;
        let tree = self.inner.find_tree(tree_id).map_err(commit_err)?;

        let parent = self.head_commit().map_err(commit_err)?;
        let parents: Vec<&Commit<'_>> = parent.iter().collect();

        self.inner
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .map_err(commit_err)
    }

    fn pull(&mut self, remote: &str, credential: &Credential) -> Result<PullOutcome> {
        self.pull_from(remote, credential)
    }

    fn push(&mut self, remote: &str, credential: &Credential) -> Result<()> {
        self.push_to(remote, credential)
    }
}

/// Reduce libgit2 status flags to the change kind the sync loop acts on.
/// Returns `None` for paths that are unchanged or ignored.
pub(crate) fn classify(status: Status) -> Option<ChangeKind> {
    if status.is_empty() || status.is_ignored() {
        return None;
    }

    let kind = if status.is_wt_new() {
        ChangeKind::Untracked
    } else if status.is_wt_modified() {
        ChangeKind::Modified
    } else if status.is_wt_deleted() {
        ChangeKind::Deleted
    } else {
        ChangeKind::Other
    };

    Some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn init_repo() -> (TempDir, GitRepository) {
        let tmp = TempDir::new().unwrap();
        Git2Repo::init(tmp.path()).unwrap();
        let repo = GitRepository::open(tmp.path()).unwrap();
        (tmp, repo)
    }

    fn commit_file(repo: &mut GitRepository, path: &str, contents: &str) -> Oid {
        std::fs::write(repo.root().join(path), contents).unwrap();
        repo.add(path).unwrap();
        repo.commit(&format!("Add {}.\n", path), &Identity::default(), Local::now())
            .unwrap()
    }

    #[test]
    fn test_open_missing_repository() {
        let tmp = TempDir::new().unwrap();
        let result = GitRepository::open(&tmp.path().join("nope"));
        assert!(matches!(result, Err(Error::RepositoryOpen { .. })));
    }

    #[test]
    fn test_open_bare_repository_fails() {
        let tmp = TempDir::new().unwrap();
        Git2Repo::init_bare(tmp.path()).unwrap();

        let err = GitRepository::open(tmp.path()).err().unwrap();
        assert!(err.to_string().contains("no working tree"));
    }

    #[test]
    fn test_clean_repository_has_empty_status() {
        let (_tmp, mut repo) = init_repo();
        commit_file(&mut repo, "notes.md", "# Notes");

        assert!(repo.status().unwrap().is_empty());
    }

    #[test]
    fn test_status_classification() {
        let (tmp, mut repo) = init_repo();
        commit_file(&mut repo, "modified.md", "v1");
        commit_file(&mut repo, "deleted.md", "bye");

        std::fs::write(tmp.path().join("modified.md"), "v2, longer").unwrap();
        std::fs::remove_file(tmp.path().join("deleted.md")).unwrap();
        std::fs::create_dir(tmp.path().join("dir")).unwrap();
        std::fs::write(tmp.path().join("dir/new.md"), "hello").unwrap();

        let state = repo.status().unwrap();
        assert_eq!(state.len(), 3);
        assert_eq!(state.get("modified.md"), Some(ChangeKind::Modified));
        assert_eq!(state.get("deleted.md"), Some(ChangeKind::Deleted));
        assert_eq!(state.get("dir/new.md"), Some(ChangeKind::Untracked));
    }

    #[test]
    fn test_commit_records_identity_and_parent() {
        let (_tmp, mut repo) = init_repo();
        let first = commit_file(&mut repo, "a.txt", "a");

        std::fs::write(repo.root().join("b.txt"), "b").unwrap();
        repo.add("b.txt").unwrap();
        let author = Identity::new("Sync Bot", "bot@example.com");
        let second = repo.commit("Add b.txt.\n", &author, Local::now()).unwrap();

        let commit = repo.inner().find_commit(second).unwrap();
        assert_eq!(commit.message(), Some("Add b.txt.\n"));
        assert_eq!(commit.author().name(), Some("Sync Bot"));
        assert_eq!(commit.author().email(), Some("bot@example.com"));
        assert_eq!(commit.parent_ids().collect::<Vec<_>>(), vec![first]);
        assert_eq!(repo.head_hash().unwrap(), second.to_string());
    }

    #[test]
    fn test_remove_stages_deletion() {
        let (tmp, mut repo) = init_repo();
        commit_file(&mut repo, "gone.txt", "x");
        std::fs::remove_file(tmp.path().join("gone.txt")).unwrap();

        repo.remove("gone.txt").unwrap();
        repo.commit("Remove gone.txt.\n", &Identity::default(), Local::now())
            .unwrap();

        assert!(repo.status().unwrap().is_empty());
        let tree = repo.inner().head().unwrap().peel_to_tree().unwrap();
        assert!(tree.get_name("gone.txt").is_none());
    }

    #[test]
    fn test_add_missing_file_fails() {
        let (_tmp, mut repo) = init_repo();
        let err = repo.add("missing.txt").unwrap_err();
        assert!(matches!(err, Error::Stage { ref path, .. } if path == "missing.txt"));
    }

    #[test]
    fn test_remotes_are_sorted() {
        let (_tmp, repo) = init_repo();
        assert!(repo.remotes().unwrap().is_empty());

        repo.inner().remote("upstream", "https://example.com/u.git").unwrap();
        repo.inner().remote("origin", "https://example.com/o.git").unwrap();
        assert_eq!(repo.remotes().unwrap(), vec!["origin", "upstream"]);
    }

    #[test]
    fn test_classify_precedence() {
        assert_eq!(classify(Status::CURRENT), None);
        assert_eq!(classify(Status::IGNORED), None);
        assert_eq!(classify(Status::WT_NEW), Some(ChangeKind::Untracked));
        assert_eq!(
            classify(Status::INDEX_NEW | Status::WT_MODIFIED),
            Some(ChangeKind::Modified)
        );
        assert_eq!(
            classify(Status::INDEX_MODIFIED | Status::WT_DELETED),
            Some(ChangeKind::Deleted)
        );
        assert_eq!(classify(Status::INDEX_MODIFIED), Some(ChangeKind::Other));
        assert_eq!(classify(Status::WT_TYPECHANGE), Some(ChangeKind::Other));
        assert_eq!(classify(Status::CONFLICTED), Some(ChangeKind::Other));
    }
}
