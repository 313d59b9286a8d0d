//! Git sync operations for gitomatic
//!
//! Handles fetch + fast-forward pulls and pushes against a named remote.
//! Diverged histories are never merged; they surface as pull errors.
//!
//! A pull follows the branch the remote's HEAD points to, so a local `master`
//! tracks a remote whose default branch is `main`. Only when the remote does
//! not report a HEAD does the pull fall back to the branch with the same name.
//! The next push sends the current branch back to that upstream.

use git2::build::CheckoutBuilder;
use git2::{BranchType, Direction, ErrorCode, FetchOptions, PushOptions, Remote};

use super::GitRepository;
use crate::auth::Credential;
use crate::error::{Error, Result};

/// How a pull finished when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    /// The current branch moved forward to the remote commit
    FastForwarded,
    /// Local history already contains the remote commit
    UpToDate,
    /// The remote has no branches yet
    EmptyRemote,
}

/// Local branch and the remote branch it was last pulled from
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Tracking {
    pub local: String,
    pub upstream: String,
}

/// Branches a remote advertises, plus the one its HEAD points to
struct Advertised {
    branches: Vec<String>,
    head: Option<String>,
}

impl Advertised {
    fn list(
        remote: &mut Remote<'_>,
        credential: &Credential,
    ) -> std::result::Result<Self, git2::Error> {
        let connection =
            remote.connect_auth(Direction::Fetch, Some(credential.remote_callbacks()), None)?;

        let branches = connection
            .list()?
            .iter()
            .filter_map(|head| head.name().strip_prefix("refs/heads/"))
            .map(String::from)
            .collect();

        // Fails on empty remotes and on servers that hide HEAD
        let head = match connection.default_branch() {
            Ok(name) => name
                .as_str()
                .and_then(|name| name.strip_prefix("refs/heads/"))
                .map(String::from),
            Err(e) => {
                tracing::debug!("Remote HEAD not available: {}", e.message());
                None
            }
        };

        Ok(Self { branches, head })
    }

    fn has(&self, branch: &str) -> bool {
        self.branches.iter().any(|name| name == branch)
    }

    /// Remote HEAD first, then the branch named like ours
    fn upstream_for<'a>(&'a self, local: &'a str) -> Option<&'a str> {
        self.head
            .as_deref()
            .filter(|head| self.has(head))
            .or_else(|| self.has(local).then_some(local))
    }
}

impl GitRepository {
    /// Short name of the branch HEAD points to, even if it has no commits yet
    fn current_branch(&self) -> std::result::Result<String, git2::Error> {
        let head = self.inner.find_reference("HEAD")?;
        let target = head
            .symbolic_target()
            .ok_or_else(|| git2::Error::from_str("HEAD is detached"))?;
        Ok(target.strip_prefix("refs/heads/").unwrap_or(target).to_string())
    }

    pub(super) fn pull_from(
        &mut self,
        remote_name: &str,
        credential: &Credential,
    ) -> Result<PullOutcome> {
        let pull_err = |source| Error::pull(remote_name, source);

        let branch = self.current_branch().map_err(pull_err)?;
        let mut remote = self.inner.find_remote(remote_name).map_err(pull_err)?;

        let advertised = Advertised::list(&mut remote, credential).map_err(pull_err)?;
        if advertised.branches.is_empty() {
            tracing::info!("Remote '{}' has no branches yet", remote_name);
            return Ok(PullOutcome::EmptyRemote);
        }

        let Some(upstream) = advertised.upstream_for(&branch).map(String::from) else {
            return Err(Error::Pull {
                remote: remote_name.to_string(),
                message: format!(
                    "remote has no default branch and no branch named '{}'",
                    branch
                ),
                source: None,
            });
        };
        if upstream != branch {
            tracing::info!("Local branch '{}' follows '{}/{}'", branch, remote_name, upstream);
        }

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(credential.remote_callbacks());
        remote
            .fetch(&[] as &[&str], Some(&mut fetch_options), None)
            .map_err(pull_err)?;

        let tracking = format!("refs/remotes/{}/{}", remote_name, upstream);
        let fetched = match self.inner.find_reference(&tracking) {
            Ok(reference) => reference,
            Err(e) if e.code() == ErrorCode::NotFound => {
                return Err(Error::Pull {
                    remote: remote_name.to_string(),
                    message: format!("fetch did not update '{}'", tracking),
                    source: None,
                });
            }
            Err(e) => return Err(pull_err(e)),
        };

        let fetched_commit = self
            .inner
            .reference_to_annotated_commit(&fetched)
            .map_err(pull_err)?;
        let (analysis, _preference) = self
            .inner
            .merge_analysis(&[&fetched_commit])
            .map_err(pull_err)?;

        self.tracking.insert(
            remote_name.to_string(),
            Tracking {
                local: branch.clone(),
                upstream: upstream.clone(),
            },
        );

        if analysis.is_up_to_date() {
            return Ok(PullOutcome::UpToDate);
        }

        if !analysis.is_fast_forward() && !analysis.is_unborn() {
            return Err(Error::Pull {
                remote: remote_name.to_string(),
                message: format!("local branch '{}' has diverged from '{}'", branch, upstream),
                source: None,
            });
        }

        let target = fetched_commit.id();
        let local_ref = format!("refs/heads/{}", branch);
        let reflog = format!("gitomatic: fast-forward {} to {}", branch, target);

        // Safe checkout keeps local edits and fails instead of overwriting them
        let object = self.inner.find_object(target, None).map_err(pull_err)?;
        self.inner
            .checkout_tree(&object, Some(CheckoutBuilder::new().safe()))
            .map_err(pull_err)?;

        if analysis.is_unborn() {
            self.inner
                .reference(&local_ref, target, false, &reflog)
                .map_err(pull_err)?;
            self.inner.set_head(&local_ref).map_err(pull_err)?;
        } else {
            self.inner
                .find_reference(&local_ref)
                .and_then(|mut reference| reference.set_target(target, &reflog))
                .map_err(pull_err)?;
        }

        tracing::info!("Fast-forwarded '{}' to {}", branch, target);
        Ok(PullOutcome::FastForwarded)
    }

    pub(super) fn push_to(&mut self, remote_name: &str, credential: &Credential) -> Result<()> {
        let push_err = |source| Error::push(remote_name, source);

        let mut remote = self.inner.find_remote(remote_name).map_err(push_err)?;
        let tracking = self.tracking.get(remote_name);

        let mut refspecs = Vec::new();
        for branch in self.inner.branches(Some(BranchType::Local)).map_err(push_err)? {
            let (branch, _) = branch.map_err(push_err)?;
            if let Some(name) = branch.name().map_err(push_err)? {
                let target = match tracking {
                    Some(t) if t.local == name => t.upstream.as_str(),
                    _ => name,
                };
                refspecs.push(format!("refs/heads/{}:refs/heads/{}", name, target));
            }
        }

        if refspecs.is_empty() {
            tracing::info!("Not pushing: no local branches.");
            return Ok(());
        }

        let mut rejected = Vec::new();
        {
            let mut callbacks = credential.remote_callbacks();
            callbacks.push_update_reference(|refname, status| {
                if let Some(message) = status {
                    rejected.push(format!("{} ({})", refname, message));
                }
                Ok(())
            });

            let mut push_options = PushOptions::new();
            push_options.remote_callbacks(callbacks);
            remote
                .push(&refspecs, Some(&mut push_options))
                .map_err(push_err)?;
        }

        if !rejected.is_empty() {
            return Err(Error::Push {
                remote: remote_name.to_string(),
                message: format!("remote rejected {}", rejected.join(", ")),
                source: None,
            });
        }

        tracing::info!("Pushed {} branch(es) to {}", refspecs.len(), remote_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn advertised(branches: &[&str], head: Option<&str>) -> Advertised {
        Advertised {
            branches: branches.iter().map(|b| b.to_string()).collect(),
            head: head.map(String::from),
        }
    }

    #[test]
    fn test_upstream_prefers_remote_head() {
        let remote = advertised(&["main", "master"], Some("main"));
        assert_eq!(remote.upstream_for("master"), Some("main"));
    }

    #[test]
    fn test_upstream_falls_back_to_same_name() {
        let remote = advertised(&["dev", "master"], None);
        assert_eq!(remote.upstream_for("master"), Some("master"));

        // A HEAD naming a branch the remote does not have is ignored
        let remote = advertised(&["master"], Some("trunk"));
        assert_eq!(remote.upstream_for("master"), Some("master"));
    }

    #[test]
    fn test_no_upstream_without_head_or_match() {
        let remote = advertised(&["dev"], None);
        assert_eq!(remote.upstream_for("master"), None);
    }
}
