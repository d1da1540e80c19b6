//! Publishing report artifacts to the activity repository
//!
//! Artifacts are written into the working tree and committed on top of the
//! branch tip: the commit tree is `HEAD`'s tree plus the artifact blobs, so
//! whatever else sits in the user's index never rides along. A commit is made
//! only when that tree differs from `HEAD`. Pushing is a
//! separate step: a failed push leaves the commit in place and the next cycle
//! pushes everything that is still pending.

mod push;

pub use push::PushStatus;

use crate::render::Artifact;
use crate::utils::atomic_write;
use git2::{BranchType, ErrorCode, Index, IndexEntry, IndexTime, Oid, Repository, RepositoryState, Signature};
use std::path::{Path, PathBuf};
use thiserror::Error;

const FALLBACK_AUTHOR: &str = "prolific-agent";
const FALLBACK_EMAIL: &str = "prolific-agent@localhost";
const BLOB_MODE: u32 = 0o100644;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("{path} is not a usable git repository: {source}")]
    NotARepository {
        path: PathBuf,
        #[source]
        source: git2::Error,
    },

    #[error("{0} is a bare repository; a working tree is required")]
    Bare(PathBuf),

    #[error("repository has an operation in progress ({0}); finish or abort it first")]
    OperationInProgress(String),

    #[error("repository index has unresolved conflicts")]
    Conflicts,

    #[error("artifact path {0} escapes the repository")]
    InvalidArtifactPath(String),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("git error: {0}")]
    Git(#[from] git2::Error),
}

/// Result of [`GitPublisher::publish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Committed { commit: String },
    /// The staged tree matched `HEAD`; no commit was made.
    Unchanged,
}

impl PublishOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, PublishOutcome::Committed { .. })
    }
}

pub struct GitPublisher {
    repo: Repository,
    workdir: PathBuf,
    branch: String,
    remote: String,
}

impl GitPublisher {
    pub fn open(repo_path: &Path, branch: &str, remote: &str) -> Result<Self, PublishError> {
        let repo = Repository::open(repo_path)
            .map_err(|source| PublishError::NotARepository { path: repo_path.to_path_buf(), source })?;
        let workdir = repo.workdir().ok_or_else(|| PublishError::Bare(repo_path.to_path_buf()))?.to_path_buf();
        Ok(Self { repo, workdir, branch: branch.to_string(), remote: remote.to_string() })
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Reject repositories that are mid-merge/rebase or carry conflicts.
    pub fn validate(&self) -> Result<(), PublishError> {
        let state = self.repo.state();
        if state != RepositoryState::Clean {
            return Err(PublishError::OperationInProgress(format!("{state:?}")));
        }
        if self.repo.index()?.has_conflicts() {
            return Err(PublishError::Conflicts);
        }
        Ok(())
    }

    /// Switch the work tree to the configured branch.
    ///
    /// Runs before anything is read from the work tree, so existing reports
    /// and viz data come from the branch being published to.
    pub fn prepare(&self) -> Result<(), PublishError> {
        self.checkout_branch()
    }

    /// Write `artifacts` and commit them on the branch when the tree changed.
    ///
    /// On failure overwritten files are restored and new ones removed.
    pub fn publish(&self, artifacts: &[Artifact], message: &str) -> Result<PublishOutcome, PublishError> {
        self.checkout_branch()?;

        let mut written = Vec::with_capacity(artifacts.len());
        let result = self.write_and_commit(artifacts, message, &mut written);
        if result.is_err() {
            self.rollback(&written);
        }
        result
    }

    fn write_and_commit(
        &self,
        artifacts: &[Artifact],
        message: &str,
        written: &mut Vec<(PathBuf, Option<Vec<u8>>)>,
    ) -> Result<PublishOutcome, PublishError> {
        for artifact in artifacts {
            let path = self.artifact_path(&artifact.rel_path)?;
            let previous = std::fs::read(&path).ok();
            if previous.as_deref() == Some(artifact.contents.as_slice()) {
                continue;
            }
            atomic_write(&path, &artifact.contents)
                .map_err(|source| PublishError::Write { path: path.clone(), source })?;
            written.push((path, previous));
        }

        let parent = self.head_commit()?;
        let tree_oid = self.artifact_tree(parent.as_ref(), artifacts)?;
        if parent.as_ref().map(|c| c.tree_id()) == Some(tree_oid) {
            tracing::debug!("Artifacts match HEAD; nothing to commit");
            return Ok(PublishOutcome::Unchanged);
        }

        let tree = self.repo.find_tree(tree_oid)?;
        let signature = self.signature()?;
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
        let oid: Oid = self.repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;

        if let Err(err) = self.stage_artifacts(artifacts) {
            tracing::warn!(error = %err, "Committed, but failed to update the index");
        }
        tracing::info!(commit = %oid, branch = %self.branch, "Committed activity report");
        Ok(PublishOutcome::Committed { commit: oid.to_string() })
    }

    /// Tree of `parent` with every artifact written as a blob.
    fn artifact_tree(&self, parent: Option<&git2::Commit<'_>>, artifacts: &[Artifact]) -> Result<Oid, PublishError> {
        let mut index = Index::new()?;
        if let Some(parent) = parent {
            index.read_tree(&parent.tree()?)?;
        }
        for artifact in artifacts {
            let id = self.repo.blob(&artifact.contents)?;
            index.add(&blob_entry(&artifact.rel_path, id, artifact.contents.len()))?;
        }
        Ok(index.write_tree_to(&self.repo)?)
    }

    /// Bring the artifact paths of the on-disk index in line with the commit.
    /// Other staged entries are left as the user had them.
    fn stage_artifacts(&self, artifacts: &[Artifact]) -> Result<(), git2::Error> {
        let mut index = self.repo.index()?;
        index.read(false)?;
        for artifact in artifacts {
            index.add_path(Path::new(&artifact.rel_path))?;
        }
        index.write()
    }

    fn rollback(&self, written: &[(PathBuf, Option<Vec<u8>>)]) {
        for (path, previous) in written.iter().rev() {
            let restored = match previous {
                Some(bytes) => atomic_write(path, bytes),
                None => std::fs::remove_file(path),
            };
            if let Err(err) = restored {
                tracing::warn!(path = %path.display(), error = %err, "Failed to roll back artifact");
            }
        }
    }

    fn artifact_path(&self, rel_path: &str) -> Result<PathBuf, PublishError> {
        let rel = Path::new(rel_path);
        let escapes = rel.is_absolute()
            || rel.components().any(|c| !matches!(c, std::path::Component::Normal(_)));
        if rel_path.is_empty() || escapes {
            return Err(PublishError::InvalidArtifactPath(rel_path.to_string()));
        }
        Ok(self.workdir.join(rel))
    }

    /// Make the configured branch current, creating it from `HEAD` when it
    /// does not exist. An unborn `HEAD` is simply pointed at the branch.
    fn checkout_branch(&self) -> Result<(), PublishError> {
        let refname = format!("refs/heads/{}", self.branch);

        let head = match self.repo.head() {
            Ok(head) => head,
            Err(err) if err.code() == ErrorCode::UnbornBranch || err.code() == ErrorCode::NotFound => {
                self.repo.set_head(&refname)?;
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        if head.name() == Some(refname.as_str()) {
            return Ok(());
        }

        let target = match self.repo.find_branch(&self.branch, BranchType::Local) {
            Ok(branch) => branch.get().peel_to_commit()?,
            Err(_) => {
                let commit = head.peel_to_commit()?;
                self.repo.branch(&self.branch, &commit, false)?;
                tracing::info!(branch = %self.branch, "Created branch");
                self.repo.set_head(&refname)?;
                return Ok(());
            }
        };

        // A safe checkout diffs against the current HEAD, so HEAD moves last.
        self.repo.checkout_tree(target.as_object(), Some(git2::build::CheckoutBuilder::new().safe()))?;
        self.repo.set_head(&refname)?;
        tracing::info!(branch = %self.branch, "Switched branch");
        Ok(())
    }

    fn head_commit(&self) -> Result<Option<git2::Commit<'_>>, PublishError> {
        match self.repo.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?)),
            Err(err) if err.code() == ErrorCode::UnbornBranch || err.code() == ErrorCode::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn signature(&self) -> Result<Signature<'static>, PublishError> {
        match self.repo.signature() {
            Ok(signature) => Ok(signature),
            Err(_) => Ok(Signature::now(FALLBACK_AUTHOR, FALLBACK_EMAIL)?),
        }
    }

    /// Push every local commit of the branch the remote does not have yet.
    pub fn push_pending(&self) -> PushStatus {
        push::push_pending(&self.repo, &self.remote, &self.branch)
    }
}

fn blob_entry(rel_path: &str, id: Oid, len: usize) -> IndexEntry {
    IndexEntry {
        ctime: IndexTime::new(0, 0),
        mtime: IndexTime::new(0, 0),
        dev: 0,
        ino: 0,
        mode: BLOB_MODE,
        uid: 0,
        gid: 0,
        file_size: u32::try_from(len).unwrap_or(u32::MAX),
        id,
        flags: 0,
        flags_extended: 0,
        path: rel_path.as_bytes().to_vec(),
    }
}

/// Commit message of a cycle.
pub fn commit_message(event_id: &str) -> String {
    format!("Prolific activity: {event_id}")
}
