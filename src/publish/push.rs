use git2::{Cred, CredentialType, ErrorCode, Oid, PushOptions, RemoteCallbacks, Repository};
use std::cell::RefCell;

const MAX_CREDENTIAL_ATTEMPTS: u32 = 3;

/// Result of pushing pending commits. Failures are reported, never raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushStatus {
    Disabled,
    /// The remote-tracking branch already points at the local branch.
    UpToDate,
    Pushed { commits: usize },
    Failed { reason: String },
}

impl PushStatus {
    pub fn is_pushed(&self) -> bool {
        matches!(self, PushStatus::Pushed { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, PushStatus::Failed { .. })
    }
}

pub(super) fn push_pending(repo: &Repository, remote_name: &str, branch: &str) -> PushStatus {
    match try_push(repo, remote_name, branch) {
        Ok(status) => status,
        Err(err) => {
            tracing::warn!(remote = remote_name, branch, error = %err.message(), "Push failed; commits stay local until the next cycle");
            PushStatus::Failed { reason: err.message().to_string() }
        }
    }
}

fn try_push(repo: &Repository, remote_name: &str, branch: &str) -> Result<PushStatus, git2::Error> {
    let local_ref = format!("refs/heads/{branch}");
    let local = match repo.refname_to_id(&local_ref) {
        Ok(oid) => oid,
        Err(err) if err.code() == ErrorCode::NotFound => return Ok(PushStatus::UpToDate),
        Err(err) => return Err(err),
    };
    let tracking_ref = format!("refs/remotes/{remote_name}/{branch}");
    let tracking = repo.refname_to_id(&tracking_ref).ok();
    if tracking == Some(local) {
        return Ok(PushStatus::UpToDate);
    }
    let pending = count_pending(repo, local, tracking)?;

    let mut remote = repo.find_remote(remote_name)?;
    let config = repo.config()?;
    let rejection: RefCell<Option<String>> = RefCell::new(None);
    let mut attempts = 0;

    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(|url, username, allowed| {
        attempts += 1;
        if attempts > MAX_CREDENTIAL_ATTEMPTS {
            return Err(git2::Error::from_str("authentication failed"));
        }
        if allowed.contains(CredentialType::USERNAME) {
            return Cred::username(username.unwrap_or("git"));
        }
        if allowed.contains(CredentialType::SSH_KEY) {
            return Cred::ssh_key_from_agent(username.unwrap_or("git"));
        }
        if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
            return Cred::credential_helper(&config, url, username);
        }
        Cred::default()
    });
    callbacks.push_update_reference(|refname, status| {
        if let Some(message) = status {
            *rejection.borrow_mut() = Some(format!("{refname} rejected: {message}"));
        }
        Ok(())
    });

    let mut options = PushOptions::new();
    options.remote_callbacks(callbacks);
    let refspec = format!("{local_ref}:{local_ref}");
    tracing::info!(remote = remote_name, branch, pending, "Pushing activity commits");
    remote.push(&[refspec.as_str()], Some(&mut options))?;

    if let Some(reason) = rejection.take() {
        tracing::warn!(remote = remote_name, branch, reason = %reason, "Push rejected; commits stay local until the next cycle");
        return Ok(PushStatus::Failed { reason });
    }

    if let Err(err) = repo.reference(&tracking_ref, local, true, "prolific-agent: push") {
        tracing::debug!(error = %err, "Failed to update remote-tracking branch");
    }
    Ok(PushStatus::Pushed { commits: pending })
}

fn count_pending(repo: &Repository, local: Oid, tracking: Option<Oid>) -> Result<usize, git2::Error> {
    let mut walk = repo.revwalk()?;
    walk.push(local)?;
    if let Some(tracking) = tracking {
        if walk.hide(tracking).is_err() {
            tracing::debug!("Remote-tracking commit not found locally; counting all commits");
        }
    }
    Ok(walk.count())
}
