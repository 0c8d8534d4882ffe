pub mod checkout;
pub mod remote;

use git2::{cert::Cert, CertificateCheckStatus, Config, Cred, CredentialType, RemoteCallbacks};
use log::{debug, trace};
use ssh_key::{
    known_hosts::{Entry, HostPatterns},
    KnownHosts,
};
use thiserror::Error;

pub use checkout::{infer_module_path, LocalCheckouts};
pub use remote::{commit_checksum, GitRemote};

const GLOBAL_KNOWN_HOSTS: &str = "/etc/ssh/ssh_known_hosts";

#[derive(Error, Debug)]
pub enum GitError {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),
    #[error("Tag {tag} not found in {url}")]
    TagNotFound { url: String, tag: String },
    #[error("Commit id `{commit}` is too short to derive a checksum")]
    ShortCommit { commit: String },
    #[error("Repository at {path} has no origin remote URL")]
    NoOriginUrl { path: String },
}

/// Callbacks authenticating with the user's git setup: the SSH agent for SSH
/// remotes and the configured credential helpers for HTTPS.
fn remote_callbacks(git_config: &Config) -> RemoteCallbacks<'_> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |url, username, allowed_types| {
        trace!(
            "Requested credentials for {}, username {:?}, allowed types {:?}",
            url,
            username,
            allowed_types
        );
        if allowed_types.contains(CredentialType::USERNAME) {
            return Cred::username("git");
        }
        if allowed_types.contains(CredentialType::SSH_KEY) {
            return Cred::ssh_key_from_agent(username.unwrap_or("git"));
        }
        if allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) {
            return Cred::credential_helper(git_config, url, username);
        }
        Err(git2::Error::from_str("no valid authentication available"))
    });
    callbacks.certificate_check(check_certificate);
    callbacks
}

/// Accepts SSH host keys listed in the system known hosts file. Anything else
/// is left to libgit2's own verification.
fn check_certificate(
    certificate: &Cert<'_>,
    host: &str,
) -> Result<CertificateCheckStatus, git2::Error> {
    let Some(hostkey) = certificate.as_hostkey().and_then(|h| h.hostkey()) else {
        return Ok(CertificateCheckStatus::CertificatePassthrough);
    };
    let entries = match KnownHosts::read_file(GLOBAL_KNOWN_HOSTS) {
        Ok(entries) => entries,
        Err(error) => {
            debug!("Skipping {GLOBAL_KNOWN_HOSTS} for {host}: {error}");
            return Ok(CertificateCheckStatus::CertificatePassthrough);
        }
    };
    if is_known_host_key(host, hostkey, &entries) {
        trace!("Host key of {host} is pinned in {GLOBAL_KNOWN_HOSTS}");
        Ok(CertificateCheckStatus::CertificateOk)
    } else {
        trace!("Host key of {host} is not pinned in {GLOBAL_KNOWN_HOSTS}");
        Ok(CertificateCheckStatus::CertificatePassthrough)
    }
}

fn is_known_host_key(host: &str, hostkey: &[u8], entries: &[Entry]) -> bool {
    entries
        .iter()
        .filter(|entry| host_matches_patterns(host, entry.host_patterns()))
        .any(|entry| entry.public_key().to_bytes().as_deref() == Ok(hostkey))
}

/// Plain host names only: `*`/`?` wildcards and hashed names never match.
/// A negated pattern (`!host`) rejects the host outright.
fn host_matches_patterns(host: &str, patterns: &HostPatterns) -> bool {
    let HostPatterns::Patterns(patterns) = patterns else {
        return false;
    };
    let host = host.to_lowercase();
    let mut matched = false;
    for pattern in patterns.iter().map(|pattern| pattern.to_lowercase()) {
        match pattern.strip_prefix('!') {
            Some(negated) if negated == host => return false,
            Some(_) => {}
            None => matched |= pattern == host,
        }
    }
    matched
}
