//! Shared-secret access control.
//!
//! A client presents at most one credential (the `key` query parameter).
//! [`AuthGate`] decides at connect time whether the client may join, and
//! re-checks the same credential against the *current* secret on every
//! mutating message, so rotating the secret revokes write access from
//! sessions that are already open.
//!
//! Comparison is plain string equality.

use std::sync::{PoisonError, RwLock};

/// What a session may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Privilege {
    /// Presented the shared secret: may mutate cells.
    Privileged,
    /// Read-only: receives the snapshot and broadcasts.
    Observer,
}

/// Connect-time decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The session may proceed with the given privilege.
    Admit(Privilege),
    /// A credential was supplied and it is wrong.
    Reject,
}

/// Classifies credentials against the configured secret.
#[derive(Debug)]
pub struct AuthGate {
    secret: RwLock<String>,
}

impl AuthGate {
    /// Create a gate for the given shared secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: RwLock::new(secret.into()),
        }
    }

    /// `Privileged` iff the credential equals the secret exactly.
    pub fn classify(&self, credential: Option<&str>) -> Privilege {
        match credential {
            Some(key) if self.matches(key) => Privilege::Privileged,
            _ => Privilege::Observer,
        }
    }

    /// Decide whether a connecting client may join.
    ///
    /// A missing credential is an anonymous observer, not a refusal. Only a
    /// supplied credential that does not match is rejected.
    pub fn admit(&self, credential: Option<&str>) -> Admission {
        match credential {
            None => Admission::Admit(Privilege::Observer),
            Some(key) if self.matches(key) => Admission::Admit(Privilege::Privileged),
            Some(_) => Admission::Reject,
        }
    }

    /// Re-validate a session's connect-time credential before a mutation.
    pub fn authorize_mutation(&self, credential: Option<&str>) -> bool {
        self.classify(credential) == Privilege::Privileged
    }

    /// Replace the shared secret. Open sessions keep their connect-time
    /// credential and lose write access if it no longer matches.
    pub fn rotate(&self, secret: impl Into<String>) {
        *self.secret.write().unwrap_or_else(PoisonError::into_inner) = secret.into();
        tracing::info!("Shared secret rotated");
    }

    fn matches(&self, key: &str) -> bool {
        *self.secret.read().unwrap_or_else(PoisonError::into_inner) == key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_secret_is_privileged() {
        let gate = AuthGate::new("s3cret");
        assert_eq!(gate.classify(Some("s3cret")), Privilege::Privileged);
        assert_eq!(gate.classify(Some("S3CRET")), Privilege::Observer);
        assert_eq!(gate.classify(Some("s3cret ")), Privilege::Observer);
        assert_eq!(gate.classify(None), Privilege::Observer);
    }

    #[test]
    fn missing_credential_is_admitted_as_observer() {
        let gate = AuthGate::new("s3cret");
        assert_eq!(gate.admit(None), Admission::Admit(Privilege::Observer));
    }

    #[test]
    fn wrong_credential_is_rejected_at_connect() {
        let gate = AuthGate::new("s3cret");
        assert_eq!(gate.admit(Some("guess")), Admission::Reject);
        assert_eq!(gate.admit(Some("")), Admission::Reject);
        assert_eq!(
            gate.admit(Some("s3cret")),
            Admission::Admit(Privilege::Privileged)
        );
    }

    #[test]
    fn mutation_check_uses_the_current_secret() {
        let gate = AuthGate::new("old");
        assert!(gate.authorize_mutation(Some("old")));
        assert!(!gate.authorize_mutation(None));

        gate.rotate("new");
        assert!(!gate.authorize_mutation(Some("old")));
        assert!(gate.authorize_mutation(Some("new")));
    }
}
