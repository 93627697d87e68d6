//! Subdomain validation and availability

use async_trait::async_trait;
use secrecy::SecretString;
use tracing::debug;

use crate::errors::ConsoleError;

/// Subdomains the platform keeps for itself
pub const RESERVED_SUBDOMAINS: &[&str] = &[
    "www",
    "api",
    "admin",
    "status",
    "docs",
    "developer",
    "developers",
    "support",
    "auth",
    "dashboard",
];

/// Minimum subdomain length
pub const MIN_SUBDOMAIN_LEN: usize = 4;

/// Outcome of a subdomain check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainStatus {
    Idle,
    TooShort,
    Invalid,
    Reserved,
    Available,
    Taken,
}

impl DomainStatus {
    pub fn describe(&self) -> &'static str {
        match self {
            DomainStatus::Idle => "No subdomain given",
            DomainStatus::TooShort => "Subdomain must be at least 4 characters",
            DomainStatus::Invalid => "Only lowercase letters, numbers and hyphens are allowed",
            DomainStatus::Reserved => "This subdomain is reserved",
            DomainStatus::Available => "Available",
            DomainStatus::Taken => "Already taken",
        }
    }
}

/// Availability lookup against the backend
#[async_trait]
pub trait DomainLookup: Send + Sync {
    async fn domain_available(&self, subdomain: &str, token: &SecretString)
        -> Result<bool, ConsoleError>;
}

/// Checks that need no backend call. `None` means the backend decides.
pub fn validate_subdomain(subdomain: &str) -> Option<DomainStatus> {
    if subdomain.is_empty() {
        return Some(DomainStatus::Idle);
    }
    if subdomain.chars().count() < MIN_SUBDOMAIN_LEN {
        return Some(DomainStatus::TooShort);
    }
    if !subdomain
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Some(DomainStatus::Invalid);
    }
    if RESERVED_SUBDOMAINS.contains(&subdomain) {
        return Some(DomainStatus::Reserved);
    }
    None
}

/// Full check. A failed availability call counts as taken.
pub async fn check_subdomain<L>(lookup: &L, subdomain: &str, token: &SecretString) -> DomainStatus
where
    L: DomainLookup + ?Sized,
{
    if let Some(status) = validate_subdomain(subdomain) {
        return status;
    }
    match lookup.domain_available(subdomain, token).await {
        Ok(true) => DomainStatus::Available,
        Ok(false) => DomainStatus::Taken,
        Err(e) => {
            debug!("Availability check for {} failed: {}", subdomain, e);
            DomainStatus::Taken
        }
    }
}
