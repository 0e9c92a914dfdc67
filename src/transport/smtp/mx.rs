//! Mail exchanger resolution
//!
//! When no relay host is given, a message is delivered to the mail exchangers
//! of its sender's domain. They are attempted by ascending priority; candidates
//! sharing a priority keep the order the resolver returned them in.

use std::fmt::{self, Debug, Formatter};

use async_trait::async_trait;
use hickory_resolver::TokioResolver;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::transport::smtp::{error, Error};

/// One mail exchanger of a domain
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MxCandidate {
    /// Host name, without the trailing dot
    pub exchange: String,
    /// MX preference, lower is tried first
    pub priority: u16,
}

impl MxCandidate {
    /// Creates a candidate
    pub fn new<S: Into<String>>(exchange: S, priority: u16) -> Self {
        MxCandidate {
            exchange: exchange.into(),
            priority,
        }
    }
}

/// Orders candidates by ascending priority, keeping the order of ties
pub fn sort_candidates(candidates: &mut [MxCandidate]) {
    candidates.sort_by_key(|candidate| candidate.priority);
}

/// Finds the mail exchangers of a domain
#[async_trait]
pub trait MxResolver: Send + Sync {
    /// Returns the exchangers of `domain`, in any order
    ///
    /// An empty list is a valid answer, the mailer turns it into a resolution
    /// error.
    async fn resolve_mx(&self, domain: &str) -> Result<Vec<MxCandidate>, Error>;
}

/// Resolves MX records through DNS, with the system configuration
///
/// The underlying resolver is created on first use.
#[derive(Default)]
pub struct DnsResolver {
    resolver: OnceCell<TokioResolver>,
}

impl DnsResolver {
    /// Creates a resolver reading the system DNS configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an already configured hickory resolver
    pub fn with_resolver(resolver: TokioResolver) -> Self {
        DnsResolver {
            resolver: OnceCell::new_with(Some(resolver)),
        }
    }

    async fn resolver(&self) -> Result<&TokioResolver, Error> {
        self.resolver
            .get_or_try_init(|| async {
                Ok::<_, Error>(
                    TokioResolver::builder_tokio()
                        .map_err(error::resolution)?
                        .build(),
                )
            })
            .await
    }
}

impl Debug for DnsResolver {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("DnsResolver")
            .field("initialized", &self.resolver.initialized())
            .finish()
    }
}

#[async_trait]
impl MxResolver for DnsResolver {
    async fn resolve_mx(&self, domain: &str) -> Result<Vec<MxCandidate>, Error> {
        let lookup = self
            .resolver()
            .await?
            .mx_lookup(domain)
            .await
            .map_err(error::resolution)?;

        let candidates: Vec<MxCandidate> = lookup
            .iter()
            .map(|mx| {
                MxCandidate::new(
                    mx.exchange().to_string().trim_end_matches('.'),
                    mx.preference(),
                )
            })
            .collect();
        debug!("{domain} has {} mail exchangers", candidates.len());
        Ok(candidates)
    }
}

/// Always answers with the same exchangers, whatever the domain
///
/// Useful to pin delivery to known hosts, or in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    candidates: Vec<MxCandidate>,
}

impl StaticResolver {
    /// Creates a resolver answering `candidates`
    pub fn new(candidates: Vec<MxCandidate>) -> Self {
        StaticResolver { candidates }
    }
}

#[async_trait]
impl MxResolver for StaticResolver {
    async fn resolve_mx(&self, _domain: &str) -> Result<Vec<MxCandidate>, Error> {
        Ok(self.candidates.clone())
    }
}
