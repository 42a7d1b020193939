//! Tenant subdomain allocation.
//!
//! A business name is normalised into a URL-safe base token and numbered
//! candidates (`base`, `base1`, `base2`, ...) are probed until a free one is
//! found. The probe is only a hint: the unique index on `store.subdomain` is
//! the arbiter, so callers that lose a race at insert time resume allocation
//! from the next attempt with [`SubdomainAllocator::allocate_from`].

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::errors::ServiceError;

/// Base token used when a seed normalises to nothing.
pub const FALLBACK_SUBDOMAIN: &str = "store";

/// DNS label limit; every candidate, suffix included, fits in it.
pub const MAX_SUBDOMAIN_LEN: usize = 63;

/// Read-only view of the subdomains already assigned.
#[async_trait]
pub trait SubdomainProbe: Send + Sync {
    async fn subdomain_taken(&self, subdomain: &str) -> Result<bool, ServiceError>;
}

#[derive(Debug, Error)]
pub enum AllocationError {
    #[error("no free subdomain for '{base}' after {attempts} attempts")]
    Exhausted { base: String, attempts: u32 },
    #[error(transparent)]
    Probe(#[from] ServiceError),
}

/// A free candidate together with the attempt number that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub subdomain: String,
    pub attempt: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct SubdomainAllocator {
    max_len: usize,
    max_attempts: u32,
}

impl Default for SubdomainAllocator {
    fn default() -> Self { Self { max_len: 20, max_attempts: 1000 } }
}

impl SubdomainAllocator {
    pub fn new(max_len: usize, max_attempts: u32) -> Self {
        Self { max_len: max_len.clamp(1, MAX_SUBDOMAIN_LEN), max_attempts: max_attempts.max(1) }
    }

    pub fn from_config(cfg: &configs::RegistrationConfig) -> Self {
        Self::new(cfg.subdomain_max_len, cfg.max_subdomain_attempts)
    }

    pub fn max_attempts(&self) -> u32 { self.max_attempts }

    /// Lowercase, collapse every run of characters outside `[a-z0-9]` into one
    /// hyphen, trim hyphens and bound the length.
    ///
    /// ```
    /// use service::subdomain::SubdomainAllocator;
    /// let alloc = SubdomainAllocator::default();
    /// assert_eq!(alloc.normalize("Joe's Games!!"), "joe-s-games");
    /// assert_eq!(alloc.normalize("!!!"), "store");
    /// ```
    pub fn normalize(&self, seed: &str) -> String {
        let mut out = String::with_capacity(seed.len().min(self.max_len));
        let mut pending_hyphen = false;
        for c in seed.trim().chars() {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                if pending_hyphen && !out.is_empty() {
                    out.push('-');
                }
                pending_hyphen = false;
                out.push(c);
            } else {
                pending_hyphen = true;
            }
        }
        out.truncate(self.max_len);
        let trimmed = out.trim_end_matches('-');
        if trimmed.is_empty() {
            FALLBACK_SUBDOMAIN.to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// Attempt 0 is the bare base; attempt `n` appends `n`, shortening the
    /// base when the suffix would push it past the label limit.
    pub fn candidate(&self, base: &str, attempt: u32) -> String {
        if attempt == 0 {
            return base.to_string();
        }
        let suffix = attempt.to_string();
        let room = MAX_SUBDOMAIN_LEN - suffix.len();
        let stem = if base.len() > room { base[..room].trim_end_matches('-') } else { base };
        format!("{stem}{suffix}")
    }

    pub async fn allocate<P>(&self, seed: &str, probe: &P) -> Result<Allocation, AllocationError>
    where
        P: SubdomainProbe + ?Sized,
    {
        self.allocate_from(seed, 0, probe).await
    }

    /// Probe candidates starting at `start_attempt`, bounded by `max_attempts` in total.
    pub async fn allocate_from<P>(&self, seed: &str, start_attempt: u32, probe: &P) -> Result<Allocation, AllocationError>
    where
        P: SubdomainProbe + ?Sized,
    {
        let base = self.normalize(seed);
        for attempt in start_attempt..self.max_attempts {
            let subdomain = self.candidate(&base, attempt);
            if !probe.subdomain_taken(&subdomain).await? {
                return Ok(Allocation { subdomain, attempt });
            }
            debug!(%subdomain, attempt, "subdomain taken");
        }
        Err(AllocationError::Exhausted { base, attempts: self.max_attempts })
    }
}
