//! Two-level admission control.
//!
//! Every request first draws from a service-wide GCRA bucket, then from a
//! bucket owned by the client's IP address. Client buckets live in a
//! bounded LRU registry and are replaced once they sit idle for longer than
//! the configured window.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::{Clock, DefaultClock, Reference},
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use lru::LruCache;
use rainbbit_core::ConfigError;
use std::net::{IpAddr, SocketAddr};
use std::num::{NonZeroU32, NonZeroUsize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

type Bucket<C> = RateLimiter<NotKeyed, InMemoryState, C, NoOpMiddleware<<C as Clock>::Instant>>;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Rates and sizes for [`AdmissionController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionConfig {
    pub global_rate_per_sec: u32,
    pub global_burst: u32,
    pub client_rate_per_sec: u32,
    pub client_burst: u32,
    /// A client bucket unused for this long is replaced.
    pub client_idle: Duration,
    /// Hard cap on tracked clients.
    pub registry_capacity: usize,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            global_rate_per_sec: DEFAULT_GLOBAL_RATE_PER_SEC,
            global_burst: DEFAULT_GLOBAL_BURST,
            client_rate_per_sec: DEFAULT_CLIENT_RATE_PER_SEC,
            client_burst: DEFAULT_CLIENT_BURST,
            client_idle: Duration::from_secs(DEFAULT_CLIENT_IDLE_SECS),
            registry_capacity: DEFAULT_CLIENT_REGISTRY_CAPACITY,
        }
    }
}

fn non_zero_u32(field: &str, value: u32) -> Result<NonZeroU32, ConfigError> {
    NonZeroU32::new(value).ok_or_else(|| ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: "must be greater than zero".to_string(),
    })
}

impl AdmissionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.global_quota()?;
        self.client_quota()?;
        if self.registry_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "client_registry_capacity".to_string(),
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.client_idle.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "client_idle".to_string(),
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    fn global_quota(&self) -> Result<Quota, ConfigError> {
        Ok(
            Quota::per_second(non_zero_u32("global_rate_per_sec", self.global_rate_per_sec)?)
                .allow_burst(non_zero_u32("global_burst", self.global_burst)?),
        )
    }

    fn client_quota(&self) -> Result<Quota, ConfigError> {
        Ok(
            Quota::per_second(non_zero_u32("client_rate_per_sec", self.client_rate_per_sec)?)
                .allow_burst(non_zero_u32("client_burst", self.client_burst)?),
        )
    }
}

// ============================================================================
// CONTROLLER
// ============================================================================

/// Outcome of [`AdmissionController::admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    /// The service-wide budget is exhausted.
    GloballyThrottled { retry_after: Duration },
    /// This client exhausted its own budget.
    ClientThrottled { retry_after: Duration },
}

struct ClientBucket<C: Clock> {
    limiter: Arc<Bucket<C>>,
    last_seen: C::Instant,
}

/// Global plus per-client rate limiting over an injectable clock.
pub struct AdmissionController<C: Clock = DefaultClock> {
    global: Bucket<C>,
    clients: Mutex<LruCache<IpAddr, ClientBucket<C>>>,
    client_quota: Quota,
    client_idle: Duration,
    clock: C,
}

impl AdmissionController<DefaultClock> {
    /// Controller on the monotonic system clock.
    pub fn new(config: AdmissionConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, DefaultClock::default())
    }
}

impl<C: Clock + Clone> AdmissionController<C> {
    pub fn with_clock(config: AdmissionConfig, clock: C) -> Result<Self, ConfigError> {
        config.validate()?;
        let capacity =
            NonZeroUsize::new(config.registry_capacity).ok_or_else(|| ConfigError::InvalidValue {
                field: "client_registry_capacity".to_string(),
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            })?;
        Ok(Self {
            global: RateLimiter::direct_with_clock(config.global_quota()?, clock.clone()),
            clients: Mutex::new(LruCache::new(capacity)),
            client_quota: config.client_quota()?,
            client_idle: config.client_idle,
            clock,
        })
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<IpAddr, ClientBucket<C>>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_idle(&self, bucket: &ClientBucket<C>, now: C::Instant) -> bool {
        Duration::from(now.duration_since(bucket.last_seen)) > self.client_idle
    }

    /// Decide whether a request from `client` may proceed.
    ///
    /// The global bucket is consulted first; a globally throttled request
    /// never touches the client registry.
    pub fn admit(&self, client: IpAddr) -> Admission {
        if let Err(not_until) = self.global.check() {
            return Admission::GloballyThrottled {
                retry_after: not_until.wait_time_from(self.clock.now()),
            };
        }

        let limiter = {
            let mut clients = self.lock();
            let now = self.clock.now();
            match clients.get_mut(&client) {
                Some(bucket) if !self.is_idle(bucket, now) => {
                    bucket.last_seen = now;
                    bucket.limiter.clone()
                }
                _ => {
                    let limiter = Arc::new(RateLimiter::direct_with_clock(
                        self.client_quota,
                        self.clock.clone(),
                    ));
                    let fresh = ClientBucket {
                        limiter: limiter.clone(),
                        last_seen: now,
                    };
                    if let Some((evicted, _)) = clients.push(client, fresh) {
                        if evicted != client {
                            tracing::debug!(client = %evicted, "Evicted client bucket");
                        }
                    }
                    limiter
                }
            }
        };

        match limiter.check() {
            Ok(()) => Admission::Allowed,
            Err(not_until) => Admission::ClientThrottled {
                retry_after: not_until.wait_time_from(self.clock.now()),
            },
        }
    }

    /// Drop every client bucket idle for longer than the idle window.
    pub fn sweep_idle(&self) -> usize {
        let mut clients = self.lock();
        let now = self.clock.now();
        let idle: Vec<IpAddr> = clients
            .iter()
            .filter(|(_, bucket)| self.is_idle(bucket, now))
            .map(|(ip, _)| *ip)
            .collect();
        for ip in &idle {
            clients.pop(ip);
        }
        idle.len()
    }

    /// Number of tracked clients.
    pub fn client_count(&self) -> usize {
        self.lock().len()
    }

    pub fn is_tracked(&self, client: &IpAddr) -> bool {
        self.lock().contains(client)
    }
}

impl<C: Clock> std::fmt::Debug for AdmissionController<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionController")
            .field("client_quota", &self.client_quota)
            .field("client_idle", &self.client_idle)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// MIDDLEWARE
// ============================================================================

/// Extract client IP from proxy headers: first `X-Forwarded-For` entry,
/// then `X-Real-IP`.
fn forwarded_client_ip(request: &Request) -> Option<IpAddr> {
    let forwarded_for = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse().ok());
    if forwarded_for.is_some() {
        return forwarded_for;
    }

    request
        .headers()
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Client identity for a request: the socket peer, or the forwarded address
/// when proxy headers are trusted.
pub fn extract_client_ip(
    request: &Request,
    peer: Option<SocketAddr>,
    trust_forwarded_headers: bool,
) -> Option<IpAddr> {
    if trust_forwarded_headers {
        if let Some(ip) = forwarded_client_ip(request) {
            return Some(ip);
        }
    }
    peer.map(|addr| addr.ip())
}

fn retry_after_secs(wait: Duration) -> u64 {
    wait.as_secs_f64().ceil().max(1.0) as u64
}

/// Admission middleware.
///
/// Rejects with 503 when the service-wide budget is exhausted and with 429
/// when the client's own budget is, both with a `Retry-After` header. A
/// request whose client address cannot be determined is answered with 500.
pub async fn admission_middleware(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.config.rate_limit_enabled {
        return Ok(next.run(request).await);
    }

    let peer = connect_info.map(|ConnectInfo(addr)| addr);
    let Some(client) =
        extract_client_ip(&request, peer, state.config.trust_forwarded_headers)
    else {
        tracing::error!("Cannot determine client address");
        return Err(ApiError::internal_error("Cannot determine client address"));
    };

    match state.admission.admit(client) {
        Admission::Allowed => Ok(next.run(request).await),
        Admission::GloballyThrottled { retry_after } => {
            crate::telemetry::record_admission_rejection("global");
            tracing::warn!(client = %client, "Request rejected: server busy");
            Err(ApiError::service_busy(retry_after_secs(retry_after)))
        }
        Admission::ClientThrottled { retry_after } => {
            crate::telemetry::record_admission_rejection("client");
            tracing::debug!(client = %client, "Request rejected: client over quota");
            Err(ApiError::too_many_requests(retry_after_secs(retry_after)))
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
