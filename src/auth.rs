use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

/// Name of the session cookie both applications set.
pub const SESSION_COOKIE: &str = "bom_session";

/// How long an issued session stays valid (8 hours).
pub const SESSION_TTL_SECS: u64 = 8 * 60 * 60;

/// Failed password attempts allowed per client before lockout.
pub const MAX_FAILED_ATTEMPTS: u32 = 5;

/// Length of the failed-attempt window (15 minutes).
pub const ATTEMPT_WINDOW_SECS: u64 = 15 * 60;

const TOKEN_VERSION: &str = "v1";
const TOKEN_STATUS: &str = "ok";

/// Outcome of a password attempt.
#[derive(Debug, PartialEq)]
pub enum AuthOutcome {
    /// Correct password; the caller should issue a session.
    Accepted,
    /// Wrong password; the failure has been recorded against the client.
    Rejected,
    /// The client is locked out for approximately this many more seconds.
    RateLimited { retry_after_secs: u64 },
}

/// Record of issued sessions. The in-memory default satisfies a single
/// process; a distributed deployment can swap in another implementation
/// without touching call sites.
pub trait SessionStore: Send + Sync {
    fn insert(&self, token: &str, expires_at: u64);
    fn contains(&self, token: &str, now: u64) -> bool;
    fn remove(&self, token: &str);
}

/// Per-client failed-attempt tracking.
pub trait AttemptStore: Send + Sync {
    /// Seconds of lockout remaining for this client, if locked out.
    fn lockout_remaining(&self, key: &str, now: u64) -> Option<u64>;
    fn record_failure(&self, key: &str, now: u64);
    fn clear(&self, key: &str);
}

/// Sessions in a process-local map. Expired entries are dropped lazily on
/// lookup and insert.
#[derive(Default)]
pub struct MemorySessions {
    inner: RwLock<HashMap<String, u64>>,
}

impl SessionStore for MemorySessions {
    fn insert(&self, token: &str, expires_at: u64) {
        let now = unix_now();
        let mut sessions = self.inner.write().unwrap();
        sessions.retain(|_, expiry| *expiry > now);
        sessions.insert(token.to_string(), expires_at);
    }

    fn contains(&self, token: &str, now: u64) -> bool {
        let sessions = self.inner.read().unwrap();
        sessions.get(token).is_some_and(|expiry| *expiry > now)
    }

    fn remove(&self, token: &str) {
        self.inner.write().unwrap().remove(token);
    }
}

struct AttemptWindow {
    failures: u32,
    window_start: u64,
}

/// Failed attempts in a process-local map keyed by client address.
#[derive(Default)]
pub struct MemoryAttempts {
    inner: RwLock<HashMap<String, AttemptWindow>>,
}

impl AttemptStore for MemoryAttempts {
    fn lockout_remaining(&self, key: &str, now: u64) -> Option<u64> {
        let attempts = self.inner.read().unwrap();
        let window = attempts.get(key)?;
        if now.saturating_sub(window.window_start) >= ATTEMPT_WINDOW_SECS {
            return None;
        }
        if window.failures >= MAX_FAILED_ATTEMPTS {
            Some(window.window_start + ATTEMPT_WINDOW_SECS - now)
        } else {
            None
        }
    }

    fn record_failure(&self, key: &str, now: u64) {
        let mut attempts = self.inner.write().unwrap();
        let window = attempts.entry(key.to_string()).or_insert(AttemptWindow {
            failures: 0,
            window_start: now,
        });
        if now.saturating_sub(window.window_start) >= ATTEMPT_WINDOW_SECS {
            window.failures = 0;
            window.window_start = now;
        }
        window.failures += 1;
    }

    fn clear(&self, key: &str) {
        self.inner.write().unwrap().remove(key);
    }
}

/// Password gate with per-client throttling and signed expiring sessions.
///
/// A session token is `v1.<expiry>.<signature>` where the signature is a
/// keyed hash over the status flag and expiry. Validation recomputes the
/// signature, compares it in constant time, checks the expiry and finally
/// consults the session store, so a forged or revoked token fails even
/// when it parses.
pub struct AuthGate {
    key: [u8; 32],
    ttl_secs: u64,
    sessions: Arc<dyn SessionStore>,
    attempts: Arc<dyn AttemptStore>,
}

impl AuthGate {
    pub fn new(
        key: [u8; 32],
        ttl_secs: u64,
        sessions: Arc<dyn SessionStore>,
        attempts: Arc<dyn AttemptStore>,
    ) -> Self {
        AuthGate {
            key,
            ttl_secs,
            sessions,
            attempts,
        }
    }

    /// Gate with in-memory session and attempt stores.
    pub fn in_memory(key: [u8; 32], ttl_secs: u64) -> Self {
        AuthGate::new(
            key,
            ttl_secs,
            Arc::new(MemorySessions::default()),
            Arc::new(MemoryAttempts::default()),
        )
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Check a candidate password for a client, enforcing the lockout
    /// window before the comparison. A success clears the client's
    /// failure count.
    pub fn password_attempt(&self, client: &str, candidate: &str, stored: &str) -> AuthOutcome {
        let now = unix_now();

        if let Some(retry_after_secs) = self.attempts.lockout_remaining(client, now) {
            return AuthOutcome::RateLimited { retry_after_secs };
        }

        if !candidate.is_empty() && constant_time_eq(candidate.as_bytes(), stored.as_bytes()) {
            self.attempts.clear(client);
            AuthOutcome::Accepted
        } else {
            self.attempts.record_failure(client, now);
            AuthOutcome::Rejected
        }
    }

    /// Issue a fresh signed session token and record it.
    pub fn issue_session(&self) -> String {
        let expires_at = unix_now() + self.ttl_secs;
        let token = format!(
            "{}.{}.{}",
            TOKEN_VERSION,
            expires_at,
            self.signature(expires_at)
        );
        self.sessions.insert(&token, expires_at);
        token
    }

    /// True when the token parses, its signature matches, it has not
    /// expired and the store still knows it.
    pub fn validate_session(&self, token: &str) -> bool {
        let mut parts = token.splitn(3, '.');
        let (Some(version), Some(expiry), Some(signature)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return false;
        };
        if version != TOKEN_VERSION {
            return false;
        }
        let Ok(expires_at) = expiry.parse::<u64>() else {
            return false;
        };

        let expected = blake3::keyed_hash(&self.key, self.payload(expires_at).as_bytes());
        let Ok(given) = blake3::Hash::from_hex(signature) else {
            return false;
        };
        // blake3::Hash equality is constant-time.
        if expected != given {
            return false;
        }

        let now = unix_now();
        if expires_at <= now {
            return false;
        }

        self.sessions.contains(token, now)
    }

    /// Drop a session from the store.
    pub fn revoke_session(&self, token: &str) {
        self.sessions.remove(token);
    }

    fn payload(&self, expires_at: u64) -> String {
        format!("{}.{}", TOKEN_STATUS, expires_at)
    }

    fn signature(&self, expires_at: u64) -> String {
        hex::encode(
            blake3::keyed_hash(&self.key, self.payload(expires_at).as_bytes()).as_bytes(),
        )
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    // Length leaks; the compared values are a user guess and a shared
    // plant password, not per-user secrets.
    blake3::hash(a) == blake3::hash(b)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
