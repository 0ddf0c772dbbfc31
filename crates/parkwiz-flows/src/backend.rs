//! # Authentication Backend
//!
//! [`AuthBackend`] abstracts over whatever service registers accounts, signs
//! users in and issues password-reset links. A production host implements it
//! against its HTTP API; tests and the CLI use [`InMemoryBackend`], which
//! answers deterministically after a configurable latency.
//!
//! Every call resolves to `Result<(), ErrorKind>` so the outcome can be fed
//! straight into an action coordinator.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use parkwiz_core::ErrorKind;

/// Email and password pair. The password never appears in `Debug` output.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Everything collected by the registration wizard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub credentials: Credentials,
    pub facility_name: String,
    pub facility_address: Option<String>,
    pub total_spaces: Option<u32>,
}

/// Remote operations the flows depend on.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Create an account. `AlreadyExists` if the email is taken.
    async fn register(&self, request: RegistrationRequest) -> Result<(), ErrorKind>;

    /// Check credentials. `InvalidCredentials` on any mismatch.
    async fn sign_in(&self, credentials: Credentials) -> Result<(), ErrorKind>;

    /// Email a reset link. `NotFound` if no account uses `email`.
    async fn send_reset_link(&self, email: String) -> Result<(), ErrorKind>;

    /// Replace the password of an existing account.
    async fn reset_password(&self, credentials: Credentials) -> Result<(), ErrorKind>;

    /// Human-readable backend name for logs.
    fn backend_name(&self) -> &str;
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Deterministic backend holding accounts in memory.
///
/// Each call sleeps for the configured latency, then consumes one injected
/// failure if any are queued, then applies the operation:
/// - `register` fails with `AlreadyExists` for a known email
/// - `sign_in` fails with `InvalidCredentials` for an unknown email or a
///   wrong password
/// - `send_reset_link` and `reset_password` fail with `NotFound` for an
///   unknown email
///
/// Emails are compared case-insensitively after trimming.
pub struct InMemoryBackend {
    latency: Duration,
    accounts: RwLock<HashMap<String, String>>,
    failures: Mutex<VecDeque<ErrorKind>>,
    sent_links: Mutex<Vec<String>>,
}

impl InMemoryBackend {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            accounts: RwLock::new(HashMap::new()),
            failures: Mutex::new(VecDeque::new()),
            sent_links: Mutex::new(Vec::new()),
        }
    }

    /// Seed an existing account.
    pub fn with_account(self, email: &str, password: impl Into<String>) -> Self {
        self.accounts
            .write()
            .insert(normalize_email(email), password.into());
        self
    }

    /// Make the next call fail with `error`, regardless of its arguments.
    /// Queued failures are consumed in order.
    pub fn fail_next(&self, error: ErrorKind) {
        self.failures.lock().push_back(error);
    }

    pub fn has_account(&self, email: &str) -> bool {
        self.accounts.read().contains_key(&normalize_email(email))
    }

    pub fn account_count(&self) -> usize {
        self.accounts.read().len()
    }

    /// Addresses a reset link was sent to, oldest first.
    pub fn sent_links(&self) -> Vec<String> {
        self.sent_links.lock().clone()
    }

    async fn round_trip(&self, call: &'static str) -> Result<(), ErrorKind> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let injected = self.failures.lock().pop_front();
        match injected {
            Some(error) => {
                tracing::debug!(call, error = %error.code(), "injected backend failure");
                Err(error)
            }
            None => Ok(()),
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

impl fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryBackend")
            .field("latency", &self.latency)
            .field("accounts", &self.account_count())
            .field("queued_failures", &self.failures.lock().len())
            .finish()
    }
}

#[async_trait]
impl AuthBackend for InMemoryBackend {
    async fn register(&self, request: RegistrationRequest) -> Result<(), ErrorKind> {
        self.round_trip("register").await?;
        let email = normalize_email(&request.credentials.email);
        let mut accounts = self.accounts.write();
        if accounts.contains_key(&email) {
            return Err(ErrorKind::AlreadyExists);
        }
        tracing::info!(
            facility = %request.facility_name,
            spaces = request.total_spaces,
            "account registered"
        );
        accounts.insert(email, request.credentials.password);
        Ok(())
    }

    async fn sign_in(&self, credentials: Credentials) -> Result<(), ErrorKind> {
        self.round_trip("sign_in").await?;
        let accounts = self.accounts.read();
        match accounts.get(&normalize_email(&credentials.email)) {
            Some(stored) if *stored == credentials.password => Ok(()),
            _ => Err(ErrorKind::InvalidCredentials),
        }
    }

    async fn send_reset_link(&self, email: String) -> Result<(), ErrorKind> {
        self.round_trip("send_reset_link").await?;
        let email = normalize_email(&email);
        if !self.accounts.read().contains_key(&email) {
            return Err(ErrorKind::NotFound);
        }
        self.sent_links.lock().push(email);
        Ok(())
    }

    async fn reset_password(&self, credentials: Credentials) -> Result<(), ErrorKind> {
        self.round_trip("reset_password").await?;
        let mut accounts = self.accounts.write();
        match accounts.get_mut(&normalize_email(&credentials.email)) {
            Some(stored) => {
                *stored = credentials.password;
                Ok(())
            }
            None => Err(ErrorKind::NotFound),
        }
    }

    fn backend_name(&self) -> &str {
        "InMemoryBackend"
    }
}
