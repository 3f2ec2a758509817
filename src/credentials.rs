use std::fmt;

/// Environment variable holding the submission email address.
pub const ENV_EMAIL: &str = "NEOS_EMAIL";
/// Environment variable holding the account username.
pub const ENV_USER: &str = "NEOS_USER";
/// Environment variable holding the account secret.
pub const ENV_PASSWORD: &str = "NEOS_PASSWORD";

/// Account identity for authenticated submissions.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub username: String,
    pub secret: String,
}

impl Account {
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Read-only identity source injected into the engine. The engine never
/// reaches into process-wide state itself; whoever builds it decides where
/// these values come from.
pub trait CredentialProvider: Send + Sync {
    /// Email address for job attribution, if one is configured.
    fn email(&self) -> Option<String>;

    /// Account identity for authenticated submission, if one is configured.
    fn account(&self) -> Option<Account>;
}

/// Fixed, fully resolved credentials.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    pub email: Option<String>,
    pub account: Option<Account>,
}

impl StaticCredentials {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            account: None,
        }
    }

    pub fn with_account(mut self, username: impl Into<String>, secret: impl Into<String>) -> Self {
        self.account = Some(Account::new(username, secret));
        self
    }
}

impl CredentialProvider for StaticCredentials {
    fn email(&self) -> Option<String> {
        self.email.clone().filter(|e| !e.trim().is_empty())
    }

    fn account(&self) -> Option<Account> {
        self.account.clone()
    }
}

/// Credentials read from the process environment on each access.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl CredentialProvider for EnvCredentials {
    fn email(&self) -> Option<String> {
        std::env::var(ENV_EMAIL).ok().filter(|e| !e.trim().is_empty())
    }

    fn account(&self) -> Option<Account> {
        let username = std::env::var(ENV_USER).ok().filter(|u| !u.is_empty())?;
        let secret = std::env::var(ENV_PASSWORD).ok().filter(|p| !p.is_empty())?;
        Some(Account::new(username, secret))
    }
}
