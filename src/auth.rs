use std::fmt;

#[derive(Clone, Default, Eq, PartialEq)]
pub struct SecretString(String);

impl SecretString {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// OAuth1 consumer credentials issued by Mautic for an API application.
#[derive(Clone, Debug)]
pub struct Credentials {
    key: String,
    secret: SecretString,
}

impl Credentials {
    #[must_use]
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: SecretString::new(secret),
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn secret(&self) -> &SecretString {
        &self.secret
    }
}

/// An OAuth1 token with its secret.
///
/// Used both for the short-lived request token of the handshake and for the
/// long-lived access token that signs API calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenPair {
    token: String,
    secret: SecretString,
}

impl TokenPair {
    #[must_use]
    pub fn new(token: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            secret: SecretString::new(secret),
        }
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub fn secret(&self) -> &SecretString {
        &self.secret
    }
}

/// Position of a client in the OAuth1 authorization sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthPhase {
    /// No token of any kind is held.
    Unauthorized,
    /// A request token was issued; waiting for the user's verifier.
    AwaitingVerifier,
    /// An access token is held but no session is bound yet.
    Authorized,
    /// A session is bound; API operations are allowed.
    Ready,
}

impl fmt::Display for AuthPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unauthorized => "unauthorized",
            Self::AwaitingVerifier => "awaiting verifier",
            Self::Authorized => "authorized",
            Self::Ready => "ready",
        })
    }
}
