use crate::{AuthPhase, Error, TokenPair};

/// Authorization progress of one client.
///
/// Transitions are strictly linear:
/// `Unauthorized` → `AwaitingVerifier` → `Authorized` → `Ready`.
/// A client built with an access token starts in `Ready`.
#[derive(Debug)]
pub(crate) enum AuthState {
    Unauthorized,
    AwaitingVerifier { request_token: TokenPair },
    Authorized { access_token: TokenPair },
    Ready { session: Session },
}

/// Access token bound for signing API calls.
#[derive(Clone, Debug)]
pub(crate) struct Session {
    access_token: TokenPair,
}

impl Session {
    pub(crate) fn new(access_token: TokenPair) -> Self {
        Self { access_token }
    }

    pub(crate) fn access_token(&self) -> &TokenPair {
        &self.access_token
    }
}

impl AuthState {
    pub(crate) fn phase(&self) -> AuthPhase {
        match self {
            Self::Unauthorized => AuthPhase::Unauthorized,
            Self::AwaitingVerifier { .. } => AuthPhase::AwaitingVerifier,
            Self::Authorized { .. } => AuthPhase::Authorized,
            Self::Ready { .. } => AuthPhase::Ready,
        }
    }

    pub(crate) fn expect(&self, operation: &'static str, expected: AuthPhase) -> Result<(), Error> {
        let actual = self.phase();
        if actual == expected {
            Ok(())
        } else {
            Err(Error::InvalidState {
                operation,
                expected,
                actual,
            })
        }
    }

    pub(crate) fn request_token(&self) -> Option<&TokenPair> {
        match self {
            Self::AwaitingVerifier { request_token } => Some(request_token),
            _ => None,
        }
    }

    pub(crate) fn access_token(&self) -> Option<&TokenPair> {
        match self {
            Self::Authorized { access_token } => Some(access_token),
            Self::Ready { session } => Some(session.access_token()),
            _ => None,
        }
    }

    pub(crate) fn session(&self) -> Option<&Session> {
        match self {
            Self::Ready { session } => Some(session),
            _ => None,
        }
    }

    /// `Authorized` → `Ready`.
    pub(crate) fn open_session(&mut self) -> Result<(), Error> {
        self.expect("open a session", AuthPhase::Authorized)?;
        if let Self::Authorized { access_token } =
            std::mem::replace(self, Self::Unauthorized)
        {
            *self = Self::Ready {
                session: Session::new(access_token),
            };
        }
        Ok(())
    }
}
