// Copyright 2025 the aam-auth authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt::{Display, Formatter, Result};
use std::sync::Arc;

/// Represents an error creating or using [Credentials](crate::credentials::Credentials).
///
/// Every error carries an [ErrorKind] so callers can tell a transport problem
/// apart from rejected credentials when deciding whether a retry could ever
/// succeed. The crate itself never retries.
#[derive(Clone, Debug)]
pub struct CredentialsError {
    kind: ErrorKind,
    source: CredentialsErrorImpl,
}

/// The classification of a [CredentialsError].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required credential field was missing or empty, or the private key
    /// could not be loaded. Reported before any network activity; retrying
    /// without fixing the configuration cannot succeed.
    Configuration,
    /// The exchange request could not be completed, or the response was not
    /// parseable JSON.
    Network,
    /// The exchange completed and returned JSON, but no access token was
    /// granted. Typically invalid or revoked credentials.
    AuthExchange,
}

#[derive(Clone, Debug, thiserror::Error)]
enum CredentialsErrorImpl {
    #[error("{0}")]
    SimpleMessage(String),
    #[error(transparent)]
    Source(Arc<dyn std::error::Error + Send + Sync>),
}

impl CredentialsError {
    pub(crate) fn new<T: std::error::Error + Send + Sync + 'static>(
        kind: ErrorKind,
        source: T,
    ) -> Self {
        CredentialsError {
            kind,
            source: CredentialsErrorImpl::Source(Arc::new(source)),
        }
    }

    pub(crate) fn from_str<T: Into<String>>(kind: ErrorKind, message: T) -> Self {
        CredentialsError {
            kind,
            source: CredentialsErrorImpl::SimpleMessage(message.into()),
        }
    }

    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns `true` if the error was detected before any network call.
    pub fn is_configuration(&self) -> bool {
        self.kind == ErrorKind::Configuration
    }

    /// Returns `true` if the exchange request itself failed.
    pub fn is_network(&self) -> bool {
        self.kind == ErrorKind::Network
    }

    /// Returns `true` if the exchange service declined to grant a token.
    pub fn is_auth_exchange(&self) -> bool {
        self.kind == ErrorKind::AuthExchange
    }
}

pub(crate) fn configuration<T: std::error::Error + Send + Sync + 'static>(
    source: T,
) -> CredentialsError {
    CredentialsError::new(ErrorKind::Configuration, source)
}

pub(crate) fn configuration_from_str<T: Into<String>>(message: T) -> CredentialsError {
    CredentialsError::from_str(ErrorKind::Configuration, message)
}

pub(crate) fn network<T: std::error::Error + Send + Sync + 'static>(
    source: T,
) -> CredentialsError {
    CredentialsError::new(ErrorKind::Network, source)
}

pub(crate) fn network_from_str<T: Into<String>>(message: T) -> CredentialsError {
    CredentialsError::from_str(ErrorKind::Network, message)
}

pub(crate) fn auth_exchange_from_str<T: Into<String>>(message: T) -> CredentialsError {
    CredentialsError::from_str(ErrorKind::AuthExchange, message)
}

impl std::error::Error for CredentialsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.source {
            CredentialsErrorImpl::SimpleMessage(_) => None,
            CredentialsErrorImpl::Source(source) => Some(source.as_ref()),
        }
    }
}

const CONFIGURATION_MSG: &str = "the client configuration is invalid";
const NETWORK_MSG: &str = "the exchange request could not be completed";
const AUTH_EXCHANGE_MSG: &str = "the exchange did not grant an access token";

impl Display for CredentialsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let msg = match self.kind {
            ErrorKind::Configuration => CONFIGURATION_MSG,
            ErrorKind::Network => NETWORK_MSG,
            ErrorKind::AuthExchange => AUTH_EXCHANGE_MSG,
        };
        write!(f, "cannot obtain access token, {}, source: {}", msg, self.source)
    }
}
