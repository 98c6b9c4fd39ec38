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

//! Authentication for the Adobe Audience Manager API.
//!
//! This crate manages the credential lifecycle for the Audience Manager REST
//! API: it builds an RS256-signed assertion from a service integration's
//! credentials, exchanges it with Adobe IMS for a bearer token, caches the
//! token, and transparently re-exchanges when the token approaches expiry.
//! Client code asks for a fresh header map immediately before every outbound
//! request and never deals with tokens directly.
//!
//! ```no_run
//! # use aam_auth::config::ImsConfig;
//! # use aam_auth::credentials::ims;
//! # use aam_auth::errors::CredentialsError;
//! # tokio_test::block_on(async {
//! let config = ImsConfig::from_file("config_aam.json").await?;
//! let credentials = ims::Builder::new(config).connect().await?;
//! let headers = credentials.headers().await?;
//! // attach `headers` to an outbound request...
//! # Ok::<(), CredentialsError>(())
//! # });
//! ```
//!
//! The exchange endpoint, the expiry safety margin, and the request timeout
//! are all configurable through [credentials::ims::Builder].

/// Error types for credential construction and token exchange.
pub mod errors;

/// Configuration loading for a service integration.
pub mod config;

/// The [Credentials] type and the IMS credential implementation.
///
/// [Credentials]: credentials::Credentials
pub mod credentials;

/// Types to work with access tokens.
pub mod token;

/// The token cache.
pub(crate) mod token_cache;

/// Header derivation for Audience Manager requests.
pub(crate) mod headers_util;

/// A `Result` alias where the `Err` case is `aam_auth::errors::CredentialsError`.
pub(crate) type Result<T> = std::result::Result<T, crate::errors::CredentialsError>;
