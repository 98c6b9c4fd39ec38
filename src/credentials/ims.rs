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

//! [IMS] credentials for a JWT service integration.
//!
//! Adobe IMS (Identity Management System) is the token service behind the
//! Audience Manager API. A service integration authenticates by signing a
//! short-lived assertion with its RSA private key and exchanging it for a
//! bearer token. The types in this module perform that exchange, cache the
//! resulting token, and re-exchange when it approaches expiry.
//!
//! Example usage:
//!
//! ```no_run
//! # use aam_auth::config::ImsConfig;
//! # use aam_auth::credentials::ims::Builder;
//! # use aam_auth::errors::CredentialsError;
//! # tokio_test::block_on(async {
//! let config = ImsConfig::from_file("config_aam.json").await?;
//! let credentials = Builder::new(config).connect().await?;
//! let headers = credentials.headers().await?;
//! # Ok::<(), CredentialsError>(())
//! # });
//! ```
//!
//! [IMS]: https://developer.adobe.com/developer-console/docs/guides/authentication/

mod jws;

use crate::Result;
use crate::config::ImsConfig;
use crate::credentials::{Credentials, dynamic};
use crate::errors;
use crate::headers_util::build_request_headers;
use crate::token::{Token, TokenProvider};
use crate::token_cache::TokenCache;
use async_trait::async_trait;
use http::HeaderMap;
use jws::{ASSERTION_LIFETIME, JwsClaims, JwsHeader};
use rustls::crypto::CryptoProvider;
use rustls::sign::Signer;
use rustls_pemfile::Item;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::time::Instant;
use url::Url;

const DEFAULT_TOKEN_ENDPOINT: &str = "https://ims-na1.adobelogin.com/ims/exchange/jwt";
const ENTITLEMENT: &str = "ent_audiencemanagerplatform_sdk";

// Note the millisecond unit, `expires_in` is in milliseconds too.
const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_millis(500);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Creates [Credentials] for a JWT service integration.
///
/// [connect][Builder::connect] performs the first token exchange before it
/// returns, so a successfully built [Credentials] has always authenticated at
/// least once. An integration that is misconfigured or rejected by IMS never
/// produces a usable handle.
#[derive(Debug)]
pub struct Builder {
    config: ImsConfig,
    token_endpoint: Option<String>,
    safety_margin: Duration,
    timeout: Duration,
    token_dump: Option<PathBuf>,
}

impl Builder {
    /// Starts a builder for the given integration.
    pub fn new(config: ImsConfig) -> Self {
        Builder {
            config,
            token_endpoint: None,
            safety_margin: DEFAULT_SAFETY_MARGIN,
            timeout: DEFAULT_TIMEOUT,
            token_dump: None,
        }
    }

    /// Overrides the token exchange endpoint.
    ///
    /// Takes precedence over the `tokenEndpoint` configuration field. If
    /// neither is set, the credentials use
    /// `https://ims-na1.adobelogin.com/ims/exchange/jwt`.
    pub fn with_token_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.token_endpoint = Some(endpoint.into());
        self
    }

    /// Sets how long before its reported expiry a token is treated as
    /// expired, forcing a refresh. Defaults to 500ms.
    pub fn with_safety_margin(mut self, margin: Duration) -> Self {
        self.safety_margin = margin;
        self
    }

    /// Sets the timeout for each exchange request. Defaults to 30 seconds.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Writes each exchanged access token to the given file.
    ///
    /// The write is best effort; a failure is logged and does not fail the
    /// exchange. Intended for debugging an integration, the file holds a
    /// live secret.
    pub fn with_token_dump<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.token_dump = Some(path.into());
        self
    }

    /// Performs the first token exchange and returns the credentials.
    ///
    /// # Errors
    ///
    /// Returns a [Configuration](crate::errors::ErrorKind::Configuration)
    /// error if a required field is missing or the endpoint is not a valid
    /// URL, without any network activity. Errors from the exchange itself
    /// are propagated from the [token][Credentials::token] path.
    pub async fn connect(self) -> Result<Credentials> {
        self.config.validate()?;

        let endpoint = self
            .token_endpoint
            .or_else(|| self.config.token_endpoint.clone())
            .unwrap_or_else(|| DEFAULT_TOKEN_ENDPOINT.to_string());
        let url = Url::parse(&endpoint).map_err(errors::configuration)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(errors::configuration_from_str(format!(
                "the token endpoint must be an http(s) URL, got `{endpoint}`"
            )));
        }
        let authority = url.origin().ascii_serialization();

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(errors::configuration)?;

        let client_id = self.config.client_id.clone();
        let org_id = self.config.org_id.clone();
        let token_provider = TokenCache::new(ImsTokenProvider {
            config: self.config,
            endpoint,
            authority,
            safety_margin: self.safety_margin,
            client,
            token_dump: self.token_dump,
        });

        // The first exchange. On failure there is no handle to return, so a
        // caller can never issue requests from an unauthenticated session.
        token_provider.token().await?;

        Ok(Credentials {
            inner: Arc::new(SessionCredentials {
                token_provider,
                client_id,
                org_id,
            }),
        })
    }
}

#[derive(Debug)]
struct ImsTokenProvider {
    config: ImsConfig,
    endpoint: String,
    authority: String,
    safety_margin: Duration,
    client: reqwest::Client,
    token_dump: Option<PathBuf>,
}

#[derive(Deserialize)]
struct ExchangeResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
}

#[async_trait]
impl TokenProvider for ImsTokenProvider {
    async fn token(&self) -> Result<Token> {
        let assertion = self.assertion().await?;

        let now = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.secret.as_str()),
                ("jwt_token", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(errors::network)?;
        let status = response.status();
        let body = response.text().await.map_err(errors::network)?;

        let response = serde_json::from_str::<ExchangeResponse>(&body).map_err(|_| {
            errors::network_from_str(format!(
                "exchange returned a non-JSON response, status {status}: {body}"
            ))
        })?;
        let Some(access_token) = response.access_token else {
            return Err(errors::auth_exchange_from_str(format!(
                "exchange response has no access token, status {status}: {body}"
            )));
        };
        let Some(expires_in) = response.expires_in else {
            return Err(errors::auth_exchange_from_str(format!(
                "exchange response has no token lifetime, status {status}"
            )));
        };

        // `expires_in` is in milliseconds.
        let lifetime = Duration::from_millis(expires_in);
        let token = Token {
            token: access_token,
            // IMS reports the type in lowercase; the API expects `Bearer`.
            token_type: "Bearer".to_string(),
            expires_at: Some(now + lifetime.saturating_sub(self.safety_margin)),
        };

        if let Some(path) = &self.token_dump {
            if let Err(e) = tokio::fs::write(path, &token.token).await {
                tracing::warn!(error = %e, path = %path.display(), "cannot write token dump");
            }
        }
        tracing::debug!(expires_in_ms = expires_in, "exchanged assertion for an access token");
        Ok(token)
    }
}

impl ImsTokenProvider {
    // Builds and signs the assertion for one exchange.
    async fn assertion(&self) -> Result<String> {
        let pem = self.config.private_key_pem().await?;
        let signer = self.signer(&pem)?;

        let mut entitlements = serde_json::Map::new();
        entitlements.insert(
            format!("{}/s/{ENTITLEMENT}", self.authority),
            serde_json::Value::Bool(true),
        );
        let claims = JwsClaims {
            exp: OffsetDateTime::now_utc() + ASSERTION_LIFETIME,
            iss: self.config.org_id.clone(),
            sub: self.config.tech_id.clone(),
            aud: format!("{}/c/{}", self.authority, self.config.client_id),
            entitlements,
        };
        let header = JwsHeader {
            alg: "RS256",
            typ: "JWT",
        };

        let signing_input = format!("{}.{}", header.encode()?, claims.encode()?);
        let signature = signer
            .sign(signing_input.as_bytes())
            .map_err(errors::configuration)?;
        use base64::prelude::{BASE64_URL_SAFE_NO_PAD, Engine as _};
        Ok(format!(
            "{signing_input}.{}",
            BASE64_URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    // Creates a signer from the integration's private key PEM.
    fn signer(&self, pem: &[u8]) -> Result<Box<dyn Signer>> {
        let key_provider = CryptoProvider::get_default().map_or_else(
            || rustls::crypto::ring::default_provider().key_provider,
            |p| p.key_provider,
        );

        let mut reader = pem;
        let item = rustls_pemfile::read_one(&mut reader)
            .map_err(errors::configuration)?
            .ok_or_else(|| {
                errors::configuration_from_str("no PEM section found in the private key file")
            })?;
        let key = match item {
            // The developer console hands out PKCS#1 keys; converted PKCS#8
            // keys work too.
            Item::Pkcs1Key(item) => key_provider.load_private_key(item.into()),
            Item::Pkcs8Key(item) => key_provider.load_private_key(item.into()),
            other => {
                return Err(errors::configuration_from_str(format!(
                    "expected an RSA private key in PKCS#1 or PKCS#8 form, found {other:?}"
                )));
            }
        };
        let key = key.map_err(errors::configuration)?;

        key.choose_scheme(&[rustls::SignatureScheme::RSA_PKCS1_SHA256])
            .ok_or_else(|| {
                errors::configuration_from_str(
                    "the private key does not support RS256 signatures",
                )
            })
    }
}

#[derive(Debug)]
struct SessionCredentials<T>
where
    T: TokenProvider,
{
    token_provider: T,
    client_id: String,
    org_id: String,
}

#[async_trait]
impl<T> dynamic::CredentialsProvider for SessionCredentials<T>
where
    T: TokenProvider,
{
    async fn token(&self) -> Result<Token> {
        self.token_provider.token().await
    }

    async fn headers(&self) -> Result<HeaderMap> {
        let token = self.token_provider.token().await?;
        build_request_headers(&token, &self.client_id, &self.org_id)
    }
}
