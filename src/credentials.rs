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

pub mod ims;

use crate::Result;
use crate::token::Token;
use http::HeaderMap;
use std::sync::Arc;

/// An authenticated session with the Audience Manager API.
///
/// A `Credentials` handle only exists after a first token exchange has
/// succeeded, so holding one means the configured integration was accepted by
/// the exchange service at least once. Create one with
/// [ims::Builder::connect].
///
/// `Credentials` is a cheaply clonable handle; clones share the cached token,
/// so concurrent requests across clones trigger at most one exchange.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub(crate) inner: Arc<dyn dynamic::CredentialsProvider>,
}

impl Credentials {
    /// Returns the current access token, exchanging a new one if the cached
    /// token has expired.
    ///
    /// Most applications should prefer [headers][Credentials::headers] and
    /// never handle tokens directly.
    pub async fn token(&self) -> Result<Token> {
        self.inner.token().await
    }

    /// Returns the headers to attach to an Audience Manager request.
    ///
    /// The map carries `Accept`, `Content-Type`, `Authorization`,
    /// `x-gw-ims-org-id`, and `x-api-key`. Call this immediately before every
    /// outbound request; the `Authorization` value changes when the token is
    /// refreshed.
    pub async fn headers(&self) -> Result<HeaderMap> {
        self.inner.headers().await
    }
}

pub(crate) mod dynamic {
    use super::{HeaderMap, Result, Token};

    /// The interface shared by all credential implementations.
    #[async_trait::async_trait]
    pub trait CredentialsProvider: std::fmt::Debug + Send + Sync {
        /// Returns a valid access token.
        async fn token(&self) -> Result<Token>;

        /// Returns the request headers derived from the current token.
        async fn headers(&self) -> Result<HeaderMap>;
    }
}
