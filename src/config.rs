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

//! Configuration for a service integration.
//!
//! An integration is provisioned in the Adobe developer console and described
//! by a small JSON file, conventionally named `config_aam.json`:
//!
//! ```json
//! {
//!     "org_id": "1234567890@AdobeOrg",
//!     "client_id": "abcdef0123456789",
//!     "tech_id": "AAAABBBB@techacct.adobe.com",
//!     "secret": "p8e-...",
//!     "pathToKey": "/path/to/private.key"
//! }
//! ```
//!
//! The private key itself stays on disk and is only read when a token
//! exchange takes place.

use crate::errors;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The credentials of a service integration, as loaded from `config_aam.json`.
#[derive(Clone, Deserialize, Serialize)]
pub struct ImsConfig {
    /// The IMS organization id, e.g. `1234567890@AdobeOrg`.
    pub org_id: String,

    /// The integration's client id, also called the API key.
    #[serde(alias = "api_key")]
    pub client_id: String,

    /// The technical account id, e.g. `AAAABBBB@techacct.adobe.com`.
    pub tech_id: String,

    /// The client secret.
    pub secret: String,

    /// Path to the PEM file holding the integration's RSA private key.
    #[serde(rename = "pathToKey", default)]
    pub path_to_key: String,

    /// The private key PEM itself. When set, `pathToKey` is ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,

    /// Overrides the default token exchange endpoint. Mostly useful in tests.
    #[serde(rename = "tokenEndpoint", default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint: Option<String>,
}

impl std::fmt::Debug for ImsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImsConfig")
            .field("org_id", &self.org_id)
            .field("client_id", &self.client_id)
            .field("tech_id", &self.tech_id)
            .field("secret", &"[censored]")
            .field("path_to_key", &self.path_to_key)
            .field(
                "private_key",
                &self.private_key.as_ref().map(|_| "[censored]"),
            )
            .field("token_endpoint", &self.token_endpoint)
            .finish()
    }
}

impl ImsConfig {
    /// Loads the configuration from a JSON file.
    ///
    /// If `path` is absolute and no file exists there, the same path is
    /// retried relative to the current directory. This keeps configuration
    /// files written on one machine usable on another.
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<ImsConfig> {
        let path = find_path(path.as_ref()).ok_or_else(|| {
            errors::configuration_from_str(format!(
                "cannot find configuration file `{}`",
                path.as_ref().display()
            ))
        })?;
        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(errors::configuration)?;
        Self::from_json(&contents)
    }

    /// Parses the configuration from its JSON representation.
    pub fn from_json(contents: &str) -> Result<ImsConfig> {
        serde_json::from_str(contents).map_err(errors::configuration)
    }

    /// Writes a template configuration file with placeholder values.
    pub async fn write_template<P: AsRef<Path>>(path: P) -> Result<()> {
        let template = ImsConfig {
            org_id: "<orgID>@AdobeOrg".to_string(),
            client_id: "<client_id>".to_string(),
            tech_id: "<technical_account>@techacct.adobe.com".to_string(),
            secret: "<your_secret>".to_string(),
            path_to_key: "<path/to/your/privatekey.key>".to_string(),
            private_key: None,
            token_endpoint: None,
        };
        let contents =
            serde_json::to_string_pretty(&template).map_err(errors::configuration)?;
        tokio::fs::write(path.as_ref(), contents)
            .await
            .map_err(errors::configuration)
    }

    /// Verifies that every required field has a value.
    pub(crate) fn validate(&self) -> Result<()> {
        let required = [
            ("org_id", &self.org_id),
            ("client_id", &self.client_id),
            ("tech_id", &self.tech_id),
            ("secret", &self.secret),
        ];
        for (name, value) in required {
            if value.is_empty() {
                return Err(errors::configuration_from_str(format!(
                    "missing required configuration field `{name}`"
                )));
            }
        }
        if self.private_key.is_none() && self.path_to_key.is_empty() {
            return Err(errors::configuration_from_str(
                "missing required configuration field `pathToKey`",
            ));
        }
        Ok(())
    }

    /// Returns the private key PEM, inline or read from `pathToKey`.
    pub(crate) async fn private_key_pem(&self) -> Result<Vec<u8>> {
        if let Some(pem) = &self.private_key {
            return Ok(pem.clone().into_bytes());
        }
        let path = find_path(Path::new(&self.path_to_key)).ok_or_else(|| {
            errors::configuration_from_str(format!(
                "cannot find private key file `{}`",
                self.path_to_key
            ))
        })?;
        tokio::fs::read(&path).await.map_err(errors::configuration)
    }
}

// Returns the path if a file exists there, retrying an absolute path as a
// relative one before giving up.
fn find_path(path: &Path) -> Option<PathBuf> {
    if path.exists() {
        return Some(path.to_path_buf());
    }
    if path.is_absolute() {
        let relative = Path::new(".").join(path.strip_prefix("/").unwrap_or(path));
        if relative.exists() {
            return Some(relative);
        }
    }
    None
}
