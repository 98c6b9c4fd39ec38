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

use crate::Result;
use crate::errors;
use serde::Serialize;
use std::time::Duration;
use time::OffsetDateTime;

// IMS rejects assertions with `exp` more than 24 hours out, so the assertion
// is minted with exactly that lifetime. The assertion is rebuilt for every
// exchange, its lifetime is unrelated to the access token's.
pub const ASSERTION_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// The claims of a signed assertion sent to the exchange service.
#[derive(Serialize)]
pub struct JwsClaims {
    #[serde(with = "time::serde::timestamp")]
    pub exp: OffsetDateTime,
    pub iss: String,
    pub sub: String,
    pub aud: String,
    /// The entitlement claims. IMS expects these keyed by the full claim URL,
    /// e.g. `https://ims-na1.adobelogin.com/s/ent_audiencemanagerplatform_sdk`.
    #[serde(flatten)]
    pub entitlements: serde_json::Map<String, serde_json::Value>,
}

impl JwsClaims {
    pub fn encode(&self) -> Result<String> {
        let now = OffsetDateTime::now_utc();
        if self.exp < now {
            return Err(errors::configuration_from_str(format!(
                "assertion expiration time {:?} is already in the past",
                self.exp
            )));
        }

        use base64::prelude::{BASE64_URL_SAFE_NO_PAD, Engine as _};
        let json = serde_json::to_string(&self).map_err(errors::configuration)?;
        Ok(BASE64_URL_SAFE_NO_PAD.encode(json.as_bytes()))
    }
}

/// The header that describes how the assertion was signed.
#[derive(Serialize, Debug)]
pub struct JwsHeader<'a> {
    pub alg: &'a str,
    pub typ: &'a str,
}

impl JwsHeader<'_> {
    pub fn encode(&self) -> Result<String> {
        use base64::prelude::{BASE64_URL_SAFE_NO_PAD, Engine as _};
        let json = serde_json::to_string(&self).map_err(errors::configuration)?;
        Ok(BASE64_URL_SAFE_NO_PAD.encode(json.as_bytes()))
    }
}
