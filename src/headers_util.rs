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
use crate::token::Token;

use http::HeaderMap;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderName, HeaderValue};

/// The header carrying the integration's API key (the IMS client id).
pub(crate) const API_KEY_HEADER: &str = "x-api-key";

/// The header carrying the IMS organization id.
pub(crate) const IMS_ORG_HEADER: &str = "x-gw-ims-org-id";

const APPLICATION_JSON: &str = "application/json";

/// Builds the full header map for an Audience Manager request.
///
/// The caller is expected to rebuild this map immediately before every
/// outbound request, so the `Authorization:` value always reflects the
/// current token.
pub(crate) fn build_request_headers(
    token: &Token,
    client_id: &str,
    org_id: &str,
) -> Result<HeaderMap> {
    let mut value = HeaderValue::from_str(&format!("{} {}", token.token_type, token.token))
        .map_err(errors::configuration)?;
    value.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(APPLICATION_JSON));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
    headers.insert(AUTHORIZATION, value);
    headers.insert(
        HeaderName::from_static(IMS_ORG_HEADER),
        HeaderValue::from_str(org_id).map_err(errors::configuration)?,
    );
    headers.insert(
        HeaderName::from_static(API_KEY_HEADER),
        HeaderValue::from_str(client_id).map_err(errors::configuration)?,
    );
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_token(value: &str) -> Token {
        Token {
            token: value.to_string(),
            token_type: "Bearer".to_string(),
            expires_at: None,
        }
    }

    #[test]
    fn success() {
        let token = test_token("token-test-only");
        let headers = build_request_headers(&token, "client-id-test", "org-id-test").unwrap();

        assert_eq!(headers.len(), 5, "{headers:?}");
        assert_eq!(headers.get(ACCEPT).unwrap(), APPLICATION_JSON);
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), APPLICATION_JSON);
        assert_eq!(
            headers.get(AUTHORIZATION).unwrap(),
            "Bearer token-test-only"
        );
        assert_eq!(headers.get(IMS_ORG_HEADER).unwrap(), "org-id-test");
        assert_eq!(headers.get(API_KEY_HEADER).unwrap(), "client-id-test");
    }

    #[test]
    fn authorization_is_sensitive() {
        let token = test_token("token-test-only");
        let headers = build_request_headers(&token, "client-id-test", "org-id-test").unwrap();
        assert!(headers.get(AUTHORIZATION).unwrap().is_sensitive());
        assert!(!headers.get(API_KEY_HEADER).unwrap().is_sensitive());
    }

    #[test]
    fn invalid_token_value() {
        let token = test_token("token\nwith\nnewlines");
        let err = build_request_headers(&token, "client-id-test", "org-id-test").unwrap_err();
        assert!(err.is_configuration(), "{err:?}");
    }

    #[test]
    fn invalid_org_id() {
        let token = test_token("token-test-only");
        let err = build_request_headers(&token, "client-id-test", "org\nid").unwrap_err();
        assert!(err.is_configuration(), "{err:?}");
    }
}
