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

use crate::token::{Token, TokenProvider};
use crate::Result;
use std::sync::Arc;
use tokio::sync::Mutex;
// Using tokio's wrapper makes the cache testable without relying on clock times.
use tokio::time::Instant;

/// A single-flight cache in front of a [TokenProvider].
///
/// All callers share one cached token. When the cached token has expired, the
/// first caller performs the exchange while concurrent callers wait for and
/// adopt its result; at most one exchange is in flight per cache at any time.
#[derive(Debug)]
pub(crate) struct TokenCache<T>
where
    T: TokenProvider,
{
    state: Arc<Mutex<CacheState>>,

    // Serializes refreshers. Held only for the duration of one exchange.
    refresh: Arc<Mutex<()>>,

    // The token provider. This thing does the exchanging.
    inner: Arc<T>,
}

#[derive(Debug)]
struct CacheState {
    // The cached token, or the error from the last exchange. The whole value
    // is replaced at once; readers never observe a token paired with another
    // exchange's expiry.
    current: Result<Token>,

    // Bumped on every publication, so a waiter can tell whether the refresh
    // it queued behind already completed.
    generation: u64,
}

// Returns true if we are holding an error, or a token past its deadline.
fn stale(token: &Result<Token>) -> bool {
    match token {
        Ok(t) => t.expires_at.is_some_and(|e| e <= Instant::now()),
        Err(_) => true,
    }
}

// We manually implement `Clone` because the compiler would otherwise require
// `T: Clone`, even though we only hold an `Arc<T>`.
impl<T: TokenProvider> Clone for TokenCache<T> {
    fn clone(&self) -> TokenCache<T> {
        TokenCache {
            state: self.state.clone(),
            refresh: self.refresh.clone(),
            inner: self.inner.clone(),
        }
    }
}

impl<T: TokenProvider> TokenCache<T> {
    pub(crate) fn new(inner: T) -> TokenCache<T> {
        TokenCache {
            state: Arc::new(Mutex::new(CacheState {
                current: Err(crate::errors::network_from_str(
                    "no token has been exchanged yet",
                )),
                generation: 0,
            })),
            refresh: Arc::new(Mutex::new(())),
            inner: Arc::new(inner),
        }
    }
}

#[async_trait::async_trait]
impl<T: TokenProvider + 'static> TokenProvider for TokenCache<T> {
    async fn token(&self) -> Result<Token> {
        let (snapshot, seen) = {
            let state = self.state.lock().await;
            (state.current.clone(), state.generation)
        };
        if !stale(&snapshot) {
            return snapshot;
        }

        let _refresh = self.refresh.lock().await;

        {
            let state = self.state.lock().await;
            if state.generation != seen {
                // Another caller refreshed while we waited for the refresh
                // lock. Adopt its result, token or error, instead of issuing
                // a second exchange for the same expiry.
                return state.current.clone();
            }
        }

        let fresh = self.inner.token().await;

        let mut state = self.state.lock().await;
        state.current = fresh;
        state.generation += 1;
        state.current.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors;
    use crate::token::tests::MockTokenProvider;
    use std::time::Duration;

    static TOKEN_VALID_DURATION: Duration = Duration::from_secs(3600);

    fn token(value: &str, expires_at: Option<Instant>) -> Token {
        Token {
            token: value.to_string(),
            token_type: "Bearer".to_string(),
            expires_at,
        }
    }

    #[tokio::test]
    async fn initial_token_success() {
        let expected = token("test-token", None);
        let expected_clone = expected.clone();

        let mut mock = MockTokenProvider::new();
        mock.expect_token()
            .times(1)
            .return_once(|| Ok(expected_clone));

        let cache = TokenCache::new(mock);
        let actual = cache.token().await.unwrap();
        assert_eq!(actual, expected);

        // Repeated calls within the validity window use the cached token; the
        // mock would panic on a second exchange.
        let actual = cache.token().await.unwrap();
        assert_eq!(actual, expected);
    }

    #[tokio::test]
    async fn initial_token_failure() {
        let mut mock = MockTokenProvider::new();
        mock.expect_token()
            .times(2)
            .returning(|| Err(errors::network_from_str("fail")));

        let cache = TokenCache::new(mock);
        assert!(cache.token().await.is_err());

        // An error is not a valid token; the next call exchanges again.
        assert!(cache.token().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_token_triggers_one_exchange() {
        let now = Instant::now();

        let initial = token("initial-token", Some(now + TOKEN_VALID_DURATION));
        let initial_clone = initial.clone();
        let refreshed = token("refreshed-token", Some(now + 2 * TOKEN_VALID_DURATION));
        let refreshed_clone = refreshed.clone();

        let mut mock = MockTokenProvider::new();
        mock.expect_token()
            .times(1)
            .return_once(|| Ok(initial_clone));
        mock.expect_token()
            .times(1)
            .return_once(|| Ok(refreshed_clone));

        let cache = TokenCache::new(mock);
        let actual = cache.token().await.unwrap();
        assert_eq!(actual, initial);

        tokio::time::advance(TOKEN_VALID_DURATION).await;

        // Exactly one new exchange, and the new token is visible.
        let actual = cache.token().await.unwrap();
        assert_eq!(actual, refreshed);
        let actual = cache.token().await.unwrap();
        assert_eq!(actual, refreshed);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_token_failure_not_served_stale() {
        let now = Instant::now();

        let initial = token("initial-token", Some(now + TOKEN_VALID_DURATION));
        let initial_clone = initial.clone();

        let mut mock = MockTokenProvider::new();
        mock.expect_token()
            .times(1)
            .return_once(|| Ok(initial_clone));
        mock.expect_token()
            .times(1)
            .return_once(|| Err(errors::auth_exchange_from_str("revoked")));

        let cache = TokenCache::new(mock);
        let actual = cache.token().await.unwrap();
        assert_eq!(actual, initial);

        tokio::time::advance(TOKEN_VALID_DURATION).await;

        // The refresh failed; the stale token must not be returned.
        assert!(cache.token().await.is_err());
    }

    #[derive(Clone, Debug)]
    struct CountingProvider {
        result: Result<Token>,
        calls: Arc<std::sync::Mutex<i32>>,
    }

    impl CountingProvider {
        fn new(result: Result<Token>) -> Self {
            CountingProvider {
                result,
                calls: Arc::new(std::sync::Mutex::new(0)),
            }
        }

        fn calls(&self) -> i32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait::async_trait]
    impl TokenProvider for CountingProvider {
        async fn token(&self) -> Result<Token> {
            // Hold the exchange open long enough for concurrent callers to
            // pile up behind the refresh lock.
            tokio::time::sleep(Duration::from_millis(50)).await;
            *self.calls.lock().unwrap() += 1;
            self.result.clone()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_exchange() {
        let expected = token("shared-token", Some(Instant::now() + TOKEN_VALID_DURATION));
        let provider = CountingProvider::new(Ok(expected.clone()));
        let cache = TokenCache::new(provider.clone());

        let tasks = (0..16)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.token().await })
            })
            .collect::<Vec<_>>();

        for task in tasks {
            let actual = task.await.unwrap().unwrap();
            assert_eq!(actual, expected);
        }

        // All sixteen callers observed the expired state concurrently; only
        // the first one may reach the exchange service.
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_the_error() {
        let provider =
            CountingProvider::new(Err(errors::auth_exchange_from_str("bad credentials")));
        let cache = TokenCache::new(provider.clone());

        let tasks = (0..16)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.token().await })
            })
            .collect::<Vec<_>>();

        for task in tasks {
            let actual = task.await.unwrap();
            let e = actual.expect_err("exchange must fail");
            assert!(e.to_string().contains("bad credentials"), "{e}");
        }
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn thundering_herd_multi_thread() {
        let expected = token("herd-token", Some(Instant::now() + TOKEN_VALID_DURATION));
        let provider = CountingProvider::new(Ok(expected.clone()));
        let cache = TokenCache::new(provider.clone());

        let tasks = (0..100)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.token().await })
            })
            .collect::<Vec<_>>();

        for task in tasks {
            let actual = task.await.unwrap();
            assert!(actual.is_ok(), "{}", actual.err().unwrap());
            assert_eq!(actual.unwrap(), expected);
        }

        // The expectation is loose to avoid racing task startup against the
        // first exchange completing; in most runs there is exactly one call.
        assert!(provider.calls() < 100);
    }
}
