use anyhow::Context;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use std::time::Duration;
use url::Url;

pub struct HttpClientFactory;

impl HttpClientFactory {
    /// Creates a new HTTP client with retry middleware
    pub fn create_client() -> ClientWithMiddleware {
        // Exponential backoff, max 3 retries on transient failures
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);

        let client = Client::builder()
            .pool_max_idle_per_host(5)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());

        ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build()
    }
}

/// Append percent-encoded query parameters to `base_url`.
/// reqwest-middleware's request builder has no `.query()`, so the URL is built up front.
pub fn build_url_with_query<K, V>(base_url: &str, params: &[(K, V)]) -> anyhow::Result<String>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut url = Url::parse(base_url).with_context(|| format!("Invalid base URL: {}", base_url))?;
    if !params.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (k, v) in params {
            pairs.append_pair(k.as_ref(), v.as_ref());
        }
    }
    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_values_are_encoded() {
        let url = build_url_with_query(
            "https://api.example.com/geo/1.0/direct",
            &[("q", "New York"), ("limit", "1")],
        )
        .unwrap();
        assert_eq!(url, "https://api.example.com/geo/1.0/direct?q=New+York&limit=1");
    }

    #[test]
    fn test_existing_query_is_extended() {
        let url = build_url_with_query("https://api.example.com/v2?a=1", &[("b", "x&y")]).unwrap();
        assert_eq!(url, "https://api.example.com/v2?a=1&b=x%26y");
    }

    #[test]
    fn test_no_params_leaves_url_untouched() {
        let url = build_url_with_query::<&str, &str>("https://api.example.com/v2/bars", &[]).unwrap();
        assert_eq!(url, "https://api.example.com/v2/bars");
    }

    #[test]
    fn test_invalid_base_rejected() {
        assert!(build_url_with_query("not a url", &[("a", "b")]).is_err());
    }
}
