use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use tokio::time;

use crate::{
    config::RestClientConfig,
    error::{RestApiError, Result},
    limiter::RateLimiter,
};

pub(crate) struct UpbitRestBase {
    base_url: String,
    client: Client,
    limiter: RateLimiter,
    error_cooldown: Duration,
    error_max_trials: u32,
}

impl UpbitRestBase {
    pub fn new(config: RestClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(RestApiError::HttpClient)?;

        Ok(Self {
            base_url: config.base_url().trim_end_matches('/').to_string(),
            client,
            limiter: RateLimiter::new(),
            error_cooldown: config.error_cooldown(),
            error_max_trials: config.error_max_trials(),
        })
    }

    fn build_url(&self, path: &str, query: &[(&str, String)]) -> Result<Url> {
        let url_str = format!("{}{}", self.base_url, path);

        Url::parse_with_params(&url_str, query.iter().map(|(k, v)| (*k, v.as_str()))).map_err(
            |e| RestApiError::UrlParse {
                url: url_str,
                reason: e.to_string(),
            },
        )
    }

    pub async fn get_json<T>(&self, path: String, query: &[(&str, String)]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = self.build_url(&path, query)?;

        let mut trials = 0u32;
        loop {
            self.limiter.acquire().await;

            let response = match self.client.get(url.clone()).send().await {
                Ok(response) => response,
                Err(e) => {
                    trials += 1;
                    if trials >= self.error_max_trials {
                        return Err(RestApiError::SendFailed(e));
                    }

                    time::sleep(self.error_cooldown).await;
                    continue;
                }
            };

            let remaining_req = response
                .headers()
                .get("Remaining-Req")
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned);

            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                // Throttled calls slow the limiter down and do not count
                // against the retry budget.
                self.limiter
                    .observe(remaining_req.as_deref(), Some(RateLimiter::THROTTLE_DELAY))
                    .await;
                continue;
            }

            self.limiter.observe(remaining_req.as_deref(), None).await;

            if !response.status().is_success() {
                let status = response.status();
                let text = response
                    .text()
                    .await
                    .map_err(RestApiError::ResponseDecoding)?;

                trials += 1;
                if trials >= self.error_max_trials {
                    return Err(RestApiError::ErrorResponse { status, text });
                }

                time::sleep(self.error_cooldown).await;
                continue;
            }

            let raw_response = response
                .text()
                .await
                .map_err(RestApiError::ResponseDecoding)?;

            return serde_json::from_str::<T>(&raw_response)
                .map_err(|e| RestApiError::ResponseJsonDeserializeFailed { raw_response, e });
        }
    }
}
