//! HTTP client for the Douban mobile (rexxar) interests endpoint.
//!
//! The endpoint is undocumented and only answers requests that look like
//! they come from the mobile site, hence the fixed referer and user agent.

use crate::error::PipelineError;
use crate::fetcher::{InterestPage, InterestSource};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, REFERER, USER_AGENT};
use reqwest::Client;
use tracing::debug;

pub const API_BASE: &str = "https://m.douban.com/rexxar/api/v2";
const MOBILE_REFERER: &str = "https://m.douban.com/mine/";
const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 16_0 like Mac OS X) \
AppleWebKit/605.1.15 (KHTML, like Gecko) Mobile/15E148 MicroMessenger/8.0.31(0x18001f30) \
NetType/WIFI Language/zh_CN";

/// Fetches "done" book interests for one account.
pub struct DoubanClient {
    client: Client,
    base_url: String,
    user_id: String,
}

impl DoubanClient {
    pub fn new(user_id: impl Into<String>) -> Result<Self, PipelineError> {
        Self::with_base_url(API_BASE, user_id)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Result<Self, PipelineError> {
        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_static(MOBILE_REFERER));
        headers.insert(USER_AGENT, HeaderValue::from_static(MOBILE_USER_AGENT));
        let client = Client::builder().default_headers(headers).build()?;

        Ok(DoubanClient {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_id: user_id.into(),
        })
    }

    pub fn interests_url(&self) -> String {
        format!("{}/user/{}/interests", self.base_url, self.user_id)
    }
}

#[async_trait]
impl InterestSource for DoubanClient {
    async fn fetch_page(&self, start: usize, count: usize) -> Result<InterestPage, PipelineError> {
        let url = self.interests_url();
        let count = count.to_string();
        let start = start.to_string();
        debug!("GET {} start={} count={}", url, start, count);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("type", "book"),
                ("status", "done"),
                ("count", count.as_str()),
                ("start", start.as_str()),
                ("for_mobile", "1"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Status {
                status: status.as_u16(),
                url,
            });
        }
        Ok(response.json::<InterestPage>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interests_url_is_scoped_to_the_account() {
        let client = DoubanClient::with_base_url("http://localhost:9/api/", "reader42").unwrap();
        assert_eq!(
            client.interests_url(),
            "http://localhost:9/api/user/reader42/interests"
        );
    }
}
