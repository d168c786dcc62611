use std::time::Duration;

use anyhow::Result;
use reqwest::Client;

const USER_AGENT: &str = concat!("convo/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct HttpClient {
    pub client: Client,
}

impl HttpClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(8)
            .build()?;
        Ok(Self { client })
    }
}
