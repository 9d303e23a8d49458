use std::time::Duration;

use crate::error::Result;

#[derive(Debug, Clone)]
pub enum HeaderKey {
    Authorization,
    ContentType,
    Accept,
    Custom(String),
}

impl HeaderKey {
    fn as_str(&self) -> &str {
        match self {
            HeaderKey::Authorization => "Authorization",
            HeaderKey::ContentType => "Content-Type",
            HeaderKey::Accept => "Accept",
            HeaderKey::Custom(s) => s.as_str(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone)]
pub struct Header {
    key: HeaderKey,
    value: String,
}

impl Header {
    pub fn new(key: HeaderKey, value: String) -> Self {
        Self { key, value }
    }
}

pub struct Client {
    cli: reqwest::Client,
    dft_headers: Vec<Header>,
}

impl Client {
    /// Every request is abandoned after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let cli = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            cli,
            dft_headers: vec![],
        })
    }

    pub fn set_default_headers(&mut self, headers: Vec<Header>) {
        self.dft_headers = headers;
    }

    pub async fn post(
        &self,
        url: &str,
        headers: Option<Vec<Header>>,
        body: String,
    ) -> Result<Response> {
        let mut builder = self.cli.post(url);
        builder = self.add_headers(builder, headers);

        let response = builder.body(body).send().await?;
        Ok(Response {
            status: response.status().into(),
            body: response.text().await?,
        })
    }

    pub async fn delete(&self, url: &str, headers: Option<Vec<Header>>) -> Result<Response> {
        let mut builder = self.cli.delete(url);
        builder = self.add_headers(builder, headers);

        let response = builder.send().await?;
        Ok(Response {
            status: response.status().into(),
            body: response.text().await?,
        })
    }

    fn add_headers(
        &self,
        mut builder: reqwest::RequestBuilder,
        headers: Option<Vec<Header>>,
    ) -> reqwest::RequestBuilder {
        let mut hdrs = self.dft_headers.clone();
        if let Some(headers) = headers {
            hdrs.extend(headers);
        }

        for header in hdrs {
            builder = builder.header(header.key.as_str(), header.value.as_str());
        }

        builder
    }
}
