use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::error::SolarError;

pub trait Fetcher: Send + Sync {
    fn fetch_text(&self, url: &str) -> Result<String, SolarError>;
    fn fetch_binary(&self, url: &str) -> Result<Vec<u8>, SolarError>;
}

impl<T: Fetcher + ?Sized> Fetcher for &T {
    fn fetch_text(&self, url: &str) -> Result<String, SolarError> {
        (**self).fetch_text(url)
    }

    fn fetch_binary(&self, url: &str) -> Result<Vec<u8>, SolarError> {
        (**self).fetch_binary(url)
    }
}

#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, SolarError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("solarsync/{}", env!("CARGO_PKG_VERSION"))).map_err(
                |err| SolarError::Transport {
                    url: String::new(),
                    message: err.to_string(),
                },
            )?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| SolarError::Transport {
                url: String::new(),
                message: err.to_string(),
            })?;
        Ok(Self { client })
    }

    fn handle_status(url: &str, response: Response) -> Result<Response, SolarError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .map(|body| snippet(&body))
            .unwrap_or_else(|_| "request failed".to_string());
        Err(SolarError::TransportStatus {
            status,
            url: url.to_string(),
            message,
        })
    }

    fn send_with_retries<F>(&self, url: &str, mut make_req: F) -> Result<Response, SolarError>
    where
        F: FnMut() -> RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            match make_req().send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        debug!(url, status, attempt, "retrying");
                        thread::sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1)));
                        attempt += 1;
                        continue;
                    }
                    return Self::handle_status(url, resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        debug!(url, attempt, error = %err, "retrying");
                        thread::sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1)));
                        attempt += 1;
                        continue;
                    }
                    return Err(SolarError::Transport {
                        url: url.to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch_text(&self, url: &str) -> Result<String, SolarError> {
        let response = self.send_with_retries(url, || self.client.get(url))?;
        response.text().map_err(|err| SolarError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        })
    }

    fn fetch_binary(&self, url: &str) -> Result<Vec<u8>, SolarError> {
        let response = self.send_with_retries(url, || self.client.get(url))?;
        let bytes = response.bytes().map_err(|err| SolarError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        })?;
        if bytes.is_empty() {
            return Err(SolarError::Transport {
                url: url.to_string(),
                message: "empty response body".to_string(),
            });
        }
        Ok(bytes.to_vec())
    }
}

fn snippet(body: &str) -> String {
    body.chars().take(200).collect()
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
