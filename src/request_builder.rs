use std::time::Duration;

use http::{header::CONTENT_TYPE, HeaderValue, Method};
use log::info;
use reqwest::{Response, StatusCode};
use url::Url;

use crate::error::Error;

/// A single report request: a POST of the rendered JSON body to the paged URL
pub struct RequestBuilder {
    pub url: Url,
    pub body: String,
    pub timeout: Option<Duration>,
}

impl RequestBuilder {
    pub fn new(url: Url, body: String) -> Self {
        Self {
            url,
            body,
            timeout: None,
        }
    }

    /// Sets a total timeout for the request
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the underlying reqwest request without sending it
    pub fn build(self) -> Result<(reqwest::Client, reqwest::Request), Error> {
        let mut client = reqwest::Client::builder();

        if let Some(timeout) = self.timeout {
            client = client.timeout(timeout);
        }

        let client = client.build()?;
        let request = client
            .request(Method::POST, self.url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(self.body)
            .build()?;

        Ok((client, request))
    }

    /// Sends the request and checks that the server answered 200 OK
    ///
    /// Any other status is an error, and the response body is discarded.
    pub async fn send(self) -> Result<Response, Error> {
        info!("Sending request to the server: {}", self.url);

        let (client, request) = self.build()?;
        let response = client.execute(request).await?;

        if response.status() != StatusCode::OK {
            return Err(Error::Status(response.status()));
        }

        info!("Successfully got response from the server");

        Ok(response)
    }
}
