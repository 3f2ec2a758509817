//! HTTP leg of the XML-RPC channel. One endpoint, one timeout per call,
//! no retry policy; callers decide what a failed call means.

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, ClientBuilder};

use crate::config::ServiceConfig;
use crate::error::TransportError;
use crate::xmlrpc::{self, Value};

pub struct Transport {
    client: Client,
    endpoint: String,
}

impl Transport {
    pub fn new(config: &ServiceConfig) -> Result<Self, TransportError> {
        let client = ClientBuilder::new().timeout(config.call_timeout).build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Issue one method call and decode its single return value.
    ///
    /// Network problems, non-success HTTP statuses, undecodable bodies and
    /// service faults each come back as their own [`TransportError`] variant.
    pub async fn call(&self, method: &str, params: &[Value]) -> Result<Value, TransportError> {
        let body = xmlrpc::encode_call(method, params);
        tracing::trace!(method, bytes = body.len(), "remote call");

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "text/xml")
            .body(body)
            .send()
            .await?
            .error_for_status()?;

        let text = response.text().await?;
        xmlrpc::decode_response(&text)
    }
}
