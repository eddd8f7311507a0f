//! Purpose: HTTP client implementation of the content host contract.
//! Exports: `RemoteHost`.
//! Role: Query another postgrid server's `/v0/content` API as a content host.
//! Invariants: Transport and decode failures surface as `ErrorKind::Host`,
//! propagated unmodified through the renderer (no retry, no fallback).

use serde::Deserialize;
use url::Url;

use crate::core::content::{ContentHost, ContentItem, ContentQuery, ResultSet};
use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Debug)]
pub struct RemoteHost {
    base_url: Url,
    token: Option<String>,
    agent: ureq::Agent,
}

#[derive(Debug, Deserialize)]
struct ContentEnvelope {
    items: Vec<ContentItem>,
    total_pages: u64,
}

impl RemoteHost {
    pub fn new(base_url: &str) -> Result<Self, Error> {
        let base_url = Url::parse(base_url).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("invalid content host url `{base_url}`"))
                .with_source(err)
        })?;
        Ok(Self {
            base_url,
            token: None,
            agent: ureq::AgentBuilder::new().build(),
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn content_url(&self, query: &ContentQuery) -> Result<Url, Error> {
        let mut url = self.base_url.join("/v0/content").map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message("invalid content host url")
                .with_source(err)
        })?;
        url.query_pairs_mut()
            .append_pair("limit", &query.limit.to_string())
            .append_pair("offset", &query.offset.to_string())
            .append_pair("orderby", query.orderby.as_str())
            .append_pair("order", query.order.as_str())
            .append_pair("post_type", &query.post_type)
            .append_pair("post_status", query.post_status.as_str());
        Ok(url)
    }
}

impl ContentHost for RemoteHost {
    fn query(&self, query: &ContentQuery) -> Result<ResultSet, Error> {
        let url = self.content_url(query)?;
        let mut request = self
            .agent
            .get(url.as_str())
            .set("Accept", "application/json");
        if let Some(token) = &self.token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }

        let response = match request.call() {
            Ok(response) => response,
            Err(ureq::Error::Status(code, _)) => {
                return Err(Error::new(ErrorKind::Host)
                    .with_message(format!("content host returned status {code}")));
            }
            Err(ureq::Error::Transport(err)) => {
                return Err(Error::new(ErrorKind::Host)
                    .with_message("content host is unreachable")
                    .with_source(err));
            }
        };

        let body = response.into_string().map_err(|err| {
            Error::new(ErrorKind::Host)
                .with_message("failed to read content host response")
                .with_source(err)
        })?;
        let envelope: ContentEnvelope = serde_json::from_str(&body).map_err(|err| {
            Error::new(ErrorKind::Host)
                .with_message("content host response is not valid JSON")
                .with_source(err)
        })?;

        Ok(ResultSet {
            items: envelope.items,
            total_pages: envelope.total_pages,
        })
    }
}
