//! HTTP access to the pack JSON server.
//!
//! One blocking GET per label; no retries. A failed or slow request is terminal for
//! that label view.

use log::{debug, info};

use crate::resource::{LayoutResource, ResourceError};

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },

    #[error("resource from {url} could not be decoded: {source}")]
    Decode {
        url: String,
        #[source]
        source: ResourceError,
    },
}

/// Blocking client for `GET /json/pack/{packfile}/{flpid}`.
#[derive(Debug, Clone)]
pub struct ResourceClient {
    base: String,
    agent: ureq::Agent,
}

impl ResourceClient {
    /// `base` is the server origin, e.g. `http://127.0.0.1:8000`.
    pub fn new(base: &str, timeout: std::time::Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            base: base.trim_end_matches('/').to_string(),
            agent,
        }
    }

    pub fn resource_url(&self, packfile: &str, flp_id: &str) -> String {
        format!("{}/json/pack/{}/{}", self.base, packfile, flp_id)
    }

    pub fn fetch(&self, packfile: &str, flp_id: &str) -> Result<LayoutResource, FetchError> {
        let url = self.resource_url(packfile, flp_id);
        info!("fetching layout resource {url}");

        let resp = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| FetchError::Http {
                url: url.clone(),
                source: Box::new(e),
            })?;
        debug!("{url}: {} {}", resp.status(), resp.content_type());

        LayoutResource::from_reader(resp.into_reader())
            .map_err(|source| FetchError::Decode { url, source })
    }
}
