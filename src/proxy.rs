use std::collections::BTreeMap;
use std::net::ToSocketAddrs;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http_status_counter::Measurement;
use pingora::http::{RequestHeader, ResponseHeader};
use pingora::prelude::*;

use crate::configuration::{ProxyConfig, UpstreamConfig};
use crate::export;

pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Forwards every request to a single upstream and counts the status of each
/// upstream response.
pub struct StatusProxy {
    upstream: UpstreamConfig,
    headers: BTreeMap<String, String>,
    status_path: Option<String>,
    measurement: Arc<Measurement>,
}

impl StatusProxy {
    pub fn new(config: &ProxyConfig, measurement: Arc<Measurement>) -> Self {
        Self {
            upstream: config.upstream.clone(),
            headers: config.headers.clone(),
            status_path: config.status_path.clone(),
            measurement,
        }
    }

    fn is_status_request(&self, session: &Session) -> bool {
        self.status_path
            .as_deref()
            .is_some_and(|path| session.req_header().uri.path() == path)
    }

    async fn write_status(&self, session: &mut Session) -> Result<()> {
        let records = export::retained_records(&self.measurement);
        let body = export::convert_records(&records).map_err(|e| {
            Error::explain(
                ErrorType::InternalError,
                format!("failed to encode status records: {e}"),
            )
        })?;

        let mut header = ResponseHeader::build(200, None)?;
        header.insert_header("Content-Type", CONTENT_TYPE_JSON)?;
        header.insert_header("Content-Length", body.len().to_string())?;
        session.set_keepalive(None);
        session
            .write_response_header(Box::new(header), false)
            .await?;
        session
            .write_response_body(Some(Bytes::from(body)), true)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ProxyHttp for StatusProxy {
    type CTX = ();

    fn new_ctx(&self) -> Self::CTX {}

    async fn request_filter(&self, session: &mut Session, _ctx: &mut Self::CTX) -> Result<bool>
    where
        Self::CTX: Send + Sync,
    {
        if !self.is_status_request(session) {
            return Ok(false);
        }

        // Served locally, so it never reaches response_filter and is not counted.
        self.write_status(session).await?;
        Ok(true)
    }

    async fn upstream_peer(
        &self,
        _session: &mut Session,
        _ctx: &mut Self::CTX,
    ) -> Result<Box<HttpPeer>> {
        let address = self.upstream.address();
        let addr = address
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| {
                Error::explain(
                    ErrorType::HTTPStatus(502),
                    format!("upstream {address} did not resolve"),
                )
            })?;

        Ok(Box::new(HttpPeer::new(
            addr,
            self.upstream.tls(),
            self.upstream.host.clone(),
        )))
    }

    async fn upstream_request_filter(
        &self,
        _session: &mut Session,
        upstream_request: &mut RequestHeader,
        _ctx: &mut Self::CTX,
    ) -> Result<()>
    where
        Self::CTX: Send + Sync,
    {
        for (name, value) in &self.headers {
            upstream_request.insert_header(name.clone(), value.as_str())?;
        }
        Ok(())
    }

    async fn response_filter(
        &self,
        _session: &mut Session,
        upstream_response: &mut ResponseHeader,
        _ctx: &mut Self::CTX,
    ) -> Result<()>
    where
        Self::CTX: Send + Sync,
    {
        self.measurement
            .count_up(upstream_response.status.as_u16());
        Ok(())
    }
}
