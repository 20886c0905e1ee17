// Copyright 2024 RustFS Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


use crate::bootstrap::ServerBootstrapConfig;
use crate::server::readiness::not_ready;
use crate::server::{HEALTH_LIVE_PATH, HEALTH_READY_PATH, INFO_PATH};
use bytes::Bytes;
use erasurefs_config::VERSION;
use erasurefs_ecstore::{ObjectLayerCell, Topology};
use http::{HeaderValue, Method, Request, Response, StatusCode, header};
use http_body_util::Full;
use serde::Serialize;
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::Service;
use tracing::error;

/// What `/erasurefs/info` reports about this node.
#[derive(Debug, Serialize)]
struct NodeInfo<'a> {
    version: &'a str,
    topology: Topology,
    address: String,
    scheme: &'a str,
    endpoints: Vec<String>,
    ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    deployment_id: Option<String>,
}

/// Routes requests until an object API exists: probes and node info,
/// `501 Not Implemented` for the rest.
#[derive(Clone)]
pub struct ProbeHandler {
    config: Arc<ServerBootstrapConfig>,
    cell: Arc<ObjectLayerCell>,
}

impl ProbeHandler {
    pub fn new(config: Arc<ServerBootstrapConfig>, cell: Arc<ObjectLayerCell>) -> Self {
        Self { config, cell }
    }

    async fn route(&self, method: &Method, path: &str) -> Response<Full<Bytes>> {
        if !matches!(path, HEALTH_LIVE_PATH | HEALTH_READY_PATH | INFO_PATH) {
            return text(StatusCode::NOT_IMPLEMENTED, "not implemented");
        }
        if *method != Method::GET && *method != Method::HEAD {
            return text(StatusCode::METHOD_NOT_ALLOWED, "method not allowed");
        }

        match path {
            HEALTH_LIVE_PATH => text(StatusCode::OK, "OK"),
            HEALTH_READY_PATH => {
                if self.cell.is_ready().await {
                    text(StatusCode::OK, "OK")
                } else {
                    not_ready()
                }
            }
            _ => self.info().await,
        }
    }

    async fn info(&self) -> Response<Full<Bytes>> {
        let layer = self.cell.get().await;
        let info = NodeInfo {
            version: VERSION,
            topology: self.config.topology,
            address: self.config.bind.to_string(),
            scheme: self.config.scheme(),
            endpoints: self.config.endpoints.iter().map(ToString::to_string).collect(),
            ready: layer.is_some(),
            deployment_id: layer.map(|l| l.deployment_id().to_string()),
        };

        match serde_json::to_vec(&info) {
            Ok(body) => {
                let mut resp = Response::new(Full::from(body));
                resp.headers_mut()
                    .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
                resp
            }
            Err(e) => {
                error!("failed to encode node info: {}", e);
                text(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
            }
        }
    }
}

fn text(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    let mut resp = Response::new(Full::from(body));
    *resp.status_mut() = status;
    resp.headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    resp
}

impl<B> Service<Request<B>> for ProbeHandler
where
    B: Send + 'static,
{
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let handler = self.clone();
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        Box::pin(async move { Ok(handler.route(&method, &path).await) })
    }
}
