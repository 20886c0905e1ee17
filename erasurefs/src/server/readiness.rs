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


use crate::server::{HEALTH_PREFIX, INFO_PATH};
use bytes::Bytes;
use erasurefs_config::DEFAULT_RETRY_AFTER_SECS;
use erasurefs_ecstore::ObjectLayerCell;
use http::{HeaderValue, Request, Response, StatusCode, header};
use http_body_util::Full;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Answers 503 with `Retry-After` until the object layer is published.
///
/// Probe paths always reach the inner service so orchestrators can watch
/// the node come up.
#[derive(Clone)]
pub struct ReadinessGateLayer {
    cell: Arc<ObjectLayerCell>,
}

impl ReadinessGateLayer {
    pub fn new(cell: Arc<ObjectLayerCell>) -> Self {
        Self { cell }
    }
}

impl<S> Layer<S> for ReadinessGateLayer {
    type Service = ReadinessGateService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ReadinessGateService {
            inner,
            cell: self.cell.clone(),
        }
    }
}

#[derive(Clone)]
pub struct ReadinessGateService<S> {
    inner: S,
    cell: Arc<ObjectLayerCell>,
}

fn is_probe(path: &str) -> bool {
    path.starts_with(HEALTH_PREFIX) || path == INFO_PATH
}

/// 503 telling clients the node is still starting.
pub(crate) fn not_ready() -> Response<Full<Bytes>> {
    let mut resp = Response::new(Full::from("service starting, retry later"));
    *resp.status_mut() = StatusCode::SERVICE_UNAVAILABLE;
    let headers = resp.headers_mut();
    headers.insert(header::RETRY_AFTER, HeaderValue::from(DEFAULT_RETRY_AFTER_SECS));
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    resp
}

impl<S, B> Service<Request<B>> for ReadinessGateService<S>
where
    S: Service<Request<B>, Response = Response<Full<Bytes>>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError> + Send + 'static,
    B: Send + 'static,
{
    type Response = Response<Full<Bytes>>;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let cell = self.cell.clone();
        let probe = is_probe(req.uri().path());
        let mut inner = self.inner.clone();

        Box::pin(async move {
            if !probe && !cell.is_ready().await {
                return Ok(not_ready());
            }
            inner.call(req).await.map_err(Into::into)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erasurefs_ecstore::disk::format::FormatV3;
    use erasurefs_ecstore::store::{DefaultObjectLayerFactory, ObjectLayerFactory};
    use std::convert::Infallible;
    use tower::ServiceExt;
    use tower::service_fn;

    async fn call(cell: &Arc<ObjectLayerCell>, path: &str) -> Response<Full<Bytes>> {
        let inner = service_fn(|_req: Request<()>| async { Ok::<_, Infallible>(Response::new(Full::from("inner"))) });
        let req = Request::builder().uri(path).body(()).unwrap();
        ReadinessGateLayer::new(cell.clone()).layer(inner).oneshot(req).await.unwrap()
    }

    #[tokio::test]
    async fn test_gate_blocks_until_published() {
        let cell = Arc::new(ObjectLayerCell::new());

        let resp = call(&cell, "/bucket/object").await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(resp.headers()[header::RETRY_AFTER], "5");
        assert_eq!(resp.headers()[header::CACHE_CONTROL], "no-store");

        let layer = DefaultObjectLayerFactory
            .activate(&[None], FormatV3::new(1, 1))
            .await
            .unwrap();
        cell.publish(layer).await.unwrap();

        let resp = call(&cell, "/bucket/object").await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_probes_pass_before_ready() {
        let cell = Arc::new(ObjectLayerCell::new());
        for path in ["/health/live", "/health/ready", "/erasurefs/info"] {
            let resp = call(&cell, path).await;
            assert_eq!(resp.status(), StatusCode::OK, "{path}");
        }

        let resp = call(&cell, "/healthz").await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
