// tankerkoenig_exporter - Prometheus metrics exporter for the Tankerkoenig API
//
// Copyright 2022 Nick Pillitteri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use crate::client::StationApi;
use crate::exporter::Exporter;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

const TEXT_FORMAT: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// State shared by all HTTP handlers.
#[derive(Debug)]
pub struct RequestState<C> {
    pub exporter: Arc<Exporter<C>>,
    pub telemetry_path: String,
}

/// Build a router serving metrics at the telemetry path and a landing page at `/`.
pub fn router<C: StationApi>(state: Arc<RequestState<C>>) -> Router {
    let path = state.telemetry_path.clone();

    Router::new()
        .route(&path, get(text_metrics::<C>))
        .route("/", get(landing_page::<C>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Scrape the Tankerkoenig API and return the results as Prometheus text metrics.
///
/// A failed scrape still results in a successful response, only failing to encode
/// metrics results in an error.
pub async fn text_metrics<C: StationApi>(State(state): State<Arc<RequestState<C>>>) -> impl IntoResponse {
    let mut headers = HeaderMap::new();

    match state.exporter.collect().await {
        Ok(buf) => {
            tracing::debug!(message = "encoded prometheus metrics to text format", num_bytes = buf.len());
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_FORMAT));
            (StatusCode::OK, headers, buf.into_bytes())
        }
        Err(e) => {
            tracing::error!(message = "error encoding metrics", error = %e);
            (StatusCode::INTERNAL_SERVER_ERROR, headers, Vec::new())
        }
    }
}

pub async fn landing_page<C: StationApi>(State(state): State<Arc<RequestState<C>>>) -> Html<String> {
    Html(format!(
        concat!(
            "<html>\n",
            "<head><title>Tankerkoenig API Exporter</title></head>\n",
            "<body>\n",
            "<h1>Tankerkoenig API Exporter</h1>\n",
            "<p>Monitoring {} stations</p>\n",
            "<p><a href=\"{}\">Metrics</a></p>\n",
            "</body>\n",
            "</html>\n",
        ),
        state.exporter.stations().len(),
        state.telemetry_path
    ))
}

#[cfg(test)]
mod tests {
    use super::{router, RequestState};
    use crate::exporter::Exporter;
    use crate::mock::MockApi;
    use crate::registry::StationRegistry;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn state(api: MockApi) -> Arc<RequestState<MockApi>> {
        let registry = StationRegistry::for_location(&api, "u33d", 5).await.unwrap();
        Arc::new(RequestState {
            exporter: Arc::new(Exporter::new(Arc::new(api), registry)),
            telemetry_path: "/metrics".to_owned(),
        })
    }

    async fn get(state: Arc<RequestState<MockApi>>, uri: &str) -> (StatusCode, String) {
        let res = router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = res.status();
        let body = hyper::body::to_bytes(res.into_body()).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_metrics() {
        let (status, body) = get(state(MockApi::with_stations(&["a"])).await, "/metrics").await;
        assert_eq!(StatusCode::OK, status);
        assert!(body.contains("tk_up 1\n"), "{}", body);
        assert!(body.contains("tk_station_price_euro{id=\"a\",product=\"diesel\"} 1.5\n"), "{}", body);
    }

    #[tokio::test]
    async fn test_metrics_failed_scrape() {
        let api = MockApi::with_stations(&["a"]).failing_batch_with("a");
        let (status, body) = get(state(api).await, "/metrics").await;
        assert_eq!(StatusCode::OK, status);
        assert!(body.contains("tk_up 0\n"), "{}", body);
    }

    #[tokio::test]
    async fn test_landing_page() {
        let (status, body) = get(state(MockApi::with_stations(&["a", "b"])).await, "/").await;
        assert_eq!(StatusCode::OK, status);
        assert!(body.contains("<a href=\"/metrics\">"), "{}", body);
        assert!(body.contains("Monitoring 2 stations"), "{}", body);
    }

    #[tokio::test]
    async fn test_not_found() {
        let (status, _) = get(state(MockApi::with_stations(&[])).await, "/other").await;
        assert_eq!(StatusCode::NOT_FOUND, status);
    }
}
