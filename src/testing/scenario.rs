//! In-process HTTP checks for the subscription routes
//!
//! A request is sent straight into the `Router` with `tower::ServiceExt::oneshot`,
//! so no listener is bound.
//!
//! ```rust,ignore
//! testing::get(app, "/users/u_1/subscription")
//!     .execute()
//!     .await
//!     .assert_ok()
//!     .assert_json_field("data.tier", serde_json::json!("Free tier"))
//!     .await;
//! ```

use axum::{
    Router,
    body::{Body, Bytes},
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tower::ServiceExt;

/// A single request against an app.
pub struct Scenario {
    app: Router,
    method: Method,
    uri: String,
}

impl Scenario {
    pub fn new(app: Router) -> Self {
        Self {
            app,
            method: Method::GET,
            uri: "/".to_string(),
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn uri(mut self, uri: &str) -> Self {
        self.uri = uri.to_string();
        self
    }

    /// Send the request and return the response for assertions.
    pub async fn execute(self) -> ScenarioAssert {
        let request = Request::builder()
            .method(self.method)
            .uri(self.uri.as_str())
            .body(Body::empty())
            .unwrap_or_else(|e| panic!("invalid request for {}: {}", self.uri, e));
        let response = self.app.oneshot(request).await.unwrap();
        ScenarioAssert { response }
    }
}

/// Chainable assertions on a response.
pub struct ScenarioAssert {
    response: Response,
}

impl ScenarioAssert {
    pub fn assert_status(self, expected: StatusCode) -> Self {
        let actual = self.response.status();
        assert_eq!(actual, expected, "expected status {}, got {}", expected, actual);
        self
    }

    pub fn assert_ok(self) -> Self {
        self.assert_status(StatusCode::OK)
    }

    pub fn assert_not_found(self) -> Self {
        self.assert_status(StatusCode::NOT_FOUND)
    }

    /// The response declares a JSON body.
    pub fn assert_json(self) -> Self {
        let content_type = self
            .response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert!(
            content_type.starts_with("application/json"),
            "expected a JSON response, got content type {:?}",
            content_type
        );
        self
    }

    /// Deserialize the whole body.
    pub async fn json<T: DeserializeOwned>(self) -> T {
        let bytes = self.into_bytes().await;
        serde_json::from_slice(&bytes).expect("response body is not valid JSON")
    }

    /// Compare the value at a dot path such as `data.remaining.days`.
    ///
    /// Numeric segments index into arrays. The body is kept so assertions can
    /// be chained.
    pub async fn assert_json_field(self, path: &str, expected: Value) -> Self {
        let status = self.response.status();
        let bytes = self.into_bytes().await;
        let body: Value = serde_json::from_slice(&bytes).expect("response body is not valid JSON");

        match lookup(&body, path) {
            Some(actual) => assert_eq!(actual, &expected, "mismatch at {}", path),
            None => panic!("{} not present in {}", path, body),
        }

        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = status;
        Self { response }
    }

    async fn into_bytes(self) -> Bytes {
        axum::body::to_bytes(self.response.into_body(), usize::MAX)
            .await
            .expect("failed to read response body")
    }
}

fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| match segment.parse::<usize>() {
        Ok(index) => current.get(index),
        Err(_) => current.get(segment),
    })
}

/// GET `uri` on `app`.
pub fn get(app: Router, uri: &str) -> Scenario {
    Scenario::new(app).method(Method::GET).uri(uri)
}
