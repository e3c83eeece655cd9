/*!
 * Credential bootstrap and transport.
 *
 * A [Session] holds the OAuth credentials needed to talk to the engine and a bearer token
 * obtained from them. Tokens are refreshed shortly before they expire, and once more on the
 * spot if the engine answers 401 anyway.
 */

use crate::{
    engine::{expr::Expr, feature::FeatureSet, FeatureCollection},
    error::{AuthError, CropSatResult, EngineError},
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::{
    path::Path,
    time::{Duration, Instant},
};

/// Where engine requests go unless told otherwise.
pub const DEFAULT_API_URL: &str = "https://earthengine.googleapis.com";

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Refresh this long before the token would actually expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Zonal statistics over a whole county can run long.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/** Stored OAuth credentials for the engine. */
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl Credentials {
    /// Load credentials from the JSON file the authentication flow left behind.
    pub fn from_file<P: AsRef<Path>>(path: P) -> CropSatResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let credentials = serde_json::from_str(&text)?;
        Ok(credentials)
    }
}

#[derive(Debug, Deserialize)]
struct TokenReply {
    access_token: String,
    expires_in: u64,
}

/** An authenticated session with the remote analytics engine. */
pub struct Session {
    http: reqwest::blocking::Client,
    credentials: Credentials,
    project: String,
    api_url: String,
    access_token: String,
    expires_at: Instant,
}

impl Session {
    /// Establish an authenticated session against the default endpoint.
    pub fn connect(credentials: Credentials, project: &str) -> CropSatResult<Self> {
        Self::connect_to(credentials, project, DEFAULT_API_URL)
    }

    /// Establish an authenticated session against a specific endpoint.
    pub fn connect_to(credentials: Credentials, project: &str, api_url: &str) -> CropSatResult<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let mut session = Session {
            http,
            credentials,
            project: project.to_owned(),
            api_url: api_url.trim_end_matches('/').to_owned(),
            access_token: String::new(),
            expires_at: Instant::now(),
        };

        session.refresh_token()?;
        log::info!("session established for project {}", session.project);

        Ok(session)
    }

    /// Exchange the refresh token for a fresh bearer token.
    fn refresh_token(&mut self) -> CropSatResult<()> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", self.credentials.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self.http.post(TOKEN_URL).form(&params).send()?;
        if !response.status().is_success() {
            return Err(Box::new(AuthError {
                message: format!("token exchange answered {}", response.status()),
            }));
        }

        let reply: TokenReply = response.json()?;
        self.access_token = reply.access_token;
        self.expires_at = Instant::now() + Duration::from_secs(reply.expires_in);
        log::debug!("bearer token refreshed");

        Ok(())
    }

    fn bearer_token(&mut self) -> CropSatResult<String> {
        if self.expires_at.saturating_duration_since(Instant::now()) < EXPIRY_MARGIN {
            self.refresh_token()?;
        }

        Ok(self.access_token.clone())
    }

    fn post_compute(&mut self, url: &str, body: &Value) -> CropSatResult<reqwest::blocking::Response> {
        let token = self.bearer_token()?;
        let response = self.http.post(url).bearer_auth(token).json(body).send()?;
        Ok(response)
    }

    /// Evaluate an expression on the engine and return the decoded result.
    ///
    /// A null result means the expression evaluated to nothing (for example taking the first
    /// element of an empty collection). That is not an error; engine reported failures are.
    pub fn compute(&mut self, expr: &Expr) -> CropSatResult<Value> {
        let url = format!("{}/v1/projects/{}/value:compute", self.api_url, self.project);
        let body = json!({ "expression": expr });

        let mut response = self.post_compute(&url, &body)?;
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            // The token may have been revoked out from under us.
            self.refresh_token()?;
            response = self.post_compute(&url, &body)?;
        }

        let status = response.status();
        let reply: Value = response.json()?;

        decode_reply(status, reply)
    }

    /// Evaluate a feature collection and decode the reply.
    pub fn get_features(&mut self, collection: &FeatureCollection) -> CropSatResult<FeatureSet> {
        let value = self.compute(collection.expr())?;
        let set = FeatureSet::from_value(value)?;
        Ok(set)
    }
}

/// Turn a compute reply into a result value.
///
/// An error object in the body wins over the HTTP status; its code falls back to the status
/// when the engine left it out. A missing `result` decodes as null, which callers treat as
/// "nothing matched" rather than a failure.
fn decode_reply(status: reqwest::StatusCode, reply: Value) -> CropSatResult<Value> {
    if let Some(error) = reply.get("error") {
        let code = error
            .get("code")
            .and_then(Value::as_u64)
            .unwrap_or_else(|| u64::from(status.as_u16()));
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("no message")
            .to_owned();
        return Err(Box::new(EngineError { code, message }));
    }

    if !status.is_success() {
        return Err(Box::new(EngineError {
            code: u64::from(status.as_u16()),
            message: format!("compute request answered {}", status),
        }));
    }

    Ok(reply.get("result").cloned().unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn reported_error_code_is_kept() {
        let reply = serde_json::json!({
            "error": { "code": 429, "message": "quota exceeded" }
        });

        let err = decode_reply(StatusCode::OK, reply).unwrap_err();
        let engine = err.downcast_ref::<EngineError>().unwrap();
        assert_eq!(engine.code, 429);
        assert_eq!(engine.message, "quota exceeded");
    }

    #[test]
    fn missing_error_code_falls_back_to_http_status() {
        let reply = serde_json::json!({
            "error": { "message": "expression too deep" }
        });

        let err = decode_reply(StatusCode::BAD_REQUEST, reply).unwrap_err();
        let engine = err.downcast_ref::<EngineError>().unwrap();
        assert_eq!(engine.code, 400);
        assert_eq!(engine.message, "expression too deep");
    }

    #[test]
    fn wide_error_codes_pass_through_unclamped() {
        let reply = serde_json::json!({
            "error": { "code": 4_294_967_296u64, "message": "internal" }
        });

        let err = decode_reply(StatusCode::OK, reply).unwrap_err();
        let engine = err.downcast_ref::<EngineError>().unwrap();
        assert_eq!(engine.code, 4_294_967_296);
    }

    #[test]
    fn bare_failure_status_becomes_an_engine_error() {
        let reply = serde_json::json!({ "unexpected": "shape" });

        let err = decode_reply(StatusCode::SERVICE_UNAVAILABLE, reply).unwrap_err();
        let engine = err.downcast_ref::<EngineError>().unwrap();
        assert_eq!(engine.code, 503);
        assert!(engine.message.contains("503"));
    }

    #[test]
    fn successful_reply_yields_the_result_value() {
        let reply = serde_json::json!({ "result": { "bands": ["B4", "B8"] } });

        let value = decode_reply(StatusCode::OK, reply).unwrap();
        assert_eq!(value, serde_json::json!({ "bands": ["B4", "B8"] }));
    }

    #[test]
    fn successful_reply_without_a_result_is_null() {
        let reply = serde_json::json!({});

        let value = decode_reply(StatusCode::OK, reply).unwrap();
        assert!(value.is_null());
    }
}
