//! Synchronous transport to the provider's structured JSON API.
//!
//! Resource objects hold a shared [`Connection`] handle and never reach
//! through each other for network access, so each of them can refresh
//! independently. [`RobotConnection`] is the production implementation; tests
//! substitute [`crate::test_support::ScriptedConnection`].

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use crate::config::RobotConfig;
use crate::error::RobotError;

/// Form body for mutating requests: repeated keys are allowed, matching the
/// provider's `key[]` array convention.
pub type FormData = [(String, String)];

/// HTTP methods used by the structured API.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HttpMethod {
    /// Read a resource or collection.
    Get,
    /// Mutate a resource with a form-encoded body.
    Post,
    /// Remove or deactivate a resource.
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// Blocking transport used by every resource object.
///
/// Errors carry the provider's HTTP status via
/// [`RobotError::Transport`]; a 404 on a collection endpoint is the
/// documented "empty collection" signal and is normalized by the managers,
/// not here.
pub trait Connection: fmt::Debug {
    /// Performs one request and decodes the JSON response document.
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::Transport`] for non-success statuses and
    /// [`RobotError::Http`] when no response was received at all.
    fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&FormData>,
    ) -> Result<Value, RobotError>;

    /// Fetches a document with a GET request.
    ///
    /// # Errors
    ///
    /// See [`Connection::request`].
    fn get(&self, path: &str) -> Result<Value, RobotError> {
        self.request(HttpMethod::Get, path, None)
    }

    /// Submits a form-encoded POST and decodes the response document.
    ///
    /// # Errors
    ///
    /// See [`Connection::request`].
    fn post(&self, path: &str, body: &FormData) -> Result<Value, RobotError> {
        self.request(HttpMethod::Post, path, Some(body))
    }

    /// Issues a DELETE request and decodes the response document.
    ///
    /// # Errors
    ///
    /// See [`Connection::request`].
    fn delete(&self, path: &str) -> Result<Value, RobotError> {
        self.request(HttpMethod::Delete, path, None)
    }
}

/// Shared handle to a [`Connection`]; the model is single-threaded.
pub type ConnectionRef = Rc<dyn Connection>;

/// Unwraps the provider's single-key envelope (`{"server": {…}}` and
/// friends) and deserializes the inner document.
///
/// A missing envelope or missing field is a protocol contract violation and
/// surfaces as [`RobotError::MalformedResponse`]; fields are never silently
/// defaulted.
///
/// # Errors
///
/// Returns [`RobotError::MalformedResponse`] naming the envelope and the
/// decoder failure.
pub fn decode<T: DeserializeOwned>(document: &Value, entity: &'static str) -> Result<T, RobotError> {
    let inner = document
        .get(entity)
        .ok_or_else(|| RobotError::MalformedResponse {
            entity,
            message: format!("missing '{entity}' envelope"),
        })?;
    serde_json::from_value(inner.clone()).map_err(|err| RobotError::MalformedResponse {
        entity,
        message: err.to_string(),
    })
}

/// Deserializes a nullable field whose key must nevertheless be present.
///
/// A plain `Option` field treats an absent key like an explicit `null`;
/// routing it through this function keeps the missing key a decoding error,
/// which [`decode`] then reports as [`RobotError::MalformedResponse`].
///
/// # Errors
///
/// Returns the deserializer's own error for anything but a value or `null`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer)
}

/// Production transport backed by `reqwest`'s blocking client.
#[derive(Debug)]
pub struct RobotConnection {
    client: reqwest::blocking::Client,
    base_url: String,
    username: String,
    password: String,
}

impl RobotConnection {
    /// Builds a transport from the crate configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::Http`] when the HTTP client cannot be
    /// constructed.
    pub fn new(config: &RobotConfig) -> Result<Self, RobotError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| RobotError::Http(err.to_string()))?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_owned(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// Builds the transport error for a non-success response. The status is
    /// always preserved, even when the body carries no decodable error
    /// envelope; an undecodable body is used verbatim as the message.
    fn error_from_response(status: u16, body: &str) -> RobotError {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|document| {
                document
                    .get("error")
                    .and_then(|err| err.get("message"))
                    .and_then(Value::as_str)
                    .map(str::to_owned)
            })
            .unwrap_or_else(|| {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    String::from("no error message supplied")
                } else {
                    trimmed.to_owned()
                }
            });
        RobotError::Transport { status, message }
    }
}

impl Connection for RobotConnection {
    fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&FormData>,
    ) -> Result<Value, RobotError> {
        let url = format!("{}{path}", self.base_url);
        debug!(%method, path, "robot API request");
        let mut request = match method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
            HttpMethod::Delete => self.client.delete(&url),
        }
        .basic_auth(&self.username, Some(&self.password));
        if let Some(form) = body {
            request = request.form(form);
        }
        let response = request.send()?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|err| RobotError::Http(err.to_string()))?;
        if (200..300).contains(&status) {
            serde_json::from_str(&body).map_err(|err| RobotError::Http(err.to_string()))
        } else {
            Err(Self::error_from_response(status, &body))
        }
    }
}
