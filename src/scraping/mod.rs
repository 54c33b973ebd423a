//! Web panel session and HTML extraction.
//!
//! The admin-account workflow has no structured API and must drive a rendered
//! HTML form instead. The fragile pattern matching lives here, behind three
//! small functions that are unit-testable against fixed fixtures, so callers
//! only ever see the narrow [`PanelSession`] contract.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::debug;

use crate::config::RobotConfig;
use crate::conn::FormData;
use crate::error::RobotError;

/// One rendered page fetched through the panel session.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PageResponse {
    /// HTTP status of the response.
    pub status: u16,
    /// Rendered HTML body.
    pub body: String,
}

/// Authenticated scraping session against the provider's web panel.
pub trait PanelSession: std::fmt::Debug {
    /// Establishes or refreshes the session; idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::Scraping`] when the panel rejects the
    /// credentials and [`RobotError::Http`] on transport failure.
    fn login(&self) -> Result<(), RobotError>;

    /// Fetches a page.
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::Http`] on transport failure.
    fn get(&self, path: &str) -> Result<PageResponse, RobotError>;

    /// Submits a form. An empty form is used to request a fresh copy of a
    /// server-rendered form page.
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::Http`] on transport failure.
    fn post(&self, path: &str, form: &FormData) -> Result<PageResponse, RobotError>;
}

/// Shared handle to a [`PanelSession`]; the model is single-threaded.
pub type PanelSessionRef = Rc<dyn PanelSession>;

static LOGIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[expect(clippy::unwrap_used, reason = "pattern is a compile-time constant")]
    Regex::new(r#"(?s)"label_req">Login.*?"element">([^<]+)"#).unwrap()
});

static INPUT_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[expect(clippy::unwrap_used, reason = "pattern is a compile-time constant")]
    Regex::new(r"<input\b[^>]*>").unwrap()
});

static ERROR_LIST_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[expect(clippy::unwrap_used, reason = "pattern is a compile-time constant")]
    Regex::new(r#"(?s)<ul\s+class="error_list">(.*?)</ul>"#).unwrap()
});

static LIST_ITEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[expect(clippy::unwrap_used, reason = "pattern is a compile-time constant")]
    Regex::new(r"<li>\s*([^<]*?)\s*</li>").unwrap()
});

/// Extracts the current admin login name from the account status page.
///
/// The name is the value rendered next to the `Login` label; `None` means no
/// account is present.
#[must_use]
pub fn extract_login(html: &str) -> Option<String> {
    LOGIN_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|login| login.as_str().trim().to_owned())
}

/// Extracts the one-time anti-forgery token from a rendered form.
///
/// Looks for an `<input>` whose `name` attribute equals `field` and returns
/// its `value`, tolerating any attribute order inside the tag.
#[must_use]
pub fn extract_csrf_token(html: &str, field: &str) -> Option<String> {
    let name_needle = format!(r#"name="{field}""#);
    for tag in INPUT_TAG_RE.find_iter(html) {
        if !tag.as_str().contains(&name_needle) {
            continue;
        }
        if let Some(value) = attribute_value(tag.as_str(), "value") {
            return Some(value);
        }
    }
    None
}

/// Extracts the validation reasons rendered in an `error_list` block.
///
/// Returns an empty list when the page carries no such block.
#[must_use]
pub fn extract_error_list(html: &str) -> Vec<String> {
    ERROR_LIST_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|block| {
            LIST_ITEM_RE
                .captures_iter(block.as_str())
                .filter_map(|item| item.get(1))
                .map(|reason| reason.as_str().to_owned())
                .collect()
        })
        .unwrap_or_default()
}

fn attribute_value(tag: &str, attribute: &str) -> Option<String> {
    let needle = format!(r#"{attribute}=""#);
    let start = tag.find(&needle)? + needle.len();
    let rest = tag.get(start..)?;
    let end = rest.find('"')?;
    rest.get(..end).map(str::to_owned)
}

/// Production panel session backed by `reqwest`'s blocking client with a
/// cookie store.
#[derive(Debug)]
pub struct RobotPanel {
    client: reqwest::blocking::Client,
    base_url: String,
    username: String,
    password: String,
    logged_in: Cell<bool>,
}

impl RobotPanel {
    /// Builds a panel session from the crate configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::Http`] when the HTTP client cannot be
    /// constructed.
    pub fn new(config: &RobotConfig) -> Result<Self, RobotError> {
        let client = reqwest::blocking::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| RobotError::Http(err.to_string()))?;
        Ok(Self {
            client,
            base_url: config.panel_base_url.trim_end_matches('/').to_owned(),
            username: config.username.clone(),
            password: config.password.clone(),
            logged_in: Cell::new(false),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn page_from(response: reqwest::blocking::Response) -> Result<PageResponse, RobotError> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|err| RobotError::Http(err.to_string()))?;
        Ok(PageResponse { status, body })
    }
}

impl PanelSession for RobotPanel {
    fn login(&self) -> Result<(), RobotError> {
        if self.logged_in.get() {
            return Ok(());
        }
        debug!("logging into the web panel");
        let response = self
            .client
            .post(self.url("/login/check"))
            .form(&[("user", self.username.as_str()), ("password", self.password.as_str())])
            .send()?;
        let status = response.status();
        if status.is_success() || status.is_redirection() {
            self.logged_in.set(true);
            Ok(())
        } else {
            Err(RobotError::Scraping(format!(
                "panel login rejected with status {}",
                status.as_u16()
            )))
        }
    }

    fn get(&self, path: &str) -> Result<PageResponse, RobotError> {
        Self::page_from(self.client.get(self.url(path)).send()?)
    }

    fn post(&self, path: &str, form: &FormData) -> Result<PageResponse, RobotError> {
        Self::page_from(self.client.post(self.url(path)).form(form).send()?)
    }
}

#[cfg(test)]
mod tests;
