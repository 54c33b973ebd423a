//! Admin account lifecycle driven through the scraped web panel.
//!
//! There is no structured API for admin accounts; every transition drives a
//! rendered HTML form protected by a one-time anti-forgery token. The remote
//! endpoint answers 200 for both success and validation failure, so success
//! is recognised by a marker substring and failures by a parsed error list.
//! After every transition the state is re-synchronized by re-scraping rather
//! than trusting the local assumption.

use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::info;

use crate::error::RobotError;
use crate::scraping::{PanelSessionRef, extract_csrf_token, extract_error_list, extract_login};

/// Form field carrying the anti-forgery token.
const CSRF_FIELD: &str = "password[_csrf_token]";
/// Substring marking a successful form submission.
const SUCCESS_MARKER: &str = "msgbox_success";

/// Characters allowed in generated admin passwords.
const PASSWORD_CHARS: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789/()-=+_,;.^~#*@";

/// Generates a random password of 20 to 40 characters drawn from letters,
/// digits, and a fixed punctuation set.
///
/// The random source is injected so generation stays deterministic under
/// test; production callers pass a cryptographically secure generator.
#[must_use]
pub fn generate_password<R: Rng + ?Sized>(rng: &mut R) -> String {
    let length = rng.random_range(20..=40);
    (0..length)
        .filter_map(|_| PASSWORD_CHARS.choose(rng).copied())
        .map(char::from)
        .collect()
}

/// Local mirror of the server's panel admin account.
///
/// `passwd` is known locally only immediately after a successful creation
/// in the same process; the provider never shows it again.
#[derive(Clone, Debug)]
pub struct AdminAccount {
    panel: PanelSessionRef,
    server_number: u32,
    /// Whether an admin account currently exists on the panel.
    pub exists: bool,
    /// Login name of the existing account.
    pub login: Option<String>,
    /// Password submitted by the last successful `create` in this process.
    pub passwd: Option<String>,
}

impl AdminAccount {
    /// Builds the account mirror and runs the initial discovery scrape.
    ///
    /// # Errors
    ///
    /// Propagates login and scraping failures from [`AdminAccount::update_info`].
    pub(crate) fn new(panel: PanelSessionRef, server_number: u32) -> Result<Self, RobotError> {
        let mut account = Self {
            panel,
            server_number,
            exists: false,
            login: None,
            passwd: None,
        };
        account.update_info()?;
        Ok(account)
    }

    /// Re-discovers the account state by scraping the status page.
    ///
    /// Presence is derived purely from whether the login label matches.
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::Scraping`] when the page is not served with
    /// status 200 and propagates panel transport failures.
    pub fn update_info(&mut self) -> Result<(), RobotError> {
        self.panel.login()?;
        let response = self
            .panel
            .get(&format!("/server/admin/id/{}", self.server_number))?;
        if response.status != 200 {
            return Err(RobotError::Scraping(format!(
                "admin status page returned status {}",
                response.status
            )));
        }
        match extract_login(&response.body) {
            Some(login) => {
                self.exists = true;
                self.login = Some(login);
            }
            None => {
                self.exists = false;
                self.login = None;
            }
        }
        Ok(())
    }

    /// Creates the admin account, or updates its password when one exists.
    ///
    /// Uses the thread RNG for password generation; see
    /// [`AdminAccount::create_with_rng`] for the injectable variant.
    ///
    /// # Errors
    ///
    /// See [`AdminAccount::create_with_rng`].
    pub fn create(&mut self, passwd: Option<String>) -> Result<(String, String), RobotError> {
        self.create_with_rng(passwd, &mut rand::rng())
    }

    /// Creates or updates the admin account with an explicit random source.
    ///
    /// When `passwd` is `None` a random one is generated. The account form
    /// is fetched first to obtain the one-time anti-forgery token, then the
    /// new password is submitted to the create endpoint (account missing) or
    /// the update endpoint with the numeric identifier attached (account
    /// present). On success the state is re-discovered and the submitted
    /// password is adopted as the only locally known copy; the resolved
    /// `(login, password)` pair is returned.
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::Scraping`] when the anti-forgery token cannot
    /// be found and [`RobotError::Credential`] carrying every listed
    /// validation reason when the submission is rejected.
    pub fn create_with_rng<R: Rng + ?Sized>(
        &mut self,
        passwd: Option<String>,
        rng: &mut R,
    ) -> Result<(String, String), RobotError> {
        let chosen = passwd.unwrap_or_else(|| generate_password(rng));

        let form_page = self
            .panel
            .post(&format!("/server/admin/id/{}", self.server_number), &[])?;
        let token = extract_csrf_token(&form_page.body, CSRF_FIELD).ok_or_else(|| {
            RobotError::Scraping(String::from(
                "anti-forgery token not found in the admin account form",
            ))
        })?;

        let mut form = vec![
            (String::from("password[new_password]"), chosen.clone()),
            (String::from("password[new_password_repeat]"), chosen.clone()),
            (String::from(CSRF_FIELD), token),
        ];
        let (operation, path) = if self.exists {
            form.push((String::from("id"), self.server_number.to_string()));
            (
                "update admin account password",
                String::from("/server/adminUpdate"),
            )
        } else {
            (
                "create admin account",
                format!("/server/adminCreate/id/{}", self.server_number),
            )
        };

        info!(server_number = self.server_number, operation, "submitting admin account form");
        let response = self.panel.post(&path, &form)?;
        Self::ensure_success(&response.body, operation)?;

        self.update_info()?;
        self.passwd = Some(chosen.clone());
        let login = self.login.clone().ok_or_else(|| {
            RobotError::Scraping(String::from(
                "admin account not visible after a successful submission",
            ))
        })?;
        Ok((login, chosen))
    }

    /// Removes the admin account.
    ///
    /// A no-op when no account exists, without any panel request.
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::Credential`] when the panel does not confirm
    /// the removal and propagates transport failures.
    pub fn delete(&mut self) -> Result<(), RobotError> {
        if !self.exists {
            return Ok(());
        }
        info!(server_number = self.server_number, "deleting admin account");
        let response = self
            .panel
            .get(&format!("/server/adminDelete/id/{}", self.server_number))?;
        Self::ensure_success(&response.body, "delete admin account")?;
        self.update_info()
    }

    fn ensure_success(body: &str, operation: &str) -> Result<(), RobotError> {
        if body.contains(SUCCESS_MARKER) {
            return Ok(());
        }
        Err(RobotError::Credential {
            operation: operation.to_owned(),
            reasons: extract_error_list(body),
        })
    }
}
