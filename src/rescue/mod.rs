//! Rescue boot mode state machine.
//!
//! The machine has three states: not yet observed, active, and inactive.
//! Activation and the reboot-and-wait cycle are deliberately separate
//! primitives so each is independently testable and retryable; the
//! `observed_*` operations compose them into "flip boot mode, then block
//! until the machine is confirmed back online in that mode".

use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::conn::{ConnectionRef, decode, nullable};
use crate::error::RobotError;

/// Externally supplied reboot-and-observe primitive.
///
/// Blocks until the machine is confirmed rebooted into its current boot
/// mode. Retries and timeouts, if any, live behind this boundary; the
/// rescue machine itself never retries.
pub trait BootObserver {
    /// Reboots the server and blocks until it is reachable again.
    ///
    /// # Errors
    ///
    /// Implementations surface their own transport or timeout failures as
    /// [`RobotError`] values.
    fn observed_reboot(&self) -> Result<(), RobotError>;
}

/// One atomic rescue status document.
///
/// The provider returns all three fields together; they are only ever
/// populated as a unit, never independently.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct RescueStatus {
    /// Whether the rescue system is armed for the next boot.
    pub active: bool,
    /// Rescue password, only present after an activation. The key itself is
    /// mandatory; a document without it is malformed.
    #[serde(deserialize_with = "nullable")]
    pub password: Option<String>,
    /// Key descriptors authorized for the rescue system.
    #[serde(rename = "authorized_key")]
    pub authorized_keys: Vec<Value>,
}

/// Parameters for a rescue activation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RescueOptions {
    /// Rescue operating system, `linux` by default.
    pub os: String,
    /// Architecture bits, 64 by default.
    pub arch: u32,
    /// Fingerprints of keys already known to the provider that should be
    /// authorized in the rescue system.
    pub authorized_keys: Option<Vec<String>>,
}

impl Default for RescueOptions {
    fn default() -> Self {
        Self {
            os: String::from("linux"),
            arch: 64,
            authorized_keys: None,
        }
    }
}

/// Boot mode state machine for one server.
#[derive(Clone, Debug)]
pub struct RescueSystem {
    conn: ConnectionRef,
    server_number: u32,
    status: Option<RescueStatus>,
}

impl RescueSystem {
    pub(crate) const fn new(conn: ConnectionRef, server_number: u32) -> Self {
        Self {
            conn,
            server_number,
            status: None,
        }
    }

    fn path(&self) -> String {
        format!("/boot/{}/rescue", self.server_number)
    }

    fn adopt(&mut self, document: &Value) -> Result<(), RobotError> {
        self.status = Some(decode(document, "rescue")?);
        Ok(())
    }

    /// Returns the cached status, fetching it once when not yet observed.
    ///
    /// All three status fields are populated together from one fetch; the
    /// unobserved state is distinct from "fetched and inactive".
    ///
    /// # Errors
    ///
    /// Propagates transport and decoding failures.
    pub fn status(&mut self) -> Result<&RescueStatus, RobotError> {
        let status = match self.status.take() {
            Some(existing) => existing,
            None => {
                let document = self.conn.get(&self.path())?;
                decode(&document, "rescue")?
            }
        };
        Ok(self.status.insert(status))
    }

    /// Whether the rescue system is currently armed.
    ///
    /// # Errors
    ///
    /// See [`RescueSystem::status`].
    pub fn active(&mut self) -> Result<bool, RobotError> {
        Ok(self.status()?.active)
    }

    /// Rescue password, known only after an activation.
    ///
    /// # Errors
    ///
    /// See [`RescueSystem::status`].
    pub fn password(&mut self) -> Result<Option<String>, RobotError> {
        Ok(self.status()?.password.clone())
    }

    /// Keys authorized for the rescue system.
    ///
    /// # Errors
    ///
    /// See [`RescueSystem::status`].
    pub fn authorized_keys(&mut self) -> Result<Vec<Value>, RobotError> {
        Ok(self.status()?.authorized_keys.clone())
    }

    /// Arms the rescue system for the next boot.
    ///
    /// A no-op when already active, without any mutating request. On
    /// activation the response document is adopted atomically as the new
    /// status; the password and authorized keys become known only through
    /// this adoption.
    ///
    /// # Errors
    ///
    /// Propagates transport and decoding failures.
    pub fn activate(&mut self, options: &RescueOptions) -> Result<(), RobotError> {
        if self.active()? {
            return Ok(());
        }
        let mut form = vec![
            (String::from("os"), options.os.clone()),
            (String::from("arch"), options.arch.to_string()),
        ];
        if let Some(keys) = &options.authorized_keys {
            for key in keys {
                form.push((String::from("authorized_key[]"), key.clone()));
            }
        }
        info!(server_number = self.server_number, os = %options.os, "activating rescue system");
        let reply = self.conn.post(&self.path(), &form)?;
        self.adopt(&reply)
    }

    /// Disarms the rescue system.
    ///
    /// A no-op when already inactive, without any mutating request.
    ///
    /// # Errors
    ///
    /// Propagates transport and decoding failures.
    pub fn deactivate(&mut self) -> Result<(), RobotError> {
        if !self.active()? {
            return Ok(());
        }
        info!(server_number = self.server_number, "deactivating rescue system");
        let reply = self.conn.delete(&self.path())?;
        self.adopt(&reply)
    }

    /// Arms the rescue system and reboots into it, blocking until the
    /// machine is confirmed back online.
    ///
    /// # Errors
    ///
    /// Propagates activation failures and any error from the reboot
    /// primitive.
    pub fn observed_activate(
        &mut self,
        reboot: &dyn BootObserver,
        options: &RescueOptions,
    ) -> Result<(), RobotError> {
        self.activate(options)?;
        reboot.observed_reboot()
    }

    /// Disarms the rescue system and reboots into the normal system,
    /// blocking until the machine is confirmed back online.
    ///
    /// # Errors
    ///
    /// Propagates deactivation failures and any error from the reboot
    /// primitive.
    pub fn observed_deactivate(&mut self, reboot: &dyn BootObserver) -> Result<(), RobotError> {
        self.deactivate()?;
        reboot.observed_reboot()
    }
}
