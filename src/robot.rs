//! Entry point wiring the shared transport and panel session.

use std::rc::Rc;

use crate::config::RobotConfig;
use crate::conn::{ConnectionRef, RobotConnection};
use crate::error::RobotError;
use crate::ip::{collection_entries, not_found_as};
use crate::scraping::{PanelSessionRef, RobotPanel};
use crate::server::Server;

/// Handle to one robot account.
///
/// Owns the shared transport and panel collaborators and hands them to
/// every [`Server`] it produces.
pub struct Robot {
    conn: ConnectionRef,
    panel: PanelSessionRef,
}

impl Robot {
    /// Builds a handle from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::Config`] when validation fails and
    /// [`RobotError::Http`] when an HTTP client cannot be constructed.
    pub fn new(config: &RobotConfig) -> Result<Self, RobotError> {
        config.validate()?;
        Ok(Self {
            conn: Rc::new(RobotConnection::new(config)?),
            panel: Rc::new(RobotPanel::new(config)?),
        })
    }

    /// Builds a handle from explicit collaborators; the seam used by tests.
    #[must_use]
    pub const fn from_parts(conn: ConnectionRef, panel: PanelSessionRef) -> Self {
        Self { conn, panel }
    }

    /// Fetches one server by its primary IP.
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::NotFound`] when no server owns `ip` and
    /// propagates every other failure.
    pub fn server(&self, ip: &str) -> Result<Server, RobotError> {
        let document = self
            .conn
            .get(&format!("/server/{ip}"))
            .map_err(|err| not_found_as(err, format!("server {ip}")))?;
        Server::from_document(self.conn.clone(), self.panel.clone(), &document)
    }

    /// Lists every server of the account.
    ///
    /// An account without servers is an empty list, whether the provider
    /// answers with an empty array or its 404-style "no resources" quirk.
    ///
    /// # Errors
    ///
    /// Propagates non-404 transport errors.
    pub fn servers(&self) -> Result<Vec<Server>, RobotError> {
        let entries = match self.conn.get("/server") {
            Ok(document) => collection_entries(&document, "server")?,
            Err(err) if err.is_not_found() => Vec::new(),
            Err(err) => return Err(err),
        };
        entries
            .iter()
            .map(|entry| Server::from_document(self.conn.clone(), self.panel.clone(), entry))
            .collect()
    }
}
