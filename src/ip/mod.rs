//! Single IP address resources and the per-server IP collection view.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::conn::{ConnectionRef, decode, nullable};
use crate::error::RobotError;

/// Fields of one `ip` document as returned by the structured API.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub(crate) struct IpData {
    pub ip: String,
    pub server_ip: String,
    pub locked: bool,
    #[serde(deserialize_with = "nullable")]
    pub separate_mac: Option<String>,
    pub traffic_warnings: bool,
    pub traffic_hourly: u64,
    pub traffic_daily: u64,
    pub traffic_monthly: u64,
}

/// Fields shared by every `subnet` document; used here when an address is
/// resolved as a member of a subnet rather than owned directly.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub(crate) struct SubnetData {
    pub ip: String,
    pub mask: u32,
    pub gateway: String,
    pub server_ip: String,
    pub failover: bool,
    pub locked: bool,
    pub traffic_warnings: bool,
    pub traffic_hourly: u64,
    pub traffic_daily: u64,
    pub traffic_monthly: u64,
}

/// Local mirror of one remote IP address.
///
/// When constructed from a subnet context the canonical network address is
/// kept separately from the member address being represented: refresh
/// re-fetches by network address while the object keeps exposing the
/// member's own fields.
#[derive(Clone, Debug)]
pub struct IpAddress {
    conn: ConnectionRef,
    /// Canonical network address used for refresh when this object
    /// represents a subnet member.
    subnet_net_ip: Option<String>,
    /// The address this object represents.
    pub ip: String,
    /// Primary IP of the owning server.
    pub server_ip: String,
    /// Whether the address is administratively locked.
    pub locked: bool,
    /// Separate MAC address, absent for subnet members.
    pub separate_mac: Option<String>,
    /// Whether traffic warnings are enabled.
    pub traffic_warnings: bool,
    /// Hourly traffic warning threshold in MB.
    pub traffic_hourly: u64,
    /// Daily traffic warning threshold in MB.
    pub traffic_daily: u64,
    /// Monthly traffic warning threshold in GB.
    pub traffic_monthly: u64,
}

impl IpAddress {
    /// Wraps an `{"ip": …}` document fetched by a manager.
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::MalformedResponse`] when the document lacks the
    /// envelope or a field.
    pub(crate) fn from_document(conn: ConnectionRef, document: &Value) -> Result<Self, RobotError> {
        let data: IpData = decode(document, "ip")?;
        Ok(Self {
            conn,
            subnet_net_ip: None,
            ip: data.ip,
            server_ip: data.server_ip,
            locked: data.locked,
            separate_mac: data.separate_mac,
            traffic_warnings: data.traffic_warnings,
            traffic_hourly: data.traffic_hourly,
            traffic_daily: data.traffic_daily,
            traffic_monthly: data.traffic_monthly,
        })
    }

    /// Wraps a `{"subnet": …}` document as the member address `member_ip`.
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::MalformedResponse`] when the document lacks the
    /// envelope or a field.
    pub(crate) fn subnet_member(
        conn: ConnectionRef,
        document: &Value,
        member_ip: &str,
    ) -> Result<Self, RobotError> {
        let data: SubnetData = decode(document, "subnet")?;
        Ok(Self {
            conn,
            subnet_net_ip: Some(data.ip),
            ip: member_ip.to_owned(),
            server_ip: data.server_ip,
            locked: data.locked,
            separate_mac: None,
            traffic_warnings: data.traffic_warnings,
            traffic_hourly: data.traffic_hourly,
            traffic_daily: data.traffic_daily,
            traffic_monthly: data.traffic_monthly,
        })
    }

    /// Refreshes the cached fields.
    ///
    /// With `document` supplied (for example the response of a mutating
    /// call) no network request is made; otherwise exactly one fetch against
    /// the canonical path occurs. Subnet members refresh by their subnet's
    /// network address and keep exposing the member address.
    ///
    /// # Errors
    ///
    /// Propagates transport errors and raises
    /// [`RobotError::MalformedResponse`] on missing fields.
    pub fn update_info(&mut self, document: Option<&Value>) -> Result<(), RobotError> {
        match self.subnet_net_ip.clone() {
            Some(net_ip) => {
                let fetched;
                let doc = match document {
                    Some(given) => given,
                    None => {
                        fetched = self.conn.get(&format!("/subnet/{net_ip}"))?;
                        &fetched
                    }
                };
                let data: SubnetData = decode(doc, "subnet")?;
                self.subnet_net_ip = Some(data.ip);
                self.server_ip = data.server_ip;
                self.locked = data.locked;
                self.separate_mac = None;
                self.traffic_warnings = data.traffic_warnings;
                self.traffic_hourly = data.traffic_hourly;
                self.traffic_daily = data.traffic_daily;
                self.traffic_monthly = data.traffic_monthly;
            }
            None => {
                let fetched;
                let doc = match document {
                    Some(given) => given,
                    None => {
                        fetched = self.conn.get(&format!("/ip/{}", self.ip))?;
                        &fetched
                    }
                };
                let data: IpData = decode(doc, "ip")?;
                self.ip = data.ip;
                self.server_ip = data.server_ip;
                self.locked = data.locked;
                self.separate_mac = data.separate_mac;
                self.traffic_warnings = data.traffic_warnings;
                self.traffic_hourly = data.traffic_hourly;
                self.traffic_daily = data.traffic_daily;
                self.traffic_monthly = data.traffic_monthly;
            }
        }
        Ok(())
    }

    /// Returns the canonical network address when this object represents a
    /// subnet member.
    #[must_use]
    pub fn subnet_net_ip(&self) -> Option<&str> {
        self.subnet_net_ip.as_deref()
    }
}

/// Collection view over a server's IP addresses.
#[derive(Clone, Debug)]
pub struct IpManager {
    conn: ConnectionRef,
    main_ip: Option<String>,
    server_number: u32,
}

impl IpManager {
    pub(crate) const fn new(conn: ConnectionRef, main_ip: Option<String>, server_number: u32) -> Self {
        Self {
            conn,
            main_ip,
            server_number,
        }
    }

    /// Fetches one IP address directly by its textual form.
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::NotFound`] when the address does not exist and
    /// propagates every other transport error.
    pub fn get(&self, ip: &str) -> Result<IpAddress, RobotError> {
        let document = self
            .conn
            .get(&format!("/ip/{ip}"))
            .map_err(|err| not_found_as(err, format!("ip {ip}")))?;
        IpAddress::from_document(self.conn.clone(), &document)
    }

    /// Lists every IP address of the owning server.
    ///
    /// A provider 404 on the collection endpoint is the documented "no
    /// addresses" signal and yields an empty list, exactly like an explicit
    /// empty array; any other error propagates unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::MissingPrimaryIp`] when the server has no
    /// resolved primary IP and propagates non-404 transport errors.
    pub fn list(&self) -> Result<Vec<IpAddress>, RobotError> {
        let main_ip = self
            .main_ip
            .as_ref()
            .ok_or(RobotError::MissingPrimaryIp {
                server_number: self.server_number,
            })?;
        let entries = match self.conn.get(&format!("/ip?server_ip={main_ip}")) {
            Ok(document) => collection_entries(&document, "ip")?,
            Err(err) if err.is_not_found() => Vec::new(),
            Err(err) => return Err(err),
        };
        debug!(count = entries.len(), server_ip = %main_ip, "listed IP addresses");
        entries
            .iter()
            .map(|entry| IpAddress::from_document(self.conn.clone(), entry))
            .collect()
    }
}

/// Extracts the entries of a collection response, which the provider renders
/// as a JSON array of enveloped documents.
pub(crate) fn collection_entries(
    document: &Value,
    entity: &'static str,
) -> Result<Vec<Value>, RobotError> {
    document
        .as_array()
        .cloned()
        .ok_or_else(|| RobotError::MalformedResponse {
            entity,
            message: String::from("collection response is not an array"),
        })
}

/// Rewrites a 404-equivalent transport error into [`RobotError::NotFound`].
pub(crate) fn not_found_as(err: RobotError, resource: String) -> RobotError {
    if err.is_not_found() {
        RobotError::NotFound { resource }
    } else {
        err
    }
}

#[cfg(test)]
mod tests;
