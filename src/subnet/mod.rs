//! Subnet resources and the per-server subnet collection view.

use serde_json::Value;
use tracing::debug;

use crate::addr::{AddrError, AddressRange};
use crate::conn::{ConnectionRef, decode};
use crate::error::RobotError;
use crate::ip::{IpAddress, SubnetData, collection_entries, not_found_as};

/// Local mirror of one remote subnet.
///
/// The derived [`AddressRange`] is recomputed wholesale from
/// `net_ip`/`mask` on every refresh and never patched independently of the
/// textual fields, so the numeric view cannot drift from the provider's.
#[derive(Clone, Debug)]
pub struct Subnet {
    conn: ConnectionRef,
    /// Network address of the subnet.
    pub net_ip: String,
    /// Prefix length.
    pub mask: u32,
    /// Gateway address.
    pub gateway: String,
    /// Primary IP of the owning server.
    pub server_ip: String,
    /// Whether this is a failover subnet.
    pub failover: bool,
    /// Whether the subnet is administratively locked.
    pub locked: bool,
    /// Whether traffic warnings are enabled.
    pub traffic_warnings: bool,
    /// Hourly traffic warning threshold in MB.
    pub traffic_hourly: u64,
    /// Daily traffic warning threshold in MB.
    pub traffic_daily: u64,
    /// Monthly traffic warning threshold in GB.
    pub traffic_monthly: u64,
    /// Numeric range covered by `net_ip`/`mask`.
    pub range: AddressRange,
}

impl Subnet {
    /// Wraps a `{"subnet": …}` document fetched by a manager.
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::MalformedResponse`] on a missing envelope or
    /// field and an address error when the network text does not parse.
    pub(crate) fn from_document(conn: ConnectionRef, document: &Value) -> Result<Self, RobotError> {
        let data: SubnetData = decode(document, "subnet")?;
        let range = AddressRange::new(&data.ip, data.mask)?;
        Ok(Self {
            conn,
            net_ip: data.ip,
            mask: data.mask,
            gateway: data.gateway,
            server_ip: data.server_ip,
            failover: data.failover,
            locked: data.locked,
            traffic_warnings: data.traffic_warnings,
            traffic_hourly: data.traffic_hourly,
            traffic_daily: data.traffic_daily,
            traffic_monthly: data.traffic_monthly,
            range,
        })
    }

    /// Refreshes the cached fields, recomputing the derived range.
    ///
    /// With `document` supplied no network request is made; otherwise
    /// exactly one fetch against `/subnet/{net_ip}` occurs.
    ///
    /// # Errors
    ///
    /// Propagates transport, decoding, and address parsing failures.
    pub fn update_info(&mut self, document: Option<&Value>) -> Result<(), RobotError> {
        let fetched;
        let doc = match document {
            Some(given) => given,
            None => {
                fetched = self.conn.get(&format!("/subnet/{}", self.net_ip))?;
                &fetched
            }
        };
        let data: SubnetData = decode(doc, "subnet")?;
        self.range = AddressRange::new(&data.ip, data.mask)?;
        self.net_ip = data.ip;
        self.mask = data.mask;
        self.gateway = data.gateway;
        self.server_ip = data.server_ip;
        self.failover = data.failover;
        self.locked = data.locked;
        self.traffic_warnings = data.traffic_warnings;
        self.traffic_hourly = data.traffic_hourly;
        self.traffic_daily = data.traffic_daily;
        self.traffic_monthly = data.traffic_monthly;
        Ok(())
    }

    /// Returns the smallest and biggest textual address of the subnet.
    #[must_use]
    pub fn ip_range(&self) -> (String, String) {
        (self.range.low_address(), self.range.high_address())
    }

    /// Returns whether `address` falls inside the subnet.
    ///
    /// # Errors
    ///
    /// Returns an [`AddrError`] when `address` is malformed or of the wrong
    /// family.
    pub fn contains(&self, address: &str) -> Result<bool, AddrError> {
        self.range.contains(address)
    }

    /// Resolves a member address of the subnet into an [`IpAddress`].
    ///
    /// Returns `Ok(None)` when the address lies outside the subnet. The
    /// member object refreshes by the subnet's canonical network address
    /// while exposing the member's own address.
    ///
    /// # Errors
    ///
    /// Propagates address parsing and transport failures.
    pub fn get_ip(&self, address: &str) -> Result<Option<IpAddress>, RobotError> {
        if !self.contains(address)? {
            return Ok(None);
        }
        let document = self.conn.get(&format!("/subnet/{}", self.net_ip))?;
        IpAddress::subnet_member(self.conn.clone(), &document, address).map(Some)
    }
}

/// Collection view over a server's subnets.
#[derive(Clone, Debug)]
pub struct SubnetManager {
    conn: ConnectionRef,
    main_ip: Option<String>,
    server_number: u32,
}

impl SubnetManager {
    pub(crate) const fn new(
        conn: ConnectionRef,
        main_ip: Option<String>,
        server_number: u32,
    ) -> Self {
        Self {
            conn,
            main_ip,
            server_number,
        }
    }

    /// Fetches one subnet directly by its network address.
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::NotFound`] when the subnet does not exist and
    /// propagates every other transport error.
    pub fn get(&self, net_ip: &str) -> Result<Subnet, RobotError> {
        let document = self
            .conn
            .get(&format!("/subnet/{net_ip}"))
            .map_err(|err| not_found_as(err, format!("subnet {net_ip}")))?;
        Subnet::from_document(self.conn.clone(), &document)
    }

    /// Lists every subnet of the owning server.
    ///
    /// The provider signals "no subnets" with a 404 rather than an empty
    /// list; both are normalized to an empty result here so call sites never
    /// have to care. Any other error propagates unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::MissingPrimaryIp`] when the server has no
    /// resolved primary IP and propagates non-404 transport errors.
    pub fn list(&self) -> Result<Vec<Subnet>, RobotError> {
        let main_ip = self
            .main_ip
            .as_ref()
            .ok_or(RobotError::MissingPrimaryIp {
                server_number: self.server_number,
            })?;
        let entries = match self.conn.get(&format!("/subnet?server_ip={main_ip}")) {
            Ok(document) => collection_entries(&document, "subnet")?,
            Err(err) if err.is_not_found() => Vec::new(),
            Err(err) => return Err(err),
        };
        debug!(count = entries.len(), server_ip = %main_ip, "listed subnets");
        entries
            .iter()
            .map(|entry| Subnet::from_document(self.conn.clone(), entry))
            .collect()
    }
}
