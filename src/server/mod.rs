//! Server aggregate: one handle per physical machine.
//!
//! A [`Server`] resolves its identity once per refresh and threads the
//! shared transport and panel collaborators through its sub-components. The
//! sub-components hold the transport directly, never the server, so each can
//! refresh on its own.

use std::process::Command;

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::admin::AdminAccount;
use crate::askpass::AskPassHelper;
use crate::conn::{ConnectionRef, decode, nullable};
use crate::error::RobotError;
use crate::ip::IpManager;
use crate::rescue::{BootObserver, RescueOptions, RescueSystem};
use crate::scraping::PanelSessionRef;
use crate::subnet::SubnetManager;

#[derive(Clone, Debug, Deserialize)]
struct ServerData {
    // Nullable keys must still be present; an absent key is a protocol
    // error, not an implicit null.
    #[serde(deserialize_with = "nullable")]
    server_ip: Option<String>,
    #[serde(deserialize_with = "nullable")]
    server_ipv6_net: Option<String>,
    server_number: u32,
    server_name: String,
    product: String,
    dc: String,
    traffic: String,
    status: String,
    #[serde(deserialize_with = "nullable")]
    subnet: Option<Vec<Value>>,
    cancelled: bool,
    paid_until: NaiveDate,
    #[serde(deserialize_with = "nullable")]
    linked_storagebox: Option<u64>,
}

impl ServerData {
    /// Resolves the primary identity: `server_ip` takes precedence, then the
    /// IPv6 network with the conventional `…2` host appended; with neither
    /// present the identity stays undefined and dependent operations fail
    /// explicitly instead of using a stale value.
    fn resolve_ip(&self) -> Option<String> {
        self.server_ip
            .clone()
            .filter(|ip| !ip.is_empty())
            .or_else(|| {
                self.server_ipv6_net
                    .clone()
                    .filter(|net| !net.is_empty())
                    .map(|net| format!("{net}2"))
            })
    }
}

/// Local mirror of one dedicated server.
#[derive(Clone, Debug)]
pub struct Server {
    conn: ConnectionRef,
    panel: PanelSessionRef,
    /// Resolved primary IP; `None` when the provider reports neither an
    /// IPv4 address nor an IPv6 network.
    pub ip: Option<String>,
    /// Numeric server identifier.
    pub number: u32,
    /// Display name.
    pub name: String,
    /// Product name, e.g. `EX42`.
    pub product: String,
    /// Datacenter label.
    pub datacenter: String,
    /// Traffic quota description.
    pub traffic: String,
    /// Provisioning status reported by the provider.
    pub status: String,
    /// Raw subnet descriptors from the server document.
    pub subnets: Vec<Value>,
    /// Whether the server has been cancelled.
    pub cancelled: bool,
    /// Paid-until date.
    pub paid_until: NaiveDate,
    /// Linked storagebox identifier, when any.
    pub linked_storagebox: Option<u64>,
    /// Boot mode state machine for this server.
    pub rescue: RescueSystem,
    /// Collection view over the server's IP addresses.
    pub ips: IpManager,
    /// Collection view over the server's subnets.
    pub subnet_manager: SubnetManager,
    admin: Option<AdminAccount>,
}

impl Server {
    /// Wraps a `{"server": …}` document into a full server handle.
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::MalformedResponse`] when the document lacks the
    /// envelope or a field.
    pub fn from_document(
        conn: ConnectionRef,
        panel: PanelSessionRef,
        document: &Value,
    ) -> Result<Self, RobotError> {
        let data: ServerData = decode(document, "server")?;
        let ip = data.resolve_ip();
        let rescue = RescueSystem::new(conn.clone(), data.server_number);
        let ips = IpManager::new(conn.clone(), ip.clone(), data.server_number);
        let subnet_manager = SubnetManager::new(conn.clone(), ip.clone(), data.server_number);
        let mut server = Self {
            conn,
            panel,
            ip,
            number: data.server_number,
            name: String::new(),
            product: String::new(),
            datacenter: String::new(),
            traffic: String::new(),
            status: String::new(),
            subnets: Vec::new(),
            cancelled: false,
            paid_until: data.paid_until,
            linked_storagebox: None,
            rescue,
            ips,
            subnet_manager,
            admin: None,
        };
        server.apply(data);
        Ok(server)
    }

    fn apply(&mut self, data: ServerData) {
        self.ip = data.resolve_ip();
        self.number = data.server_number;
        self.name = data.server_name;
        self.product = data.product;
        self.datacenter = data.dc;
        self.traffic = data.traffic;
        self.status = data.status;
        self.subnets = data.subnet.unwrap_or_default();
        self.cancelled = data.cancelled;
        self.paid_until = data.paid_until;
        self.linked_storagebox = data.linked_storagebox;
        self.ips = IpManager::new(self.conn.clone(), self.ip.clone(), self.number);
        self.subnet_manager = SubnetManager::new(self.conn.clone(), self.ip.clone(), self.number);
    }

    /// Refreshes the cached fields.
    ///
    /// With `document` supplied (for example the response of a mutating
    /// call) no network request is made; otherwise exactly one fetch
    /// against `/server/{ip}` occurs.
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::MissingPrimaryIp`] when a fetch is needed but
    /// the identity is unresolved; propagates transport and decoding
    /// failures.
    pub fn update_info(&mut self, document: Option<&Value>) -> Result<(), RobotError> {
        let fetched;
        let doc = match document {
            Some(given) => given,
            None => {
                let ip = self.ip.as_ref().ok_or(RobotError::MissingPrimaryIp {
                    server_number: self.number,
                })?;
                fetched = self.conn.get(&format!("/server/{ip}"))?;
                &fetched
            }
        };
        let data: ServerData = decode(doc, "server")?;
        self.apply(data);
        Ok(())
    }

    /// Renames the server, adopting the provider's response as the new
    /// local state rather than assuming the submitted value took effect
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::MissingPrimaryIp`] when the identity is
    /// unresolved; propagates transport and decoding failures.
    pub fn set_name(&mut self, name: &str) -> Result<(), RobotError> {
        let ip = self.ip.clone().ok_or(RobotError::MissingPrimaryIp {
            server_number: self.number,
        })?;
        info!(server_number = self.number, name, "renaming server");
        let reply = self.conn.post(
            &format!("/server/{ip}"),
            &[(String::from("server_name"), name.to_owned())],
        )?;
        self.update_info(Some(&reply))
    }

    /// Returns the admin account mirror, running the discovery scrape on
    /// first access.
    ///
    /// # Errors
    ///
    /// Propagates panel login and scraping failures from the discovery.
    pub fn admin(&mut self) -> Result<&mut AdminAccount, RobotError> {
        let account = match self.admin.take() {
            Some(existing) => existing,
            None => AdminAccount::new(self.panel.clone(), self.number)?,
        };
        Ok(self.admin.insert(account))
    }

    /// Reboots into the rescue system, spawns an interactive SSH shell, and
    /// reboots back into the normal system when the shell exits.
    ///
    /// Blocks for two full reboot-and-verify cycles plus the shell session.
    ///
    /// # Errors
    ///
    /// Propagates rescue and reboot failures; returns
    /// [`RobotError::CommandFailure`] when the SSH session exits
    /// unsuccessfully, in which case the machine is left in rescue mode.
    pub fn rescue_shell(&mut self, reboot: &dyn BootObserver) -> Result<(), RobotError> {
        let ip = self.ip.clone().ok_or(RobotError::MissingPrimaryIp {
            server_number: self.number,
        })?;
        self.rescue
            .observed_activate(reboot, &RescueOptions::default())?;
        let passwd = self.rescue.password()?.ok_or_else(|| {
            RobotError::Scraping(String::from("no rescue password available after activation"))
        })?;

        let askpass = AskPassHelper::new(&passwd)?;
        let mut command = Command::new("ssh");
        for option in [
            "CheckHostIP=no",
            "GlobalKnownHostsFile=/dev/null",
            "UserKnownHostsFile=/dev/null",
            "StrictHostKeyChecking=no",
            "LogLevel=quiet",
        ] {
            command.arg("-o").arg(option);
        }
        let status = command
            .arg(format!("root@{ip}"))
            .env("DISPLAY", ":666")
            .env("SSH_ASKPASS", askpass.path())
            .env("SSH_ASKPASS_REQUIRE", "force")
            .status()?;
        drop(askpass);
        if !status.success() {
            return Err(RobotError::CommandFailure {
                program: String::from("ssh"),
                status: status.code(),
            });
        }

        self.rescue.observed_deactivate(reboot)
    }
}
