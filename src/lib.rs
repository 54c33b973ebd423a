//! Client library for a dedicated-server hosting account.
//!
//! The crate mirrors remote entities — servers, IP addresses, subnets, the
//! rescue boot status, and the web-panel admin account — as lazily cached
//! local resource objects. Each resource refreshes through `update_info`:
//! either by one fetch against its canonical path or by adopting the
//! response of a mutating call, so cached state never silently diverges
//! from the server side. Where the provider has no structured API the admin
//! account workflow drives the rendered control panel through a scraping
//! session instead.

pub mod addr;
pub mod admin;
pub mod askpass;
pub mod config;
pub mod conn;
pub mod error;
pub mod ip;
pub mod rescue;
pub mod robot;
pub mod scraping;
pub mod server;
pub mod subnet;
pub mod test_support;

pub use addr::{AddrError, AddressRange};
pub use admin::AdminAccount;
pub use askpass::AskPassHelper;
pub use config::{ConfigError, RobotConfig};
pub use conn::{Connection, ConnectionRef, HttpMethod, RobotConnection};
pub use error::RobotError;
pub use ip::{IpAddress, IpManager};
pub use rescue::{BootObserver, RescueOptions, RescueStatus, RescueSystem};
pub use robot::Robot;
pub use scraping::{PageResponse, PanelSession, PanelSessionRef, RobotPanel};
pub use server::Server;
pub use subnet::{Subnet, SubnetManager};
