//! Test support utilities shared across unit and integration tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serde_json::{Value, json};

use crate::conn::{Connection, FormData, HttpMethod};
use crate::error::RobotError;
use crate::rescue::BootObserver;
use crate::scraping::{PageResponse, PanelSession};

/// Scripted transport that returns pre-seeded replies in FIFO order.
///
/// Used to drive deterministic API outcomes without any network access.
#[derive(Clone, Debug, Default)]
pub struct ScriptedConnection {
    replies: Rc<RefCell<VecDeque<ScriptedReply>>>,
    invocations: Rc<RefCell<Vec<ApiInvocation>>>,
}

#[derive(Clone, Debug)]
enum ScriptedReply {
    Document(Value),
    Failure { status: u16, message: String },
}

/// Records a single request made through [`ScriptedConnection`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ApiInvocation {
    /// HTTP method of the request.
    pub method: HttpMethod,
    /// Path as passed to the transport.
    pub path: String,
    /// Form body, when one was supplied.
    pub body: Option<Vec<(String, String)>>,
}

impl ScriptedConnection {
    /// Creates a connection with no queued replies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful JSON document.
    pub fn push_document(&self, document: Value) {
        self.replies
            .borrow_mut()
            .push_back(ScriptedReply::Document(document));
    }

    /// Queues a transport failure with the given status.
    pub fn push_failure(&self, status: u16, message: &str) {
        self.replies.borrow_mut().push_back(ScriptedReply::Failure {
            status,
            message: message.to_owned(),
        });
    }

    /// Returns a snapshot of all requests recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<ApiInvocation> {
        self.invocations.borrow().clone()
    }

    /// Number of mutating (non-GET) requests recorded so far.
    #[must_use]
    pub fn mutation_count(&self) -> usize {
        self.invocations
            .borrow()
            .iter()
            .filter(|invocation| invocation.method != HttpMethod::Get)
            .count()
    }
}

impl Connection for ScriptedConnection {
    fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&FormData>,
    ) -> Result<Value, RobotError> {
        self.invocations.borrow_mut().push(ApiInvocation {
            method,
            path: path.to_owned(),
            body: body.map(<[(String, String)]>::to_vec),
        });
        match self.replies.borrow_mut().pop_front() {
            Some(ScriptedReply::Document(document)) => Ok(document),
            Some(ScriptedReply::Failure { status, message }) => {
                Err(RobotError::Transport { status, message })
            }
            None => Err(RobotError::Http(format!(
                "no scripted reply available for {method} {path}"
            ))),
        }
    }
}

/// Records a single page request made through [`ScriptedPanel`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PanelInvocation {
    /// `GET` or `POST`.
    pub method: HttpMethod,
    /// Requested path.
    pub path: String,
    /// Submitted form, when one was supplied.
    pub form: Option<Vec<(String, String)>>,
}

/// Scripted panel session returning pre-seeded pages in FIFO order.
#[derive(Clone, Debug, Default)]
pub struct ScriptedPanel {
    pages: Rc<RefCell<VecDeque<PageResponse>>>,
    invocations: Rc<RefCell<Vec<PanelInvocation>>>,
    logins: Rc<RefCell<u32>>,
}

impl ScriptedPanel {
    /// Creates a panel with no queued pages.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a rendered page with status 200.
    pub fn push_page(&self, body: &str) {
        self.push_page_with_status(200, body);
    }

    /// Queues a rendered page with an explicit status.
    pub fn push_page_with_status(&self, status: u16, body: &str) {
        self.pages.borrow_mut().push_back(PageResponse {
            status,
            body: body.to_owned(),
        });
    }

    /// Returns a snapshot of all page requests recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<PanelInvocation> {
        self.invocations.borrow().clone()
    }

    /// Number of times `login` was called.
    #[must_use]
    pub fn login_count(&self) -> u32 {
        *self.logins.borrow()
    }
}

impl PanelSession for ScriptedPanel {
    fn login(&self) -> Result<(), RobotError> {
        *self.logins.borrow_mut() += 1;
        Ok(())
    }

    fn get(&self, path: &str) -> Result<PageResponse, RobotError> {
        self.invocations.borrow_mut().push(PanelInvocation {
            method: HttpMethod::Get,
            path: path.to_owned(),
            form: None,
        });
        self.pages
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| RobotError::Http(format!("no scripted page available for GET {path}")))
    }

    fn post(&self, path: &str, form: &FormData) -> Result<PageResponse, RobotError> {
        self.invocations.borrow_mut().push(PanelInvocation {
            method: HttpMethod::Post,
            path: path.to_owned(),
            form: Some(form.to_vec()),
        });
        self.pages
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| RobotError::Http(format!("no scripted page available for POST {path}")))
    }
}

/// Reboot-and-observe double that records how often it was invoked.
#[derive(Clone, Debug, Default)]
pub struct ScriptedReboot {
    count: Rc<RefCell<u32>>,
}

impl ScriptedReboot {
    /// Creates a reboot double.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of observed reboot cycles performed.
    #[must_use]
    pub fn reboots(&self) -> u32 {
        *self.count.borrow()
    }
}

impl BootObserver for ScriptedReboot {
    fn observed_reboot(&self) -> Result<(), RobotError> {
        *self.count.borrow_mut() += 1;
        Ok(())
    }
}

/// Produces a minimal `{"ip": …}` document.
#[must_use]
pub fn ip_document(ip: &str, server_ip: &str) -> Value {
    json!({
        "ip": {
            "ip": ip,
            "server_ip": server_ip,
            "locked": false,
            "separate_mac": null,
            "traffic_warnings": false,
            "traffic_hourly": 50,
            "traffic_daily": 500,
            "traffic_monthly": 3,
        }
    })
}

/// Produces a minimal `{"subnet": …}` document.
#[must_use]
pub fn subnet_document(net_ip: &str, mask: u32, server_ip: &str) -> Value {
    json!({
        "subnet": {
            "ip": net_ip,
            "mask": mask,
            "gateway": server_ip,
            "server_ip": server_ip,
            "failover": false,
            "locked": false,
            "traffic_warnings": false,
            "traffic_hourly": 50,
            "traffic_daily": 500,
            "traffic_monthly": 3,
        }
    })
}

/// Produces a minimal `{"server": …}` document.
#[must_use]
pub fn server_document(
    server_ip: Option<&str>,
    server_ipv6_net: Option<&str>,
    number: u32,
    name: &str,
) -> Value {
    json!({
        "server": {
            "server_ip": server_ip,
            "server_ipv6_net": server_ipv6_net,
            "server_number": number,
            "server_name": name,
            "product": "EX42",
            "dc": "FSN1-DC8",
            "traffic": "unlimited",
            "status": "ready",
            "subnet": [{"ip": "10.0.0.0", "mask": "24"}],
            "cancelled": false,
            "paid_until": "2026-09-30",
            "linked_storagebox": null,
        }
    })
}

/// Produces a minimal `{"rescue": …}` document.
#[must_use]
pub fn rescue_document(active: bool, password: Option<&str>) -> Value {
    json!({
        "rescue": {
            "active": active,
            "password": password,
            "authorized_key": [],
        }
    })
}
