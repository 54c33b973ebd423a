//! Unit tests for IP resources and their manager.

use std::rc::Rc;

use rstest::{fixture, rstest};
use serde_json::json;

use super::{IpAddress, IpManager};
use crate::conn::{ConnectionRef, HttpMethod};
use crate::error::RobotError;
use crate::test_support::{ScriptedConnection, ip_document, subnet_document};

#[fixture]
fn scripted() -> ScriptedConnection {
    ScriptedConnection::new()
}

fn manager(scripted: &ScriptedConnection, main_ip: Option<&str>) -> IpManager {
    let conn: ConnectionRef = Rc::new(scripted.clone());
    IpManager::new(conn, main_ip.map(str::to_owned), 42)
}

#[rstest]
fn get_wraps_the_fetched_document(scripted: ScriptedConnection) {
    scripted.push_document(ip_document("5.6.7.8", "1.2.3.4"));
    let ip = manager(&scripted, Some("1.2.3.4"))
        .get("5.6.7.8")
        .expect("scripted document");
    assert_eq!(ip.ip, "5.6.7.8");
    assert_eq!(ip.server_ip, "1.2.3.4");
    assert_eq!(
        scripted.invocations().first().map(|i| i.path.clone()),
        Some(String::from("/ip/5.6.7.8"))
    );
}

#[rstest]
fn get_maps_404_to_not_found(scripted: ScriptedConnection) {
    scripted.push_failure(404, "IP_NOT_FOUND");
    let err = manager(&scripted, Some("1.2.3.4"))
        .get("9.9.9.9")
        .expect_err("missing address");
    assert!(matches!(err, RobotError::NotFound { .. }));
}

#[rstest]
fn list_normalizes_404_to_an_empty_collection(scripted: ScriptedConnection) {
    scripted.push_failure(404, "IP_NOT_FOUND");
    let ips = manager(&scripted, Some("1.2.3.4"))
        .list()
        .expect("404 means no addresses");
    assert!(ips.is_empty());
}

#[rstest]
fn list_accepts_an_explicit_empty_collection(scripted: ScriptedConnection) {
    scripted.push_document(json!([]));
    let ips = manager(&scripted, Some("1.2.3.4"))
        .list()
        .expect("empty list is fine");
    assert!(ips.is_empty());
}

#[rstest]
fn list_propagates_other_transport_errors(scripted: ScriptedConnection) {
    scripted.push_failure(503, "overloaded");
    let err = manager(&scripted, Some("1.2.3.4"))
        .list()
        .expect_err("503 must surface");
    assert!(matches!(err, RobotError::Transport { status: 503, .. }));
}

#[rstest]
fn list_requires_a_resolved_primary_ip(scripted: ScriptedConnection) {
    let err = manager(&scripted, None).list().expect_err("no primary ip");
    assert!(matches!(
        err,
        RobotError::MissingPrimaryIp { server_number: 42 }
    ));
    assert!(scripted.invocations().is_empty(), "must fail before any fetch");
}

#[rstest]
fn list_wraps_every_entry(scripted: ScriptedConnection) {
    scripted.push_document(json!([
        ip_document("5.6.7.8", "1.2.3.4"),
        ip_document("5.6.7.9", "1.2.3.4"),
    ]));
    let ips = manager(&scripted, Some("1.2.3.4"))
        .list()
        .expect("two entries");
    let addrs: Vec<&str> = ips.iter().map(|ip| ip.ip.as_str()).collect();
    assert_eq!(addrs, vec!["5.6.7.8", "5.6.7.9"]);
}

#[rstest]
fn update_info_with_document_avoids_any_fetch(scripted: ScriptedConnection) {
    scripted.push_document(ip_document("5.6.7.8", "1.2.3.4"));
    let mut ip = manager(&scripted, Some("1.2.3.4"))
        .get("5.6.7.8")
        .expect("scripted document");
    let before = scripted.invocations().len();

    let mut patched = ip_document("5.6.7.8", "1.2.3.4");
    patched["ip"]["locked"] = json!(true);
    ip.update_info(Some(&patched)).expect("document supplied");

    assert!(ip.locked);
    assert_eq!(scripted.invocations().len(), before);
}

#[rstest]
fn update_info_without_document_fetches_exactly_once(scripted: ScriptedConnection) {
    scripted.push_document(ip_document("5.6.7.8", "1.2.3.4"));
    scripted.push_document(ip_document("5.6.7.8", "1.2.3.4"));
    let mut ip = manager(&scripted, Some("1.2.3.4"))
        .get("5.6.7.8")
        .expect("scripted document");
    let before = scripted.invocations().len();
    ip.update_info(None).expect("scripted refresh");
    assert_eq!(scripted.invocations().len(), before + 1);
}

#[rstest]
fn refresh_yields_the_same_fields_as_adopting_the_document(scripted: ScriptedConnection) {
    let document = ip_document("5.6.7.8", "1.2.3.4");
    scripted.push_document(document.clone());
    scripted.push_document(document.clone());
    let conn: ConnectionRef = Rc::new(scripted.clone());

    let mut fetched = IpAddress::from_document(conn.clone(), &document).expect("valid document");
    fetched.update_info(None).expect("scripted refresh");
    let mut adopted = IpAddress::from_document(conn, &document).expect("valid document");
    adopted.update_info(Some(&document)).expect("document supplied");

    assert_eq!(fetched.ip, adopted.ip);
    assert_eq!(fetched.server_ip, adopted.server_ip);
    assert_eq!(fetched.locked, adopted.locked);
    assert_eq!(fetched.separate_mac, adopted.separate_mac);
    assert_eq!(fetched.traffic_warnings, adopted.traffic_warnings);
    assert_eq!(fetched.traffic_hourly, adopted.traffic_hourly);
    assert_eq!(fetched.traffic_daily, adopted.traffic_daily);
    assert_eq!(fetched.traffic_monthly, adopted.traffic_monthly);
}

#[rstest]
fn subnet_member_refreshes_by_network_address(scripted: ScriptedConnection) {
    let conn: ConnectionRef = Rc::new(scripted.clone());
    let document = subnet_document("10.0.0.0", 24, "1.2.3.4");
    let mut member =
        IpAddress::subnet_member(conn, &document, "10.0.0.5").expect("valid document");
    assert_eq!(member.ip, "10.0.0.5");
    assert_eq!(member.subnet_net_ip(), Some("10.0.0.0"));
    assert_eq!(member.separate_mac, None);

    scripted.push_document(subnet_document("10.0.0.0", 24, "1.2.3.4"));
    member.update_info(None).expect("scripted refresh");
    assert_eq!(
        scripted.invocations().first().map(|i| i.path.clone()),
        Some(String::from("/subnet/10.0.0.0"))
    );
    assert_eq!(member.ip, "10.0.0.5", "member address must survive refresh");
}

#[rstest]
fn missing_field_is_a_malformed_response(scripted: ScriptedConnection) {
    scripted.push_document(json!({"ip": {"ip": "5.6.7.8"}}));
    let err = manager(&scripted, Some("1.2.3.4"))
        .get("5.6.7.8")
        .expect_err("document lacks fields");
    assert!(matches!(err, RobotError::MalformedResponse { .. }));
}

#[rstest]
fn absent_separate_mac_key_is_a_malformed_response(scripted: ScriptedConnection) {
    let mut document = ip_document("5.6.7.8", "1.2.3.4");
    document["ip"]
        .as_object_mut()
        .expect("ip object")
        .remove("separate_mac");
    scripted.push_document(document);
    let err = manager(&scripted, Some("1.2.3.4"))
        .get("5.6.7.8")
        .expect_err("key missing");
    assert!(matches!(err, RobotError::MalformedResponse { .. }));
}

#[rstest]
fn list_requests_are_gets(scripted: ScriptedConnection) {
    scripted.push_document(json!([]));
    manager(&scripted, Some("1.2.3.4"))
        .list()
        .expect("empty list");
    assert!(
        scripted
            .invocations()
            .iter()
            .all(|i| i.method == HttpMethod::Get)
    );
}
