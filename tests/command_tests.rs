use std::sync::{Arc, Mutex};

use autelis_bridge::{AutelisBridge, AutelisClient, Command, Driver, Node, Report};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn status_xml(pump: i32) -> String {
    format!(
        r#"<response>
        <system>
            <runstate>1</runstate>
            <opmode>0</opmode>
            <freeze>0</freeze>
            <sensor1>1</sensor1>
            <sensor2>1</sensor2>
            <sensor3>1</sensor3>
        </system>
        <equipment>
            <pump>{pump}</pump>
            <aux1>0</aux1>
        </equipment>
        <temp>
            <tempunits>F</tempunits>
            <htstatus>0</htstatus>
            <poolht>1</poolht>
            <poolsp>85</poolsp>
            <pooltemp>78</pooltemp>
            <spaht>0</spaht>
            <spasp>100</spasp>
            <spatemp>97</spatemp>
            <airtemp>75</airtemp>
            <soltemp>80</soltemp>
        </temp>
    </response>"#
    )
}

async fn synced_bridge(
    server: &MockServer,
    pump: i32,
) -> (AutelisBridge<AutelisClient>, Arc<Mutex<Vec<Report>>>) {
    Mock::given(method("GET"))
        .and(path("/status.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(status_xml(pump)))
        .mount(server)
        .await;

    let reports: Arc<Mutex<Vec<Report>>> = Arc::new(Mutex::new(vec![]));
    let sink = reports.clone();
    let addr = server.address();
    let mut bridge = AutelisBridge::builder(format!("{}:{}", addr.ip(), addr.port()))
        .credentials("admin", "pool")
        .on_report(move |report| sink.lock().unwrap().push(report.clone()))
        .build();

    assert!(bridge.sync(true).await, "initial sync should succeed");
    reports.lock().unwrap().clear();
    (bridge, reports)
}

fn equipment_state(bridge: &AutelisBridge<AutelisClient>, address: &str) -> i32 {
    match bridge.registry().get(address) {
        Some(Node::Equipment(node)) => node.state,
        other => panic!("expected equipment node at {address}, got {other:?}"),
    }
}

fn zone_field(bridge: &AutelisBridge<AutelisClient>, address: &str) -> (i32, i32) {
    match bridge.registry().get(address) {
        Some(Node::TempControl(node)) => (node.mode, node.setpoint),
        other => panic!("expected temp control node at {address}, got {other:?}"),
    }
}

#[tokio::test]
async fn turn_on_applies_optimistic_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/set.cgi"))
        .and(query_param("name", "aux1"))
        .and(query_param("value", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .expect(1)
        .mount(&server)
        .await;

    let (mut bridge, reports) = synced_bridge(&server, 1).await;
    assert!(bridge.turn_on("aux1").await);
    assert_eq!(equipment_state(&bridge, "aux1"), 1);

    let captured = reports.lock().unwrap();
    assert_eq!(
        captured.as_slice(),
        &[Report {
            address: "aux1".to_string(),
            driver: Driver::Status,
            value: 1,
        }]
    );
}

#[tokio::test]
async fn failed_device_call_leaves_state_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/set.cgi"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (mut bridge, reports) = synced_bridge(&server, 1).await;
    assert!(!bridge.turn_off("pump").await);
    assert_eq!(equipment_state(&bridge, "pump"), 1);
    assert!(reports.lock().unwrap().is_empty());
}

#[tokio::test]
async fn set_zone_mode_updates_mode_field() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/set.cgi"))
        .and(query_param("name", "poolht"))
        .and(query_param("value", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .expect(1)
        .mount(&server)
        .await;

    let (mut bridge, _) = synced_bridge(&server, 1).await;
    assert!(bridge.set_zone_mode("poolht", 3).await);
    assert_eq!(zone_field(&bridge, "poolht"), (3, 85));
}

#[tokio::test]
async fn set_zone_setpoint_targets_setpoint_element() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/set.cgi"))
        .and(query_param("name", "spasp"))
        .and(query_param("value", "102"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .expect(1)
        .mount(&server)
        .await;

    let (mut bridge, _) = synced_bridge(&server, 1).await;
    assert!(bridge.set_zone_setpoint("spaht", 102).await);
    assert_eq!(zone_field(&bridge, "spaht"), (0, 102));
}

#[tokio::test]
async fn setpoint_on_non_zone_address_makes_no_device_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/set.cgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .expect(0)
        .mount(&server)
        .await;

    let (mut bridge, reports) = synced_bridge(&server, 1).await;
    assert!(!bridge.set_zone_setpoint("pump", 90).await);
    assert!(!bridge.set_zone_setpoint("ghost", 90).await);
    assert!(reports.lock().unwrap().is_empty());
}

#[tokio::test]
async fn dispatch_rejects_commands_for_wrong_kind() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/set.cgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .expect(0)
        .mount(&server)
        .await;

    let (mut bridge, _) = synced_bridge(&server, 1).await;
    assert!(!bridge.dispatch("poolht", Command::On).await);
    assert!(!bridge.dispatch("pump", Command::SetTemp(90)).await);
    assert!(!bridge.dispatch("ghost", Command::Off).await);
}

#[tokio::test]
async fn dispatch_routes_by_node_kind() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/set.cgi"))
        .and(query_param("name", "pump"))
        .and(query_param("value", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/set.cgi"))
        .and(query_param("name", "poolsp"))
        .and(query_param("value", "88"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .expect(1)
        .mount(&server)
        .await;

    let (mut bridge, _) = synced_bridge(&server, 1).await;
    assert!(bridge.dispatch("pump", Command::Off).await);
    assert!(bridge.dispatch("poolht", Command::SetTemp(88)).await);
    assert_eq!(equipment_state(&bridge, "pump"), 0);
    assert_eq!(zone_field(&bridge, "poolht"), (1, 88));
}

#[tokio::test]
async fn dispatch_query_reports_current_values() {
    let server = MockServer::start().await;
    let (mut bridge, reports) = synced_bridge(&server, 1).await;

    assert!(bridge.dispatch("pump", Command::Query).await);

    let captured = reports.lock().unwrap();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].address, "pump");
    assert_eq!(captured[0].value, 1);
}

#[tokio::test]
async fn optimistic_write_superseded_by_next_sync() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/set.cgi"))
        .and(query_param("name", "pump"))
        .and(query_param("value", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&server)
        .await;

    // device keeps reporting the pump on; the optimistic off is overwritten
    let (mut bridge, _) = synced_bridge(&server, 1).await;
    assert!(bridge.turn_off("pump").await);
    assert_eq!(equipment_state(&bridge, "pump"), 0);

    assert!(bridge.sync(true).await);
    assert_eq!(equipment_state(&bridge, "pump"), 1);
}
