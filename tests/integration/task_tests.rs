//! End-to-end runs of the provisionee task against the mock cloud, radio
//! and platform.

use ffs_provisionee::config::{ProvisioneeConfig, ReportPolicy};
use ffs_provisionee::error::Error;
use ffs_provisionee::provisionee::ports::keys;
use ffs_provisionee::provisionee::{ConfigValue, ProvisioneeState, ProvisioneeTask};
use ffs_provisionee::wifi::{SecurityProtocol, WifiConfiguration};

use super::mocks::{HookCall, MockCloud, MockPlatform, MockRadio, RadioCall, Reply};

use ProvisioneeState::{
    ComputeConfiguration, ConnectedToUserNetwork, ConnectingToSetupNetwork, ConnectingToUserNetwork,
    Done, GetWifiList, NotProvisioned, PostWifiScanData, StartPinBasedSetup, StartProvisioning,
};

fn session_reply() -> Reply {
    Reply::signed(r#"{"nonce":"n","sessionId":"session-1","canProceed":true,"salt":"NaCl"}"#)
}

fn proceed_reply() -> Reply {
    Reply::signed(r#"{"nonce":"n","canProceed":true}"#)
}

fn credentials_reply(ssid: &str) -> Reply {
    Reply::signed(&format!(
        r#"{{"nonce":"n","canProceed":true,"sequenceNumber":1,"allCredentialsReturned":true,"wifiCredentialsList":[{{"ssid":"\"{ssid}\"","securityProtocol":"WPA_PSK","key":"\"password\"","priority":1}}]}}"#
    ))
}

/// Everything up to and including the GET_WIFI_LIST report, one scan post.
fn replies_through_credentials(ssid: &str) -> Vec<Reply> {
    vec![
        session_reply(),
        Reply::next_state("START_PIN_BASED_SETUP"),
        proceed_reply(),
        Reply::next_state("COMPUTE_CONFIGURATION"),
        Reply::signed(
            r#"{"nonce":"n","canProceed":true,"configuration":{"LocaleConfiguration.Realm":"USAmazon"},"registrationDetails":{"registrationToken":"token-1","expiresAt":1700000000}}"#,
        ),
        Reply::next_state("POST_WIFI_SCAN_DATA"),
        Reply::signed(r#"{"nonce":"n","canProceed":true,"totalCredentialsFound":1,"allCredentialsFound":true}"#),
        Reply::next_state("GET_WIFI_LIST"),
        credentials_reply(ssid),
        Reply::next_state("CONNECTING_TO_USER_NETWORK"),
    ]
}

fn home_radio() -> MockRadio {
    MockRadio::new()
        .with_network(b"home", SecurityProtocol::WpaPsk)
        .with_network(b"cafe", SecurityProtocol::Open)
        .with_network(b"old", SecurityProtocol::Wep)
}

fn task(
    cloud: MockCloud,
    radio: MockRadio,
    platform: &MockPlatform,
) -> ProvisioneeTask<MockCloud, MockRadio> {
    ProvisioneeTask::new(cloud, radio, &ProvisioneeConfig::default(), platform).unwrap()
}

fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

// ── Full run ──────────────────────────────────────────────────

#[test]
fn encoded_network_run_reaches_done() {
    let mut replies = vec![
        session_reply(),
        Reply::next_state("START_PIN_BASED_SETUP"),
        proceed_reply(),
        Reply::next_state("COMPUTE_CONFIGURATION"),
        Reply::signed(
            r#"{"nonce":"n","canProceed":true,"configuration":{"LocaleConfiguration.Realm":"USAmazon"},"registrationDetails":{"registrationToken":"token-1","expiresAt":1700000000}}"#,
        ),
        Reply::next_state("POST_WIFI_SCAN_DATA"),
        Reply::signed(r#"{"nonce":"n","canProceed":true,"totalCredentialsFound":0}"#),
        Reply::signed(r#"{"nonce":"n","canProceed":true,"totalCredentialsFound":1,"allCredentialsFound":true}"#),
        Reply::next_state("GET_WIFI_LIST"),
        credentials_reply("home"),
        Reply::next_state("CONNECTING_TO_USER_NETWORK"),
        Reply::next_state("CONNECTED_TO_USER_NETWORK"),
    ];
    replies.push(Reply::next_state("DONE"));

    let mut platform = MockPlatform::provisioned_device();
    platform.scan_posts = 2;
    let mut task = task(MockCloud::new(replies), home_radio().reaching(b"home").reaching_encoded(), &platform);

    task.run(&mut platform).unwrap();

    assert_eq!(
        platform.states(),
        &[
            NotProvisioned,
            ConnectingToSetupNetwork,
            StartProvisioning,
            StartPinBasedSetup,
            ComputeConfiguration,
            PostWifiScanData,
            GetWifiList,
            ConnectingToUserNetwork,
            ConnectedToUserNetwork,
            Done,
        ]
    );

    let cloud = task.dss().transport();
    assert_eq!(cloud.remaining(), 0);
    assert_eq!(
        cloud.operations(),
        vec![
            "startProvisioningSession",
            "report",
            "startPinBasedSetup",
            "report",
            "computeConfigurationData",
            "report",
            "postWifiScanData",
            "postWifiScanData",
            "report",
            "getWifiCredentials",
            "report",
            "report",
            "report",
        ]
    );

    // One check per loop iteration plus the one that sees DONE.
    let checks = platform.hooks.iter().filter(|h| **h == HookCall::CanProceed).count();
    assert_eq!(checks, 10);
    let scan_checks = platform
        .hooks
        .iter()
        .filter(|h| matches!(h, HookCall::CanPostScanData(_)))
        .count();
    assert_eq!(scan_checks, 3);

    assert_eq!(
        platform.store.value("LocaleConfiguration.Realm"),
        Some(&ConfigValue::String("USAmazon".into()))
    );
    assert_eq!(platform.store.registration_token().map(|t| t.token.as_str()), Some("token-1"));
    assert!(task.user_networks().is_empty());
}

#[test]
fn encoded_network_uses_socks_port_until_user_network() {
    let mut replies = replies_through_credentials("home");
    replies.push(Reply::next_state("CONNECTED_TO_USER_NETWORK"));
    replies.push(Reply::next_state("DONE"));

    let mut platform = MockPlatform::provisioned_device();
    let mut task = task(MockCloud::new(replies), home_radio().reaching(b"home").reaching_encoded(), &platform);
    task.run(&mut platform).unwrap();

    let requests = &task.dss().transport().requests;
    let (setup, user) = requests.split_at(requests.len() - 2);
    assert!(setup.iter().all(|r| r.port == 8888));
    assert!(user.iter().all(|r| r.port == 443));
    assert!(requests.iter().all(|r| r.host == "dp-sps-na.amazon.com"));

    let radio = task.wifi().driver();
    match radio.calls.iter().find(|c| matches!(c, RadioCall::Connect { .. })) {
        Some(RadioCall::Connect { ssid, security, hidden }) => {
            assert_eq!(ssid.len(), 32);
            assert_eq!(*security, SecurityProtocol::WpaPsk);
            assert!(*hidden);
        }
        other => panic!("expected a connect, got {other:?}"),
    }
    assert_eq!(radio.connects().last().map(Vec::as_slice), Some(&b"home"[..]));
}

#[test]
fn report_bodies_carry_state_result_and_attempts() {
    let mut replies = replies_through_credentials("home");
    replies.push(Reply::next_state("CONNECTED_TO_USER_NETWORK"));
    replies.push(Reply::next_state("DONE"));

    let mut platform = MockPlatform::provisioned_device();
    let mut task = task(MockCloud::new(replies), home_radio().reaching(b"home").reaching_encoded(), &platform);
    task.run(&mut platform).unwrap();

    let requests = &task.dss().transport().requests;
    let first_report = &requests[1].body;
    assert!(first_report.contains(r#""sessionId":"session-1""#));
    assert!(first_report.contains(r#""sequenceNumber":2"#));
    assert!(first_report.contains(r#""currentProvisioningState":"START_PROVISIONING""#));
    assert!(first_report.contains(r#""registrationState":"NOT_REGISTERED""#));
    assert!(first_report.contains(r#""stateTransitionResult":"SUCCESS""#));
    // The encoded setup network attempt.
    assert_eq!(count(first_report, r#""wifiConnectionState":"ASSOCIATED""#), 1);

    let compute_report = &requests[5].body;
    assert!(compute_report.contains(r#""registrationState":"IN_PROGRESS""#));
    assert!(!compute_report.contains("wifiNetworkInfoList"));

    let user_report = &requests[10].body;
    assert!(user_report.contains(r#""currentProvisioningState":"CONNECTING_TO_USER_NETWORK""#));
    assert!(user_report.contains(r#""ssid":"\"home\"""#));
    // Attempts already reported are not sent again.
    assert_eq!(count(user_report, "wifiConnectionState"), 1);
}

#[test]
fn pin_is_hashed_with_session_salt() {
    let replies = vec![session_reply(), Reply::next_state("START_PIN_BASED_SETUP"), proceed_reply(), Reply::stop()];
    let mut platform = MockPlatform::provisioned_device();
    let mut task = task(MockCloud::new(replies), MockRadio::new().reaching_encoded(), &platform);
    task.run(&mut platform).unwrap();

    use base64::{Engine as _, engine::general_purpose::STANDARD};
    let expected = STANDARD.encode(hmac_sha256::Hash::hash(b"12345678NaCl"));
    let pin_request = &task.dss().transport().requests[2];
    assert_eq!(pin_request.operation(), "startPinBasedSetup");
    assert!(pin_request.body.contains(&format!(r#""hashedPin":"{expected}""#)));
}

// ── Stops ─────────────────────────────────────────────────────

#[test]
fn cloud_refusal_on_first_response_stops_cleanly() {
    let replies = vec![Reply::signed(r#"{"nonce":"n","canProceed":false}"#)];
    let mut platform = MockPlatform::provisioned_device();
    let mut task = task(MockCloud::new(replies), MockRadio::new().reaching_encoded(), &platform);

    assert_eq!(task.run(&mut platform), Ok(()));
    assert_eq!(platform.states(), &[NotProvisioned, ConnectingToSetupNetwork, StartProvisioning]);
    assert_eq!(task.dss().transport().operations(), vec!["startProvisioningSession"]);
}

#[test]
fn client_refusal_on_second_check_stops_after_one_transition() {
    let mut platform = MockPlatform::provisioned_device();
    platform.can_proceed.extend([true, false]);
    let mut task = task(MockCloud::new([session_reply()]), MockRadio::new().reaching_encoded(), &platform);

    assert_eq!(task.run(&mut platform), Ok(()));
    assert_eq!(platform.states(), &[NotProvisioned, ConnectingToSetupNetwork]);
    assert!(task.dss().transport().requests.is_empty());
    assert!(task.wifi().driver().calls.is_empty());
}

#[test]
fn cloud_refusal_in_report_keeps_state() {
    let replies = vec![session_reply(), Reply::stop()];
    let mut platform = MockPlatform::provisioned_device();
    let mut task = task(MockCloud::new(replies), MockRadio::new().reaching_encoded(), &platform);

    task.run(&mut platform).unwrap();
    assert_eq!(platform.states().last(), Some(&StartProvisioning));
}

// ── Setup network fallback ────────────────────────────────────

#[test]
fn device_without_keys_uses_default_setup_network() {
    let replies = vec![Reply::signed(r#"{"nonce":"n","canProceed":false}"#)];
    let mut platform = MockPlatform::bare_device();
    let mut task = task(MockCloud::new(replies), MockRadio::new().reaching(b"simple_setup"), &platform);

    task.run(&mut platform).unwrap();
    let radio = task.wifi().driver();
    assert_eq!(radio.connects(), vec![b"simple_setup".to_vec()]);
    assert!(radio.calls.contains(&RadioCall::Connect {
        ssid: b"simple_setup".to_vec(),
        security: SecurityProtocol::Open,
        hidden: true,
    }));
    assert!(platform.hooks.contains(&HookCall::SetupNetwork));
    assert_eq!(task.dss().transport().requests[0].port, 443);
}

#[test]
fn unreachable_encoded_network_falls_back_to_client_network() {
    let replies = vec![Reply::signed(r#"{"nonce":"n","canProceed":false}"#)];
    let mut platform = MockPlatform::provisioned_device();
    platform.setup_network = Some(WifiConfiguration::wpa_psk(b"lab", b"lab-passphrase").unwrap());
    let mut task = task(MockCloud::new(replies), MockRadio::new().reaching(b"lab"), &platform);

    task.run(&mut platform).unwrap();
    let connects = task.wifi().driver().connects();
    assert_eq!(connects.len(), 2);
    assert_eq!(connects[1], b"lab".to_vec());
    assert_eq!(task.setup_network().map(|n| n.ssid.as_slice()), Some(&b"lab"[..]));
    assert_eq!(task.dss().transport().requests[0].port, 443);
}

#[test]
fn failed_fallback_still_advances() {
    let replies = vec![Reply::signed(r#"{"nonce":"n","canProceed":false}"#)];
    let mut platform = MockPlatform::bare_device();
    let mut task = task(MockCloud::new(replies), MockRadio::new(), &platform);

    assert_eq!(task.run(&mut platform), Ok(()));
    assert!(platform.states().contains(&StartProvisioning));
}

// ── Failures ──────────────────────────────────────────────────

#[test]
fn failed_pin_setup_is_reported() {
    let replies = vec![
        session_reply(),
        Reply::next_state("START_PIN_BASED_SETUP"),
        Reply::unsigned(r#"{"nonce":"n","canProceed":true}"#),
        Reply::stop(),
    ];
    let mut platform = MockPlatform::provisioned_device();
    let mut task = task(MockCloud::new(replies), MockRadio::new().reaching_encoded(), &platform);

    assert_eq!(task.run(&mut platform), Ok(()));
    let report = &task.dss().transport().requests[3];
    assert_eq!(report.operation(), "report");
    assert!(report.body.contains(r#""currentProvisioningState":"START_PIN_BASED_SETUP""#));
    assert!(report.body.contains(r#""stateTransitionResult":"FAILURE""#));
    assert_eq!(platform.states().last(), Some(&StartPinBasedSetup));
}

#[test]
fn unreachable_user_network_rejoins_setup_network_and_reports_failure() {
    let mut replies = replies_through_credentials("home");
    replies.push(Reply::stop());

    let mut platform = MockPlatform::provisioned_device();
    let mut task = task(MockCloud::new(replies), home_radio().reaching_encoded(), &platform);

    assert_eq!(task.run(&mut platform), Ok(()));

    let connects = task.wifi().driver().connects();
    assert_eq!(connects.len(), 3);
    assert_eq!(connects[1], b"home".to_vec());
    assert_eq!(connects[0], connects[2]);

    let report = task.dss().transport().requests.last().unwrap();
    assert!(report.body.contains(r#""stateTransitionResult":"FAILURE""#));
    assert!(report.body.contains(r#""ssid":"\"home\"","securityProtocol":"WPA_PSK","wifiConnectionState":"FAILED""#));
    assert!(report.body.contains(r#""code":"3:3:0:1""#));
    // Back on the encoded network, so back on the SOCKS port.
    assert_eq!(report.port, 8888);
    assert!(task.dss().on_setup_network());
    assert_eq!(task.user_networks().len(), 1);
}

#[test]
fn no_scan_post_is_reported_as_failure() {
    let mut replies = replies_through_credentials("home");
    // Nothing is posted, so everything from the scan reply on goes.
    replies.truncate(6);
    replies.push(Reply::stop());

    let mut platform = MockPlatform::provisioned_device();
    platform.scan_posts = 0;
    let mut task = task(MockCloud::new(replies), home_radio().reaching_encoded(), &platform);

    assert_eq!(task.run(&mut platform), Ok(()));
    let cloud = task.dss().transport();
    assert!(!cloud.operations().contains(&"postWifiScanData"));
    let report = cloud.requests.last().unwrap();
    assert!(report.body.contains(r#""currentProvisioningState":"POST_WIFI_SCAN_DATA""#));
    assert!(report.body.contains(r#""stateTransitionResult":"FAILURE""#));
}

#[test]
fn local_fault_skips_report_under_protocol_only_policy() {
    let replies = vec![Reply::signed(
        r#"{"nonce":"n","sessionId":"session-1","canProceed":true,"salt":"far-too-long-salt"}"#,
    )];
    let mut platform = MockPlatform::provisioned_device();
    let config = ProvisioneeConfig {
        report_local_failures: ReportPolicy::ProtocolOnly,
        ..ProvisioneeConfig::default()
    };
    let mut task = ProvisioneeTask::new(
        MockCloud::new(replies),
        MockRadio::new().reaching_encoded(),
        &config,
        &platform,
    )
    .unwrap();

    assert_eq!(task.run(&mut platform), Err(Error::Overrun));
    assert_eq!(task.dss().transport().requests.len(), 1);
}

#[test]
fn stored_dss_endpoint_overrides_defaults() {
    let replies = vec![Reply::signed(r#"{"nonce":"n","canProceed":false}"#)];
    let mut platform = MockPlatform::bare_device();
    platform.store = platform
        .store
        .clone()
        .with_value(keys::DSS_HOST, ConfigValue::String("dss.test".into()))
        .with_value(keys::DSS_PORT, ConfigValue::Integer(8443));
    let mut task = task(MockCloud::new(replies), MockRadio::new().reaching(b"simple_setup"), &platform);

    task.run(&mut platform).unwrap();
    let request = &task.dss().transport().requests[0];
    assert_eq!((request.host.as_str(), request.port), ("dss.test", 8443));
}
