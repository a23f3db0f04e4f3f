//! DSS client operations against the mock cloud: request bodies, response
//! validation and redirects.

use ffs_provisionee::config::ProvisioneeConfig;
use ffs_provisionee::dss::{Backlog, DssClient, ReportRequest, ReportResult};
use ffs_provisionee::error::Error;
use ffs_provisionee::provisionee::ports::keys;
use ffs_provisionee::provisionee::{ConfigValue, ProvisioneeState, RegistrationState};
use ffs_provisionee::wifi::{ScanResult, SecurityProtocol, WifiConfiguration, ssid_from};

use super::mocks::{MockCloud, MockPlatform, Reply};

fn session_reply() -> Reply {
    Reply::signed(r#"{"nonce":"n","sessionId":"session-1","canProceed":true,"salt":"NaCl"}"#)
}

fn client(replies: Vec<Reply>, platform: &MockPlatform) -> DssClient<MockCloud> {
    DssClient::new(MockCloud::new(replies), &ProvisioneeConfig::default(), platform).unwrap()
}

fn scan_result(ssid: &[u8], security: SecurityProtocol) -> ScanResult {
    ScanResult {
        ssid: ssid_from(ssid).unwrap(),
        bssid: [0xAA, 0xBB, 0xCC, 0x00, 0x11, 0x22],
        security,
        channel: 1,
        frequency: Some(2412),
        signal_strength: Some(-61),
    }
}

// ── Operations ────────────────────────────────────────────────

#[test]
fn session_id_and_salt_come_from_the_response() {
    let mut platform = MockPlatform::provisioned_device();
    let mut dss = client(vec![session_reply()], &platform);

    let started = dss.start_provisioning_session(&mut platform).unwrap();
    assert!(started.can_proceed);
    assert_eq!(started.salt.as_slice(), b"NaCl");
    assert_eq!(dss.session_id(), Some("session-1"));

    let body = &dss.transport().requests[0].body;
    assert!(body.starts_with(r#"{"nonce":""#));
    assert!(!body.contains("sessionId"));
    assert!(body.contains(r#""deviceDetails":{"manufacturer":"Acme","productIndex":"CbtN"}"#));
    assert_eq!(dss.nonce().len(), 32);
}

#[test]
fn three_scan_results_are_posted_in_order() {
    let mut platform = MockPlatform::provisioned_device();
    let mut dss = client(
        vec![
            session_reply(),
            Reply::signed(r#"{"nonce":"n","canProceed":true,"totalCredentialsFound":3,"allCredentialsFound":true}"#),
        ],
        &platform,
    );
    dss.start_provisioning_session(&mut platform).unwrap();

    let results = vec![
        scan_result(b"first", SecurityProtocol::WpaPsk),
        scan_result(b"second", SecurityProtocol::Open),
        scan_result(b"third", SecurityProtocol::Wep),
    ];
    let mut backlog = Backlog::new(results.into_iter());
    let posted = dss.post_wifi_scan_data(&mut platform, 1, &mut backlog).unwrap();

    assert!(posted.can_proceed);
    assert_eq!(posted.total_credentials_found, 3);
    assert!(posted.all_credentials_found);
    assert_eq!(backlog.accepted(), 3);
    assert!(!backlog.has_more());

    let body = &dss.transport().requests[1].body;
    assert!(body.contains(r#""sessionId":"session-1""#));
    assert!(body.contains(r#""sequenceNumber":1"#));
    assert_eq!(body.matches(r#""bssid":"AA:BB:CC:00:11:22""#).count(), 3);
    let positions: Vec<usize> = ["first", "second", "third"]
        .iter()
        .map(|s| body.find(&format!(r#""ssid":"\"{s}\"""#)).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn wep_credentials_are_hex_decoded() {
    let mut platform = MockPlatform::provisioned_device();
    let mut dss = client(
        vec![
            session_reply(),
            Reply::signed(
                r#"{"nonce":"n","canProceed":true,"allCredentialsReturned":true,"wifiCredentialsList":[{"ssid":"\"legacy\"","securityProtocol":"WEP","key":"3131313131","keyIndex":0},{"ssid":"bad","securityProtocol":"OPEN"}]}"#,
            ),
        ],
        &platform,
    );
    dss.start_provisioning_session(&mut platform).unwrap();

    let mut saved: Vec<WifiConfiguration> = Vec::new();
    let returned = dss
        .get_wifi_credentials(&mut platform, 1, |network| {
            saved.push(network);
            Ok(())
        })
        .unwrap();

    assert!(returned.all_credentials_returned);
    assert_eq!(returned.saved, 1);
    assert_eq!(saved[0].ssid.as_slice(), b"legacy");
    assert_eq!(saved[0].security, SecurityProtocol::Wep);
    assert_eq!(saved[0].key.as_slice(), b"11111");
    assert_eq!(saved[0].wep_index, Some(0));
}

#[test]
fn report_advances_the_sequence_number() {
    let mut platform = MockPlatform::provisioned_device();
    let mut dss = client(
        vec![
            session_reply(),
            Reply::next_state("START_PIN_BASED_SETUP"),
            Reply::signed(r#"{"nonce":"n","canProceed":true,"waitTime":"30","reason":"busy"}"#),
        ],
        &platform,
    );
    dss.start_provisioning_session(&mut platform).unwrap();

    let request = ReportRequest {
        state: ProvisioneeState::StartProvisioning,
        result: ReportResult::Success,
        registration: RegistrationState::NotRegistered,
    };
    let first = dss
        .report(&mut platform, request, &mut Backlog::new(core::iter::empty()))
        .unwrap();
    assert_eq!(first.next_state, ProvisioneeState::StartPinBasedSetup);

    let second = dss
        .report(&mut platform, request, &mut Backlog::new(core::iter::empty()))
        .unwrap();
    assert_eq!(second.next_state, ProvisioneeState::NotProvisioned);
    assert_eq!(second.wait_time.as_deref(), Some("30"));
    assert_eq!(second.reason.as_deref(), Some("busy"));

    let requests = &dss.transport().requests;
    assert!(requests[1].body.contains(r#""sequenceNumber":2"#));
    assert!(requests[2].body.contains(r#""sequenceNumber":3"#));
    assert!(!requests[1].body.contains("wifiNetworkInfoList"));
}

#[test]
fn report_needs_a_session() {
    let mut platform = MockPlatform::provisioned_device();
    let mut dss = client(Vec::new(), &platform);
    let request = ReportRequest {
        state: ProvisioneeState::StartProvisioning,
        result: ReportResult::Failure,
        registration: RegistrationState::NotRegistered,
    };
    assert_eq!(
        dss.report(&mut platform, request, &mut Backlog::new(core::iter::empty())),
        Err(Error::Failed("dss no session"))
    );
    assert!(dss.transport().requests.is_empty());
}

// ── Response validation ───────────────────────────────────────

#[test]
fn unsigned_body_is_rejected() {
    let mut platform = MockPlatform::provisioned_device();
    let mut dss = client(vec![Reply::unsigned(r#"{"canProceed":true}"#)], &platform);
    assert_eq!(
        dss.start_provisioning_session(&mut platform),
        Err(Error::Failed("dss body without signature"))
    );
    assert_eq!(dss.session_id(), None);
}

#[test]
fn wrong_signature_is_rejected() {
    let mut platform = MockPlatform::provisioned_device();
    let mut reply = session_reply();
    reply.headers[0].1 = b"d3Jvbmc=".to_vec();
    let mut dss = client(vec![reply], &platform);
    assert_eq!(dss.start_provisioning_session(&mut platform), Err(Error::Failed("dss signature")));
}

#[test]
fn signature_header_name_is_case_insensitive() {
    let mut platform = MockPlatform::provisioned_device();
    let mut reply = session_reply();
    reply.headers[0].0 = String::from("X-Amzn-Dss-Signature");
    let mut dss = client(vec![reply], &platform);
    assert!(dss.start_provisioning_session(&mut platform).unwrap().can_proceed);
}

#[test]
fn missing_can_proceed_means_stop() {
    let mut platform = MockPlatform::provisioned_device();
    let mut dss = client(vec![Reply::signed(r#"{"nonce":"n"}"#)], &platform);
    let started = dss.start_provisioning_session(&mut platform).unwrap();
    assert!(!started.can_proceed);
    assert_eq!(dss.session_id(), None);
}

// ── Redirects ─────────────────────────────────────────────────

#[test]
fn permanent_redirect_persists_host() {
    let mut platform = MockPlatform::provisioned_device();
    let mut dss = client(
        vec![
            Reply::redirect(308, "https://dss-eu.example.com/api/v1/startProvisioningSession"),
            session_reply(),
        ],
        &platform,
    );
    dss.start_provisioning_session(&mut platform).unwrap();

    let requests = &dss.transport().requests;
    assert_eq!(requests[0].host, "dp-sps-na.amazon.com");
    assert_eq!(requests[1].host, "dss-eu.example.com");
    assert_eq!(requests[0].body, requests[1].body);
    assert_eq!(dss.host(), "dss-eu.example.com");
    assert_eq!(
        platform.store.value(keys::DSS_HOST),
        Some(&ConfigValue::String("dss-eu.example.com".into()))
    );
}

#[test]
fn temporary_redirect_is_not_persisted() {
    let mut platform = MockPlatform::provisioned_device();
    let mut dss = client(
        vec![Reply::redirect(307, "https://dss-tmp.example.com:443"), session_reply()],
        &platform,
    );
    dss.start_provisioning_session(&mut platform).unwrap();
    assert_eq!(dss.transport().requests[1].host, "dss-tmp.example.com");
    assert_eq!(platform.store.value(keys::DSS_HOST), None);
}

#[test]
fn redirect_limit_is_enforced() {
    let mut platform = MockPlatform::provisioned_device();
    let hops = (0..4).map(|i| Reply::redirect(307, &format!("https://hop{i}.example.com"))).collect();
    let mut dss = client(hops, &platform);
    assert_eq!(
        dss.start_provisioning_session(&mut platform),
        Err(Error::Failed("dss redirect limit"))
    );
    assert_eq!(dss.transport().requests.len(), 4);
}

#[test]
fn duplicate_location_is_rejected() {
    let mut platform = MockPlatform::provisioned_device();
    let mut reply = Reply::redirect(307, "https://a.example.com");
    reply.headers.push((String::from("location"), b"https://b.example.com".to_vec()));
    let mut dss = client(vec![reply], &platform);
    assert_eq!(
        dss.start_provisioning_session(&mut platform),
        Err(Error::Failed("dss duplicate location"))
    );
}
