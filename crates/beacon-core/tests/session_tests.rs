//! Advertising session behaviour against a mock radio
//!
//! Covers the enable → start → stop flow, restarts, externally triggered
//! shutdown and the missing-handle paths.


use std::sync::Arc;
use std::thread;

use beacon_core::{
    encode, AdapterState, AdapterStateDispatcher, AdvertiseFailure, AdvertisingSession,
    AdvertisingSessionState, BeaconConfig, BeaconFormat, StartOutcome, Unavailable, UniqueCode,
};
use test_utils::{MockRadio, RadioCall};

// ----------------------------------------------------------------------------
// Test Utilities
// ----------------------------------------------------------------------------

fn session_for(radio: &MockRadio) -> AdvertisingSession {
    let dispatcher = AdapterStateDispatcher::new(radio.as_event_source());
    AdvertisingSession::new(radio.as_manager(), dispatcher, BeaconConfig::default())
}

fn expected(format: BeaconFormat, code: u32) -> beacon_core::AdvertisementPayload {
    encode(format, code.into(), &BeaconConfig::default().device_identifier)
}

fn start_payloads(radio: &MockRadio) -> Vec<beacon_core::AdvertisementPayload> {
    radio
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            RadioCall::Start { payload, .. } => Some(payload),
            _ => None,
        })
        .collect()
}

// ----------------------------------------------------------------------------
// Start / Stop
// ----------------------------------------------------------------------------

#[test]
fn test_start_with_radio_enabled() {
    let radio = MockRadio::enabled();
    let session = session_for(&radio);

    let outcome = session.request_start(BeaconFormat::AltBeacon, UniqueCode::new(0x1234_5678));

    assert_eq!(outcome, StartOutcome::Started);
    assert_eq!(session.state(), AdvertisingSessionState::Advertising);
    assert_eq!(start_payloads(&radio), vec![expected(BeaconFormat::AltBeacon, 0x1234_5678)]);
    assert_eq!(radio.live_advertisements().len(), 1);
    assert_eq!(
        session.dispatcher().registered_states(),
        vec![AdapterState::TurningOff]
    );
    assert!(!radio.calls().contains(&RadioCall::Enable));
}

#[test]
fn test_stop_uses_start_callback() {
    let radio = MockRadio::enabled();
    let session = session_for(&radio);

    session.request_start(BeaconFormat::IBeacon, UniqueCode::ZERO);
    session.request_stop();

    let calls = radio.advertiser_calls();
    assert_eq!(calls.len(), 2);
    let (RadioCall::Start { callback: started, .. }, RadioCall::Stop { callback: stopped }) =
        (&calls[0], &calls[1])
    else {
        panic!("unexpected advertiser calls: {:?}", calls);
    };
    assert_eq!(started, stopped);
    assert!(radio.live_advertisements().is_empty());
    assert_eq!(session.state(), AdvertisingSessionState::Idle);
    assert!(!session.dispatcher().is_subscribed());
    assert_eq!(radio.subscription_count(), 0);
}

#[test]
fn test_stop_when_idle_does_not_touch_advertiser() {
    let radio = MockRadio::enabled();
    let session = session_for(&radio);

    session.request_stop();
    session.request_stop();

    assert!(radio.calls().is_empty());
    assert_eq!(session.state(), AdvertisingSessionState::Idle);
}

#[test]
fn test_restart_stops_before_starting() {
    let radio = MockRadio::enabled();
    let session = session_for(&radio);

    session.request_start(BeaconFormat::AltBeacon, UniqueCode::new(1));
    session.request_start(BeaconFormat::IBeacon, UniqueCode::new(2));

    let calls = radio.advertiser_calls();
    assert!(matches!(calls[0], RadioCall::Start { .. }));
    assert!(matches!(calls[1], RadioCall::Stop { .. }));
    assert!(matches!(calls[2], RadioCall::Start { .. }));
    assert_eq!(calls.len(), 3);

    assert_eq!(radio.max_live(), 1);
    assert_eq!(radio.live_advertisements(), vec![expected(BeaconFormat::IBeacon, 2)]);
    assert_eq!(session.active_payload(), Some(expected(BeaconFormat::IBeacon, 2)));
    assert_eq!(
        session.active_format(),
        Some((BeaconFormat::IBeacon, UniqueCode::new(2)))
    );
}

#[test]
fn test_concurrent_starts_never_overlap() {
    let radio = MockRadio::enabled();
    let session = session_for(&radio);

    thread::scope(|scope| {
        for i in 0..8u32 {
            let session = session.clone();
            scope.spawn(move || {
                let format = BeaconFormat::ALL[(i % 3) as usize];
                session.request_start(format, UniqueCode::new(i));
            });
        }
    });

    assert_eq!(radio.max_live(), 1);
    assert_eq!(radio.live_advertisements().len(), 1);
    assert_eq!(session.state(), AdvertisingSessionState::Advertising);
}

#[test]
fn test_start_failure_is_only_logged() {
    let radio = MockRadio::enabled();
    radio.fail_next_start(AdvertiseFailure::DataTooLarge);
    let session = session_for(&radio);

    let outcome = session.request_start(BeaconFormat::Standard, UniqueCode::ZERO);

    assert_eq!(outcome, StartOutcome::Started);
    assert_eq!(session.state(), AdvertisingSessionState::Advertising);
    assert!(radio.live_advertisements().is_empty());
}

// ----------------------------------------------------------------------------
// Radio Enablement
// ----------------------------------------------------------------------------

#[test]
fn test_start_waits_for_radio() {
    let radio = MockRadio::disabled();
    let session = session_for(&radio);

    let outcome = session.request_start(BeaconFormat::AltBeacon, UniqueCode::new(7));

    assert_eq!(outcome, StartOutcome::WaitingForRadio);
    assert_eq!(session.state(), AdvertisingSessionState::Enabling);
    assert!(radio.calls().contains(&RadioCall::Enable));
    assert!(radio.advertiser_calls().is_empty());
    assert_eq!(session.dispatcher().registered_states(), vec![AdapterState::On]);

    radio.emit(AdapterState::TurningOn);
    assert_eq!(session.state(), AdvertisingSessionState::Enabling);

    radio.emit(AdapterState::On);

    assert_eq!(session.state(), AdvertisingSessionState::Advertising);
    assert_eq!(start_payloads(&radio), vec![expected(BeaconFormat::AltBeacon, 7)]);
    assert_eq!(
        session.dispatcher().registered_states(),
        vec![AdapterState::TurningOff]
    );
}

#[test]
fn test_later_request_replaces_pending_start() {
    let radio = MockRadio::disabled();
    let session = session_for(&radio);

    session.request_start(BeaconFormat::AltBeacon, UniqueCode::new(1));
    let outcome = session.request_start(BeaconFormat::IBeacon, UniqueCode::new(2));
    assert_eq!(outcome, StartOutcome::WaitingForRadio);

    radio.emit(AdapterState::On);

    assert_eq!(start_payloads(&radio), vec![expected(BeaconFormat::IBeacon, 2)]);
}

#[test]
fn test_stop_while_enabling_cancels_start() {
    let radio = MockRadio::disabled();
    let session = session_for(&radio);

    session.request_start(BeaconFormat::AltBeacon, UniqueCode::new(1));
    session.request_stop();

    assert_eq!(session.state(), AdvertisingSessionState::Idle);
    assert!(!session.dispatcher().is_subscribed());

    radio.emit(AdapterState::On);
    radio.emit_stale(AdapterState::On);

    assert!(radio.advertiser_calls().is_empty());
    assert_eq!(session.state(), AdvertisingSessionState::Idle);
}

#[test]
fn test_radio_turning_off_stops_advertising() {
    let radio = MockRadio::enabled();
    let session = session_for(&radio);

    session.request_start(BeaconFormat::IBeacon, UniqueCode::ZERO);
    radio.emit(AdapterState::TurningOff);

    assert_eq!(session.state(), AdvertisingSessionState::Idle);
    assert!(matches!(radio.advertiser_calls().last(), Some(RadioCall::Stop { .. })));
    assert!(radio.live_advertisements().is_empty());
    assert!(!session.dispatcher().is_subscribed());

    radio.emit(AdapterState::Off);
    session.request_stop();
    assert_eq!(radio.advertiser_calls().len(), 2);
}

#[test]
fn test_restart_after_radio_cycle() {
    let radio = MockRadio::enabled();
    let session = session_for(&radio);

    session.request_start(BeaconFormat::AltBeacon, UniqueCode::new(3));
    radio.emit(AdapterState::TurningOff);
    radio.emit(AdapterState::Off);

    assert_eq!(
        session.request_start(BeaconFormat::AltBeacon, UniqueCode::new(3)),
        StartOutcome::WaitingForRadio
    );
    radio.emit(AdapterState::On);

    assert_eq!(session.state(), AdvertisingSessionState::Advertising);
    assert_eq!(radio.live_advertisements(), vec![expected(BeaconFormat::AltBeacon, 3)]);
}

// ----------------------------------------------------------------------------
// Missing Handles and Capabilities
// ----------------------------------------------------------------------------

#[test]
fn test_unsupported_adapter() {
    let radio = MockRadio::enabled();
    radio.set_supported(false);
    let session = session_for(&radio);

    let outcome = session.request_start(BeaconFormat::AltBeacon, UniqueCode::ZERO);

    assert_eq!(outcome, StartOutcome::Unsupported);
    assert_eq!(session.state(), AdvertisingSessionState::Idle);
    assert!(radio.calls().is_empty());
}

#[test]
fn test_missing_adapter() {
    let radio = MockRadio::enabled();
    radio.remove_adapter();
    let session = session_for(&radio);

    assert_eq!(
        session.request_start(BeaconFormat::IBeacon, UniqueCode::ZERO),
        StartOutcome::Unavailable(Unavailable::Adapter)
    );
    assert_eq!(session.state(), AdvertisingSessionState::Idle);
    assert!(radio.calls().is_empty());
}

#[test]
fn test_missing_advertiser() {
    let radio = MockRadio::enabled();
    radio.remove_advertiser();
    let session = session_for(&radio);

    assert_eq!(
        session.request_start(BeaconFormat::IBeacon, UniqueCode::ZERO),
        StartOutcome::Unavailable(Unavailable::Advertiser)
    );
    assert_eq!(session.state(), AdvertisingSessionState::Idle);
    assert!(!session.dispatcher().is_subscribed());
}

#[test]
fn test_dropping_session_stops_advertising() {
    let radio = MockRadio::enabled();
    let session = session_for(&radio);

    session.request_start(BeaconFormat::AltBeacon, UniqueCode::new(9));
    drop(session);

    assert!(radio.live_advertisements().is_empty());
    assert_eq!(radio.subscription_count(), 0);
}

#[test]
fn test_dispatcher_shared_with_other_listeners() {
    let radio = MockRadio::enabled();
    let dispatcher = AdapterStateDispatcher::new(radio.as_event_source());
    let session = AdvertisingSession::new(
        radio.as_manager(),
        dispatcher.clone(),
        BeaconConfig::default(),
    );

    let seen = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = seen.clone();
    dispatcher.register(AdapterState::Off, move || {
        counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    });

    session.request_start(BeaconFormat::Standard, UniqueCode::ZERO);
    session.request_stop();

    assert!(dispatcher.is_subscribed());
    radio.emit(AdapterState::Off);
    assert_eq!(seen.load(std::sync::atomic::Ordering::SeqCst), 1);
}
