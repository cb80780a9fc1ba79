//! Sequencing tests for the runner against the scripted mock transport.

use ebi_device::mock::MockTransport;
use ebi_device::{DeviceError, DeviceSession, SessionConfig};
use ebi_protocol::*;
use ebi_runner::commands::{setup, with_network_paused, SetupStep};
use ebi_runner::config::RunnerConfig;
use ebi_runner::RunnerError;

fn open_session(script: impl FnOnce(&mut MockTransport)) -> DeviceSession<MockTransport> {
    let mut mock = MockTransport::new();
    mock.expect(&[0x01], &[0x81, 0x50, 0x55, 0x01, 0x02]);
    mock.expect(&[0x04], &[0x84, 0x10]);
    mock.expect(&[0x06], &[0x86, 0x02, 0x00]);
    script(&mut mock);
    DeviceSession::open(mock, SessionConfig::default()).expect("handshake should succeed")
}

// ============================================================================
// Network pause policy
// ============================================================================

#[test]
fn test_set_while_online_stops_and_restarts_network() {
    let mut session = open_session(|mock| {
        mock.expect(&[0x04], &[0x84, 0x30]);
        mock.expect(&[0x30], &[0xB0, 0x00]);
        mock.expect(&[0x21, 0x01, 0x02], &[0xA1, 0x00]);
        mock.expect(&[0x31], &[0xB1, 0x00]);
    });

    let status = with_network_paused(&mut session, |s| s.set_network_address(&[0x01, 0x02])).unwrap();
    assert_eq!(status, Status::Success);
    assert_eq!(session.state().operational_state, DeviceState::Online);
    assert_eq!(session.transport().remaining_expectations(), 0);
}

#[test]
fn test_set_while_offline_touches_nothing_else() {
    let mut session = open_session(|mock| {
        mock.expect(&[0x04], &[0x84, 0x20]);
        mock.expect(&[0x10, 0x0D], &[0x90, 0x00]);
    });

    let status = with_network_paused(&mut session, |s| s.set_output_power(13)).unwrap();
    assert_eq!(status, Status::Success);
    assert_eq!(session.state().operational_state, DeviceState::Offline);
    assert_eq!(session.transport().remaining_expectations(), 0);
}

#[test]
fn test_network_restarts_after_failed_operation() {
    let mut session = open_session(|mock| {
        mock.expect(&[0x04], &[0x84, 0x30]);
        mock.expect(&[0x30], &[0xB0, 0x00]);
        mock.expect_silence(&[0x11, 0x02, 0x07, 0x00, 0x01]);
        mock.expect(&[0x31], &[0xB1, 0x00]);
    });

    let params = RadioParameters::from_codes(2, 7, 0, 1).unwrap();
    let err = with_network_paused(&mut session, |s| s.set_operating_channel(params)).unwrap_err();
    assert!(matches!(err, DeviceError::NoResponse { opcode: 0x11 }));
    assert_eq!(session.state().operational_state, DeviceState::Online);
    assert_eq!(session.transport().remaining_expectations(), 0);
}

// ============================================================================
// Setup sequence
// ============================================================================

#[test]
fn test_setup_from_online_boot() {
    let config = RunnerConfig::from_yaml(
        "radio:\n  channel: 2\nenergy_save: 2\noutput_power: 13\nnetwork_address: 2\n",
    )
    .unwrap();

    let mut session = open_session(|mock| {
        mock.expect_frames(&[0x05], &[&[0x85, 0x00], &[0x84, 0x30]]);
        mock.expect(&[0x30], &[0xB0, 0x00]);
        mock.expect(&[0x13, 0x02], &[0x93, 0x00]);
        mock.expect(&[0x10, 0x0D], &[0x90, 0x00]);
        mock.expect(&[0x11, 0x02, 0x07, 0x00, 0x01], &[0x91, 0x00]);
        mock.expect(&[0x21, 0x00, 0x02], &[0xA1, 0x00]);
        mock.expect(&[0x31], &[0xB1, 0x00]);
    });

    let steps = setup(&mut session, &config).unwrap();
    let names: Vec<_> = steps.iter().map(|s| s.step).collect();
    assert_eq!(
        names,
        vec![
            "reset",
            "network stop",
            "energy save",
            "output power",
            "operating channel",
            "network address",
            "network start",
        ]
    );
    assert!(steps.iter().all(|s| s.status.is_success()));
    assert_eq!(session.state().operational_state, DeviceState::Online);
    assert_eq!(session.transport().remaining_expectations(), 0);
}

#[test]
fn test_setup_reports_declined_steps() {
    let mut session = open_session(|mock| {
        mock.expect_frames(&[0x05], &[&[0x85, 0x00], &[0x84, 0x10]]);
        mock.expect(&[0x13, 0x00], &[0x93, 0x00]);
        mock.expect(&[0x11, 0x01, 0x07, 0x00, 0x01], &[0x91, 0x06]);
        mock.expect(&[0x31], &[0xB1, 0x03]);
    });

    let steps = setup(&mut session, &RunnerConfig::default()).unwrap();
    assert_eq!(
        steps[2],
        SetupStep {
            step: "operating channel",
            status: Status::Busy,
        }
    );
    assert_eq!(steps[3].status, Status::OperationTimeout);
    assert_eq!(session.state().operational_state, DeviceState::Ready);
}

#[test]
fn test_setup_rejects_bad_config_before_reset() {
    let config = RunnerConfig::from_yaml("radio:\n  coding_rate: 0\n").unwrap();
    let mut session = open_session(|_| {});

    let err = setup(&mut session, &config).unwrap_err();
    assert!(matches!(
        err,
        RunnerError::Protocol(ProtocolError::InvalidParameter(_))
    ));
    assert_eq!(session.transport().sent_frames().len(), 3);
}
