//! Unit tests for HCI framing, the command engine and adapter selection

use super::constants::*;
use super::device::*;
use super::engine::*;
use super::mock::{MockTransport, Step};
use super::packet::*;
use super::transport::retry_transient;
use crate::config::{AckPolicy, EngineConfig};
use crate::error::{Criterion, Error, HciError};
use std::io;

#[test]
fn test_hci_command_serialization() {
    // Test Reset command
    let packet = CommandFrame::reset().to_packet();

    assert_eq!(packet[0], HCI_COMMAND_PKT);

    // Opcode: Reset (0x0003)
    let opcode = u16::from_le_bytes([packet[1], packet[2]]);
    assert_eq!(opcode, 0x0C03); // OGF_HOST_CTL << 10 | OCF_RESET

    // Param length: 0
    assert_eq!(packet[3], 0);
    assert_eq!(packet.len(), 4);

    // Test Download Minidriver command
    let packet = CommandFrame::download_minidriver().to_packet();
    assert_eq!(packet, vec![HCI_COMMAND_PKT, 0x2e, 0xfc, 0x00]);

    // Test Write BD ADDR command
    let packet = CommandFrame::write_bd_addr([0x43, 0x29, 0xb1, 0x55, 0x00, 0x01]).to_packet();
    assert_eq!(
        packet,
        vec![HCI_COMMAND_PKT, 0x01, 0xfc, 0x06, 0x43, 0x29, 0xb1, 0x55, 0x00, 0x01]
    );

    // Test raw command from a firmware record
    let command = CommandFrame::new(0xfc4c, vec![0x01, 0x02, 0x03]).unwrap();
    let packet = command.to_packet();

    assert_eq!(packet[0], HCI_COMMAND_PKT);
    assert_eq!(u16::from_le_bytes([packet[1], packet[2]]), 0xfc4c);
    assert_eq!(packet[3], 3);
    assert_eq!(&packet[4..], &[0x01, 0x02, 0x03]);
    assert_eq!(command.header(), [HCI_COMMAND_PKT, 0x4c, 0xfc, 3]);
}

#[test]
fn test_opcode_composition() {
    assert_eq!(opcode(OGF_HOST_CTL, OCF_RESET), OP_RESET);
    assert_eq!(opcode(OGF_VENDOR_CMD, OCF_BCM_DOWNLOAD_MINIDRIVER), OP_BCM_DOWNLOAD_MINIDRIVER);
    assert_eq!(opcode(OGF_VENDOR_CMD, OCF_BCM_WRITE_BD_ADDR), OP_BCM_WRITE_BD_ADDR);
}

#[test]
fn test_parameter_length_limit() {
    assert!(CommandFrame::new(0xfc4c, vec![0; HCI_MAX_PARAM_LEN]).is_ok());

    match CommandFrame::new(0xfc4c, vec![0; HCI_MAX_PARAM_LEN + 1]) {
        Err(HciError::InvalidParamLength(len)) => assert_eq!(len, 256),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_event_status_parsing() {
    // Command Complete for reset, status 0
    let event = EventFrame::new(&[HCI_EVENT_PKT, EVT_CMD_COMPLETE, 4, 1, 0x03, 0x0c, 0x00]);
    assert_eq!(event.event_code(), Some(EVT_CMD_COMPLETE));
    assert_eq!(event.parameters(), Some(&[1, 0x03, 0x0c, 0x00][..]));
    assert_eq!(event.status_for(OP_RESET), Some(0x00));
    assert_eq!(event.status_for(OP_BCM_WRITE_BD_ADDR), None);

    // Command Status for a vendor command, status 0x01 (unknown command)
    let event = EventFrame::new(&[HCI_EVENT_PKT, EVT_CMD_STATUS, 4, 0x01, 1, 0x4c, 0xfc]);
    assert_eq!(event.status_for(0xfc4c), Some(0x01));

    // Some other event
    let event = EventFrame::new(&[HCI_EVENT_PKT, 0x05, 4, 0x00, 0x40, 0x00, 0x13]);
    assert_eq!(event.status_for(OP_RESET), None);

    // Invalid data
    assert_eq!(EventFrame::new(&[]).event_code(), None);
    assert_eq!(EventFrame::new(&[HCI_EVENT_PKT, EVT_CMD_COMPLETE, 10, 1]).parameters(), None);
    assert_eq!(EventFrame::new(&[0x02, 0x00, 0x20]).event_code(), None);
}

#[test]
fn test_event_frame_is_bounded() {
    let event = EventFrame::new(&[0xaa; 300]);
    assert_eq!(event.len(), HCI_MAX_EVENT_SIZE);
}

#[test]
fn test_reset_acknowledged_first_attempt() {
    let mut engine = CommandEngine::new(MockTransport::new(), EngineConfig::default());

    let outcome = engine.reset().unwrap();
    assert_eq!(outcome, ResetOutcome::Acknowledged { attempt: 1 });

    assert_eq!(
        engine.transport().steps,
        vec![
            Step::Command(OP_RESET, vec![]),
            Step::Wait(RESET_TIMEOUT),
            Step::Read,
        ]
    );
}

#[test]
fn test_reset_acknowledged_after_silence() {
    let mut engine =
        CommandEngine::new(MockTransport::new().silent_resets(2), EngineConfig::default());

    let outcome = engine.reset().unwrap();
    assert_eq!(outcome, ResetOutcome::Acknowledged { attempt: 3 });
    assert_eq!(engine.transport().opcodes(), vec![OP_RESET; 3]);
}

#[test]
fn test_reset_never_acknowledged_permissive() {
    let mut engine =
        CommandEngine::new(MockTransport::new().silent_resets(usize::MAX), EngineConfig::default());

    let outcome = engine.reset().unwrap();
    assert_eq!(outcome, ResetOutcome::Unacknowledged);

    let steps = &engine.transport().steps;
    assert_eq!(steps.len(), 2 * RESET_ATTEMPTS);
    for pair in steps.chunks(2) {
        assert_eq!(
            pair,
            &[Step::Command(OP_RESET, vec![]), Step::Wait(RESET_TIMEOUT)]
        );
    }
    assert!(!steps.contains(&Step::Read));
}

#[test]
fn test_reset_never_acknowledged_strict() {
    let config = EngineConfig::default().with_ack_policy(AckPolicy::Strict);
    let mut engine = CommandEngine::new(MockTransport::new().silent_resets(usize::MAX), config);

    match engine.reset() {
        Err(Error::ResetTimeout(attempts)) => assert_eq!(attempts, RESET_ATTEMPTS),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(engine.transport().opcodes().len(), RESET_ATTEMPTS);
}

#[test]
fn test_permissive_accepts_failed_status() {
    let mut engine =
        CommandEngine::new(MockTransport::new().statuses(&[0x0c]), EngineConfig::default());

    let event = engine
        .execute(&CommandFrame::new(0xfc4c, vec![0x01]).unwrap())
        .unwrap();
    assert_eq!(event.status_for(0xfc4c), Some(0x0c));
}

#[test]
fn test_strict_rejects_failed_status() {
    let config = EngineConfig::default()
        .with_ack_policy(AckPolicy::Strict)
        .with_hexdump(true);
    let mut engine = CommandEngine::new(MockTransport::new().statuses(&[0x00, 0x0c]), config);

    let frame = CommandFrame::new(0xfc4c, vec![0x01]).unwrap();
    assert!(engine.execute(&frame).is_ok());

    match engine.execute(&frame) {
        Err(Error::CommandRejected { opcode, status }) => {
            assert_eq!(opcode, 0xfc4c);
            assert_eq!(status, 0x0c);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_retry_transient_errors() {
    let mut failures = vec![
        io::Error::from(io::ErrorKind::Interrupted),
        io::Error::from(io::ErrorKind::WouldBlock),
        io::Error::from(io::ErrorKind::Interrupted),
    ];
    let mut calls = 0;

    let written = retry_transient(|| {
        calls += 1;
        match failures.pop() {
            Some(e) => Err(e),
            None => Ok(8usize),
        }
    })
    .unwrap();

    assert_eq!(written, 8);
    assert_eq!(calls, 4);
}

#[test]
fn test_retry_stops_on_fatal_error() {
    let mut calls = 0;

    let result: io::Result<usize> = retry_transient(|| {
        calls += 1;
        Err(io::Error::from(io::ErrorKind::BrokenPipe))
    });

    assert_eq!(result.unwrap_err().kind(), io::ErrorKind::BrokenPipe);
    assert_eq!(calls, 1);
}

#[test]
fn test_select_adapter() {
    // No adapters
    match select_adapter(Vec::<AdapterHandle>::new(), AdapterFlags::UP) {
        Err(Error::DeviceNotFound(Criterion::State(flags))) => assert_eq!(flags, AdapterFlags::UP),
        other => panic!("unexpected {:?}", other),
    }

    // Exactly one
    let handle = select_adapter(vec![AdapterHandle::new(2)], AdapterFlags::UP).unwrap();
    assert_eq!(handle, AdapterHandle::new(2));

    // Several
    let candidates = vec![
        AdapterHandle::new(0),
        AdapterHandle::new(1),
        AdapterHandle::new(3),
    ];
    let err = select_adapter(candidates.clone(), AdapterFlags::UP).unwrap_err();
    assert_eq!(err.exit_code(), 1);
    assert!(err.to_string().ends_with("hci0, hci1, hci3"));
    match err {
        Error::AmbiguousDevice(found) => assert_eq!(found, candidates),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_select_adapter_consumes_lazily_filtered_input() {
    let flags = [
        AdapterFlags::UP | AdapterFlags::RUNNING,
        AdapterFlags::INIT,
        AdapterFlags::RAW,
    ];
    let up = flags
        .iter()
        .enumerate()
        .filter(|(_, f)| f.contains(AdapterFlags::UP))
        .map(|(id, _)| AdapterHandle::new(id as u16));

    assert_eq!(select_adapter(up, AdapterFlags::UP).unwrap(), AdapterHandle::new(0));
}

#[test]
fn test_adapter_names() {
    assert_eq!(AdapterHandle::from_name("hci0"), Some(AdapterHandle::new(0)));
    assert_eq!(AdapterHandle::from_name("hci12"), Some(AdapterHandle::new(12)));
    assert_eq!(AdapterHandle::from_name("hci"), None);
    assert_eq!(AdapterHandle::from_name("hci-1"), None);
    assert_eq!(AdapterHandle::from_name("00:11:22:33:44:55"), None);
    assert_eq!(AdapterHandle::new(7).to_string(), "hci7");

    assert_eq!(DeviceSelector::from(None::<String>), DeviceSelector::Auto);
    assert_eq!(
        DeviceSelector::from(Some("hci1".to_string())),
        DeviceSelector::Named("hci1".to_string())
    );
}
