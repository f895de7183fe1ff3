//! End-to-end scenarios: a host talks to the bridge over the serial link while
//! frames arrive from a simulated CAN bus.

mod helpers;

use carlink::{
    core::{ids, PacketId},
    error::{BridgeError, SendError},
    protocol::{
        bridge::{Bridge, BridgeApp, PollOutcome},
        gateway::Dispatch,
        host::HostCommand,
        link::packet::TypedPacket,
        transport::can_frame::CanFrame,
    },
};
use embassy_time::Duration;
use embedded_can::{ErrorKind, ExtendedId, Frame, Id, StandardId};
use helpers::{ManualClock, MockBus, MockLink, TestFrame};

type TestBridge<const F: usize = 50> = Bridge<MockLink, MockBus, ManualClock, F>;

#[derive(Default)]
/// Application double recording every hook call.
struct App {
    changes: Vec<(u32, [u8; 8], usize)>,
    user_events: Vec<(u8, Vec<u8>)>,
    baud_rates: Vec<u32>,
}

impl BridgeApp for App {
    fn on_can_change(&mut self, can_id: u32, data: &[u8; 8], len: usize) {
        self.changes.push((can_id, *data, len));
    }

    fn on_user_event(&mut self, id: u8, payload: &[u8]) {
        self.user_events.push((id, payload.to_vec()));
    }

    fn on_baud_rate(&mut self, baud: u32) {
        self.baud_rates.push(baud);
    }
}

fn bridge<const F: usize>() -> TestBridge<F> {
    Bridge::new(MockLink::default(), MockBus::default(), ManualClock::at(0))
}

fn standard(id: u16, data: &[u8]) -> TestFrame {
    TestFrame::new(StandardId::new(id).unwrap(), data).unwrap()
}

/// Queue a host command the way the host tool would encode it.
fn host_command<const F: usize>(bridge: &mut TestBridge<F>, command: HostCommand) {
    let mut buffer = [0u8; 32];
    let (id, len) = command.encode(&mut buffer).unwrap();
    bridge.link_mut().host_sends_frame(id, &buffer[..len]);
}

//==================================================================================Gateway

#[test]
/// Filter on 0x7E8 with a full mask: the first frame produces exactly one
/// delta event, the identical repeat produces none.
fn test_filter_change_suppression_end_to_end() {
    let mut bridge: TestBridge = bridge();
    let mut app = App::default();
    bridge
        .link_mut()
        .host_sends(&[0x7B, 0x62, 0x02, 0x05, 0x00, 0x00, 0x07, 0xE8, 0xFF, 0x7D]);

    let outcome = bridge.poll(&mut app).unwrap();
    assert_eq!(
        outcome,
        PollOutcome {
            can: None,
            host: Some(ids::CAN_ADD_FILTER)
        }
    );
    assert_eq!(bridge.gateway().len(), 1);
    assert!(bridge.link().tx.is_empty());

    let data = [1, 2, 3, 4, 5, 6, 7, 8];
    bridge.bus_mut().push_frame(standard(0x7E8, &data));
    bridge.bus_mut().push_frame(standard(0x7E8, &data));

    let first = bridge.poll(&mut app).unwrap();
    let second = bridge.poll(&mut app).unwrap();
    assert_eq!(first.can, Some(Dispatch::Filtered { changed: 1 }));
    assert_eq!(second.can, Some(Dispatch::Filtered { changed: 0 }));

    assert_eq!(
        bridge.link().tx,
        [
            0x7B, 0x62, 0x01, 0x0C, 0x00, 0x00, 0x07, 0xE8, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06,
            0x07, 0x08, 0x7D
        ]
    );
    assert_eq!(app.changes, [(0x7E8, data, 8)]);
}

#[test]
/// Without filters every frame is forwarded whole, repeats included.
fn test_sniff_fallback_with_empty_registry() {
    let mut bridge: TestBridge = bridge();
    let extended = TestFrame::new(ExtendedId::new(0x18DA_F110).unwrap(), &[0x03, 0x41]).unwrap();
    bridge.bus_mut().push_frame(extended.clone());
    bridge.bus_mut().push_frame(extended);

    for _ in 0..2 {
        let outcome = bridge.poll(&mut ()).unwrap();
        assert_eq!(outcome.can, Some(Dispatch::Sniffed));
    }
    let frames = bridge.link_mut().take_frames();
    assert_eq!(frames.len(), 2);
    assert_eq!(
        frames[0],
        (
            ids::CAN_EVENT,
            vec![0x18, 0xDA, 0xF1, 0x10, 0x03, 0x41, 0, 0, 0, 0, 0, 0]
        )
    );
}

#[test]
/// The sniffer commands toggle raw forwarding over the filters.
fn test_sniffer_commands() {
    let mut bridge: TestBridge = bridge();
    host_command(
        &mut bridge,
        HostCommand::AddFilter {
            can_id: 0x100,
            mask: 0x80,
        },
    );
    host_command(&mut bridge, HostCommand::StartSniffer);
    bridge.poll(&mut ()).unwrap();
    bridge.poll(&mut ()).unwrap();
    assert!(bridge.gateway().is_sniffing());

    bridge.bus_mut().push_frame(standard(0x200, &[1]));
    assert_eq!(bridge.poll(&mut ()).unwrap().can, Some(Dispatch::Sniffed));

    host_command(&mut bridge, HostCommand::StopSniffer);
    bridge.poll(&mut ()).unwrap();
    assert!(!bridge.gateway().is_sniffing());

    bridge.bus_mut().push_frame(standard(0x200, &[1]));
    assert_eq!(
        bridge.poll(&mut ()).unwrap().can,
        Some(Dispatch::Filtered { changed: 0 })
    );
    assert_eq!(bridge.link_mut().take_frames().len(), 1);
}

#[test]
/// A registration past capacity is answered with a registry-full event.
fn test_registry_full_reported() {
    let mut bridge: TestBridge<2> = bridge();
    for can_id in [0x10, 0x20, 0x30] {
        host_command(&mut bridge, HostCommand::AddFilter { can_id, mask: 0xFF });
    }
    for _ in 0..3 {
        bridge.poll(&mut ()).unwrap();
    }
    let registered: Vec<u32> = bridge.gateway().filters().iter().map(|f| f.can_id()).collect();
    assert_eq!(registered, [0x10, 0x20]);
    assert_eq!(
        bridge.link_mut().take_frames(),
        [(ids::REGISTRY_FULL_ERROR, vec![])]
    );
}

#[test]
fn test_remove_filter_command() {
    let mut bridge: TestBridge = bridge();
    host_command(&mut bridge, HostCommand::AddFilter { can_id: 0x10, mask: 0xFF });
    host_command(&mut bridge, HostCommand::RemoveFilter { can_id: 0x10 });
    bridge.poll(&mut ()).unwrap();
    assert_eq!(bridge.gateway().len(), 1);
    bridge.poll(&mut ()).unwrap();
    assert!(bridge.gateway().is_empty());
}

//==================================================================================Host commands

#[test]
/// Malformed and unknown commands are reported, and the loop keeps going.
fn test_bad_commands_reported() {
    let mut bridge: TestBridge = bridge();
    // add filter missing its mask byte
    bridge
        .link_mut()
        .host_sends_frame(ids::CAN_ADD_FILTER, &[0x00, 0x00, 0x07, 0xE8]);
    bridge.link_mut().host_sends_frame(PacketId::new(0x70, 0x01), &[]);
    host_command(&mut bridge, HostCommand::StartSniffer);

    for _ in 0..3 {
        bridge.poll(&mut ()).unwrap();
    }
    assert!(bridge.gateway().is_empty());
    assert!(bridge.gateway().is_sniffing());
    assert_eq!(
        bridge.link_mut().take_frames(),
        [
            (ids::CONFIG_READ_ERROR, vec![]),
            (ids::UNKNOWN_COMMAND_ERROR, vec![])
        ]
    );
}

#[test]
fn test_user_event_reaches_application() {
    let mut bridge: TestBridge = bridge();
    let mut app = App::default();
    bridge
        .link_mut()
        .host_sends_frame(PacketId::new(0x63, 0x05), &[0xDE, 0xAD]);
    let outcome = bridge.poll(&mut app).unwrap();
    assert_eq!(outcome.host, Some(PacketId::new(0x63, 0x05)));
    assert_eq!(app.user_events, [(0x05, vec![0xDE, 0xAD])]);
}

#[test]
/// A speed change is echoed to the host before the application switches the UART.
fn test_set_baud_rate_acknowledged() {
    let mut bridge: TestBridge = bridge();
    let mut app = App::default();
    host_command(&mut bridge, HostCommand::SetBaudRate { baud: 115_200 });
    let outcome = bridge.poll(&mut app).unwrap();
    assert_eq!(outcome.host, Some(ids::SET_BAUD_RATE));
    assert_eq!(app.baud_rates, [115_200]);
    assert_eq!(
        bridge.link_mut().take_frames(),
        [(ids::SET_BAUD_RATE, vec![0x00, 0x01, 0xC2, 0x00])]
    );

    // no acknowledgement, no switch
    bridge.link_mut().broken = true;
    host_command(&mut bridge, HostCommand::SetBaudRate { baud: 9_600 });
    assert!(matches!(
        bridge.poll(&mut app),
        Err(BridgeError::LinkWrite(SendError::Sink("link down")))
    ));
    assert_eq!(app.baud_rates, [115_200]);
}

#[test]
/// A frame split across polls is handled once its last byte arrives, and
/// only one frame is handled per poll.
fn test_host_input_across_polls() {
    let mut bridge: TestBridge = bridge();
    bridge.link_mut().host_sends(&[0x00, 0x7B, 0x61]);
    assert_eq!(bridge.poll(&mut ()).unwrap().host, None);
    assert!(bridge.parser().in_frame());

    bridge
        .link_mut()
        .host_sends(&[0x0A, 0x7D, 0x7B, 0x61, 0x0B, 0x7D]);
    assert_eq!(bridge.poll(&mut ()).unwrap().host, Some(ids::START_SNIFFER));
    assert!(bridge.gateway().is_sniffing());
    assert_eq!(bridge.poll(&mut ()).unwrap().host, Some(ids::STOP_SNIFFER));
    assert!(!bridge.gateway().is_sniffing());
}

//==================================================================================Transmit

#[test]
fn test_transmit_command() {
    let mut bridge: TestBridge = bridge();
    host_command(
        &mut bridge,
        HostCommand::Transmit(CanFrame::new(0x7DF, false, &[0x02, 0x01, 0x0D]).unwrap()),
    );
    bridge.poll(&mut ()).unwrap();

    let sent = &bridge.bus().sent;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].id(), Id::Standard(StandardId::new(0x7DF).unwrap()));
    assert_eq!(sent[0].data(), &[0x02, 0x01, 0x0D]);
    assert!(bridge.link().tx.is_empty());
}

#[test]
/// Transmit failures are fire-and-forget: the host gets an error event.
fn test_transmit_failures_reported() {
    let mut bridge: TestBridge = bridge();
    bridge.bus_mut().tx_failure = Some(nb::Error::WouldBlock);
    assert!(!bridge
        .transmit(&CanFrame::new(0x123, false, &[1]).unwrap())
        .unwrap());

    bridge.bus_mut().tx_failure = Some(nb::Error::Other(ErrorKind::Bit));
    assert!(!bridge
        .transmit(&CanFrame::new(0x123, false, &[1]).unwrap())
        .unwrap());

    // 0x800 does not fit an 11-bit identifier
    bridge.bus_mut().tx_failure = None;
    assert!(!bridge
        .transmit(&CanFrame::new(0x800, false, &[]).unwrap())
        .unwrap());
    assert!(bridge.bus().sent.is_empty());

    assert_eq!(
        bridge.link_mut().take_frames(),
        [
            (ids::CAN_TRANSMIT_ERROR, vec![]),
            (ids::CAN_TRANSMIT_ERROR, vec![]),
            (ids::CAN_TRANSMIT_ERROR, vec![])
        ]
    );
}

//==================================================================================Events

#[test]
fn test_trigger_event() {
    let mut bridge: TestBridge = bridge();
    bridge.trigger_event(7).unwrap();
    assert_eq!(bridge.link().tx, [0x7B, 0x73, 0x72, 0x01, 0x07, 0x7D]);
}

#[test]
/// Packets sent through the bridge are rate limited against its clock.
fn test_send_packet_rate_limited() {
    let mut bridge: TestBridge = bridge();
    let mut packet = TypedPacket::new(PacketId::new(0x63, 0x10), [0x2Au8, 0x01]);
    let limit = Duration::from_millis(250);

    assert!(bridge.send_packet(&mut packet, limit).unwrap());
    bridge.clock().advance(100);
    assert!(!bridge.send_packet(&mut packet, limit).unwrap());
    bridge.clock().advance(150);
    assert!(bridge.send_packet(&mut packet, limit).unwrap());

    assert_eq!(bridge.link_mut().take_frames().len(), 2);
}

//==================================================================================Failures

#[test]
/// A bus error is surfaced and the pending host frame waits for the next poll.
fn test_bus_error_surfaced() {
    let mut bridge: TestBridge = bridge();
    bridge.bus_mut().rx.push_back(Err(ErrorKind::Overrun));
    host_command(&mut bridge, HostCommand::StartSniffer);

    assert!(matches!(
        bridge.poll(&mut ()),
        Err(BridgeError::BusReceive(ErrorKind::Overrun))
    ));
    assert!(!bridge.gateway().is_sniffing());
    assert_eq!(bridge.poll(&mut ()).unwrap().host, Some(ids::START_SNIFFER));
}

#[test]
fn test_link_write_failure_surfaced() {
    let mut bridge: TestBridge = bridge();
    bridge.link_mut().broken = true;
    bridge.bus_mut().push_frame(standard(0x321, &[1, 2]));
    assert!(matches!(
        bridge.poll(&mut ()),
        Err(BridgeError::LinkWrite(SendError::Sink("link down")))
    ));
}

#[test]
/// The peripherals can be taken back once the loop stops.
fn test_release() {
    let mut bridge: TestBridge = bridge();
    bridge.trigger_event(1).unwrap();
    let (link, bus, _clock) = bridge.release();
    assert_eq!(link.tx.len(), 6);
    assert!(bus.sent.is_empty());
}
