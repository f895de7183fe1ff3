//! Control loop tying the host link, the CAN bus, and the gateway together.
//!
//! Each [`Bridge::poll`] handles at most one CAN frame and one host frame:
//!
//! 1. if the bus driver has a frame pending (`receive()` does not return
//!    `WouldBlock`), it goes through the gateway and changed frames reach the
//!    application callback;
//! 2. the host link is drained until one frame is complete, and the decoded
//!    command is applied.
//!
//! Rejected commands and failed transmits never abort the loop. They are
//! reported to the host as empty error events (`0x65`).
use crate::{
    core::{ids, PacketId, CAN_DATA_LEN, REGISTRY_CAPACITY, SCRATCH_CAPACITY},
    error::{BridgeError, SendError},
    infra::codec::traits::PacketPayload,
    protocol::{
        gateway::{CanGateway, Dispatch},
        host::HostCommand,
        link::{
            packet::{SignalPacket, TypedPacket},
            parser::{OwnedFrame, StreamParser},
        },
        transport::{
            can_frame::CanFrame,
            traits::{byte_sink::ByteSink, byte_source::ByteSource, clock::Clock},
        },
    },
};
use embassy_time::Duration;
use embedded_can::nb::Can;

/// Error returned by [`Bridge::poll`] for a link `L` and a bus `B`.
pub type PollError<L, B> = BridgeError<
    <L as ByteSource>::Error,
    <L as ByteSink>::Error,
    <B as Can>::Error,
>;

/// Error returned when a frame could not be written to the host link `L`.
pub type LinkError<L> = SendError<<L as ByteSink>::Error>;

//==================================================================================Application

/// Application hooks called from [`Bridge::poll`]. All default to no-ops.
pub trait BridgeApp {
    /// A filtered CAN frame changed. `data` is the raw frame, zero-padded past `len`.
    fn on_can_change(&mut self, _can_id: u32, _data: &[u8; CAN_DATA_LEN], _len: usize) {}

    /// The host sent a user event (type `0x63`).
    fn on_user_event(&mut self, _id: u8, _payload: &[u8]) {}

    /// The host asked for a new link speed. The acknowledgement already went
    /// out at the old speed; reconfiguring the UART is up to the application.
    fn on_baud_rate(&mut self, _baud: u32) {}
}

impl BridgeApp for () {}

/// What one [`Bridge::poll`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollOutcome {
    /// How the received CAN frame was handled, if one was pending.
    pub can: Option<Dispatch>,
    /// Identity of the host frame handled, if one was complete.
    pub host: Option<PacketId>,
}

//==================================================================================Bridge

/// Gateway device: host link `L`, bus driver `B`, clock `C`, a registry of
/// `F` filters, and a host parser with `P` bytes of scratch.
pub struct Bridge<
    L,
    B,
    C,
    const F: usize = REGISTRY_CAPACITY,
    const P: usize = SCRATCH_CAPACITY,
> {
    link: L,
    bus: B,
    clock: C,
    parser: StreamParser<P>,
    gateway: CanGateway<F>,
    app_event: TypedPacket<[u8; 1]>,
}

impl<L, B, C, const F: usize, const P: usize> Bridge<L, B, C, F, P>
where
    L: ByteSource + ByteSink,
    B: Can,
    C: Clock,
{
    pub fn new(link: L, bus: B, clock: C) -> Self {
        Self::with_parser(link, bus, clock, StreamParser::new())
    }

    /// Same as [`new`](Self::new) with a preconfigured parser (truncation policy).
    pub fn with_parser(link: L, bus: B, clock: C, parser: StreamParser<P>) -> Self {
        Self {
            link,
            bus,
            clock,
            parser,
            gateway: CanGateway::new(),
            app_event: TypedPacket::new(ids::APP_EVENT, [0]),
        }
    }

    /// Run one iteration of the control loop.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::BusReceive`] when the driver reports a receive error;
    ///   the host link is not read in that iteration
    /// - [`BridgeError::LinkRead`] when the host link fails
    /// - [`BridgeError::LinkWrite`] when an event could not be written
    pub fn poll<A: BridgeApp + ?Sized>(
        &mut self,
        app: &mut A,
    ) -> Result<PollOutcome, PollError<L, B>> {
        let can = match self.bus.receive() {
            Ok(frame) => {
                let frame = CanFrame::from_frame(&frame);
                let dispatch = self
                    .gateway
                    .on_frame(&frame, &mut self.link, |can_id, data, len| {
                        app.on_can_change(can_id, data, len)
                    })
                    .map_err(BridgeError::LinkWrite)?;
                Some(dispatch)
            }
            Err(nb::Error::WouldBlock) => None,
            Err(nb::Error::Other(err)) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("CAN receive failed");
                return Err(BridgeError::BusReceive(err));
            }
        };

        let mut received = None;
        self.parser
            .drain(&mut self.link, &mut |id: PacketId, payload: &[u8]| {
                received = Some(OwnedFrame::new(id, payload));
            })
            .map_err(BridgeError::LinkRead)?;

        let host = match received {
            Some(frame) => {
                self.dispatch(frame.id, &frame.payload, app)
                    .map_err(BridgeError::LinkWrite)?;
                Some(frame.id)
            }
            None => None,
        };
        Ok(PollOutcome { can, host })
    }

    /// Apply one host frame. Bad commands and a full registry are reported
    /// to the host; only a failed write to the link is an error.
    pub fn dispatch<A: BridgeApp + ?Sized>(
        &mut self,
        id: PacketId,
        payload: &[u8],
        app: &mut A,
    ) -> Result<(), LinkError<L>> {
        let command = match HostCommand::decode(id, payload) {
            Ok(command) => command,
            Err(err) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("Rejected host command {}: {}", id, err);
                return self.report(err.report_id());
            }
        };

        match command {
            HostCommand::StartSniffer => self.gateway.start_sniffer(),
            HostCommand::StopSniffer => self.gateway.stop_sniffer(),
            HostCommand::SetBaudRate { baud } => {
                TypedPacket::new(ids::SET_BAUD_RATE, baud.to_be_bytes())
                    .serialize(&mut self.link)?;
                // partial input was framed at the old speed
                self.parser.reset();
                #[cfg(feature = "defmt")]
                defmt::info!("Host link switching to {=u32} baud", baud);
                app.on_baud_rate(baud);
            }
            HostCommand::AddFilter { can_id, mask } => {
                if self.gateway.add_filter(can_id, mask).is_err() {
                    return self.report(ids::REGISTRY_FULL_ERROR);
                }
            }
            HostCommand::RemoveFilter { can_id } => {
                self.gateway.remove_filter(can_id);
            }
            HostCommand::Transmit(frame) => {
                self.transmit(&frame)?;
            }
            HostCommand::UserEvent { id, payload } => app.on_user_event(id, payload),
        }
        Ok(())
    }

    /// Hand a frame to the bus driver without waiting.
    ///
    /// A full transmit queue, a driver error, or an identifier too wide for
    /// its format is reported to the host as a transmit error event.
    /// Returns whether the driver accepted the frame.
    pub fn transmit(&mut self, frame: &CanFrame) -> Result<bool, LinkError<L>> {
        let accepted = match frame.to_frame::<B::Frame>() {
            // a displaced lower-priority frame is dropped
            Some(driver_frame) => self.bus.transmit(&driver_frame).is_ok(),
            None => false,
        };
        if !accepted {
            #[cfg(feature = "defmt")]
            defmt::warn!("CAN transmit of {=u32:#x} failed", frame.id);
            self.report(ids::CAN_TRANSMIT_ERROR)?;
        }
        Ok(accepted)
    }

    /// Emit application event `n` (`0x73`/`0x72`, one byte payload).
    pub fn trigger_event(&mut self, n: u8) -> Result<(), LinkError<L>> {
        self.app_event.set_payload([n]);
        self.app_event.serialize(&mut self.link)
    }

    /// Send a typed packet, rate limited against this bridge's clock.
    /// Returns whether it went out.
    pub fn send_packet<T: PacketPayload>(
        &mut self,
        packet: &mut TypedPacket<T>,
        rate_limit: Duration,
    ) -> Result<bool, LinkError<L>> {
        packet.serialize_at(&mut self.link, self.clock.now(), rate_limit)
    }

    fn report(&mut self, id: PacketId) -> Result<(), LinkError<L>> {
        SignalPacket::new(id, []).serialize(&mut self.link)
    }

    pub fn gateway(&self) -> &CanGateway<F> {
        &self.gateway
    }

    pub fn gateway_mut(&mut self) -> &mut CanGateway<F> {
        &mut self.gateway
    }

    pub fn parser(&self) -> &StreamParser<P> {
        &self.parser
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Give back the peripherals.
    pub fn release(self) -> (L, B, C) {
        (self.link, self.bus, self.clock)
    }
}
