/// Test doubles for the host link, the CAN bus driver, and the clock.
use carlink::{
    core::PacketId,
    infra::codec::frame::{EncodedFrame, MAX_FRAME_LEN},
    protocol::{
        link::parser::StreamParser,
        transport::traits::{byte_sink::ByteSink, byte_source::ByteSource, clock::Clock},
    },
};
use embassy_time::Instant;
use embedded_can::{ErrorKind, Frame, Id};
use std::{cell::Cell, collections::VecDeque};

//==================================================================================Host link

#[derive(Default)]
#[allow(dead_code)]
/// In-memory serial link: bytes queued by the "host" are read by the device,
/// bytes written by the device are kept for inspection.
pub struct MockLink {
    pub rx: VecDeque<u8>,
    pub tx: Vec<u8>,
    /// When set, every write fails.
    pub broken: bool,
}

#[allow(dead_code)]
impl MockLink {
    /// Queue raw bytes as if the host had sent them.
    pub fn host_sends(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }

    /// Queue one encoded frame from the host.
    pub fn host_sends_frame(&mut self, id: PacketId, payload: &[u8]) {
        let frame = EncodedFrame::encode(id, payload).expect("payload fits a frame");
        self.host_sends(frame.as_bytes());
    }

    /// Decode and drain everything the device wrote so far.
    pub fn take_frames(&mut self) -> Vec<(PacketId, Vec<u8>)> {
        let mut parser: StreamParser<MAX_FRAME_LEN> = StreamParser::new();
        let mut frames = Vec::new();
        for byte in self.tx.drain(..) {
            parser.push(byte, &mut |id: PacketId, payload: &[u8]| {
                frames.push((id, payload.to_vec()))
            });
        }
        frames
    }
}

impl ByteSource for MockLink {
    type Error = ();

    fn read_byte(&mut self) -> nb::Result<u8, Self::Error> {
        self.rx.pop_front().ok_or(nb::Error::WouldBlock)
    }
}

impl ByteSink for MockLink {
    type Error = &'static str;

    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        if self.broken {
            return Err("link down");
        }
        self.tx.extend_from_slice(bytes);
        Ok(())
    }
}

//==================================================================================CAN bus

#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(dead_code)]
/// Minimal `embedded_can::Frame` implementation.
pub struct TestFrame {
    id: Id,
    remote: bool,
    dlc: usize,
    data: [u8; 8],
}

impl Frame for TestFrame {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        if data.len() > 8 {
            return None;
        }
        let mut buffer = [0u8; 8];
        buffer[..data.len()].copy_from_slice(data);
        Some(Self {
            id: id.into(),
            remote: false,
            dlc: data.len(),
            data: buffer,
        })
    }

    fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        if dlc > 8 {
            return None;
        }
        Some(Self {
            id: id.into(),
            remote: true,
            dlc,
            data: [0; 8],
        })
    }

    fn is_extended(&self) -> bool {
        matches!(self.id, Id::Extended(_))
    }

    fn is_remote_frame(&self) -> bool {
        self.remote
    }

    fn id(&self) -> Id {
        self.id
    }

    fn dlc(&self) -> usize {
        self.dlc
    }

    fn data(&self) -> &[u8] {
        if self.remote {
            &[]
        } else {
            &self.data[..self.dlc]
        }
    }
}

#[derive(Default)]
#[allow(dead_code)]
/// Non-blocking bus driver backed by queues.
pub struct MockBus {
    /// Frames waiting to be received by the device.
    pub rx: VecDeque<Result<TestFrame, ErrorKind>>,
    /// Frames the device put on the bus.
    pub sent: Vec<TestFrame>,
    /// Transmit outcome: `None` accepts, otherwise the error returned.
    pub tx_failure: Option<nb::Error<ErrorKind>>,
}

#[allow(dead_code)]
impl MockBus {
    pub fn push_frame(&mut self, frame: TestFrame) {
        self.rx.push_back(Ok(frame));
    }
}

impl embedded_can::nb::Can for MockBus {
    type Frame = TestFrame;
    type Error = ErrorKind;

    fn transmit(&mut self, frame: &Self::Frame) -> nb::Result<Option<Self::Frame>, Self::Error> {
        match self.tx_failure {
            Some(nb::Error::WouldBlock) => return Err(nb::Error::WouldBlock),
            Some(nb::Error::Other(kind)) => return Err(nb::Error::Other(kind)),
            None => {}
        }
        self.sent.push(frame.clone());
        Ok(None)
    }

    fn receive(&mut self) -> nb::Result<Self::Frame, Self::Error> {
        match self.rx.pop_front() {
            Some(Ok(frame)) => Ok(frame),
            Some(Err(kind)) => Err(nb::Error::Other(kind)),
            None => Err(nb::Error::WouldBlock),
        }
    }
}

//==================================================================================Clock

#[derive(Default)]
#[allow(dead_code)]
/// Clock advanced by hand.
pub struct ManualClock {
    millis: Cell<u64>,
}

#[allow(dead_code)]
impl ManualClock {
    pub fn at(millis: u64) -> Self {
        Self {
            millis: Cell::new(millis),
        }
    }

    pub fn advance(&self, millis: u64) {
        self.millis.set(self.millis.get() + millis);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        Instant::from_millis(self.millis.get())
    }
}
