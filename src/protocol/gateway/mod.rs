//! CAN gateway: decides for every received bus frame whether the host sees
//! the raw frame (sniffing) or only the filtered bytes that changed.
//!
//! Filters are kept in a fixed-capacity registry keyed by CAN identifier.
//! Each filter selects up to eight data bytes with a mask (bit 7 selects data
//! byte 0, bit 0 selects data byte 7) and caches the last bytes it observed.
//! A matching frame produces a delta event only when one of the selected
//! bytes differs from that cache, which keeps the host link load tied to
//! actual vehicle state changes rather than to the bus frame rate.
//!
//! Event payload, type `0x62` id `0x01`:
//!
//! ```text
//! <can_id: u32 big-endian> <selected bytes, in data-byte order>
//! ```
//!
//! Sniff events use the same identity with all eight (zero-padded) data bytes.
use crate::{
    core::{ids, CanData, CAN_DATA_LEN, REGISTRY_CAPACITY},
    error::{GatewayError, SendError},
    protocol::{
        link::packet::TypedPacket,
        transport::{
            can_frame::CanFrame,
            traits::{byte_sink::ByteSink, frame_sender::FrameSender},
        },
    },
};
use heapless::Vec;

//==================================================================================Constants

/// Largest delta event payload: identifier plus eight selected bytes.
pub const MAX_EVENT_PAYLOAD: usize = 4 + CAN_DATA_LEN;

/// Bytes selected by a filter mask, in data-byte order.
pub type MaskedBytes = Vec<u8, CAN_DATA_LEN>;

//==================================================================================Filter

/// Registry entry selecting bytes of the frames carrying one CAN identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    can_id: u32,
    mask: u8,
    /// Last masked bytes reported to the host; `None` until the first one.
    cached: Option<MaskedBytes>,
}

impl Filter {
    pub fn new(can_id: u32, mask: u8) -> Self {
        Self {
            can_id,
            mask,
            cached: None,
        }
    }

    pub fn can_id(&self) -> u32 {
        self.can_id
    }

    pub fn mask(&self) -> u8 {
        self.mask
    }

    /// Number of data bytes the mask selects.
    pub fn selected_len(&self) -> usize {
        self.mask.count_ones() as usize
    }

    pub fn cached_value(&self) -> Option<&[u8]> {
        self.cached.as_deref()
    }

    /// Extract the selected bytes; mask bit 7 maps to data byte 0.
    pub fn extract(&self, data: &[u8; CAN_DATA_LEN]) -> MaskedBytes {
        data.iter()
            .enumerate()
            .filter(|(i, _)| self.mask & (0x80u8 >> *i) != 0)
            .map(|(_, byte)| *byte)
            .collect()
    }

    /// Selected bytes of `data` when they differ from the cache, `None` otherwise.
    /// The cache is left untouched until [`commit`](Self::commit).
    fn changed(&self, data: &[u8; CAN_DATA_LEN]) -> Option<MaskedBytes> {
        let current = self.extract(data);
        if self.cached.as_ref() == Some(&current) {
            return None;
        }
        Some(current)
    }

    /// Record bytes that reached the host as the last observed value.
    fn commit(&mut self, bytes: MaskedBytes) {
        self.cached = Some(bytes);
    }
}

//==================================================================================Dispatch

/// How a received frame was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Dispatch {
    /// Forwarded whole as a sniff event.
    Sniffed,
    /// Ran through the filters; `changed` delta events were emitted.
    Filtered { changed: usize },
}

//==================================================================================Gateway

/// Filter registry of capacity `N` plus the sniffer state.
#[derive(Debug)]
pub struct CanGateway<const N: usize = REGISTRY_CAPACITY> {
    filters: Vec<Filter, N>,
    sniffing: bool,
    sniffer: TypedPacket<CanData>,
}

impl<const N: usize> Default for CanGateway<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> CanGateway<N> {
    pub const fn new() -> Self {
        Self {
            filters: Vec::new(),
            sniffing: false,
            sniffer: TypedPacket::new(ids::CAN_EVENT, CanData::new()),
        }
    }

    /// Register a filter for `can_id`, replacing any filter already bound to it.
    ///
    /// The capacity check comes first: a full registry rejects every
    /// registration, a replacement included, and is left untouched.
    pub fn add_filter(&mut self, can_id: u32, mask: u8) -> Result<(), GatewayError> {
        if self.filters.is_full() {
            #[cfg(feature = "defmt")]
            defmt::warn!("Filter registry full, rejecting {=u32:#x}", can_id);
            return Err(GatewayError::RegistryFull { capacity: N });
        }
        self.remove_filter(can_id);
        self.filters
            .push(Filter::new(can_id, mask))
            .map_err(|_| GatewayError::RegistryFull { capacity: N })?;

        #[cfg(feature = "defmt")]
        defmt::info!("Filter {=u32:#x} registered, mask {=u8:#b}", can_id, mask);
        Ok(())
    }

    /// Remove the filter bound to `can_id`. Survivors keep their order.
    /// Returns whether anything was removed.
    pub fn remove_filter(&mut self, can_id: u32) -> bool {
        let before = self.filters.len();
        self.filters.retain(|filter| filter.can_id != can_id);
        let removed = self.filters.len() != before;
        #[cfg(feature = "defmt")]
        if removed {
            defmt::debug!("Filter {=u32:#x} removed", can_id);
        }
        removed
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
    }

    /// Registered filters in insertion order.
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn filter(&self, can_id: u32) -> Option<&Filter> {
        self.filters.iter().find(|filter| filter.can_id == can_id)
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn start_sniffer(&mut self) {
        #[cfg(feature = "defmt")]
        defmt::info!("CAN sniffer started");
        self.sniffing = true;
    }

    pub fn stop_sniffer(&mut self) {
        #[cfg(feature = "defmt")]
        defmt::info!("CAN sniffer stopped");
        self.sniffing = false;
    }

    pub fn is_sniffing(&self) -> bool {
        self.sniffing
    }

    /// Handle one received frame.
    ///
    /// With the sniffer on, or no filter registered, the whole frame goes out
    /// as a sniff event, without change suppression. Otherwise every filter
    /// bound to `can_id` compares its selected bytes with its cache; on a
    /// difference it emits a delta event, then updates the cache and calls
    /// `on_change(can_id, data, len)`. When the event cannot be written the
    /// cache keeps its previous value, so the next matching frame reports
    /// the change again.
    ///
    /// Data bytes at positions `>= len` are treated as zero.
    pub fn on_can_frame<S, F>(
        &mut self,
        can_id: u32,
        data: &[u8; CAN_DATA_LEN],
        len: usize,
        sink: &mut S,
        mut on_change: F,
    ) -> Result<Dispatch, SendError<S::Error>>
    where
        S: ByteSink + ?Sized,
        F: FnMut(u32, &[u8; CAN_DATA_LEN], usize),
    {
        let sniff = CanData::from_frame(can_id, data, len);

        if self.sniffing || self.filters.is_empty() {
            self.sniffer.set_payload(sniff);
            self.sniffer.serialize(sink)?;
            return Ok(Dispatch::Sniffed);
        }

        let mut padded = [0u8; CAN_DATA_LEN];
        padded.copy_from_slice(sniff.data());

        let mut changed = 0;
        for filter in self.filters.iter_mut().filter(|f| f.can_id == can_id) {
            let Some(bytes) = filter.changed(&padded) else {
                continue;
            };

            let mut payload = [0u8; MAX_EVENT_PAYLOAD];
            payload[..4].copy_from_slice(&can_id.to_be_bytes());
            payload[4..4 + bytes.len()].copy_from_slice(&bytes);
            // a failed write keeps the old cache so the change is retried
            sink.send_frame(ids::CAN_EVENT, &payload[..4 + bytes.len()])?;
            filter.commit(bytes);

            on_change(can_id, data, len);
            changed += 1;
        }
        Ok(Dispatch::Filtered { changed })
    }

    /// [`on_can_frame`](Self::on_can_frame) for a frame already copied from the driver.
    pub fn on_frame<S, F>(
        &mut self,
        frame: &CanFrame,
        sink: &mut S,
        on_change: F,
    ) -> Result<Dispatch, SendError<S::Error>>
    where
        S: ByteSink + ?Sized,
        F: FnMut(u32, &[u8; CAN_DATA_LEN], usize),
    {
        self.on_can_frame(frame.id, &frame.data, frame.len, sink, on_change)
    }
}
