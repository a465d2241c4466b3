//! Serialized access to the shared sensor bus
//!
//! All thermocouple channels hang off one physical bus. The wire protocol is
//! a strict 32-clock exchange bracketed by an exclusive line select, so two
//! interleaved reads corrupt both frames. [`SharedBus`] owns the only handle
//! to the hardware and runs the full select/transfer/deselect sequence as one
//! critical section.
//!
//! The hardware itself sits behind the [`BusIo`] trait so the engine can be
//! exercised against a scripted double ([`ScriptedBus`]) without pins.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::errors::BusError;

/// Raw access to the physical bus
///
/// Implementations drive the actual line toggling; callers never use this
/// directly, only through [`SharedBus`], which enforces exclusivity.
pub trait BusIo: Send {
    /// Assert the chip-select line for `channel`
    fn select(&mut self, channel: u8) -> Result<(), BusError>;

    /// Clock in one full 32-bit frame
    fn transfer(&mut self) -> Result<u32, BusError>;

    /// Release the chip-select line for `channel`
    fn deselect(&mut self, channel: u8);
}

/// Exclusive-access guard around the physical bus
///
/// At most one frame read is in flight across all channels; concurrent
/// callers block on the internal mutex. The guard is released on every exit
/// path, including when the exchange fails mid-frame.
pub struct SharedBus<B: BusIo> {
    io: Mutex<B>,
}

impl<B: BusIo> SharedBus<B> {
    /// Wrap a bus implementation in the serializer
    pub fn new(io: B) -> Self {
        Self { io: Mutex::new(io) }
    }

    /// Read one raw frame from `channel`
    ///
    /// Runs select, transfer and deselect under the bus lock. The channel is
    /// deselected even when the transfer fails, so a failed read leaves the
    /// bus idle for the next caller.
    pub fn read_frame(&self, channel: u8) -> Result<u32, BusError> {
        let mut io = match self.io.lock() {
            Ok(io) => io,
            // A panicking holder cannot have left a select asserted past its
            // unwind, the frame it read is simply lost.
            Err(poisoned) => poisoned.into_inner(),
        };
        io.select(channel)?;
        let frame = io.transfer();
        io.deselect(channel);
        frame
    }
}

/// Scripted bus double for tests and dry runs
///
/// Channels answer from per-channel frame queues; an entry can also be an
/// injected I/O error. An exhausted queue reports an exchange failure, which
/// exercises the transient-failure path.
pub struct ScriptedBus {
    channels: Vec<VecDeque<Result<u32, BusError>>>,
    selected: Option<u8>,
    reads: u64,
}

impl ScriptedBus {
    /// Create a bus with `channel_count` empty channels
    pub fn new(channel_count: u8) -> Self {
        Self {
            channels: (0..channel_count).map(|_| VecDeque::new()).collect(),
            selected: None,
            reads: 0,
        }
    }

    /// Queue a frame on `channel`
    pub fn push_frame(&mut self, channel: u8, frame: u32) -> &mut Self {
        self.channels[channel as usize].push_back(Ok(frame));
        self
    }

    /// Queue `n` copies of `frame` on `channel`
    pub fn push_frames(&mut self, channel: u8, frame: u32, n: usize) -> &mut Self {
        for _ in 0..n {
            self.push_frame(channel, frame);
        }
        self
    }

    /// Queue an I/O failure on `channel`
    pub fn push_error(&mut self, channel: u8) -> &mut Self {
        self.channels[channel as usize].push_back(Err(BusError::Exchange("injected")));
        self
    }

    /// Total completed transfers
    pub fn reads(&self) -> u64 {
        self.reads
    }
}

impl BusIo for ScriptedBus {
    fn select(&mut self, channel: u8) -> Result<(), BusError> {
        if channel as usize >= self.channels.len() {
            return Err(BusError::BadChannel(channel));
        }
        assert!(self.selected.is_none(), "select while another channel is selected");
        self.selected = Some(channel);
        Ok(())
    }

    fn transfer(&mut self) -> Result<u32, BusError> {
        let channel = self.selected.expect("transfer without select");
        self.reads += 1;
        self.channels[channel as usize]
            .pop_front()
            .unwrap_or(Err(BusError::Exchange("script exhausted")))
    }

    fn deselect(&mut self, channel: u8) {
        assert_eq!(self.selected, Some(channel), "deselect of unselected channel");
        self.selected = None;
    }
}
