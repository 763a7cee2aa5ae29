use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::{Error, Result};
use crate::scires::stream::ByteCursor;

const NUM_CHANNELS: usize = 16;
const HEADER_SIZE: usize = 1 + NUM_CHANNELS * 2;

const DELTA_ESCAPE: u8 = 0xf8;
const STATUS_STOP: u8 = 0xfc;
const STATUS_SYSTEM: u8 = 0xf;

#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum EventKind {
    NoteOff = 0x8,
    NoteOn = 0x9,
    KeyPressure = 0xa,
    Control = 0xb,
    Program = 0xc,
    Pressure = 0xd,
    PitchWheel = 0xe,
}

impl EventKind {
    pub fn data_len(&self) -> usize {
        match self {
            EventKind::Program | EventKind::Pressure => 1,
            _ => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EventKind::NoteOff => "NOTE_OFF",
            EventKind::NoteOn => "NOTE_ON",
            EventKind::KeyPressure => "KEY_PRESSURE",
            EventKind::Control => "CONTROL",
            EventKind::Program => "PROGRAM",
            EventKind::Pressure => "PRESSURE",
            EventKind::PitchWheel => "PITCH_WHEEL",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SoundEvent {
    /// Ticks since the previous emitted event.
    pub delta: u32,
    pub channel: u8,
    pub kind: EventKind,
    pub data: Vec<u8>,
}

#[derive(Debug)]
pub struct Sound0 {
    pub digital_sample: u8,
    pub channel_init: [[u8; 2]; NUM_CHANNELS],
    pub events: Vec<SoundEvent>,
    total_ticks: u32,
}

// The status an event is decoded with; system statuses are only skipped.
#[derive(Clone, Copy)]
enum Status {
    Channel(EventKind, u8),
    System,
}

fn parse_status(byte: u8) -> Result<Status> {
    let class = byte >> 4;
    if class == STATUS_SYSTEM {
        return Ok(Status::System);
    }
    let kind = EventKind::try_from(class)
        .map_err(|_| Error::format(format!("invalid sound status byte 0x{:02x}", byte)))?;
    Ok(Status::Channel(kind, byte & 0xf))
}

fn read_delta(rdr: &mut ByteCursor) -> Result<u32> {
    let mut delta = 0u32;
    loop {
        let byte = rdr.get()?;
        delta += byte as u32;
        if byte != DELTA_ESCAPE {
            return Ok(delta);
        }
    }
}

impl Sound0 {
    /// Decodes the header and event stream. Running out of data before the
    /// stop status is an error.
    pub fn new(data: &[u8]) -> Result<Self> {
        let mut rdr = ByteCursor::new(data);
        let digital_sample = rdr.get()?;
        let mut channel_init = [[0u8; 2]; NUM_CHANNELS];
        for init in channel_init.iter_mut() {
            init.copy_from_slice(rdr.get_bytes(2)?);
        }
        debug_assert_eq!(rdr.position(), HEADER_SIZE);

        let mut events = Vec::new();
        let mut running: Option<(EventKind, u8)> = None;
        let mut pending_delta = 0u32;
        let mut total_ticks = 0u32;
        while rdr.peek()? != STATUS_STOP {
            let delta = read_delta(&mut rdr)?;
            pending_delta += delta;
            total_ticks += delta;

            let (kind, channel) = if rdr.peek()? & 0x80 != 0 {
                let byte = rdr.get()?;
                if byte == STATUS_STOP {
                    break;
                }
                match parse_status(byte)? {
                    Status::Channel(kind, channel) => {
                        running = Some((kind, channel));
                        (kind, channel)
                    }
                    Status::System => {
                        log::trace!("sound: skipping system status 0x{:02x}", byte);
                        continue;
                    }
                }
            } else {
                running.ok_or_else(|| {
                    Error::format(format!("sound data byte at {} without a prior status", rdr.position()))
                })?
            };

            let data = rdr.get_bytes(kind.data_len())?.to_vec();
            events.push(SoundEvent { delta: pending_delta, channel, kind, data });
            pending_delta = 0;
        }
        log::debug!("sound: {} events, {} ticks", events.len(), total_ticks);
        Ok(Self { digital_sample, channel_init, events, total_ticks })
    }

    pub fn is_digital_sample(&self) -> bool {
        self.digital_sample != 0
    }

    pub fn get_channel_init(&self, channel: usize) -> Option<[u8; 2]> {
        self.channel_init.get(channel).copied()
    }

    /// Length of the piece in ticks, skipped system events included.
    pub fn total_ticks(&self) -> u32 {
        self.total_ticks
    }
}
