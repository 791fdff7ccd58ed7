// LabWired FI Profiler - Fault-Injection Test Target
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! SimpleSerial style packet framing.
//!
//! A packet is a command byte followed by an optional COBS block and a
//! `0x00` terminator:
//!
//! ```text
//! [cmd, 0x00]                                  no payload (also used for acks)
//! [cmd, COBS(payload ++ [crc8(payload)]), 0x00]  with payload
//! ```
//!
//! The command byte is never stuffed, so it must not be `0x00`.

use crate::Command;

/// Terminates every frame.
pub const FRAME_BYTE: u8 = 0x00;

/// Announced once per boot. Hosts see it as an `'r'` packet wrapped in
/// empty frames, which keeps it recognisable after a partial line.
pub const RESET_SEQUENCE: [u8; 7] = [0x00, 0x00, 0x00, Command::Reset.byte(), 0x00, 0x00, 0x00];

/// Generator polynomial of the payload checksum.
pub const CRC_POLY: u8 = 0x4D;

/// CRC-8 with polynomial [`CRC_POLY`], zero initial value, no reflection and
/// no final XOR.
pub const fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    let mut i = 0;
    while i < data.len() {
        crc ^= data[i];
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ CRC_POLY
            } else {
                crc << 1
            };
            bit += 1;
        }
        i += 1;
    }
    crc
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("empty frame")]
    Empty,
    #[error("frame is not terminated by 0x00")]
    Unterminated,
    #[error("frame exceeds the {capacity} byte receive buffer")]
    Overflow { capacity: usize },
    #[error("{len} byte payload does not fit the {capacity} byte frame buffer")]
    PayloadTooLarge { len: usize, capacity: usize },
    #[error("command byte 0x00 is reserved as the frame terminator")]
    ReservedCommand,
    #[error("malformed COBS block")]
    Cobs,
    #[error("CRC mismatch: computed {computed:#04x}, received {received:#04x}")]
    Crc { computed: u8, received: u8 },
}

/// One decoded packet. The payload borrows the buffer it was decoded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub cmd: u8,
    pub payload: &'a [u8],
}

impl Frame<'_> {
    pub fn command(&self) -> Option<Command> {
        Command::from_byte(self.cmd)
    }
}

/// Decodes a single frame in place.
///
/// `frame` must hold exactly one packet including its terminating
/// [`FRAME_BYTE`]. The COBS block is unstuffed inside `frame`, so the buffer
/// content is no longer a valid encoding afterwards.
pub fn decode_in_place(frame: &mut [u8]) -> Result<Frame<'_>, FrameError> {
    let body_len = match frame.split_last() {
        Some((&FRAME_BYTE, body)) => body.len(),
        _ => return Err(FrameError::Unterminated),
    };

    match body_len {
        0 => Err(FrameError::Empty),
        1 => Ok(Frame {
            cmd: frame[0],
            payload: &[],
        }),
        _ => {
            let (head, block) = frame.split_at_mut(1);
            let cmd = head[0];
            let decoded = corncobs::decode_in_place(block).map_err(|_| FrameError::Cobs)?;
            let (&received, payload) = block[..decoded].split_last().ok_or(FrameError::Cobs)?;
            let computed = crc8(payload);
            if computed != received {
                return Err(FrameError::Crc { computed, received });
            }
            Ok(Frame { cmd, payload })
        }
    }
}

/// Copies `payload` into `scratch` and appends its checksum, producing the
/// block that [`encode_iter`] stuffs. An empty payload seals to an empty
/// block.
pub fn seal<'s>(payload: &[u8], scratch: &'s mut [u8]) -> Result<&'s [u8], FrameError> {
    if payload.is_empty() {
        return Ok(&[]);
    }
    let len = payload.len();
    if len >= scratch.len() {
        return Err(FrameError::PayloadTooLarge {
            len,
            capacity: scratch.len(),
        });
    }
    scratch[..len].copy_from_slice(payload);
    scratch[len] = crc8(payload);
    Ok(&scratch[..=len])
}

/// Yields the wire bytes of one packet, terminator included.
///
/// `sealed` comes from [`seal`]; pass an empty slice for a payload-free
/// packet.
pub fn encode_iter(cmd: u8, sealed: &[u8]) -> impl Iterator<Item = u8> + '_ {
    let bare = sealed.is_empty();
    let block = (!bare).then(|| corncobs::encode_iter(sealed));
    core::iter::once(cmd)
        .chain(block.into_iter().flatten())
        .chain(bare.then_some(FRAME_BYTE))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderState {
    Filling,
    /// Too long; dropping bytes until the next terminator.
    Overflowed,
    Terminated,
    /// Terminator of an overflowed frame seen.
    Overran,
}

/// Accumulates received bytes until a terminator completes a frame.
///
/// `N` bounds the encoded frame including its terminator. Oversized frames
/// are dropped whole; the reader resynchronises on the next terminator.
#[derive(Debug)]
pub struct FrameReader<const N: usize> {
    buf: [u8; N],
    len: usize,
    state: ReaderState,
}

impl<const N: usize> Default for FrameReader<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> FrameReader<N> {
    const HAS_ROOM: () = assert!(N >= 2, "frame buffer must hold a command and a terminator");

    pub const fn new() -> Self {
        let () = Self::HAS_ROOM;
        Self {
            buf: [0; N],
            len: 0,
            state: ReaderState::Filling,
        }
    }

    /// Feeds one byte. Returns `true` when `byte` terminated a frame, which
    /// is then available through [`FrameReader::frame`].
    pub fn push(&mut self, byte: u8) -> bool {
        if matches!(self.state, ReaderState::Terminated | ReaderState::Overran) {
            self.clear();
        }

        if byte == FRAME_BYTE {
            self.state = match self.state {
                ReaderState::Overflowed => ReaderState::Overran,
                _ => {
                    self.buf[self.len] = FRAME_BYTE;
                    self.len += 1;
                    ReaderState::Terminated
                }
            };
            return true;
        }

        if self.state == ReaderState::Filling {
            // keep one slot for the terminator
            if self.len + 1 < N {
                self.buf[self.len] = byte;
                self.len += 1;
            } else {
                self.state = ReaderState::Overflowed;
            }
        }
        false
    }

    /// Decodes the frame completed by the last [`FrameReader::push`].
    ///
    /// The buffer is decoded in place, so a second call for the same frame
    /// reports [`FrameError::Unterminated`].
    pub fn frame(&mut self) -> Result<Frame<'_>, FrameError> {
        match self.state {
            ReaderState::Overran => Err(FrameError::Overflow { capacity: N }),
            ReaderState::Filling | ReaderState::Overflowed => Err(FrameError::Unterminated),
            ReaderState::Terminated => {
                let len = core::mem::take(&mut self.len);
                decode_in_place(&mut self.buf[..len])
            }
        }
    }

    /// Drops any partially received frame.
    pub fn clear(&mut self) {
        self.len = 0;
        self.state = ReaderState::Filling;
    }
}
