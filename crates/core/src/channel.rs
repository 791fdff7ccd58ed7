// LabWired FI Profiler - Fault-Injection Test Target
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::frame::{self, Frame, FrameError, FrameReader, RESET_SEQUENCE};

/// Failures reported by a board's serial driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("receiver overrun")]
    Overrun,
    #[error("framing error on the line")]
    Framing,
    #[error("noise detected on the line")]
    Noise,
    #[error("parity error")]
    Parity,
    #[error("serial port closed")]
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
    #[error("frame: {0}")]
    Frame(#[from] FrameError),
}

/// Blocking byte transport provided by the board (usually a UART).
pub trait SerialPort {
    /// Blocks until a byte arrives.
    fn read_byte(&mut self) -> Result<u8, TransportError>;

    /// Blocks until `byte` is accepted by the transmitter.
    fn write_byte(&mut self, byte: u8) -> Result<(), TransportError>;

    /// Blocks until every written byte has left the transmitter.
    fn flush(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Packet level view of the link to the host instrument.
pub trait PacketChannel {
    /// Blocks until the next packet arrives. The payload borrows the
    /// channel's receive buffer.
    fn read_command(&mut self) -> Result<Frame<'_>, ChannelError>;

    fn write_packet(&mut self, cmd: u8, payload: &[u8]) -> Result<(), ChannelError>;

    /// Acknowledges `cmd` with a payload-free packet carrying the same
    /// command byte.
    fn send_ack(&mut self, cmd: u8) -> Result<(), ChannelError> {
        self.write_packet(cmd, &[])
    }

    fn send_reset_marker(&mut self) -> Result<(), ChannelError>;
}

/// [`PacketChannel`] speaking the SimpleSerial framing over a [`SerialPort`].
///
/// `N` sizes both the receive buffer and the transmit scratch buffer; it must
/// exceed the largest payload written by one byte for the checksum.
#[derive(Debug)]
pub struct SimpleSerial<P, const N: usize> {
    port: P,
    reader: FrameReader<N>,
    scratch: [u8; N],
}

impl<P: SerialPort, const N: usize> SimpleSerial<P, N> {
    pub fn new(port: P) -> Self {
        Self {
            port,
            reader: FrameReader::new(),
            scratch: [0; N],
        }
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn into_inner(self) -> P {
        self.port
    }

    fn write_all(&mut self, bytes: impl IntoIterator<Item = u8>) -> Result<(), TransportError> {
        for byte in bytes {
            self.port.write_byte(byte)?;
        }
        self.port.flush()
    }
}

impl<P: SerialPort, const N: usize> PacketChannel for SimpleSerial<P, N> {
    fn read_command(&mut self) -> Result<Frame<'_>, ChannelError> {
        loop {
            let byte = match self.port.read_byte() {
                Ok(byte) => byte,
                Err(err) => {
                    self.reader.clear();
                    return Err(err.into());
                }
            };
            if self.reader.push(byte) {
                break;
            }
        }
        Ok(self.reader.frame()?)
    }

    fn write_packet(&mut self, cmd: u8, payload: &[u8]) -> Result<(), ChannelError> {
        if cmd == frame::FRAME_BYTE {
            return Err(FrameError::ReservedCommand.into());
        }
        let sealed = frame::seal(payload, &mut self.scratch)?;
        for byte in frame::encode_iter(cmd, sealed) {
            self.port.write_byte(byte)?;
        }
        self.port.flush()?;
        Ok(())
    }

    fn send_reset_marker(&mut self) -> Result<(), ChannelError> {
        Ok(self.write_all(RESET_SEQUENCE)?)
    }
}
