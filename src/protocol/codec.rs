//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! ┌──────────────┬──────────┬──────────────┐
//! │ 04 20 69 (3) │  Op (1)  │ [Arg (1)]    │
//! └──────────────┴──────────┴──────────────┘
//! ```
//!
//! ### Response Format
//! ```text
//! ┌──────────────┬──────────┬──────────┬─────────────────┐
//! │ 04 20 69 (3) │  Op (1)  │ Type (1) │ Value (4, LE)   │
//! └──────────────┴──────────┴──────────┴─────────────────┘
//! ```

use std::io::{Read, Write};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{BridgeError, Result};
use super::{Command, Opcode, Response, ResponseKind};

/// Magic header present in every request and response
pub const HEADER: [u8; 3] = [0x04, 0x20, 0x69];

/// Size of a response frame
pub const RESPONSE_SIZE: usize = 9;

/// Largest request frame: header + opcode + argument
pub const MAX_COMMAND_SIZE: usize = HEADER.len() + 2;

// =============================================================================
// Command Encoding
// =============================================================================

/// Encode a command to bytes
///
/// The argument is only written for set-type opcodes.
pub fn encode_command(opcode: Opcode, argument: u8) -> Bytes {
    let mut frame = BytesMut::with_capacity(MAX_COMMAND_SIZE);
    frame.put_slice(&HEADER);
    frame.put_u8(opcode as u8);
    if opcode.has_argument() {
        frame.put_u8(argument);
    }
    frame.freeze()
}

/// Write a command to a stream as one write
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    let frame = encode_command(command.opcode, command.argument);
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to its 9-byte frame
pub fn encode_response(response: &Response) -> Bytes {
    let mut frame = BytesMut::with_capacity(RESPONSE_SIZE);
    frame.put_slice(&HEADER);
    frame.put_u8(response.opcode);
    frame.put_u8(response.kind.as_byte());
    frame.put_u32_le(response.value);
    frame.freeze()
}

/// Decode a complete 9-byte response frame
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    if bytes.len() != RESPONSE_SIZE {
        return Err(BridgeError::FrameLength {
            expected: RESPONSE_SIZE,
            actual: bytes.len(),
        });
    }

    let mut buf = bytes;
    let header = [buf.get_u8(), buf.get_u8(), buf.get_u8()];
    if header != HEADER {
        return Err(BridgeError::Protocol { header });
    }

    Ok(Response {
        opcode: buf.get_u8(),
        kind: ResponseKind::from_byte(buf.get_u8()),
        value: buf.get_u32_le(),
    })
}

/// Read one response frame from a stream
///
/// Relies on the reader's own timeout; the client uses a deadline-aware
/// loop instead.
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    let mut frame = [0u8; RESPONSE_SIZE];
    reader.read_exact(&mut frame)?;
    decode_response(&frame)
}

/// Write a response frame to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    writer.write_all(&encode_response(response))?;
    writer.flush()?;
    Ok(())
}
