//! Protocol Module
//!
//! Defines the wire protocol spoken by the bridge command server.
//!
//! ## Protocol Format
//!
//! Every frame starts with the magic header `04 20 69`. It lets either side
//! notice a desynchronised stream; nothing resynchronises automatically.
//!
//! ### Request Format
//! ```text
//! ┌──────────────┬──────────┬──────────────┐
//! │ Header (3)   │  Op (1)  │ [Arg (1)]    │
//! └──────────────┴──────────┴──────────────┘
//! ```
//!
//! ### Opcodes
//! - 0x00: SET boot mode        - Arg: 0 (NAND) / 1 (SD card)
//! - 0x01: GET boot mode
//! - 0x02: RESET board
//! - 0x03: SET XVC running      - Arg: 0 / 1
//! - 0x04: GET XVC running
//! - 0x05: SET serial running   - Arg: 0 / 1
//! - 0x06: GET serial running
//! - 0x07: RECONFIG wifi        - no response
//! - 0x08: SET logger state     - Arg: 0 / 1
//! - 0x09: GET logger state
//! - 0x0A: RESET server         - no response
//! - 0x64: TEST
//!
//! ### Response Format
//! ```text
//! ┌──────────────┬──────────┬──────────┬─────────────────┐
//! │ Header (3)   │  Op (1)  │ Type (1) │ Value (4, LE)   │
//! └──────────────┴──────────┴──────────┴─────────────────┘
//! ```
//!
//! ### Response Types
//! - 0x00: STATUS

mod command;
mod response;
mod codec;

pub use command::{Command, Opcode};
pub use response::{Response, ResponseKind};
pub use codec::{
    encode_command, decode_response, encode_response,
    read_response, write_command, write_response,
    HEADER, MAX_COMMAND_SIZE, RESPONSE_SIZE,
};
