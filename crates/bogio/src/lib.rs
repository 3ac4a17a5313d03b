//! `bogio`: async text-line I/O for the game server.
//!
//! Player connections are plain lines over a byte stream. The gateway owns
//! framing; everything above it only ever sees already-stripped lines.

pub mod line;

pub use line::LineReader;
