//! `tileio`: the small amount of socket IO the tile server needs.
//!
//! - LF/CRLF line framing for requests (`line`),
//! - `/begin/` .. `/end/` framed responses, chunked to a maximum packet size (`packet`).

pub mod line;
pub mod packet;

pub use line::LineReader;
pub use packet::{MAX_PACKET_SIZE, PacketWriter};
