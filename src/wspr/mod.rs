//! WSPR forward error correction and message codec.
//!
//! A WSPR transmission carries 50 payload bits through a K=32, rate 1/2
//! convolutional code (81 input bits with tail zeros, 162 channel symbols),
//! interleaved by bit-reversed index. Decoding runs the Fano sequential
//! algorithm over soft symbols, then unpacks callsign, grid and power.

mod fano;
mod message;

pub use fano::{deinterleave, encode, fano, interleave, FanoResult, POLY1, POLY2};
pub use message::{nhash, unpack_message, WsprHashTable, WsprMessage};
