//! FT8 message codec: 77-bit payload packing and unpacking.
//!
//! Field-level codecs (c28, c58, g15, ...) produce and consume
//! [`BitField`](crate::fields::BitField) values; [`compose`] assembles them
//! into payloads and full 79-tone frames, and [`unpack`] renders decoded
//! payloads back to message text.

mod callsign;
mod compose;
mod error;
mod frame;
mod grid;
mod hash_cache;
mod unpack;

pub use callsign::{hash10, hash12, hash22, pack_callsign, unpack_callsign};
pub use compose::{
    compose_standard, encode_ack, encode_c28, encode_c58, encode_g15, encode_i3, encode_n3,
    encode_r2, encode_rover, payload174,
};
pub use error::DecodeError;
pub use frame::{costas_score, frame237, frame_tones, tones_to_llr};
pub use grid::{pack_grid, unpack_grid};
pub use hash_cache::CallsignHashCache;
pub use unpack::unpack77;
