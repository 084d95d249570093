
pub mod constants;
pub mod crc;
pub mod dsp;
pub mod fields;
pub mod ldpc;
pub mod message;
pub mod report;
pub mod source;
pub mod tracing_init;
pub mod window;
pub mod wspr;

pub use fields::{BitField, MessageType};
pub use message::CallsignHashCache;
pub use window::{SessionConfig, SpotLedger};
