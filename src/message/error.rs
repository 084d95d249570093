use snafu::Snafu;

/// Failure modes of the field codecs. Candidate-level decode failures
/// (FEC, CRC, sync) are not errors; these cover malformed values only.
#[derive(Debug, Snafu, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A numeric value falls outside the range a field can carry.
    #[snafu(display("{value} is out of range for {field}"))]
    OutOfRange { field: &'static str, value: u64 },

    /// A character is not part of the field's alphabet.
    #[snafu(display("character {ch:?} cannot be encoded in {field}"))]
    BadChar { field: &'static str, ch: char },

    /// Fewer bits or characters than the field requires.
    #[snafu(display("{field} needs {needed} bits, got {got}"))]
    ShortInput {
        field: &'static str,
        needed: usize,
        got: usize,
    },

    /// A hash reference with no stored callsign.
    #[snafu(display("no callsign stored under hash {hash:#x}"))]
    HashMiss { hash: u32 },
}
