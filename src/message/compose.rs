//! Field encoders and payload composition.
//!
//! Each encoder returns a tagged [`BitField`]; concatenation produces the
//! 77-bit payload, and [`payload174`] appends the CRC and LDPC parity to
//! form a complete codeword.

use crate::crc::crc14;
use crate::fields::BitField;
use crate::ldpc;

use super::callsign::{pack_c58, pack_callsign};
use super::error::DecodeError;
use super::grid::pack_grid;

fn field(bits: usize, value: u64, tag: &'static str) -> BitField {
    // width/value pairs here are produced by the codecs below and always fit
    BitField::tagged(bits, value, tag).expect("field value fits its width")
}

/// 28-bit callsign field.
pub fn encode_c28(callsign: &str) -> Result<BitField, DecodeError> {
    Ok(field(28, pack_callsign(callsign)? as u64, "c28"))
}

/// 58-bit non-standard callsign field.
pub fn encode_c58(callsign: &str) -> Result<BitField, DecodeError> {
    Ok(field(58, pack_c58(callsign)?, "c58"))
}

/// 15-bit grid / report field.
pub fn encode_g15(text: &str) -> Result<BitField, DecodeError> {
    Ok(field(15, pack_grid(text)? as u64, "g15"))
}

/// Rover flag: `""` or `"/R"`.
pub fn encode_rover(text: &str) -> Result<BitField, DecodeError> {
    let value = match text {
        "" => 0,
        "/R" => 1,
        _ => {
            return Err(DecodeError::BadChar {
                field: "r1",
                ch: text.chars().next().unwrap_or(' '),
            })
        }
    };
    Ok(field(1, value, "r1"))
}

/// Acknowledge flag: `""` or `"R"`.
pub fn encode_ack(text: &str) -> Result<BitField, DecodeError> {
    let value = match text {
        "" => 0,
        "R" => 1,
        _ => {
            return Err(DecodeError::BadChar {
                field: "R1",
                ch: text.chars().next().unwrap_or(' '),
            })
        }
    };
    Ok(field(1, value, "R1"))
}

/// Reply token: `""`, `"RRR"`, `"RR73"` or `"73"`.
pub fn encode_r2(text: &str) -> Result<BitField, DecodeError> {
    let value = match text {
        "" => 0,
        "RRR" => 1,
        "RR73" => 2,
        "73" => 3,
        _ => {
            return Err(DecodeError::BadChar {
                field: "r2",
                ch: text.chars().next().unwrap_or(' '),
            })
        }
    };
    Ok(field(2, value, "r2"))
}

/// Message type field, 0..=7.
pub fn encode_i3(value: u8) -> Result<BitField, DecodeError> {
    if value > 7 {
        return Err(DecodeError::OutOfRange {
            field: "i3",
            value: value as u64,
        });
    }
    Ok(field(3, value as u64, "i3"))
}

/// Message sub-type field, 0..=5.
pub fn encode_n3(value: u8) -> Result<BitField, DecodeError> {
    if value > 5 {
        return Err(DecodeError::OutOfRange {
            field: "n3",
            value: value as u64,
        });
    }
    Ok(field(3, value as u64, "n3"))
}

/// Compose a standard (type 1) payload:
/// `c28 r1 c28 r1 R1 g15 i3` = 77 bits.
pub fn compose_standard(
    call1: &str,
    rover1: &str,
    call2: &str,
    rover2: &str,
    ack: &str,
    grid: &str,
    message_type: u8,
) -> Result<BitField, DecodeError> {
    let payload = encode_c28(call1)?
        .concat(&encode_rover(rover1)?)
        .concat(&encode_c28(call2)?)
        .concat(&encode_rover(rover2)?)
        .concat(&encode_ack(ack)?)
        .concat(&encode_g15(grid)?)
        .concat(&encode_i3(message_type)?);
    debug_assert_eq!(payload.len(), 77);
    Ok(payload)
}

/// Append the CRC-14 and the 83 LDPC parity bits to a 77-bit payload.
pub fn payload174(message: &BitField) -> Result<BitField, DecodeError> {
    if message.len() != 77 {
        return Err(DecodeError::ShortInput {
            field: "payload174",
            needed: 77,
            got: message.len(),
        });
    }
    let crc = crc14(message.as_bits());
    let with_crc = message.concat(&field(14, crc as u64, "cs14"));
    let parity = ldpc::encode(with_crc.as_bits());
    let parity_field =
        BitField::from_bits_tagged(83, parity, &[("ldpc83", 83)]).expect("83 parity bits");
    Ok(with_crc.concat(&parity_field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc::crc14_check;
    use crate::fields::MessageType;
    use crate::ldpc;

    #[test]
    fn standard_payload_layout() {
        let payload = compose_standard("CQ", "", "KG5YJE", "", "", "EM13", 1).unwrap();
        assert_eq!(payload.len(), 77);
        // the trailing three bits carry the message type
        let i3 = payload.select("i3", 0).unwrap();
        assert_eq!(i3.value(), 1);
    }

    #[test]
    fn overlay_matches_standalone_field() {
        let payload = compose_standard("CQ", "", "KG5YJE", "", "", "EM13", 1).unwrap();
        let selected = payload.overlay(MessageType::Std, "c28", 1);
        let standalone = encode_c28("KG5YJE").unwrap();
        assert_eq!(selected, standalone.as_bits().to_bitvec());
    }

    #[test]
    fn full_codeword_passes_crc_and_parity() {
        let payload = compose_standard("CQ", "", "KG5YJE", "", "", "EM13", 1).unwrap();
        let codeword = payload174(&payload).unwrap();
        assert_eq!(codeword.len(), 174);
        assert!(crc14_check(codeword.as_bits()));
        assert_eq!(ldpc::score(codeword.as_bits()), 83);
    }

    #[test]
    fn flag_encoders_reject_unknown_tokens() {
        assert!(encode_rover("/P").is_err());
        assert!(encode_ack("RR").is_err());
        assert!(encode_r2("R73").is_err());
        assert!(encode_i3(8).is_err());
        assert!(encode_n3(6).is_err());
    }
}
