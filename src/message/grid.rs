//! Maidenhead grid / report field (g15).

use super::error::DecodeError;

/// Values above this encode reports and the special tokens rather than a
/// four-character grid square.
const NGBASE: u32 = 180 * 180;

/// Pack a grid square, special token or signal report into 15 bits.
///
/// Accepts `AA00`..`RR99`, the empty string, `RRR`, `RR73`, `73`, and
/// signed reports `-30`..`+49` (rendered like `+05` / `-12`).
pub fn pack_grid(text: &str) -> Result<u32, DecodeError> {
    match text {
        "" => return Ok(NGBASE + 1),
        "RRR" => return Ok(NGBASE + 2),
        "RR73" => return Ok(NGBASE + 3),
        "73" => return Ok(NGBASE + 4),
        _ => {}
    }

    let chars: Vec<char> = text.chars().collect();
    if chars.len() == 4
        && ('A'..='R').contains(&chars[0])
        && ('A'..='R').contains(&chars[1])
        && chars[2].is_ascii_digit()
        && chars[3].is_ascii_digit()
    {
        let l0 = chars[0] as u32 - 'A' as u32;
        let l1 = chars[1] as u32 - 'A' as u32;
        let d0 = chars[2] as u32 - '0' as u32;
        let d1 = chars[3] as u32 - '0' as u32;
        return Ok(((l0 * 18 + l1) * 10 + d0) * 10 + d1);
    }

    if let Ok(report) = text.parse::<i32>() {
        if (-30..=49).contains(&report) {
            return Ok((NGBASE as i32 + 35 + report) as u32);
        }
        return Err(DecodeError::OutOfRange {
            field: "g15",
            value: report.unsigned_abs() as u64,
        });
    }

    Err(DecodeError::BadChar {
        field: "g15",
        ch: chars.first().copied().unwrap_or(' '),
    })
}

/// Unpack a 15-bit grid field. `acknowledge` is the R flag preceding the
/// grid in the payload; it prefixes reports with `R`.
pub fn unpack_grid(ng: u32, acknowledge: bool) -> Result<String, DecodeError> {
    if ng < NGBASE {
        let mut n = ng;
        let d1 = n % 10;
        n /= 10;
        let d0 = n % 10;
        n /= 10;
        let l1 = n % 18;
        n /= 18;
        let l0 = n;
        if l0 >= 18 {
            return Err(DecodeError::OutOfRange {
                field: "g15",
                value: ng as u64,
            });
        }
        return Ok(format!(
            "{}{}{}{}",
            (b'A' + l0 as u8) as char,
            (b'A' + l1 as u8) as char,
            d0,
            d1
        ));
    }

    Ok(match ng - NGBASE {
        1 => String::new(),
        2 => "RRR".to_string(),
        3 => "RR73".to_string(),
        4 => "73".to_string(),
        v => {
            let report = v as i32 - 35;
            let r = if acknowledge { "R" } else { "" };
            if report >= 0 {
                format!("{r}+{report:02}")
            } else {
                format!("{r}-{:02}", -report)
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("AA00", 0)]
    #[case("EM13", ((4 * 18 + 12) * 10 + 1) * 10 + 3)]
    #[case("RR99", ((17 * 18 + 17) * 10 + 9) * 10 + 9)]
    fn grid_reference_values(#[case] text: &str, #[case] expected: u32) {
        assert_eq!(pack_grid(text).unwrap(), expected);
        assert_eq!(unpack_grid(expected, false).unwrap(), text);
    }

    #[test]
    fn special_tokens() {
        assert_eq!(unpack_grid(pack_grid("").unwrap(), false).unwrap(), "");
        assert_eq!(unpack_grid(pack_grid("RRR").unwrap(), false).unwrap(), "RRR");
        assert_eq!(unpack_grid(pack_grid("RR73").unwrap(), false).unwrap(), "RR73");
        assert_eq!(unpack_grid(pack_grid("73").unwrap(), false).unwrap(), "73");
    }

    #[test]
    fn reports_round_trip_with_ack_prefix() {
        assert_eq!(unpack_grid(pack_grid("+05").unwrap(), false).unwrap(), "+05");
        assert_eq!(unpack_grid(pack_grid("-12").unwrap(), false).unwrap(), "-12");
        assert_eq!(unpack_grid(pack_grid("-12").unwrap(), true).unwrap(), "R-12");
        assert!(pack_grid("-31").is_err());
        assert!(pack_grid("+50").is_err());
    }

    #[test]
    fn malformed_grid_is_rejected() {
        assert!(pack_grid("ZZ00").is_err());
        assert!(pack_grid("E1M3").is_err());
    }
}
