//! Raw frame decoder for the thermocouple amplifier
//!
//! One bus exchange yields a 32-bit frame laid out as:
//!
//! ```text
//! D31..D18  probe temperature, 14-bit two's complement, 0.25 °C/LSB
//! D17       reserved
//! D16       fault flag
//! D15..D4   reference junction, 12-bit two's complement, 0.0625 °C/LSB
//! D3        reserved
//! D2        SCV: short to VCC
//! D1        SCG: short to ground
//! D0        OC:  open circuit
//! ```
//!
//! Decoding is a pure function of the frame; the same frame always produces
//! the same reading or fault.

use crate::errors::FaultKind;

/// Fault flag, D16
const FAULT_BIT: u32 = 0x10000;
/// Open-circuit fault, D0
const OC_BIT: u32 = 0x1;
/// Short-to-ground fault, D1
const SCG_BIT: u32 = 0x2;
/// Short-to-VCC fault, D2
const SCV_BIT: u32 = 0x4;

/// Decoded temperatures from one fault-free frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Measured thermocouple junction temperature, °C
    pub probe_celsius: f64,
    /// Cold-junction compensation temperature, °C
    pub reference_celsius: f64,
}

/// Decode a raw 32-bit frame into temperatures, or classify its fault
///
/// Fault bits take priority over the temperature fields: a frame with the
/// fault flag set never yields a reading, even though the probe field may
/// still hold plausible bits.
pub fn decode(frame: u32) -> Result<Reading, FaultKind> {
    if frame & FAULT_BIT != 0 {
        // Specific bits win over the generic flag, in fixed priority order.
        return Err(if frame & OC_BIT != 0 {
            FaultKind::OpenCircuit
        } else if frame & SCG_BIT != 0 {
            FaultKind::ShortToGround
        } else if frame & SCV_BIT != 0 {
            FaultKind::ShortToVcc
        } else {
            FaultKind::Unknown
        });
    }

    let probe = twos_complement((frame >> 18) & 0x3FFF, 0x2000, 0x1FFF);
    let reference = twos_complement((frame >> 4) & 0xFFF, 0x800, 0x7FF);

    Ok(Reading {
        probe_celsius: probe as f64 * 0.25,
        reference_celsius: reference as f64 * 0.0625,
    })
}

/// Interpret `field` as two's complement with the given sign bit and
/// magnitude mask
fn twos_complement(field: u32, sign_bit: u32, magnitude_mask: u32) -> i32 {
    if field & sign_bit != 0 {
        -((((!field) & magnitude_mask) + 1) as i32)
    } else {
        (field & magnitude_mask) as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Build a fault-free frame from raw probe and reference fields
    fn frame_of(probe_field: u32, reference_field: u32) -> u32 {
        ((probe_field & 0x3FFF) << 18) | ((reference_field & 0xFFF) << 4)
    }

    #[test]
    fn zero_frame() {
        let r = decode(0).unwrap();
        assert_eq!(r.probe_celsius, 0.0);
        assert_eq!(r.reference_celsius, 0.0);
    }

    #[test]
    fn positive_probe() {
        // 100.0 °C = 400 LSB
        let r = decode(frame_of(400, 0)).unwrap();
        assert_eq!(r.probe_celsius, 100.0);
    }

    #[test]
    fn probe_boundaries() {
        // Max positive magnitude: no sign flip
        let r = decode(frame_of(0x1FFF, 0)).unwrap();
        assert_eq!(r.probe_celsius, 2047.75);

        // Sign bit alone: most negative representable
        let r = decode(frame_of(0x2000, 0)).unwrap();
        assert_eq!(r.probe_celsius, -2048.0);

        // All ones: -1 LSB
        let r = decode(frame_of(0x3FFF, 0)).unwrap();
        assert_eq!(r.probe_celsius, -0.25);
    }

    #[test]
    fn reference_junction() {
        // 25.0 °C = 400 LSB at 0.0625 °C/LSB
        let r = decode(frame_of(0, 400)).unwrap();
        assert_eq!(r.reference_celsius, 25.0);

        // All-ones reference field: -0.0625
        let r = decode(frame_of(0, 0xFFF)).unwrap();
        assert_eq!(r.reference_celsius, -0.0625);
    }

    #[test]
    fn fault_priority() {
        // OC and SCG both set: open circuit wins
        assert_eq!(
            decode(FAULT_BIT | OC_BIT | SCG_BIT),
            Err(FaultKind::OpenCircuit)
        );
        assert_eq!(decode(FAULT_BIT | SCG_BIT | SCV_BIT), Err(FaultKind::ShortToGround));
        assert_eq!(decode(FAULT_BIT | SCV_BIT), Err(FaultKind::ShortToVcc));
        assert_eq!(decode(FAULT_BIT), Err(FaultKind::Unknown));
    }

    #[test]
    fn fault_bits_without_flag_are_ignored() {
        // Specific bits only matter when D16 is set
        assert!(decode(OC_BIT | SCG_BIT | SCV_BIT).is_ok());
    }

    proptest! {
        #[test]
        fn decode_is_pure(frame in any::<u32>()) {
            prop_assert_eq!(decode(frame), decode(frame));
        }

        #[test]
        fn fault_free_frames_always_decode(frame in any::<u32>()) {
            let frame = frame & !FAULT_BIT;
            let r = decode(frame).unwrap();
            // Field widths bound the decoded values
            prop_assert!((-2048.0..=2047.75).contains(&r.probe_celsius));
            prop_assert!((-128.0..=127.9375).contains(&r.reference_celsius));
        }
    }
}
