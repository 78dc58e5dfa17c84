// Integrity checker: parity-split XOR over raw frames.

#[cfg(test)]
mod tests {
    use histo_core::integrity::{checksum, ChecksumError, ChecksumResult};
    use proptest::prelude::*;

// # ✅ 1. Reference vector

    #[test]
    fn five_byte_frame() {
        let sum = checksum(&[0x01, 0x02, 0x03, 0x04, 0x05]).unwrap();
        assert_eq!(sum, ChecksumResult { even: 0x07, odd: 0x06 });
        assert_eq!(sum.to_string(), "even=0x07 odd=0x06");
        assert_eq!(sum.as_u16(), 0x0706);
    }

// # ✅ 2. Short frames never read out of bounds

    #[test]
    fn short_frames_are_rejected() {
        assert_eq!(checksum(&[]), Err(ChecksumError::FrameTooShort { len: 0 }));
        assert_eq!(checksum(&[0xFF]), Err(ChecksumError::FrameTooShort { len: 1 }));
    }

    #[test]
    fn odd_length_frame_folds_last_byte_into_even() {
        // indices 0,2,4 even; 1,3 odd
        let sum = checksum(&[0xF0, 0x0F, 0x0F, 0xF0, 0xFF]).unwrap();
        assert_eq!(sum.even, 0xF0 ^ 0x0F ^ 0xFF);
        assert_eq!(sum.odd, 0x0F ^ 0xF0);
    }

// # ✅ 3. Properties

    proptest! {
        #[test]
        fn prop_deterministic(frame in proptest::collection::vec(any::<u8>(), 2..512)) {
            prop_assert_eq!(checksum(&frame).unwrap(), checksum(&frame).unwrap());
        }

        #[test]
        fn prop_matches_index_parity(frame in proptest::collection::vec(any::<u8>(), 2..512)) {
            let sum = checksum(&frame).unwrap();
            let even = frame.iter().step_by(2).fold(0u8, |acc, b| acc ^ b);
            let odd = frame.iter().skip(1).step_by(2).fold(0u8, |acc, b| acc ^ b);
            prop_assert_eq!(sum, ChecksumResult { even, odd });
        }

        #[test]
        fn prop_short_frames_error(frame in proptest::collection::vec(any::<u8>(), 0..2)) {
            prop_assert!(checksum(&frame).is_err());
        }
    }
}
