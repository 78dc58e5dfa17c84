// Object decoder: outcomes, tolerance, and robustness against bad input.

#[cfg(test)]
mod tests {
    use histo_core::constants::histogram_fields as hf;
    use histo_core::objects::{
        decode, encode_histogram, DecodedObject, HistogramDraft, ObjectDecoder, ObjectError, ObjectWriter, TypeTag,
        WireType,
    };
    use proptest::prelude::*;

    fn th1f() -> TypeTag {
        TypeTag::from_name("TH1F").unwrap()
    }

    fn centered_1_2_3() -> Vec<u8> {
        let draft = HistogramDraft::from_centers("TH1F", "h1", &[1.0, 2.0, 3.0], &[10.0, 20.0, 10.0]);
        encode_histogram(&draft).unwrap()
    }

    /// Minimal hand-written TH1D body with the given extra fields appended.
    fn th1d_with(extra: impl FnOnce(&mut ObjectWriter)) -> Vec<u8> {
        let mut w = ObjectWriter::new("TH1D", 3);
        w.put_u32(hf::NBINS, 2)
            .put_f64(hf::X_MIN, 0.0)
            .put_f64(hf::X_MAX, 2.0)
            .put_f64_array(hf::CONTENTS, &[0.0, 1.0, 3.0, 0.0]);
        extra(&mut w);
        w.finish().unwrap()
    }

// # ✅ 1. Mean of a simple histogram

    #[test]
    fn bins_at_1_2_3_have_mean_2() {
        let decoded = decode(&centered_1_2_3(), &th1f());
        let h = decoded.histogram().expect("histogram outcome");
        assert_eq!(h.class_name(), "TH1F");
        assert_eq!(h.name(), "h1");
        assert_eq!(h.nbins(), 3);
        assert!((h.mean() - 2.0).abs() < 1e-12);
        assert_eq!(h.entries(), 40.0);
    }

// # ✅ 2. Round trip keeps bins, statistics and metadata

    #[test]
    fn filled_draft_round_trips() {
        let mut draft = HistogramDraft::uniform("TH1D", "gaus", 10, -5.0, 5.0).title("a title");
        for (i, x) in [-4.5, -1.2, 0.1, 0.2, 0.3, 1.7, 2.2, 9.0].iter().enumerate() {
            draft.fill(*x, 1.0 + i as f64 * 0.5).unwrap();
        }
        let wire = encode_histogram(&draft).unwrap();

        let decoded = ObjectDecoder::for_type("TH1D").unwrap().decode(&wire);
        let h = decoded.histogram().unwrap();
        assert_eq!(h.title(), "a title");
        assert_eq!(h.contents(), draft.contents.as_slice());
        assert_eq!(h.stored_stats(), draft.stats);

        let s = draft.stats.unwrap();
        assert!((h.mean() - s.sumwx / s.sumw).abs() < 1e-12);
        // the 9.0 fill lands in overflow, which is excluded from the stats
        assert_eq!(h.stats().overflow, 1.0 + 7.0 * 0.5);
        assert_eq!(h.entries(), 8.0);
    }

    #[test]
    fn variable_bins_round_trip() {
        let draft = HistogramDraft::with_edges("TH1D", "v", vec![0.0, 1.0, 4.0, 10.0]);
        let wire = encode_histogram(&draft).unwrap();
        let decoded = decode(&wire, &TypeTag::from_name("TH1D").unwrap());
        let h = decoded.histogram().unwrap();
        assert_eq!(h.axis().edges(), &[0.0, 1.0, 4.0, 10.0]);
        assert_eq!(h.bin_center(2), Some(2.5));
    }

    #[test]
    fn integer_contents_are_widened() {
        let draft = HistogramDraft::from_centers("TH1I", "ints", &[1.0, 2.0], &[3.0, 5.0]);
        let wire = encode_histogram(&draft).unwrap();
        let decoded = decode(&wire, &th1f());
        assert_eq!(decoded.histogram().unwrap().contents(), &[0.0, 3.0, 5.0, 0.0]);
    }

// # ✅ 3. Type handling

    #[test]
    fn sibling_class_in_same_family_decodes() {
        let draft = HistogramDraft::from_centers("TH1D", "d", &[1.0], &[2.0]);
        let decoded = decode(&encode_histogram(&draft).unwrap(), &th1f());
        assert_eq!(decoded.histogram().unwrap().class_name(), "TH1D");
    }

    #[test]
    fn foreign_classes_are_type_mismatch() {
        for class in ["TGraph", "TH2F", "TProfile", "TSomethingElse"] {
            let mut w = ObjectWriter::new(class, 1);
            w.put_u32(hf::NBINS, 1);
            let decoded = decode(&w.finish().unwrap(), &th1f());
            assert_eq!(
                decoded,
                DecodedObject::TypeMismatch { found: class.to_string(), expected: "TH1F".to_string() }
            );
            assert!(decoded.histogram().is_none());
        }
    }

    #[test]
    fn expecting_a_non_histogram_class_mismatches_everything() {
        let decoded = decode(&centered_1_2_3(), &TypeTag::from_name("TGraph").unwrap());
        assert!(decoded.is_type_mismatch());
    }

// # ✅ 4. Forward and backward tolerance

    #[test]
    fn unknown_fields_are_skipped() {
        let wire = th1d_with(|w| {
            w.put_bytes(900, b"from a newer writer").put_u64(901, 7);
        });
        let decoded = decode(&wire, &th1f());
        assert_eq!(decoded.histogram().unwrap().contents(), &[0.0, 1.0, 3.0, 0.0]);
    }

    #[test]
    fn missing_optional_fields_take_defaults() {
        let decoded = decode(&th1d_with(|_| {}), &th1f());
        let h = decoded.histogram().unwrap();
        assert_eq!(h.name(), "");
        assert_eq!(h.title(), "");
        assert_eq!(h.entries(), 4.0);
        assert!(h.stored_stats().is_none());
        // centers 0.5 and 1.5 weighted 1 and 3
        assert!((h.mean() - 1.25).abs() < 1e-12);
    }

    #[test]
    fn later_duplicate_field_wins() {
        let wire = th1d_with(|w| {
            w.put_str(hf::NAME, "first").put_str(hf::NAME, "second");
        });
        assert_eq!(decode(&wire, &th1f()).histogram().unwrap().name(), "second");
    }

    #[test]
    fn header_extension_is_skipped() {
        let mut w = ObjectWriter::new("TH1F", 3).header_extension(&[0xAA; 9]);
        w.put_u32(hf::NBINS, 1)
            .put_f64(hf::X_MIN, 0.0)
            .put_f64(hf::X_MAX, 1.0)
            .put_array(hf::CONTENTS, WireType::F32Array, &[0.0, 5.0, 0.0]);
        let decoded = decode(&w.finish().unwrap(), &th1f());
        assert_eq!(decoded.histogram().unwrap().bin_content(1), Some(5.0));
    }

    #[test]
    fn trailing_bytes_after_body_are_ignored() {
        let mut wire = centered_1_2_3();
        wire.extend_from_slice(b"junk");
        assert!(decode(&wire, &th1f()).histogram().is_some());
    }

// # ✅ 5. Malformed input is Absent

    #[test]
    fn empty_frame_is_absent() {
        assert!(matches!(
            decode(&[], &th1f()),
            DecodedObject::Absent { reason: ObjectError::Truncated { have: 0, .. } }
        ));
    }

    #[test]
    fn bad_magic_is_absent() {
        let mut wire = centered_1_2_3();
        wire[0] = b'X';
        assert!(matches!(
            decode(&wire, &th1f()),
            DecodedObject::Absent { reason: ObjectError::InvalidMagic(_) }
        ));
    }

    #[test]
    fn corrupted_header_fails_crc() {
        let mut wire = centered_1_2_3();
        wire[8] ^= 0x01; // class_version
        assert!(matches!(
            decode(&wire, &th1f()),
            DecodedObject::Absent { reason: ObjectError::HeaderCrcMismatch { .. } }
        ));
    }

    #[test]
    fn header_without_crc_is_accepted() {
        let mut w = ObjectWriter::new("TH1D", 3).without_header_crc();
        w.put_u32(hf::NBINS, 1)
            .put_f64(hf::X_MIN, 0.0)
            .put_f64(hf::X_MAX, 1.0)
            .put_f64_array(hf::CONTENTS, &[0.0, 1.0, 0.0]);
        assert!(decode(&w.finish().unwrap(), &th1f()).histogram().is_some());
    }

    #[test]
    fn known_field_with_wrong_wire_type_is_absent() {
        let mut w = ObjectWriter::new("TH1F", 3);
        w.put_str(hf::NBINS, "three");
        assert!(matches!(
            decode(&w.finish().unwrap(), &th1f()),
            DecodedObject::Absent { reason: ObjectError::WrongWireType { field_id: hf::NBINS, .. } }
        ));
    }

    #[test]
    fn contents_length_must_match_bins() {
        let mut w = ObjectWriter::new("TH1D", 3);
        w.put_u32(hf::NBINS, 3)
            .put_f64(hf::X_MIN, 0.0)
            .put_f64(hf::X_MAX, 3.0)
            .put_f64_array(hf::CONTENTS, &[1.0, 2.0]);
        assert!(matches!(
            decode(&w.finish().unwrap(), &th1f()),
            DecodedObject::Absent { reason: ObjectError::LengthMismatch { field: "contents", .. } }
        ));
    }

    #[test]
    fn missing_nbins_is_absent() {
        let mut w = ObjectWriter::new("TH1F", 3);
        w.put_f64_array(hf::CONTENTS, &[0.0, 0.0, 0.0]);
        assert!(matches!(
            decode(&w.finish().unwrap(), &th1f()),
            DecodedObject::Absent { reason: ObjectError::MissingField("nbins") }
        ));
    }

    #[test]
    fn max_bin_count_is_absent_not_a_panic() {
        let mut w = ObjectWriter::new("TH1D", 3);
        w.put_u32(hf::NBINS, u32::MAX)
            .put_f64(hf::X_MIN, 0.0)
            .put_f64(hf::X_MAX, 1.0)
            .put_f64_array(hf::CONTENTS, &[0.0, 1.0, 0.0]);
        assert!(matches!(decode(&w.finish().unwrap(), &th1f()), DecodedObject::Absent { .. }));
    }

    #[test]
    fn blank_type_name_is_rejected() {
        assert!(TypeTag::from_name("").is_none());
        assert!(ObjectDecoder::for_type("   ").is_none());
    }

// # ✅ 6. Robustness properties

    proptest! {
        #[test]
        fn prop_any_truncation_is_absent(cut in 0usize..10_000) {
            let wire = centered_1_2_3();
            let cut = cut % wire.len();
            prop_assert!(decode(&wire[..cut], &th1f()).is_absent());
        }

        #[test]
        fn prop_arbitrary_bytes_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            let _ = decode(&bytes, &th1f());
        }

        #[test]
        fn prop_corrupted_body_never_panics(at in 0usize..10_000, byte in any::<u8>()) {
            let mut wire = centered_1_2_3();
            let at = at % wire.len();
            wire[at] = byte;
            let _ = decode(&wire, &th1f());
        }

        #[test]
        fn prop_round_trip_mean(counts in proptest::collection::vec(0u16..1000, 1..40)) {
            let centers: Vec<f64> = (0..counts.len()).map(|i| i as f64 + 0.5).collect();
            let counts: Vec<f64> = counts.into_iter().map(f64::from).collect();
            let total: f64 = counts.iter().sum();
            prop_assume!(total > 0.0);

            let draft = HistogramDraft::from_centers("TH1F", "p", &centers, &counts);
            let decoded = decode(&encode_histogram(&draft).unwrap(), &th1f());
            let h = decoded.histogram().unwrap();

            let expected = centers.iter().zip(&counts).map(|(c, n)| c * n).sum::<f64>() / total;
            prop_assert!((h.mean() - expected).abs() < 1e-9);
            prop_assert_eq!(h.contents()[1..=counts.len()].to_vec(), counts);
        }
    }
}
