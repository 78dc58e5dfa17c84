// Report sinks: text and JSON lines.

#[cfg(test)]
mod tests {
    use histo_core::integrity::checksum;
    use histo_core::objects::{decode, encode_histogram, HistogramDraft, TypeTag};
    use histo_core::report::{LineReportSink, NullSink, ReportFormat, ReportRecord, ReportSink};
    use histo_core::transport::Frame;

    fn histogram_frame() -> Frame {
        let draft = HistogramDraft::from_centers("TH1F", "hpx", &[1.0, 2.0, 3.0], &[10.0, 20.0, 10.0]);
        Frame::from(encode_histogram(&draft).unwrap())
    }

    #[test]
    fn text_line_for_histogram() {
        let frame = histogram_frame();
        let sum = checksum(frame.as_bytes()).unwrap();
        let decoded = decode(frame.as_bytes(), &TypeTag::from_name("TH1F").unwrap());

        let mut sink = LineReportSink::new(Vec::new(), ReportFormat::Text);
        sink.report(7, &frame, Some(&sum), &decoded).unwrap();
        let line = String::from_utf8(sink.into_inner()).unwrap();

        assert!(line.starts_with(&format!("7 size={} {}", frame.len(), sum)), "{line}");
        assert!(line.contains("TH1F \"hpx\" mean=2 "), "{line}");
        assert!(line.contains("entries=40"), "{line}");
    }

    #[test]
    fn json_record_for_histogram() {
        let frame = histogram_frame();
        let sum = checksum(frame.as_bytes()).unwrap();
        let decoded = decode(frame.as_bytes(), &TypeTag::from_name("TH1F").unwrap());

        let record = ReportRecord::new(0, &frame, Some(&sum), &decoded);
        let v = serde_json::to_value(&record).unwrap();
        assert_eq!(v["outcome"], "histogram");
        assert_eq!(v["class"], "TH1F");
        assert_eq!(v["mean"], 2.0);
        assert_eq!(v["checksum"]["odd"], u64::from(sum.odd));
        assert!(v.get("reason").is_none());
    }

    #[test]
    fn null_sink_accepts_everything() {
        let frame = Frame::default();
        let decoded = decode(frame.as_bytes(), &TypeTag::from_name("TH1F").unwrap());
        let mut sink = NullSink;
        sink.report(0, &frame, None, &decoded).unwrap();
        sink.flush().unwrap();
    }
}
