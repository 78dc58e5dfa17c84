// Configuration loading and validation.

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use histo_core::config::{ConfigError, SubscriberConfig};
    use histo_core::constants::DEFAULT_ENDPOINT;
    use histo_core::report::ReportFormat;

    #[test]
    fn defaults_match_reference_setup() {
        let cfg = SubscriberConfig::default();
        assert_eq!(cfg.bind, DEFAULT_ENDPOINT);
        assert_eq!(cfg.expected_type, "TH1F");
        assert_eq!(cfg.format, ReportFormat::Text);
        assert!(cfg.parallelism().is_none());
        assert_eq!(cfg.poll_interval(), Duration::from_millis(100));
    }

    #[test]
    fn file_values_are_loaded() {
        let path = std::env::temp_dir().join(format!("histo-config-{}.toml", std::process::id()));
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "bind = \"tcp://127.0.0.1:7000\"").unwrap();
        writeln!(f, "expected_type = \"TH1D\"").unwrap();
        writeln!(f, "format = \"json\"").unwrap();
        writeln!(f, "workers = 3").unwrap();
        drop(f);

        let cfg = SubscriberConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        cfg.validate().unwrap();
        assert_eq!(cfg.endpoint().unwrap().port, 7000);
        assert_eq!(cfg.expected().unwrap().family, "TH1");
        assert_eq!(cfg.format, ReportFormat::Json);
        let profile = cfg.parallelism().unwrap();
        assert_eq!(profile.worker_count, 3);
        assert_eq!(profile.inflight_frames, cfg.inflight_frames);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            SubscriberConfig::from_toml_str("bnid = \"tcp://*:1\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        assert!(matches!(
            SubscriberConfig::from_file("/definitely/not/here.toml"),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let empty_bind = SubscriberConfig { bind: String::new(), ..Default::default() };
        assert!(matches!(empty_bind.validate(), Err(ConfigError::Empty(_))));

        let bad_bind = SubscriberConfig { bind: "udp://*:1".into(), ..Default::default() };
        assert!(matches!(bad_bind.validate(), Err(ConfigError::Endpoint(_))));

        let zero_poll = SubscriberConfig { poll_interval_ms: 0, ..Default::default() };
        assert!(matches!(zero_poll.validate(), Err(ConfigError::Zero("poll_interval_ms"))));

        let zero_frames = SubscriberConfig { max_frame_size: 0, ..Default::default() };
        assert!(matches!(zero_frames.validate(), Err(ConfigError::Zero("max_frame_size"))));
    }
}
