//! config.rs
//! Subscriber configuration: TOML file, defaults, and validation.
//!
//! Every field has a default, so an empty file is a valid configuration.
//! Command-line flags are applied on top by the binary before `validate`.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    DEFAULT_ENDPOINT, DEFAULT_EXPECTED_TYPE, DEFAULT_INFLIGHT_FRAMES, DEFAULT_POLL_INTERVAL, MAX_FRAME_SIZE,
};
use crate::objects::TypeTag;
use crate::parallelism::ParallelismProfile;
use crate::report::ReportFormat;
use crate::transport::{Endpoint, TcpOptions};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("invalid bind endpoint: {0}")]
    Endpoint(String),
}

/// Decode worker count: a number (0 = sequential driver) or `auto`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WorkersRepr", into = "WorkersRepr")]
pub enum Workers {
    Count(usize),
    /// One worker per spare core.
    Auto,
}

impl Default for Workers {
    fn default() -> Self {
        Self::Count(0)
    }
}

impl FromStr for Workers {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        s.parse::<usize>()
            .map(Self::Count)
            .map_err(|_| format!("expected a worker count or `auto`, got `{s}`"))
    }
}

impl fmt::Display for Workers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{n}"),
            Self::Auto => f.write_str("auto"),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WorkersRepr {
    Count(usize),
    Name(String),
}

impl TryFrom<WorkersRepr> for Workers {
    type Error = String;

    fn try_from(repr: WorkersRepr) -> Result<Self, Self::Error> {
        match repr {
            WorkersRepr::Count(n) => Ok(Self::Count(n)),
            WorkersRepr::Name(name) => name.parse(),
        }
    }
}

impl From<Workers> for WorkersRepr {
    fn from(w: Workers) -> Self {
        match w {
            Workers::Count(n) => Self::Count(n),
            Workers::Auto => Self::Name("auto".into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SubscriberConfig {
    /// `tcp://host:port`, `*` for every interface.
    pub bind: String,
    /// Class name decoded objects must match.
    pub expected_type: String,
    pub format: ReportFormat,
    pub workers: Workers,
    pub inflight_frames: usize,
    pub max_frame_size: usize,
    pub poll_interval_ms: u64,
    /// Add a text preview of each frame's payload to the reports.
    pub show_payload: bool,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_ENDPOINT.to_string(),
            expected_type: DEFAULT_EXPECTED_TYPE.to_string(),
            format: ReportFormat::Text,
            workers: Workers::default(),
            inflight_frames: DEFAULT_INFLIGHT_FRAMES,
            max_frame_size: MAX_FRAME_SIZE,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            show_payload: false,
        }
    }
}

impl SubscriberConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind.trim().is_empty() {
            return Err(ConfigError::Empty("bind address"));
        }
        if self.expected_type.trim().is_empty() {
            return Err(ConfigError::Empty("expected type"));
        }
        if self.max_frame_size == 0 {
            return Err(ConfigError::Zero("max_frame_size"));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Zero("poll_interval_ms"));
        }
        if self.inflight_frames == 0 {
            return Err(ConfigError::Zero("inflight_frames"));
        }
        self.endpoint()?;
        Ok(())
    }

    pub fn endpoint(&self) -> Result<Endpoint, ConfigError> {
        Endpoint::parse(&self.bind).map_err(|e| ConfigError::Endpoint(e.to_string()))
    }

    pub fn expected(&self) -> Result<TypeTag, ConfigError> {
        TypeTag::from_name(&self.expected_type).ok_or(ConfigError::Empty("expected type"))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn tcp_options(&self) -> TcpOptions {
        TcpOptions {
            max_frame_size: self.max_frame_size,
            poll_interval: self.poll_interval(),
            inflight_frames: self.inflight_frames,
        }
    }

    /// `None` selects the sequential driver.
    pub fn parallelism(&self) -> Option<ParallelismProfile> {
        match self.workers {
            Workers::Count(0) => None,
            Workers::Count(n) => Some(ParallelismProfile { worker_count: n, inflight_frames: self.inflight_frames }),
            Workers::Auto => Some(ParallelismProfile {
                inflight_frames: self.inflight_frames,
                ..ParallelismProfile::default()
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let cfg = SubscriberConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, SubscriberConfig::default());
        cfg.validate().unwrap();
    }

    #[test]
    fn auto_workers_sizes_from_cores() {
        let cfg = SubscriberConfig::from_toml_str("workers = \"auto\"\ninflight_frames = 5").unwrap();
        assert_eq!(cfg.workers, Workers::Auto);
        let profile = cfg.parallelism().unwrap();
        assert!(profile.worker_count >= 1);
        assert_eq!(profile.inflight_frames, 5);
    }

    #[test]
    fn workers_parse_from_flags() {
        assert_eq!("AUTO".parse::<Workers>().unwrap(), Workers::Auto);
        assert_eq!("4".parse::<Workers>().unwrap(), Workers::Count(4));
        assert!("many".parse::<Workers>().is_err());
        assert!(SubscriberConfig::from_toml_str("workers = \"many\"").is_err());
    }

    #[test]
    fn blank_expected_type_is_rejected() {
        let cfg = SubscriberConfig { expected_type: "  ".into(), ..Default::default() };
        assert!(matches!(cfg.validate(), Err(ConfigError::Empty("expected type"))));
    }
}
