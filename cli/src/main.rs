mod logging;

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use histo_core::constants::PAYLOAD_PREVIEW_BYTES;
use histo_core::prelude::*;

use crate::logging::init_logging;

#[derive(Parser, Debug)]
#[command(
    name = "histo-sub",
    version,
    about = "Subscribe to histogram publishers and report every received frame"
)]
struct Cli {
    /// Endpoint to bind, e.g. tcp://*:5024
    #[arg(long, value_name = "ENDPOINT")]
    bind: Option<String>,

    /// Class name decoded objects must match [default: TH1F]
    #[arg(long, value_name = "TYPE")]
    expect: Option<String>,

    /// Report format: text or json
    #[arg(long)]
    format: Option<ReportFormat>,

    /// Decode workers: a count, or `auto` for one per spare core; 0 runs the sequential loop
    #[arg(long, value_name = "N|auto")]
    workers: Option<Workers>,

    #[arg(long, value_name = "BYTES")]
    max_frame_size: Option<usize>,

    #[arg(long, value_name = "MS")]
    poll_interval_ms: Option<u64>,

    /// TOML config file; flags override its values
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Decode a recorded capture (length-prefixed frames) instead of listening; `-` reads stdin
    #[arg(long, value_name = "PATH|-")]
    replay: Option<PathBuf>,

    /// Show the start of each frame's payload as text in the reports
    #[arg(long)]
    show_payload: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    fn config(&self) -> Result<SubscriberConfig> {
        let mut cfg = match &self.config {
            Some(path) => SubscriberConfig::from_file(path)?,
            None => SubscriberConfig::default(),
        };

        if let Some(bind) = &self.bind {
            cfg.bind = bind.clone();
        }
        if let Some(expect) = &self.expect {
            cfg.expected_type = expect.clone();
        }
        if let Some(format) = self.format {
            cfg.format = format;
        }
        if let Some(workers) = self.workers {
            cfg.workers = workers;
        }
        if let Some(max) = self.max_frame_size {
            cfg.max_frame_size = max;
        }
        if let Some(ms) = self.poll_interval_ms {
            cfg.poll_interval_ms = ms;
        }
        if self.show_payload {
            cfg.show_payload = true;
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "subscriber failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let cfg = cli.config().context("invalid configuration")?;
    let expected = cfg.expected()?;

    let stop = StopToken::new();
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.stop()).context("failed to install Ctrl-C handler")?;
    }

    let source = open_source(cli.replay.as_deref(), &cfg, &stop)?;
    let mut sink = LineReportSink::stdout(cfg.format);
    if cfg.show_payload {
        sink = sink.with_payload_preview(PAYLOAD_PREVIEW_BYTES);
    }

    let snapshot = match cfg.parallelism() {
        Some(profile) => run_parallel(source, &mut sink, &expected, &profile, &stop)?,
        None => Subscriber::new(source, sink, expected).run()?,
    };

    info!(
        frames_per_sec = snapshot.frames_per_sec,
        reports = snapshot.reports_written,
        "clean shutdown"
    );
    Ok(())
}

fn open_source(
    replay: Option<&Path>,
    cfg: &SubscriberConfig,
    stop: &StopToken,
) -> Result<Box<dyn FrameSource + Send>> {
    let source: Box<dyn FrameSource + Send> = match replay {
        Some(path) if path == Path::new("-") => Box::new(
            ReaderFrameSource::new(BufReader::new(io::stdin()), stop.clone())
                .with_max_frame_size(cfg.max_frame_size)
                .with_poll_interval(cfg.poll_interval()),
        ),
        Some(path) => {
            let file = File::open(path).with_context(|| format!("failed to open capture {}", path.display()))?;
            info!(path = %path.display(), "replaying capture");
            Box::new(
                ReaderFrameSource::new(BufReader::new(file), stop.clone())
                    .with_max_frame_size(cfg.max_frame_size)
                    .with_poll_interval(cfg.poll_interval()),
            )
        }
        None => {
            let endpoint = cfg.endpoint()?;
            Box::new(TcpFrameSource::bind(&endpoint, cfg.tcp_options(), stop.clone())?)
        }
    };
    Ok(source)
}
