use super::{
    bytes_to_mb,
    bytes_to_mbits,
    log_success,
    output::Report,
    Speedtest,
};
use crate::{
    CollectorError,
    Measurement,
    MeasurementResult,
};
use std::{
    path::{
        Path,
        PathBuf,
    },
    process::Command,
    time::Instant,
};

const ARGS: [&str; 3] = ["--format=json-pretty", "--accept-license", "--accept-gdpr"];

/// Runs the Ookla speedtest binary.
#[derive(Debug, Clone)]
pub struct SpeedtestCli {
    path: PathBuf,
}

impl SpeedtestCli {
    /// Resolve `executable` (a name on `PATH` or a path) to the binary.
    pub fn new(executable: &str) -> Result<Self, CollectorError> {
        let path = which::which(executable).map_err(|source| CollectorError::SpeedtestNotFound {
            executable: executable.to_string(),
            source,
        })?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Speedtest for SpeedtestCli {
    fn run(&self) -> MeasurementResult {
        let start = Instant::now();

        let output = match Command::new(&self.path).args(ARGS).output() {
            Ok(output) => output,
            Err(err) => {
                error!(path = %self.path.display(), %err, "Could not execute speedtest");
                return MeasurementResult::failed();
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            error!(
                status = %output.status,
                stdout = %stdout,
                stderr = %String::from_utf8_lossy(&output.stderr),
                "Speedtest exited with an error"
            );
            return MeasurementResult::failed();
        }

        let report: Report = match serde_json::from_slice(&output.stdout) {
            Ok(report) => report,
            Err(err) => {
                error!(%err, output = %stdout, "Parsing JSON output from speedtest failed");
                return MeasurementResult::failed();
            }
        };

        let result = MeasurementResult::success(
            Measurement {
                jitter_latency: report.ping.jitter,
                ping: report.ping.latency,
                download_speed: bytes_to_mbits(report.download.bandwidth),
                upload_speed: bytes_to_mbits(report.upload.bandwidth),
                data_used: bytes_to_mb(report.download.bytes) + bytes_to_mb(report.upload.bytes),
                server_id: report.server.id.to_string(),
                server_host: report.server.host,
                client_isp: report.isp,
                client_ip: report.interface.external_ip,
            },
            start.elapsed(),
        );
        log_success(&result, start.elapsed());
        result
    }
}
