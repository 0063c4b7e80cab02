//! CLI parsing and the operational tunables it produces.
//!
//! Everything here is `clap`'s derive API, matching the one dependency the
//! teacher crate's own lineage carries for argument parsing. The values
//! this module produces are passed down into `source`, `ingest`, `dedup`
//! and `transport` as plain constructor arguments -- nothing here reaches
//! back up into those modules.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Default port prefix (`N`): TCP/UDP forwarding listens on `N*100+23`,
/// the HTTP API on `N*100+80`.
pub const DEFAULT_PORT_PREFIX: u16 = 80;

#[derive(Parser, Debug)]
#[command(name = "ais-relay", version, about = "Real-time AIS aggregation, deduplication and rebroadcast")]
pub struct Cli {
    /// An upstream feed: `[name[:timeout]=]<url>`, where `<url>` is
    /// `tcp://host:port`, `http(s)://...`, `file://path`, or a bare path.
    /// Repeat for multiple sources.
    #[arg(long = "source", required = true, value_parser = parse_source_arg)]
    pub sources: Vec<SourceSpec>,

    /// Port prefix `N`: TCP/UDP forwarding on `N*100+23`, HTTP on `N*100+80`.
    #[arg(long, default_value_t = DEFAULT_PORT_PREFIX)]
    pub port_prefix: u16,

    /// Bound on how long an in-flight multi-sentence message may take to
    /// complete before its assembler slot is treated as stale.
    #[arg(long, value_parser = parse_duration, default_value = "2s")]
    pub max_message_timespan: Duration,

    /// Interval at which the duplicate filter rotates its rolling window.
    /// A message is guaranteed to be checked against the last window and
    /// may be checked against up to twice that.
    #[arg(long, value_parser = parse_duration, default_value = "1m")]
    pub min_keep_alive: Duration,

    /// How often periodic statistics are logged. `0s` disables reporting.
    #[arg(long, value_parser = parse_duration, default_value = "1m")]
    pub report_interval: Duration,
}

impl Cli {
    pub fn tcp_addr(&self) -> std::net::SocketAddr {
        ([0, 0, 0, 0], self.port_prefix as u32 as u16 * 100 + 23).into()
    }

    pub fn http_addr(&self) -> std::net::SocketAddr {
        ([0, 0, 0, 0], self.port_prefix as u32 as u16 * 100 + 80).into()
    }
}

/// One `--source` argument, fully parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSpec {
    pub name: String,
    pub timeout: Duration,
    pub endpoint: Endpoint,
}

/// The three transports a source connector can read from (§4.5/§6.1).
#[derive(Debug, Clone, PartialEq)]
pub enum Endpoint {
    Tcp(String),
    Http(String),
    File(PathBuf),
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SourceSpecError {
    #[error("empty source URL")]
    EmptyUrl,
    #[error("invalid timeout suffix in {0:?}; expected s/ms/ns")]
    BadTimeout(String),
}

/// Parses `[name[:timeout]=]<url>` per §6.1. A bare URL gets the URL
/// itself as its name and the default 5s timeout; `tcp://`, `http(s)://`
/// and `file://` are recognized schemes, anything else is treated as a
/// bare filesystem path.
fn parse_source_arg(raw: &str) -> Result<SourceSpec, SourceSpecError> {
    let (prefix, url) = match raw.split_once('=') {
        Some((prefix, url)) if !prefix.is_empty() => (Some(prefix), url),
        _ => (None, raw),
    };
    if url.is_empty() {
        return Err(SourceSpecError::EmptyUrl);
    }

    let (name, timeout) = match prefix {
        None => (url.to_string(), DEFAULT_TIMEOUT),
        Some(prefix) => match prefix.split_once(':') {
            None => (prefix.to_string(), DEFAULT_TIMEOUT),
            Some((name, timeout_str)) => (name.to_string(), parse_duration(timeout_str)?),
        },
    };

    let endpoint = if let Some(rest) = url.strip_prefix("tcp://") {
        Endpoint::Tcp(rest.to_string())
    } else if url.starts_with("http://") || url.starts_with("https://") {
        Endpoint::Http(url.to_string())
    } else if let Some(rest) = url.strip_prefix("file://") {
        Endpoint::File(PathBuf::from(rest))
    } else {
        Endpoint::File(PathBuf::from(url))
    };

    Ok(SourceSpec { name, timeout, endpoint })
}

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Parses a duration with an `s`, `ms`, or `ns` unit suffix (§6.1); no
/// suffix is rejected rather than guessed at.
fn parse_duration(raw: &str) -> Result<Duration, SourceSpecError> {
    let bad = || SourceSpecError::BadTimeout(raw.to_string());
    if let Some(digits) = raw.strip_suffix("ms") {
        let ms: u64 = digits.parse().map_err(|_| bad())?;
        Ok(Duration::from_millis(ms))
    } else if let Some(digits) = raw.strip_suffix("ns") {
        let ns: u64 = digits.parse().map_err(|_| bad())?;
        Ok(Duration::from_nanos(ns))
    } else if let Some(digits) = raw.strip_suffix('s') {
        let whole_and_frac: Vec<&str> = digits.splitn(2, '.').collect();
        match whole_and_frac.as_slice() {
            [whole] => {
                let s: u64 = whole.parse().map_err(|_| bad())?;
                Ok(Duration::from_secs(s))
            }
            [whole, frac] => {
                let s: u64 = if whole.is_empty() { 0 } else { whole.parse().map_err(|_| bad())? };
                let frac_nanos: u64 = format!("{:0<9}", frac)[..9].parse().map_err(|_| bad())?;
                Ok(Duration::from_secs(s) + Duration::from_nanos(frac_nanos))
            }
            _ => Err(bad()),
        }
    } else if let Some(digits) = raw.strip_suffix('m') {
        let m: u64 = digits.parse().map_err(|_| bad())?;
        Ok(Duration::from_secs(m * 60))
    } else if let Some(digits) = raw.strip_suffix('h') {
        let h: u64 = digits.parse().map_err(|_| bad())?;
        Ok(Duration::from_secs(h * 3600))
    } else {
        Err(bad())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_path_is_a_file_source_named_after_itself() {
        let spec = parse_source_arg("/var/log/ais.nmea").unwrap();
        assert_eq!(spec.name, "/var/log/ais.nmea");
        assert_eq!(spec.timeout, DEFAULT_TIMEOUT);
        assert_eq!(spec.endpoint, Endpoint::File(PathBuf::from("/var/log/ais.nmea")));
    }

    #[test]
    fn named_tcp_source_with_timeout() {
        let spec = parse_source_arg("buoy1:250ms=tcp://127.0.0.1:4001").unwrap();
        assert_eq!(spec.name, "buoy1");
        assert_eq!(spec.timeout, Duration::from_millis(250));
        assert_eq!(spec.endpoint, Endpoint::Tcp("127.0.0.1:4001".to_string()));
    }

    #[test]
    fn named_source_without_timeout_gets_default() {
        let spec = parse_source_arg("coastal=tcp://10.0.0.1:10110").unwrap();
        assert_eq!(spec.name, "coastal");
        assert_eq!(spec.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn http_source() {
        let spec = parse_source_arg("hub=https://example.com/stream").unwrap();
        assert_eq!(spec.endpoint, Endpoint::Http("https://example.com/stream".to_string()));
    }

    #[test]
    fn file_scheme_is_honored() {
        let spec = parse_source_arg("replay=file:///tmp/capture.nmea").unwrap();
        assert_eq!(spec.endpoint, Endpoint::File(PathBuf::from("/tmp/capture.nmea")));
    }

    #[test]
    fn duration_units() {
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("100ns").unwrap(), Duration::from_nanos(100));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
    }

    #[test]
    fn duration_without_unit_is_rejected() {
        assert!(parse_duration("5").is_err());
    }

    #[test]
    fn port_prefix_derives_tcp_and_http_ports() {
        let cli = Cli {
            sources: vec![],
            port_prefix: 80,
            max_message_timespan: Duration::from_secs(2),
            min_keep_alive: Duration::from_secs(60),
            report_interval: Duration::from_secs(60),
        };
        assert_eq!(cli.tcp_addr().port(), 8023);
        assert_eq!(cli.http_addr().port(), 8080);
    }
}
