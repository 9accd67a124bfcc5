//! # Heartbeat
//!
//! Registers the server with a public server list. A background thread
//! reads the connection parameters from a small line-based data file, sends
//! them as an HTTP GET every interval and writes the returned play URL to a
//! local file. Failures are logged and retried; they never stop the server.
//!
//! Data file, one value per line:
//!
//! ```text
//! salt
//! ip
//! port
//! players
//! max players
//! server name
//! public flag (true/false)
//! heartbeat url (optional)
//! ```

use std::fmt::{self, Write as _};
use std::fs;
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::HeartbeatError;
use crate::protocol::PROTOCOL_VERSION;

/// Default listing endpoint.
pub const DEFAULT_HEARTBEAT_URL: &str = "http://www.classicube.net/server/heartbeat";
/// Wait after a failed attempt.
pub const RETRY_BACKOFF: Duration = Duration::from_secs(5);
/// Connect and read timeout for one request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const STOP_POLL: Duration = Duration::from_millis(100);

/// Values sent with each heartbeat.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeartbeatData {
    /// Name verification salt.
    pub salt: String,
    /// Public address of the server.
    pub address: String,
    /// Listening port.
    pub port: u16,
    /// Players online.
    pub players: usize,
    /// Player slots.
    pub max_players: usize,
    /// Server name.
    pub name: String,
    /// Shown in the public list.
    pub public: bool,
    /// Overrides the configured heartbeat URL.
    pub url: Option<String>,
}

impl HeartbeatData {
    /// Parses the line-based data file format.
    ///
    /// # Errors
    ///
    /// Returns [`HeartbeatError::MalformedData`] naming the first missing or
    /// unparsable line.
    pub fn parse(text: &str) -> Result<Self, HeartbeatError> {
        let lines: Vec<&str> = text.lines().map(str::trim).collect();
        let field = |index: usize| -> Result<&str, HeartbeatError> {
            lines.get(index).copied().ok_or_else(|| HeartbeatError::MalformedData {
                line: index + 1,
                message: "missing".to_owned(),
            })
        };
        let number = |index: usize| -> Result<usize, HeartbeatError> {
            let value = field(index)?;
            value.parse().map_err(|_| HeartbeatError::MalformedData {
                line: index + 1,
                message: format!("expected a number, found {value:?}"),
            })
        };

        let port = number(2)?;
        let port = u16::try_from(port)
            .map_err(|_| HeartbeatError::MalformedData { line: 3, message: format!("port {port} out of range") })?;
        let public = match field(6)?.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            other => {
                return Err(HeartbeatError::MalformedData { line: 7, message: format!("expected true/false, found {other:?}") })
            }
        };

        Ok(Self {
            salt: field(0)?.to_owned(),
            address: field(1)?.to_owned(),
            port,
            players: number(3)?,
            max_players: number(4)?,
            name: field(5)?.to_owned(),
            public,
            url: lines.get(7).filter(|line| !line.is_empty()).map(|line| (*line).to_owned()),
        })
    }

    /// Reads and parses a data file.
    ///
    /// # Errors
    ///
    /// Returns the I/O error or the parse error.
    pub fn load(path: &Path) -> Result<Self, HeartbeatError> {
        Self::parse(&fs::read_to_string(path)?)
    }

    /// Writes the data file.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), HeartbeatError> {
        fs::write(path, self.to_string())?;
        Ok(())
    }

    /// Query string of a heartbeat request.
    #[must_use]
    pub fn query(&self) -> String {
        format!(
            "port={}&max={}&name={}&public={}&version={}&salt={}&users={}",
            self.port,
            self.max_players,
            url_encode(&self.name),
            if self.public { "True" } else { "False" },
            PROTOCOL_VERSION,
            url_encode(&self.salt),
            self.players,
        )
    }
}

impl fmt::Display for HeartbeatData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.salt)?;
        writeln!(f, "{}", self.address)?;
        writeln!(f, "{}", self.port)?;
        writeln!(f, "{}", self.players)?;
        writeln!(f, "{}", self.max_players)?;
        writeln!(f, "{}", self.name)?;
        writeln!(f, "{}", self.public)?;
        if let Some(url) = &self.url {
            writeln!(f, "{url}")?;
        }
        Ok(())
    }
}

/// Percent-encodes everything but unreserved URL characters.
#[must_use]
pub fn url_encode(text: &str) -> String {
    let mut encoded = String::with_capacity(text.len());
    for byte in text.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            encoded.push(char::from(byte));
        } else {
            let _ = write!(encoded, "%{byte:02X}");
        }
    }
    encoded
}

/// Where to send heartbeats and where to keep the files.
#[derive(Clone, Debug)]
pub struct HeartbeatConfig {
    /// Listing endpoint, used unless the data file names one.
    pub url: String,
    /// Time between heartbeats.
    pub interval: Duration,
    /// Time between data file reloads.
    pub refresh: Duration,
    /// Data file path.
    pub data_file: PathBuf,
    /// File the returned play URL is written to.
    pub output_file: PathBuf,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_HEARTBEAT_URL.to_owned(),
            interval: Duration::from_secs(45),
            refresh: Duration::from_secs(60),
            data_file: PathBuf::from("heartbeat.txt"),
            output_file: PathBuf::from("externalurl.txt"),
        }
    }
}

/// Produces fresh heartbeat data, e.g. from the live server.
pub type DataSource = Box<dyn Fn() -> HeartbeatData + Send>;

/// Periodic registration with a server list.
pub struct HeartbeatClient {
    config: HeartbeatConfig,
    data: HeartbeatData,
    source: Option<DataSource>,
    last_refresh: Option<Instant>,
}

impl fmt::Debug for HeartbeatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeartbeatClient").field("config", &self.config).field("data", &self.data).finish_non_exhaustive()
    }
}

impl HeartbeatClient {
    /// Starts from `initial`; the data file replaces it on the first refresh.
    #[must_use]
    pub fn new(config: HeartbeatConfig, initial: HeartbeatData) -> Self {
        Self { config, data: initial, source: None, last_refresh: None }
    }

    /// Rewrites the data file from `source` before every reload.
    #[must_use]
    pub fn with_source(mut self, source: DataSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Data the next heartbeat will send.
    #[must_use]
    pub const fn data(&self) -> &HeartbeatData {
        &self.data
    }

    /// Reloads the data file. A bad file keeps the previous data.
    pub fn refresh(&mut self) {
        self.last_refresh = Some(Instant::now());
        if let Some(source) = &self.source {
            if let Err(err) = source().save(&self.config.data_file) {
                warn!(error = %err, file = %self.config.data_file.display(), "could not write heartbeat data");
            }
        }
        match HeartbeatData::load(&self.config.data_file) {
            Ok(data) => self.data = data,
            Err(err) => warn!(error = %err, file = %self.config.data_file.display(), "keeping previous heartbeat data"),
        }
    }

    /// Full request URL for the current data.
    #[must_use]
    pub fn request_url(&self) -> String {
        let base = self.data.url.as_deref().unwrap_or(&self.config.url);
        let separator = if base.contains('?') { '&' } else { '?' };
        format!("{base}{separator}{}", self.data.query())
    }

    /// Sends one heartbeat and stores the returned URL.
    ///
    /// # Errors
    ///
    /// Returns the network, HTTP or file error.
    pub fn beat(&self) -> Result<String, HeartbeatError> {
        let body = http_get(&self.request_url())?;
        let url = body.trim().to_owned();
        fs::write(&self.config.output_file, &url)?;
        Ok(url)
    }

    /// Loops until `stop` is set.
    pub fn run(mut self, stop: &AtomicBool) {
        let mut last_url = String::new();
        while !stop.load(Ordering::Relaxed) {
            if self.last_refresh.map_or(true, |at| at.elapsed() >= self.config.refresh) {
                self.refresh();
            }
            let wait = match self.beat() {
                Ok(url) => {
                    if url != last_url {
                        info!(%url, "server registered");
                        last_url = url;
                    } else {
                        debug!("heartbeat sent");
                    }
                    self.config.interval
                }
                Err(err) => {
                    warn!(error = %err, "heartbeat failed, retrying");
                    RETRY_BACKOFF
                }
            };
            sleep_unless_stopped(wait, stop);
        }
    }

    /// Runs [`Self::run`] on a background thread.
    ///
    /// # Errors
    ///
    /// Returns the error if the thread cannot be started.
    pub fn spawn(self, stop: Arc<AtomicBool>) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new().name("heartbeat".to_owned()).spawn(move || self.run(&stop))
    }
}

fn sleep_unless_stopped(duration: Duration, stop: &AtomicBool) {
    let deadline = Instant::now() + duration;
    while !stop.load(Ordering::Relaxed) {
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        thread::sleep(STOP_POLL.min(deadline - now));
    }
}

/// Parts of an `http://host[:port]/path` URL.
#[derive(Clone, Debug, PartialEq, Eq)]
struct HttpTarget {
    host: String,
    port: u16,
    path: String,
}

fn parse_url(url: &str) -> Result<HttpTarget, HeartbeatError> {
    let rest = url.strip_prefix("http://").ok_or_else(|| HeartbeatError::BadUrl(url.to_owned()))?;
    let (authority, path) = rest.find('/').map_or((rest, "/"), |i| (&rest[..i], &rest[i..]));
    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port)) => (host, port.parse().map_err(|_| HeartbeatError::BadUrl(url.to_owned()))?),
        None => (authority, 80),
    };
    if host.is_empty() {
        return Err(HeartbeatError::BadUrl(url.to_owned()));
    }
    Ok(HttpTarget { host: host.to_owned(), port, path: path.to_owned() })
}

/// Minimal HTTP/1.1 GET returning the response body.
fn http_get(url: &str) -> Result<String, HeartbeatError> {
    let target = parse_url(url)?;
    let address = (target.host.as_str(), target.port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| HeartbeatError::BadUrl(url.to_owned()))?;
    let mut stream = TcpStream::connect_timeout(&address, REQUEST_TIMEOUT)?;
    stream.set_read_timeout(Some(REQUEST_TIMEOUT))?;
    stream.set_write_timeout(Some(REQUEST_TIMEOUT))?;
    write!(
        stream,
        "GET {} HTTP/1.1\r\nHost: {}\r\nUser-Agent: tundra\r\nConnection: close\r\n\r\n",
        target.path, target.host
    )?;
    stream.flush()?;

    let mut response = Vec::new();
    stream.read_to_end(&mut response)?;
    parse_response(&response)
}

fn parse_response(response: &[u8]) -> Result<String, HeartbeatError> {
    let text = String::from_utf8_lossy(response);
    let (head, body) = text.split_once("\r\n\r\n").ok_or(HeartbeatError::BadResponse)?;
    let mut lines = head.lines();
    let status: u16 = lines
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse().ok())
        .ok_or(HeartbeatError::BadResponse)?;
    if !(200..300).contains(&status) {
        return Err(HeartbeatError::Status(status));
    }
    let chunked = lines.any(|line| {
        line.split_once(':').is_some_and(|(name, value)| {
            name.trim().eq_ignore_ascii_case("transfer-encoding") && value.trim().eq_ignore_ascii_case("chunked")
        })
    });
    if chunked {
        decode_chunked(body)
    } else {
        Ok(body.to_owned())
    }
}

fn decode_chunked(mut body: &str) -> Result<String, HeartbeatError> {
    let mut decoded = String::new();
    loop {
        let (size_line, rest) = body.split_once("\r\n").ok_or(HeartbeatError::BadResponse)?;
        let size_hex = size_line.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size_hex, 16).map_err(|_| HeartbeatError::BadResponse)?;
        if size == 0 {
            return Ok(decoded);
        }
        let chunk = rest.get(..size).ok_or(HeartbeatError::BadResponse)?;
        decoded.push_str(chunk);
        body = rest.get(size..).and_then(|r| r.strip_prefix("\r\n")).ok_or(HeartbeatError::BadResponse)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn sample() -> HeartbeatData {
        HeartbeatData {
            salt: "abc123".into(),
            address: "203.0.113.5".into(),
            port: 25565,
            players: 3,
            max_players: 20,
            name: "Tundra Test".into(),
            public: true,
            url: None,
        }
    }

    #[test]
    fn test_data_file_round_trip() {
        let data = sample();
        assert_eq!(HeartbeatData::parse(&data.to_string()).unwrap(), data);
        let with_url = HeartbeatData { url: Some("http://example.com/hb".into()), ..sample() };
        assert_eq!(HeartbeatData::parse(&with_url.to_string()).unwrap(), with_url);
    }

    #[test]
    fn test_malformed_data_names_line() {
        let err = HeartbeatData::parse("salt\nip\nnot-a-port\n").unwrap_err();
        assert!(matches!(err, HeartbeatError::MalformedData { line: 3, .. }));
        let err = HeartbeatData::parse("salt\nip\n25565\n1\n2\nname\n").unwrap_err();
        assert!(matches!(err, HeartbeatError::MalformedData { line: 7, .. }));
    }

    #[test]
    fn test_bad_file_keeps_previous_data() {
        let dir = std::env::temp_dir().join(format!("tundra-heartbeat-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let data_file = dir.join("bad.txt");
        fs::write(&data_file, "only-one-line\n").unwrap();
        let config = HeartbeatConfig { data_file, ..HeartbeatConfig::default() };
        let mut client = HeartbeatClient::new(config, sample());
        client.refresh();
        assert_eq!(client.data(), &sample());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_query_encoding() {
        let client = HeartbeatClient::new(HeartbeatConfig::default(), sample());
        assert_eq!(
            client.request_url(),
            "http://www.classicube.net/server/heartbeat?port=25565&max=20&name=Tundra%20Test&public=True&version=7&salt=abc123&users=3"
        );
        assert_eq!(url_encode("a&b=c"), "a%26b%3Dc");
    }

    #[test]
    fn test_parse_url() {
        assert_eq!(
            parse_url("http://localhost:8080/hb?x=1").unwrap(),
            HttpTarget { host: "localhost".into(), port: 8080, path: "/hb?x=1".into() }
        );
        assert_eq!(parse_url("http://example.com").unwrap().path, "/");
        assert!(matches!(parse_url("https://example.com/"), Err(HeartbeatError::BadUrl(_))));
    }

    #[test]
    fn test_parse_responses() {
        let plain = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello";
        assert_eq!(parse_response(plain).unwrap(), "hello");
        let chunked = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n";
        assert_eq!(parse_response(chunked).unwrap(), "hello world");
        assert!(matches!(parse_response(b"HTTP/1.1 503 Busy\r\n\r\n"), Err(HeartbeatError::Status(503))));
        assert!(matches!(parse_response(b"garbage"), Err(HeartbeatError::BadResponse)));
    }

    #[test]
    fn test_beat_writes_output_file() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = [0u8; 1024];
            let n = stream.read(&mut request).unwrap();
            let request = String::from_utf8_lossy(&request[..n]).to_string();
            stream.write_all(b"HTTP/1.1 200 OK\r\nConnection: close\r\n\r\nhttp://play.example/abc\n").unwrap();
            request
        });

        let dir = std::env::temp_dir().join(format!("tundra-heartbeat-out-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let config = HeartbeatConfig {
            url: format!("http://127.0.0.1:{port}/heartbeat"),
            output_file: dir.join("externalurl.txt"),
            ..HeartbeatConfig::default()
        };
        let client = HeartbeatClient::new(config.clone(), sample());
        assert_eq!(client.beat().unwrap(), "http://play.example/abc");
        assert_eq!(fs::read_to_string(&config.output_file).unwrap(), "http://play.example/abc");

        let request = server.join().unwrap();
        assert!(request.starts_with("GET /heartbeat?port=25565&max=20"));
        fs::remove_dir_all(&dir).unwrap();
    }
}
