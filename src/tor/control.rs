//! Tor Control Port client
//!
//! One connection, one command in flight. Tor replies carry no request id,
//! so every exchange holds the connection lock from write until the final
//! status line has been read.

use super::error::ControlError;
use super::reply::{ControlReply, ReplyAssembler};
use crate::config::TorConfig;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Common cookie file locations
const COOKIE_PATHS: &[&str] = &[
    "/run/tor/control.authcookie",
    "/var/run/tor/control.authcookie",
    "/var/lib/tor/control_auth_cookie",
];

/// Sends one command line and returns its complete reply
#[async_trait]
pub trait ControlTransport: Send + Sync {
    async fn send_command(&self, command: &str) -> Result<ControlReply, ControlError>;
}

/// Serialized access to the Tor control port
pub struct ControlChannel {
    settings: TorConfig,
    timeout: Duration,
    conn: Mutex<Option<Connection>>,
}

impl ControlChannel {
    /// Connect and authenticate
    pub async fn connect(settings: &TorConfig) -> Result<Self, ControlError> {
        let timeout = settings.command_timeout();
        let conn = Connection::open(settings, timeout).await?;
        info!(
            "Connected to Tor control port {}:{}",
            settings.control_host, settings.control_port
        );

        Ok(Self {
            settings: settings.clone(),
            timeout,
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Send a single command and wait for its full reply.
    ///
    /// Callers queue on the connection lock. Any failure during the exchange
    /// drops the connection; the next call reconnects first.
    pub async fn send_command(&self, command: &str) -> Result<ControlReply, ControlError> {
        if command.contains(['\r', '\n']) {
            return Err(ControlError::invalid("command must be a single line"));
        }

        let mut guard = self.conn.lock().await;
        if guard.is_none() {
            info!("Re-establishing Tor control connection");
            *guard = Some(Connection::open(&self.settings, self.timeout).await?);
        }
        let Some(conn) = guard.as_mut() else {
            return Err(ControlError::Closed);
        };

        let name = command_name(command);
        debug!("Sending Tor command: {}", name);

        match conn.exchange_timed(command, self.timeout).await {
            Ok(reply) => {
                debug!("{} reply: {}", name, reply);
                Ok(reply)
            },
            Err(e) => {
                warn!("{} failed, dropping control connection: {}", name, e);
                *guard = None;
                Err(e)
            },
        }
    }

    /// Whether a live connection is currently held
    pub async fn is_connected(&self) -> bool {
        self.conn.lock().await.is_some()
    }

    /// Close the connection. Waits for an in-flight command to finish.
    pub async fn close(&self) {
        if let Some(mut conn) = self.conn.lock().await.take() {
            if let Err(e) = conn.stream.get_mut().shutdown().await {
                debug!("Error closing control connection: {}", e);
            }
            info!("Tor control connection closed");
        }
    }
}

#[async_trait]
impl ControlTransport for ControlChannel {
    async fn send_command(&self, command: &str) -> Result<ControlReply, ControlError> {
        ControlChannel::send_command(self, command).await
    }
}

/// Only the keyword is logged; arguments may carry key material
fn command_name(command: &str) -> &str {
    command.split_whitespace().next().unwrap_or("")
}

struct Connection {
    stream: BufReader<TcpStream>,
}

impl Connection {
    async fn open(settings: &TorConfig, timeout: Duration) -> Result<Self, ControlError> {
        let addr = format!("{}:{}", settings.control_host, settings.control_port);
        debug!("Connecting to Tor control port: {}", addr);

        let stream = match tokio::time::timeout(timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(ControlError::Connect { addr, source }),
            Err(_) => {
                return Err(ControlError::Connect {
                    addr,
                    source: std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        "connection attempt timed out",
                    ),
                })
            },
        };

        let mut conn = Self {
            stream: BufReader::new(stream),
        };
        conn.authenticate(settings, timeout).await?;
        Ok(conn)
    }

    async fn exchange(&mut self, command: &str) -> Result<ControlReply, ControlError> {
        let writer = self.stream.get_mut();
        writer.write_all(command.as_bytes()).await?;
        writer.write_all(b"\r\n").await?;
        writer.flush().await?;

        let mut assembler = ReplyAssembler::default();
        loop {
            let mut line = String::new();
            if self.stream.read_line(&mut line).await? == 0 {
                return Err(ControlError::Closed);
            }
            if let Some(reply) = assembler.push(&line)? {
                return Ok(reply);
            }
        }
    }

    async fn exchange_timed(
        &mut self,
        command: &str,
        timeout: Duration,
    ) -> Result<ControlReply, ControlError> {
        match tokio::time::timeout(timeout, self.exchange(command)).await {
            Ok(result) => result,
            Err(_) => Err(ControlError::Timeout(timeout)),
        }
    }

    async fn authenticate(&mut self, settings: &TorConfig, timeout: Duration) -> Result<(), ControlError> {
        // Tor expects hex-encoded password when using HashedControlPassword
        if let Some(password) = &settings.control_password {
            let cmd = format!(
                "AUTHENTICATE {}",
                data_encoding::HEXLOWER.encode(password.as_bytes())
            );
            return self.send_authenticate(&cmd, timeout).await;
        }

        let info = self.exchange_timed("PROTOCOLINFO 1", timeout).await?;
        let methods = AuthMethods::from_reply(&info)?;
        debug!("Tor auth methods: {:?}", methods.methods);

        if methods.allows("NULL") {
            return self.send_authenticate("AUTHENTICATE", timeout).await;
        }

        if methods.allows("COOKIE") {
            // Tor closes the connection after a failed AUTHENTICATE, so only
            // the first readable cookie gets a try
            for path in cookie_candidates(settings, &methods) {
                if let Ok(cookie) = tokio::fs::read(&path).await {
                    debug!("Authenticating with cookie from {}", path.display());
                    let cmd = format!("AUTHENTICATE {}", data_encoding::HEXLOWER.encode(&cookie));
                    return self.send_authenticate(&cmd, timeout).await;
                }
            }
            return Err(ControlError::Authentication(
                "cookie authentication required but no cookie file is readable".to_string(),
            ));
        }

        Err(ControlError::Authentication(format!(
            "no supported auth method offered by Tor ({}); configure control_password",
            methods.methods.join(",")
        )))
    }

    async fn send_authenticate(&mut self, cmd: &str, timeout: Duration) -> Result<(), ControlError> {
        let reply = self.exchange_timed(cmd, timeout).await?;
        if reply.is_ok() {
            debug!("Authenticated to Tor control port");
            Ok(())
        } else {
            Err(ControlError::Authentication(reply.raw().trim_end().to_string()))
        }
    }
}

fn cookie_candidates(settings: &TorConfig, methods: &AuthMethods) -> Vec<PathBuf> {
    settings
        .cookie_path
        .iter()
        .cloned()
        .chain(methods.cookie_file.iter().map(PathBuf::from))
        .chain(COOKIE_PATHS.iter().map(PathBuf::from))
        .collect()
}

/// Authentication methods advertised in a PROTOCOLINFO reply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthMethods {
    pub methods: Vec<String>,
    pub cookie_file: Option<String>,
}

impl AuthMethods {
    /// Parse `250-AUTH METHODS=COOKIE,SAFECOOKIE COOKIEFILE="/path"`
    pub fn from_reply(reply: &ControlReply) -> Result<Self, ControlError> {
        if !reply.is_ok() {
            return Err(ControlError::Authentication(reply.raw().trim_end().to_string()));
        }

        let auth = reply
            .lines()
            .iter()
            .find_map(|line| line.text.strip_prefix("AUTH "))
            .ok_or_else(|| ControlError::parse("PROTOCOLINFO reply missing AUTH line"))?;

        let mut parsed = Self::default();
        if let Some(start) = auth.find("METHODS=") {
            let rest = &auth[start + "METHODS=".len()..];
            let end = rest.find(' ').unwrap_or(rest.len());
            parsed.methods = rest[..end]
                .split(',')
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(start) = auth.find("COOKIEFILE=\"") {
            let rest = &auth[start + "COOKIEFILE=\"".len()..];
            if let Some(end) = rest.find('"') {
                parsed.cookie_file = Some(rest[..end].to_string());
            }
        }

        Ok(parsed)
    }

    pub fn allows(&self, method: &str) -> bool {
        self.methods.iter().any(|m| m == method)
    }
}
