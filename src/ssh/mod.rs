//! Remote CLI sessions.
//!
//! The collector talks to devices through [`SessionOpener`] and
//! [`CommandSession`] so tests can substitute scripted sessions. The
//! production opener uses libssh2 (blocking) on tokio's blocking pool.

use async_trait::async_trait;
use std::fmt;
use std::io::Read;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// libssh2's LIBSSH2_ERROR_TIMEOUT
const LIBSSH2_ERROR_TIMEOUT: i32 = -9;

/// Failure while reaching or driving a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Address did not resolve or TCP connect was refused
    Unreachable(String),
    Timeout(String),
    Authentication(String),
    /// Handshake or channel failure on an established connection
    Session(String),
    /// The device could not run one command; the session is still usable
    Command(String),
}

impl ConnectionError {
    /// Every kind except `Command` ends the collection attempt
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ConnectionError::Command(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ConnectionError::Unreachable(_) => "unreachable",
            ConnectionError::Timeout(_) => "timeout",
            ConnectionError::Authentication(_) => "authentication",
            ConnectionError::Session(_) => "session",
            ConnectionError::Command(_) => "command",
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::Unreachable(m) => write!(f, "Device unreachable: {}", m),
            ConnectionError::Timeout(m) => write!(f, "Timed out: {}", m),
            ConnectionError::Authentication(m) => write!(f, "Authentication failed: {}", m),
            ConnectionError::Session(m) => write!(f, "SSH session error: {}", m),
            ConnectionError::Command(m) => write!(f, "Command failed: {}", m),
        }
    }
}

impl std::error::Error for ConnectionError {}

/// Where and how to log in
#[derive(Debug, Clone)]
pub struct SessionTarget {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
}

#[async_trait]
pub trait SessionOpener: Send + Sync {
    async fn open(&self, target: &SessionTarget) -> Result<Box<dyn CommandSession>, ConnectionError>;
}

/// An authenticated session that runs commands one at a time
#[async_trait]
pub trait CommandSession: Send {
    /// Run one command and return its output verbatim
    async fn run(&mut self, command: &str) -> Result<String, ConnectionError>;

    async fn close(&mut self);
}

/// Keyboard-interactive prompt handler that always responds with the password
struct PasswordPrompt {
    password: String,
}

impl ssh2::KeyboardInteractivePrompt for PasswordPrompt {
    fn prompt<'a>(
        &mut self,
        _username: &str,
        _instructions: &str,
        prompts: &[ssh2::Prompt<'a>],
    ) -> Vec<String> {
        prompts.iter().map(|_| self.password.clone()).collect()
    }
}

/// libssh2-backed opener
#[derive(Debug, Clone, Default)]
pub struct SshOpener;

#[async_trait]
impl SessionOpener for SshOpener {
    async fn open(&self, target: &SessionTarget) -> Result<Box<dyn CommandSession>, ConnectionError> {
        let t = target.clone();
        let session = tokio::task::spawn_blocking(move || ssh_connect(&t))
            .await
            .map_err(|e| ConnectionError::Session(format!("Task join error: {}", e)))??;

        tracing::debug!("SSH session established to {}:{}", target.host, target.port);
        Ok(Box::new(SshSession {
            session: Some(session),
            label: format!("{}:{}", target.host, target.port),
            command_timeout: target.command_timeout,
        }))
    }
}

/// Create an SSH session and authenticate with password, then
/// keyboard-interactive. Blocking.
fn ssh_connect(target: &SessionTarget) -> Result<ssh2::Session, ConnectionError> {
    let addr = (target.host.as_str(), target.port)
        .to_socket_addrs()
        .map_err(|e| ConnectionError::Unreachable(format!("{}: {}", target.host, e)))?
        .next()
        .ok_or_else(|| ConnectionError::Unreachable(format!("{}: no address", target.host)))?;

    let tcp = TcpStream::connect_timeout(&addr, target.connect_timeout).map_err(|e| {
        if e.kind() == std::io::ErrorKind::TimedOut {
            ConnectionError::Timeout(format!("TCP connect to {}", addr))
        } else {
            ConnectionError::Unreachable(format!("TCP connect to {}: {}", addr, e))
        }
    })?;

    tcp.set_read_timeout(Some(target.command_timeout)).ok();
    tcp.set_write_timeout(Some(target.command_timeout)).ok();

    let mut session = ssh2::Session::new()
        .map_err(|e| ConnectionError::Session(format!("Failed to create SSH session: {}", e)))?;
    session.set_tcp_stream(tcp);
    session.set_timeout(u32::try_from(target.connect_timeout.as_millis()).unwrap_or(u32::MAX));
    session.handshake().map_err(|e| classify("SSH handshake", e))?;

    match session.userauth_password(&target.username, &target.password) {
        Ok(_) if session.authenticated() => {}
        _ => {
            // Keyboard-interactive is required by Arista EOS and similar
            let mut prompter = PasswordPrompt {
                password: target.password.clone(),
            };
            let _ = session.userauth_keyboard_interactive(&target.username, &mut prompter);
        }
    }

    if !session.authenticated() {
        return Err(ConnectionError::Authentication(format!(
            "all methods exhausted for user {}",
            target.username
        )));
    }

    session.set_timeout(u32::try_from(target.command_timeout.as_millis()).unwrap_or(u32::MAX));
    Ok(session)
}

fn classify(context: &str, e: ssh2::Error) -> ConnectionError {
    if e.code() == ssh2::ErrorCode::Session(LIBSSH2_ERROR_TIMEOUT) {
        ConnectionError::Timeout(context.to_string())
    } else {
        ConnectionError::Session(format!("{}: {}", context, e))
    }
}

struct SshSession {
    session: Option<ssh2::Session>,
    label: String,
    command_timeout: Duration,
}

#[async_trait]
impl CommandSession for SshSession {
    async fn run(&mut self, command: &str) -> Result<String, ConnectionError> {
        let session = self
            .session
            .clone()
            .ok_or_else(|| ConnectionError::Session("session already closed".to_string()))?;
        let cmd = command.to_string();

        let task = tokio::task::spawn_blocking(move || exec_on_session(&session, &cmd));
        match tokio::time::timeout(self.command_timeout + Duration::from_secs(1), task).await {
            Ok(joined) => joined.map_err(|e| ConnectionError::Session(format!("Task join error: {}", e)))?,
            Err(_) => Err(ConnectionError::Timeout(format!("'{}' on {}", command, self.label))),
        }
    }

    async fn close(&mut self) {
        if let Some(session) = self.session.take() {
            let label = self.label.clone();
            let _ = tokio::task::spawn_blocking(move || {
                if let Err(e) = session.disconnect(None, "collection complete", None) {
                    tracing::debug!("SSH disconnect from {} failed: {}", label, e);
                }
            })
            .await;
        }
    }
}

/// Execute a command on its own channel. Blocking.
fn exec_on_session(session: &ssh2::Session, cmd: &str) -> Result<String, ConnectionError> {
    let mut channel = session
        .channel_session()
        .map_err(|e| classify("Failed to open channel", e))?;

    if let Err(e) = channel.exec(cmd) {
        let _ = channel.wait_close();
        return Err(ConnectionError::Command(format!("'{}': {}", cmd, e)));
    }

    // Devices may emit non-UTF-8 text (GBK descriptions), which is kept lossily
    let mut output = Vec::new();
    channel.read_to_end(&mut output).map_err(|e| {
        if e.kind() == std::io::ErrorKind::TimedOut || e.kind() == std::io::ErrorKind::WouldBlock {
            ConnectionError::Timeout(format!("reading output of '{}'", cmd))
        } else {
            ConnectionError::Session(format!("Failed to read output of '{}': {}", cmd, e))
        }
    })?;
    let _ = channel.wait_close();

    Ok(decode_output(&output))
}

fn decode_output(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
