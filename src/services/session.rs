use crate::models::{AuthMethod, CommandResult, ConnectionParameters, ForwardingRule};
use crate::utils::error::{LauncherError, Result};
use russh::client::{self, AuthResult};
use russh::keys::{PrivateKey, PrivateKeyWithHashAlg, PublicKey};
use russh::{ChannelMsg, Disconnect};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

type SshHandle = client::Handle<ClientHandler>;

/// Entry point for opening remote sessions.
///
/// One orchestrator use owns at most one active [`RemoteSession`]; all
/// further work (exec, forwarding, teardown) happens through the session
/// handle itself.
pub struct SessionOrchestrator;

impl SessionOrchestrator {
    /// Connect and authenticate, returning an opaque session handle.
    ///
    /// The timeout covers the TCP connect, the SSH handshake and
    /// authentication together.
    pub async fn connect(
        params: &ConnectionParameters,
        timeout: Duration,
    ) -> Result<RemoteSession> {
        tracing::info!("Connecting to {}", params.display_name());

        let connect = Self::connect_inner(params);
        match tokio::time::timeout(timeout, connect).await {
            Ok(result) => result,
            Err(_) => Err(LauncherError::ConnectTimeout(timeout)),
        }
    }

    async fn connect_inner(params: &ConnectionParameters) -> Result<RemoteSession> {
        let config = client::Config {
            inactivity_timeout: Some(Duration::from_secs(300)),
            ..<client::Config as Default>::default()
        };

        let handler = if params.verify_host_key {
            ClientHandler::with_verification(params.host_key_fingerprint.clone())
        } else {
            ClientHandler::new()
        };

        let mut session = client::connect(
            Arc::new(config),
            (params.host.as_str(), params.port),
            handler,
        )
        .await
        .map_err(|e| LauncherError::ConnectionFailed(e.to_string()))?;

        let auth_res = match &params.auth {
            AuthMethod::Password { password } => session
                .authenticate_password(&params.username, password)
                .await
                .map_err(|e| LauncherError::AuthenticationFailed(e.to_string()))?,
            AuthMethod::PublicKey {
                private_key_path,
                passphrase,
            } => {
                let key_data = tokio::fs::read_to_string(private_key_path)
                    .await
                    .map_err(|_| {
                        LauncherError::KeyFileNotFound(private_key_path.display().to_string())
                    })?;

                let key = PrivateKey::from_openssh(key_data.trim()).map_err(|e| {
                    LauncherError::AuthenticationFailed(format!("Failed to load key: {}", e))
                })?;
                let key = if let Some(pass) = passphrase {
                    key.decrypt(pass.as_bytes()).map_err(|e| {
                        LauncherError::AuthenticationFailed(format!("Failed to decrypt key: {}", e))
                    })?
                } else {
                    key
                };

                let key_with_alg = PrivateKeyWithHashAlg::new(Arc::new(key), None);
                session
                    .authenticate_publickey(&params.username, key_with_alg)
                    .await
                    .map_err(|e| LauncherError::AuthenticationFailed(e.to_string()))?
            }
        };

        if !matches!(auth_res, AuthResult::Success) {
            return Err(LauncherError::AuthenticationFailed(
                "credentials rejected by server".to_string(),
            ));
        }

        tracing::info!("Authenticated to {}", params.display_name());

        Ok(RemoteSession {
            handle: Arc::new(Mutex::new(session)),
            label: params.display_name(),
            forwards: Vec::new(),
            closed: false,
        })
    }
}

/// An authenticated remote session.
///
/// Exec channels and forwarding rules are derived from the session and die
/// with it: `disconnect` (idempotent) aborts every forward listener and
/// closes the transport, and dropping the session aborts the listeners too.
pub struct RemoteSession {
    handle: Arc<Mutex<SshHandle>>,
    label: String,
    forwards: Vec<ForwardHandle>,
    closed: bool,
}

impl RemoteSession {
    /// Run one remote command over a fresh exec channel.
    ///
    /// Blocks until the channel is drained to EOF and returns the full
    /// buffered output at once. A non-zero remote exit status is reported in
    /// [`CommandResult::failure`], not as an `Err`.
    pub async fn run(&mut self, command: &str, timeout: Duration) -> Result<CommandResult> {
        if self.closed {
            return Err(LauncherError::SessionClosed);
        }

        tracing::debug!("Running on {}: {}", self.label, command);

        let mut channel = {
            let handle = self.handle.lock().await;
            handle
                .channel_open_session()
                .await
                .map_err(|e| LauncherError::ExecFailed(e.to_string()))?
        };

        channel
            .exec(true, command)
            .await
            .map_err(|e| LauncherError::ExecFailed(e.to_string()))?;

        let drain = async {
            let mut capture = ExecCapture::new();
            while capture.accept(channel.wait().await) {}
            capture
        };

        let capture = tokio::time::timeout(timeout, drain)
            .await
            .map_err(|_| LauncherError::ExecTimeout(timeout))?;

        let result = capture.into_result();
        if let Some(status) = result.exit_status {
            tracing::debug!("Command finished with status {}", status);
        }

        Ok(result)
    }

    /// Establish a local listener that tunnels accepted connections through
    /// this session to `remote_host:remote_port`.
    ///
    /// Fails with [`LauncherError::PortInUse`] if `local_port` is already
    /// bound. The listener runs until the session is disconnected.
    pub async fn forward_local_port(
        &mut self,
        local_port: u16,
        remote_host: &str,
        remote_port: u16,
    ) -> Result<ForwardingRule> {
        if self.closed {
            return Err(LauncherError::SessionClosed);
        }

        let rule = ForwardingRule::new(local_port, remote_host, remote_port);
        tracing::info!("Creating local forward: {}", rule.description());

        let listener = bind_forward_listener(&rule.bind_address, local_port).await?;

        let handle = self.handle.clone();
        let remote_host = rule.remote_host.clone();

        let task = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((mut local_stream, peer_addr)) => {
                        tracing::debug!("Accepted connection from {}", peer_addr);

                        let handle = handle.clone();
                        let remote_host = remote_host.clone();

                        tokio::spawn(async move {
                            match handle_forward_connection(
                                handle,
                                &mut local_stream,
                                &remote_host,
                                remote_port,
                            )
                            .await
                            {
                                Ok(_) => {
                                    tracing::debug!("Connection from {} completed", peer_addr);
                                }
                                Err(e) => {
                                    tracing::error!("Forward error for {}: {}", peer_addr, e);
                                }
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!("Accept error: {}", e);
                        break;
                    }
                }
            }
        });

        self.forwards.push(ForwardHandle {
            rule: rule.clone(),
            task: Some(task),
        });

        Ok(rule)
    }

    /// Forwarding rules currently bound to this session
    pub fn forwarding_rules(&self) -> Vec<ForwardingRule> {
        self.forwards.iter().map(|f| f.rule.clone()).collect()
    }

    /// Whether `disconnect` has been called
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Tear down the session and every forwarding rule derived from it.
    ///
    /// Idempotent; subsequent calls are no-ops.
    pub async fn disconnect(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        for mut forward in self.forwards.drain(..) {
            forward.stop();
        }

        let handle = self.handle.lock().await;
        if let Err(e) = handle
            .disconnect(Disconnect::ByApplication, "", "English")
            .await
        {
            // The transport may already be gone; the session is released
            // either way.
            tracing::debug!("Disconnect from {} returned: {}", self.label, e);
        }

        tracing::info!("Disconnected from {}", self.label);
        Ok(())
    }
}

impl Drop for RemoteSession {
    fn drop(&mut self) {
        for forward in &mut self.forwards {
            forward.stop();
        }
    }
}

/// Accumulated output of one exec channel.
struct ExecCapture {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    exit_status: Option<u32>,
}

impl ExecCapture {
    fn new() -> Self {
        Self {
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit_status: None,
        }
    }

    /// Feed one channel message; returns false once the channel is drained.
    ///
    /// EOF only ends the data stream; the exit status may still arrive
    /// afterwards, so draining continues until the channel closes.
    fn accept(&mut self, msg: Option<ChannelMsg>) -> bool {
        match msg {
            Some(ChannelMsg::Data { ref data }) => {
                self.stdout.extend_from_slice(data);
                true
            }
            Some(ChannelMsg::ExtendedData { ref data, .. }) => {
                self.stderr.extend_from_slice(data);
                true
            }
            Some(ChannelMsg::ExitStatus { exit_status }) => {
                self.exit_status = Some(exit_status);
                true
            }
            Some(ChannelMsg::Eof) => true,
            Some(ChannelMsg::Close) | None => false,
            Some(_) => true,
        }
    }

    fn into_result(self) -> CommandResult {
        CommandResult::from_raw(self.stdout, self.stderr, self.exit_status)
    }
}

/// Handle for one running forward listener
pub struct ForwardHandle {
    pub rule: ForwardingRule,
    task: Option<JoinHandle<()>>,
}

impl ForwardHandle {
    /// Stop the listener
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::info!("Stopped forward {}", self.rule.id);
        }
    }

    /// Check if the listener is still running
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for ForwardHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Bind the local listener for a forward, mapping a bind conflict to
/// [`LauncherError::PortInUse`].
pub(crate) async fn bind_forward_listener(
    bind_address: &str,
    local_port: u16,
) -> Result<TcpListener> {
    let bind_addr = format!("{}:{}", bind_address, local_port);
    let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::AddrInUse {
            LauncherError::PortInUse(local_port)
        } else {
            LauncherError::ForwardFailed(format!("Failed to bind to {}: {}", bind_addr, e))
        }
    })?;

    tracing::info!("Listening on {}", bind_addr);
    Ok(listener)
}

async fn handle_forward_connection(
    handle: Arc<Mutex<SshHandle>>,
    local_stream: &mut TcpStream,
    remote_host: &str,
    remote_port: u16,
) -> Result<()> {
    let guard = handle.lock().await;

    let mut channel = guard
        .channel_open_direct_tcpip(remote_host, remote_port as u32, "localhost", 0)
        .await
        .map_err(|e| {
            LauncherError::ForwardFailed(format!(
                "Failed to open channel to {}:{}: {}",
                remote_host, remote_port, e
            ))
        })?;

    drop(guard); // Release the lock

    let (mut local_read, mut local_write) = local_stream.split();
    let mut buf = vec![0u8; 8192];

    loop {
        tokio::select! {
            result = local_read.read(&mut buf) => {
                match result {
                    Ok(0) => break, // EOF
                    Ok(n) => {
                        channel.data(&buf[..n]).await
                            .map_err(|e| LauncherError::ForwardFailed(e.to_string()))?;
                    }
                    Err(e) => {
                        tracing::debug!("Local read error: {}", e);
                        break;
                    }
                }
            }
            message = channel.wait() => {
                match message {
                    Some(ChannelMsg::Data { ref data }) => {
                        local_write.write_all(data).await
                            .map_err(|e| LauncherError::ForwardFailed(e.to_string()))?;
                    }
                    Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    Ok(())
}

/// SSH client handler with optional host key verification
#[derive(Clone)]
pub struct ClientHandler {
    /// Whether to verify server host keys
    pub verify_host_keys: bool,
    /// Expected host key fingerprint (SHA256)
    pub expected_fingerprint: Option<String>,
}

impl ClientHandler {
    pub fn new() -> Self {
        Self {
            verify_host_keys: false,
            expected_fingerprint: None,
        }
    }

    /// Create handler with host key verification enabled
    pub fn with_verification(expected_fingerprint: Option<String>) -> Self {
        Self {
            verify_host_keys: true,
            expected_fingerprint,
        }
    }

    /// Calculate SHA256 fingerprint of a public key
    fn calculate_fingerprint(key: &PublicKey) -> String {
        use russh::keys::ssh_key::HashAlg;
        key.fingerprint(HashAlg::Sha256).to_string()
    }
}

impl Default for ClientHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl client::Handler for ClientHandler {
    type Error = russh::Error;

    fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> impl std::future::Future<Output = std::result::Result<bool, Self::Error>> + Send {
        let fingerprint = Self::calculate_fingerprint(server_public_key);
        let verify_host_keys = self.verify_host_keys;
        let expected_fingerprint = self.expected_fingerprint.clone();

        async move {
            tracing::info!("Server key fingerprint: {}", fingerprint);

            if !verify_host_keys {
                tracing::warn!("Host key verification disabled - accepting server key");
                return Ok(true);
            }

            match &expected_fingerprint {
                Some(expected) if expected == &fingerprint => {
                    tracing::info!("Server key verified successfully");
                    Ok(true)
                }
                Some(expected) => {
                    tracing::error!("Server key mismatch!");
                    tracing::error!("Expected: {}", expected);
                    tracing::error!("Received: {}", fingerprint);
                    Err(russh::Error::UnknownKey)
                }
                None => {
                    // First connection; accept and log the fingerprint so the
                    // user can pin it for the next attempt.
                    tracing::warn!("First connection to this host");
                    tracing::warn!("Server key fingerprint: {}", fingerprint);
                    Ok(true)
                }
            }
        }
    }
}
