use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;

use russh::server::{Auth, Msg, Session};
use russh::{Channel, ChannelId};
use tokio::io::AsyncWriteExt;
use tokio::process::ChildStdin;
use tracing::{debug, error, info, warn};

use crate::config::GatewayConfig;
use crate::error::GitGateError;
use crate::repo;
use crate::ssh::exec::{ExecCommand, UploadPack};

/// Per-connection handler. Accepts only "session" channels and services a
/// single `git-upload-pack` exec request per channel; everything else is
/// refused.
pub struct SshHandler {
    pub config: Arc<GatewayConfig>,
    pub addr: Option<SocketAddr>,
    /// Stdin pipe of the subprocess running on each busy channel. Channel
    /// data is forwarded here; channel EOF drops the pipe.
    children: HashMap<ChannelId, ChildStdin>,
    /// Channels that have already seen an exec request. An entry is never
    /// cleared by EOF or a dropped stdin, only by channel close, so a
    /// channel can service at most one exec over its lifetime.
    serviced: HashSet<ChannelId>,
}

impl SshHandler {
    pub fn new(config: Arc<GatewayConfig>, addr: Option<SocketAddr>) -> Self {
        Self {
            config,
            addr,
            children: HashMap::new(),
            serviced: HashSet::new(),
        }
    }
}

impl russh::server::Handler for SshHandler {
    type Error = GitGateError;

    /// Anonymous access: "none" authentication always succeeds.
    async fn auth_none(&mut self, user: &str) -> Result<Auth, Self::Error> {
        info!(peer = ?self.addr, user = %user, "accepting anonymous client");
        Ok(Auth::Accept)
    }

    async fn channel_open_session(
        &mut self,
        channel: Channel<Msg>,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        debug!(peer = ?self.addr, channel = ?channel.id(), "session channel opened");
        Ok(true)
    }

    async fn channel_open_direct_tcpip(
        &mut self,
        _channel: Channel<Msg>,
        host_to_connect: &str,
        port_to_connect: u32,
        _originator_address: &str,
        _originator_port: u32,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        warn!(
            peer = ?self.addr,
            target = %format!("{}:{}", host_to_connect, port_to_connect),
            "refusing direct-tcpip channel"
        );
        Ok(false)
    }

    async fn channel_open_forwarded_tcpip(
        &mut self,
        _channel: Channel<Msg>,
        _host_to_connect: &str,
        _port_to_connect: u32,
        _originator_address: &str,
        _originator_port: u32,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        warn!(peer = ?self.addr, "refusing forwarded-tcpip channel");
        Ok(false)
    }

    async fn channel_open_direct_streamlocal(
        &mut self,
        _channel: Channel<Msg>,
        _socket_path: &str,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        warn!(peer = ?self.addr, "refusing direct-streamlocal channel");
        Ok(false)
    }

    async fn channel_open_x11(
        &mut self,
        _channel: Channel<Msg>,
        _originator_address: &str,
        _originator_port: u32,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        warn!(peer = ?self.addr, "refusing x11 channel");
        Ok(false)
    }

    /// Services the one command this gateway understands:
    /// `git-upload-pack <ref>`.
    async fn exec_request(
        &mut self,
        channel: ChannelId,
        data: &[u8],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        if !self.serviced.insert(channel) {
            // The first exec owns the teardown; refuse without touching
            // the channel state.
            warn!(peer = ?self.addr, channel = ?channel, "exec request on an already serviced channel");
            session.channel_failure(channel)?;
            return Ok(());
        }
        let Some(command) = ExecCommand::parse(data) else {
            warn!(
                peer = ?self.addr,
                command = %String::from_utf8_lossy(data),
                "refusing exec command"
            );
            session.channel_failure(channel)?;
            session.eof(channel)?;
            session.close(channel)?;
            return Ok(());
        };

        let repo_path = repo::resolve(&self.config.repo_root, &command.reference);
        info!(peer = ?self.addr, repo = %repo_path.display(), "requesting repo");
        session.channel_success(channel)?;

        let handle = session.handle();
        match UploadPack::spawn(&self.config.upload_pack_bin, &repo_path) {
            Ok(mut upload_pack) => {
                if let Some(stdin) = upload_pack.stdin.take() {
                    self.children.insert(channel, stdin);
                }
                tokio::spawn(async move {
                    let status = upload_pack.bridge(handle.clone(), channel).await;
                    // Status, EOF, close, in protocol order. The channel is
                    // torn down exactly once, after the single command.
                    let _ = handle.exit_status_request(channel, status).await;
                    let _ = handle.eof(channel).await;
                    let _ = handle.close(channel).await;
                });
            }
            Err(e) => {
                error!(
                    peer = ?self.addr,
                    repo = %repo_path.display(),
                    error = %e,
                    "failed to start upload-pack"
                );
                session.exit_status_request(channel, 1)?;
                session.eof(channel)?;
                session.close(channel)?;
            }
        }
        Ok(())
    }

    /// Bytes from the peer are the subprocess's stdin.
    async fn data(
        &mut self,
        channel: ChannelId,
        data: &[u8],
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        if let Some(stdin) = self.children.get_mut(&channel) {
            if let Err(e) = stdin.write_all(data).await {
                debug!(error = %e, "failed to write to upload-pack stdin");
                self.children.remove(&channel);
            }
        }
        Ok(())
    }

    /// Peer EOF closes the subprocess's stdin so pack negotiation can
    /// finish.
    async fn channel_eof(
        &mut self,
        channel: ChannelId,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.children.remove(&channel);
        Ok(())
    }

    async fn channel_close(
        &mut self,
        channel: ChannelId,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.children.remove(&channel);
        self.serviced.remove(&channel);
        Ok(())
    }
}
