use std::path::Path;
use std::process::Stdio;

use russh::server::Handle;
use russh::{ChannelId, CryptoVec};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tracing::debug;

const COPY_BUF_SIZE: usize = 65536;

/// A parsed exec-request command. The only accepted shape is
/// `git-upload-pack <ref>` with exactly one space: anything else, including
/// extra arguments or unescaped spaces in the reference, is refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecCommand {
    pub reference: String,
}

impl ExecCommand {
    /// Parses the raw exec payload as delivered by the transport (the
    /// length-prefixed string has already been unmarshaled).
    pub fn parse(payload: &[u8]) -> Option<Self> {
        let command = std::str::from_utf8(payload).ok()?;
        let parts: Vec<&str> = command.split(' ').collect();
        if parts.len() != 2 {
            return None;
        }
        if parts[0] != "git-upload-pack" {
            return None;
        }
        Some(Self {
            reference: parts[1].to_string(),
        })
    }
}

/// A running upload-pack subprocess with its three stdio pipes.
///
/// The caller keeps `stdin` and feeds it with bytes arriving on the
/// channel; [`UploadPack::bridge`] streams stdout/stderr back to the peer
/// and reports the final status.
pub struct UploadPack {
    child: Child,
    pub stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
}

impl UploadPack {
    /// Runs `<bin> --strict <repo>` with the working directory and
    /// `GIT_DIR` both set to the resolved repository path. The environment
    /// is not inherited.
    pub fn spawn(bin: &Path, repo: &Path) -> std::io::Result<Self> {
        let mut cmd = Command::new(bin);
        cmd.arg("--strict")
            .arg(repo)
            .current_dir(repo)
            .env_clear()
            .env("GIT_DIR", repo)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let mut child = cmd.spawn()?;
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        Ok(Self {
            child,
            stdin,
            stdout,
            stderr,
        })
    }

    /// Streams the subprocess's stdout to the channel's data stream and
    /// its stderr to extended data type 1, then waits for termination.
    /// Blocks only the calling task.
    ///
    /// Returns 0 on clean exit and 1 on any failure.
    pub async fn bridge(mut self, handle: Handle, id: ChannelId) -> u32 {
        let stdout = self.stdout.take();
        let stderr = self.stderr.take();
        let out_handle = handle.clone();
        let copy_stdout = async move {
            let Some(mut stdout) = stdout else { return };
            let mut buf = vec![0u8; COPY_BUF_SIZE];
            loop {
                match stdout.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        if out_handle
                            .data(id, CryptoVec::from_slice(&buf[..n]))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(e) => {
                        debug!(error = %e, "error reading upload-pack stdout");
                        break;
                    }
                }
            }
        };
        let copy_stderr = async move {
            let Some(mut stderr) = stderr else { return };
            let mut buf = vec![0u8; COPY_BUF_SIZE];
            loop {
                match stderr.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        if handle
                            .extended_data(id, 1, CryptoVec::from_slice(&buf[..n]))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(e) => {
                        debug!(error = %e, "error reading upload-pack stderr");
                        break;
                    }
                }
            }
        };
        tokio::join!(copy_stdout, copy_stderr);
        self.wait_status().await
    }

    async fn wait_status(&mut self) -> u32 {
        match self.child.wait().await {
            Ok(status) if status.success() => 0,
            Ok(_) => 1,
            Err(_) => 1,
        }
    }
}
