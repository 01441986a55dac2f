#[derive(Clone, Debug)]
pub enum GitGateError {
    HostKey(String),
    Io(String),
    RusshError(String),
    SshServerStartError(String),
    ConfigError(String),
}

impl From<russh::Error> for GitGateError {
    fn from(e: russh::Error) -> Self {
        GitGateError::RusshError(format!("{}", e))
    }
}

impl From<russh::keys::Error> for GitGateError {
    fn from(e: russh::keys::Error) -> Self {
        GitGateError::HostKey(format!("{}", e))
    }
}

impl From<std::io::Error> for GitGateError {
    fn from(e: std::io::Error) -> Self {
        GitGateError::Io(format!("{}", e))
    }
}

impl std::fmt::Display for GitGateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GitGateError::HostKey(e) => write!(f, "Host key error: {}", e),
            GitGateError::Io(e) => write!(f, "IO error: {}", e),
            GitGateError::RusshError(e) => write!(f, "SSH error: {}", e),
            GitGateError::SshServerStartError(e) => write!(f, "SSH server start error: {}", e),
            GitGateError::ConfigError(e) => write!(f, "Config error: {}", e),
        }
    }
}

impl std::error::Error for GitGateError {}
