use std::{fmt, fs::File, io};

use mockall::automock;
use suppaftp::{types::FileType, FtpError, FtpStream};
use thiserror::Error;

use crate::config::ServerConfig;

#[derive(Debug, Error)]
pub enum FtpClientError {
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Authentication error: {0}")]
    Authentication(String),
    #[error("Unexpected server response: {0}")]
    Protocol(String),
    #[error("Local file error: {0}")]
    Io(#[from] io::Error),
}

impl FtpClientError {
    /// Whether a new connection attempt may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, FtpClientError::Connection(_))
    }
}

impl From<FtpError> for FtpClientError {
    fn from(error: FtpError) -> Self {
        match error {
            FtpError::ConnectionError(error) => FtpClientError::Connection(error.to_string()),
            other => FtpClientError::Protocol(other.to_string()),
        }
    }
}

/// An established FTP session.
#[automock]
pub trait FtpClient {
    /// Store `file` content on server as `remote_name` (binary mode).
    fn store_binary(&mut self, remote_name: &str, file: &mut File) -> Result<u64, FtpClientError>;
    fn quit(&mut self) -> Result<(), FtpClientError>;
}

#[automock]
pub trait FtpConnector {
    fn connect(&self) -> Result<Box<dyn FtpClient>, FtpClientError>;
}

#[derive(Clone)]
pub struct SuppaFtpConnector {
    host: String,
    port: u16,
    credentials: Option<(String, String)>,
}

impl SuppaFtpConnector {
    pub fn new(host: String, port: u16, credentials: Option<(String, String)>) -> Self {
        Self {
            host,
            port,
            credentials,
        }
    }

    pub fn from_config(server: &ServerConfig) -> Self {
        let credentials = server.username.as_ref().map(|username| {
            (
                username.clone(),
                server.password.clone().unwrap_or_default(),
            )
        });
        Self::new(server.host.clone(), server.port, credentials)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for SuppaFtpConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuppaFtpConnector")
            .field("host", &self.host)
            .field("port", &self.port)
            .field(
                "username",
                &self.credentials.as_ref().map(|(username, _)| username),
            )
            .finish()
    }
}

impl FtpConnector for SuppaFtpConnector {
    fn connect(&self) -> Result<Box<dyn FtpClient>, FtpClientError> {
        let mut stream = FtpStream::connect((self.host.as_str(), self.port))?;
        if let Some((username, password)) = &self.credentials {
            stream
                .login(username, password)
                .map_err(|error| FtpClientError::Authentication(error.to_string()))?;
        }
        stream.transfer_type(FileType::Binary)?;
        log::debug!("Connected to ftp server {}", self.address());
        Ok(Box::new(SuppaFtpClient { stream }))
    }
}

pub struct SuppaFtpClient {
    stream: FtpStream,
}

impl FtpClient for SuppaFtpClient {
    fn store_binary(&mut self, remote_name: &str, file: &mut File) -> Result<u64, FtpClientError> {
        Ok(self.stream.put_file(remote_name, file)?)
    }

    fn quit(&mut self) -> Result<(), FtpClientError> {
        Ok(self.stream.quit()?)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::*;
    use std::net::TcpListener;

    #[rstest]
    #[case(FtpClientError::Connection("reset".to_string()), true)]
    #[case(FtpClientError::Authentication("530".to_string()), false)]
    #[case(FtpClientError::Protocol("550".to_string()), false)]
    fn test_is_transient(#[case] error: FtpClientError, #[case] expected: bool) {
        assert_eq!(error.is_transient(), expected);
    }

    #[test]
    fn test_connect_refused_is_transient() {
        // Bind then release a port to get one nobody listens on
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let connector = SuppaFtpConnector::new("127.0.0.1".to_string(), port, None);

        let error = connector.connect().err().unwrap();

        assert!(error.is_transient());
    }

    #[test]
    fn test_debug_hides_password() {
        let connector = SuppaFtpConnector::new(
            "localhost".to_string(),
            21,
            Some(("photo".to_string(), "secret".to_string())),
        );
        assert!(!format!("{:?}", connector).contains("secret"));
    }
}
