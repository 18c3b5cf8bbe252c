#![allow(dead_code)]

use async_trait::async_trait;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use ftpd_core::sample::LocalFs;
use ftpd_core::{
    ClientContext, ClientHandlingDriver, DriverError, FileInfo, OpenMode, Server, ServerDriver,
    ServerError, Settings,
};
use ftpd_core::driver::FileStream;

pub const USER: &str = "bob";
pub const PASSWORD: &str = "secret";

const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

pub type Calls = Arc<Mutex<Vec<String>>>;

/// Driver recording every call it receives, serving files from a local
/// directory.
pub struct TestDriver {
    root: PathBuf,
    calls: Calls,
    max_connections: Option<usize>,
    idle_timeout_secs: Option<u64>,
    data_timeout_secs: u64,
    tls: Option<Arc<rustls::ServerConfig>>,
    welcome_fails: bool,
}

impl TestDriver {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            calls: Arc::new(Mutex::new(Vec::new())),
            max_connections: None,
            idle_timeout_secs: None,
            data_timeout_secs: 5,
            tls: None,
            welcome_fails: false,
        }
    }

    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = Some(max);
        self
    }

    pub fn idle_timeout_secs(mut self, secs: u64) -> Self {
        self.idle_timeout_secs = Some(secs);
        self
    }

    pub fn data_timeout_secs(mut self, secs: u64) -> Self {
        self.data_timeout_secs = secs;
        self
    }

    pub fn tls(mut self, config: Arc<rustls::ServerConfig>) -> Self {
        self.tls = Some(config);
        self
    }

    pub fn welcome_fails(mut self) -> Self {
        self.welcome_fails = true;
        self
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ServerDriver for TestDriver {
    fn settings(&self) -> Settings {
        Settings {
            listen_host: Some("127.0.0.1".into()),
            listen_port: Some(0),
            max_connections: self.max_connections,
            idle_timeout_secs: self.idle_timeout_secs,
            data_connection_timeout_secs: Some(self.data_timeout_secs),
            ..Settings::default()
        }
    }

    async fn welcome_user(&self, cc: &dyn ClientContext) -> Result<String, DriverError> {
        self.record(format!("welcome {}", cc.id()));
        if self.welcome_fails {
            return Err(DriverError::Rejected("maintenance".into()));
        }
        Ok("Welcome".into())
    }

    async fn user_left(&self, cc: &dyn ClientContext) {
        self.record(format!("left {}", cc.id()));
    }

    async fn auth_user(
        &self,
        _cc: &dyn ClientContext,
        user: &str,
        pass: &str,
    ) -> Result<Arc<dyn ClientHandlingDriver>, DriverError> {
        self.record(format!("auth {}", user));
        if user == USER && pass == PASSWORD {
            Ok(Arc::new(RecordingFs {
                inner: LocalFs::new(self.root.clone()),
                calls: self.calls.clone(),
            }))
        } else {
            Err(DriverError::AuthenticationFailed("bad user or password".into()))
        }
    }

    async fn tls_config(&self) -> Result<Arc<rustls::ServerConfig>, DriverError> {
        self.tls.clone().ok_or(DriverError::TlsNotConfigured)
    }
}

pub struct RecordingFs {
    inner: LocalFs,
    calls: Calls,
}

impl RecordingFs {
    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ClientHandlingDriver for RecordingFs {
    async fn change_directory(&self, cc: &dyn ClientContext, directory: &str) -> Result<(), DriverError> {
        self.record(format!("cwd {}", directory));
        self.inner.change_directory(cc, directory).await
    }

    async fn make_directory(&self, cc: &dyn ClientContext, directory: &str) -> Result<(), DriverError> {
        self.record(format!("mkd {}", directory));
        self.inner.make_directory(cc, directory).await
    }

    async fn list_files(&self, cc: &dyn ClientContext) -> Result<Vec<FileInfo>, DriverError> {
        self.record(format!("list {}", cc.path()));
        self.inner.list_files(cc).await
    }

    async fn open_file(
        &self,
        cc: &dyn ClientContext,
        path: &str,
        mode: OpenMode,
    ) -> Result<Box<dyn FileStream>, DriverError> {
        self.record(format!("open {} {:?}", path, mode));
        self.inner.open_file(cc, path, mode).await
    }

    async fn delete_file(&self, cc: &dyn ClientContext, path: &str) -> Result<(), DriverError> {
        self.record(format!("delete {}", path));
        self.inner.delete_file(cc, path).await
    }

    async fn file_info(&self, cc: &dyn ClientContext, path: &str) -> Result<FileInfo, DriverError> {
        self.record(format!("info {}", path));
        self.inner.file_info(cc, path).await
    }

    async fn rename_file(&self, cc: &dyn ClientContext, from: &str, to: &str) -> Result<(), DriverError> {
        self.record(format!("rename {} {}", from, to));
        self.inner.rename_file(cc, from, to).await
    }

    async fn can_allocate(&self, _cc: &dyn ClientContext, size: u64) -> Result<bool, DriverError> {
        self.record(format!("allo {}", size));
        Ok(size <= 1_000_000)
    }

    async fn notify_write(&self, cc: &dyn ClientContext, path: &str) -> Result<(), DriverError> {
        self.record(format!("notify {}", path));
        self.inner.notify_write(cc, path).await
    }
}

/// A bound server running its accept loop in the background.
pub struct TestServer {
    pub server: Server,
    pub addr: SocketAddr,
    pub calls: Calls,
    pub serving: JoinHandle<Result<(), ServerError>>,
}

impl TestServer {
    pub async fn start(driver: TestDriver) -> Self {
        let calls = driver.calls.clone();
        let server = Server::bind(Arc::new(driver)).await.unwrap();
        let addr = server.local_addr();
        let serving = tokio::spawn({
            let server = server.clone();
            async move { server.serve().await }
        });
        Self {
            server,
            addr,
            calls,
            serving,
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Waits until the registry holds exactly `count` sessions.
    pub async fn wait_for_sessions(&self, count: usize) {
        for _ in 0..250 {
            if self.server.session_count().await == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!(
            "expected {} sessions, found {}",
            count,
            self.server.session_count().await
        );
    }
}

/// Minimal FTP client speaking over any byte stream.
pub struct FtpClient<S> {
    stream: BufReader<S>,
}

impl FtpClient<TcpStream> {
    /// Connects and consumes the greeting, which is returned.
    pub async fn connect(addr: SocketAddr) -> (Self, String) {
        let stream = TcpStream::connect(addr).await.unwrap();
        let mut client = Self::new(stream);
        let greeting = client.read_reply().await;
        (client, greeting)
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> FtpClient<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufReader::new(stream),
        }
    }

    pub fn into_inner(self) -> S {
        self.stream.into_inner()
    }

    pub async fn send(&mut self, line: &str) {
        let stream = self.stream.get_mut();
        stream
            .write_all(format!("{}\r\n", line).as_bytes())
            .await
            .unwrap();
        stream.flush().await.unwrap();
    }

    /// Writes raw bytes, with no line ending added.
    pub async fn send_raw(&mut self, bytes: &[u8]) {
        let stream = self.stream.get_mut();
        stream.write_all(bytes).await.unwrap();
        stream.flush().await.unwrap();
    }

    /// Reads one reply; multi-line replies are joined with `\n`.
    pub async fn read_reply(&mut self) -> String {
        let first = self.read_line().await;
        if first.len() < 4 || first.as_bytes()[3] != b'-' {
            return first;
        }
        let last_prefix = format!("{} ", &first[..3]);
        let mut lines = vec![first];
        loop {
            let line = self.read_line().await;
            let done = line.starts_with(&last_prefix);
            lines.push(line);
            if done {
                return lines.join("\n");
            }
        }
    }

    pub async fn cmd(&mut self, line: &str) -> String {
        self.send(line).await;
        self.read_reply().await
    }

    pub async fn login(&mut self) {
        assert_eq!(self.cmd(&format!("USER {}", USER)).await, "331 OK");
        assert_eq!(
            self.cmd(&format!("PASS {}", PASSWORD)).await,
            "230 Password ok, continue"
        );
    }

    /// Declares an extended passive channel and returns its address.
    pub async fn epsv(&mut self, host: SocketAddr) -> SocketAddr {
        let reply = self.cmd("EPSV").await;
        assert!(reply.starts_with("229 "), "unexpected reply {}", reply);
        let port = reply
            .split("|||")
            .nth(1)
            .and_then(|rest| rest.split('|').next())
            .and_then(|port| port.parse::<u16>().ok())
            .unwrap();
        SocketAddr::new(host.ip(), port)
    }

    /// True when the server closed the control connection. Anything still
    /// in flight (a TLS alert, say) is discarded.
    pub async fn is_closed(&mut self) -> bool {
        let mut rest = Vec::new();
        tokio::time::timeout(REPLY_TIMEOUT, self.stream.read_to_end(&mut rest))
            .await
            .is_ok()
    }

    async fn read_line(&mut self) -> String {
        let mut line = String::new();
        let read = tokio::time::timeout(REPLY_TIMEOUT, self.stream.read_line(&mut line))
            .await
            .expect("timed out waiting for a reply")
            .unwrap();
        assert!(read > 0, "connection closed while waiting for a reply");
        line.trim_end_matches(['\r', '\n']).to_string()
    }
}

/// Reads a data connection until the server closes it.
pub async fn read_all<S: AsyncRead + Unpin>(mut stream: S) -> Vec<u8> {
    let mut data = Vec::new();
    tokio::time::timeout(REPLY_TIMEOUT, stream.read_to_end(&mut data))
        .await
        .expect("timed out reading data connection")
        .unwrap();
    data
}
