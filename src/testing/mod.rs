//! In-memory transport and file system used by unit tests.
//!
//! `MemoryFs` is a shared tree of directories and byte files. A
//! `MemoryConnector` hands out `MemoryTransport`s over that tree and lets a
//! test kill, mute or refuse them to simulate broken links.
//!
//! `ssh_server` runs a real SSH/SFTP server on loopback for tests that need
//! a genuine russh handle.


use std::collections::BTreeMap;
use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::AsyncWrite;

use crate::sftp::path_utils::remote_parent;
use crate::sftp::{
    EntryKind, FileSession, RemoteEntry, RemoteMetadata, RemoteReader, RemoteWriter, SftpError,
};
use crate::ssh::{Connector, Credentials, PingResult, SshError, Transport};

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File(Vec<u8>),
}

#[derive(Default)]
struct Tracker {
    active: AtomicUsize,
    max_active: AtomicUsize,
    total: AtomicUsize,
}

/// Shared in-memory remote file system
#[derive(Clone)]
pub struct MemoryFs {
    nodes: Arc<Mutex<BTreeMap<String, Node>>>,
    tracker: Arc<Tracker>,
    op_delay: Arc<Mutex<Duration>>,
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn parent_of(path: &str) -> String {
    remote_parent(path)
}

impl MemoryFs {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::Dir);
        Self {
            nodes: Arc::new(Mutex::new(nodes)),
            tracker: Arc::new(Tracker::default()),
            op_delay: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Create a directory and any missing parents
    pub fn add_dir(&self, path: &str) {
        let path = normalize(path);
        let mut nodes = self.nodes.lock();
        let mut current = path.clone();
        let mut chain = Vec::new();
        while current != "/" {
            chain.push(current.clone());
            current = parent_of(&current);
        }
        for dir in chain.into_iter().rev() {
            nodes.entry(dir).or_insert(Node::Dir);
        }
    }

    /// Create or replace a file, creating missing parents
    pub fn add_file(&self, path: &str, contents: &[u8]) {
        let path = normalize(path);
        self.add_dir(&parent_of(&path));
        self.nodes
            .lock()
            .insert(path, Node::File(contents.to_vec()));
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        match self.nodes.lock().get(&normalize(path)) {
            Some(Node::File(bytes)) => Some(bytes.clone()),
            _ => None,
        }
    }

    pub fn is_dir(&self, path: &str) -> bool {
        matches!(self.nodes.lock().get(&normalize(path)), Some(Node::Dir))
    }

    pub fn exists(&self, path: &str) -> bool {
        self.nodes.lock().contains_key(&normalize(path))
    }

    /// Each file-session call sleeps this long while counted as active
    pub fn set_op_delay(&self, delay: Duration) {
        *self.op_delay.lock() = delay;
    }

    /// Highest number of file-session calls ever in flight at once
    pub fn max_active(&self) -> usize {
        self.tracker.max_active.load(Ordering::SeqCst)
    }

    /// Total file-session calls served
    pub fn op_count(&self) -> usize {
        self.tracker.total.load(Ordering::SeqCst)
    }

    /// A file session that is not tied to any transport
    pub fn session(&self) -> MemoryFileSession {
        MemoryFileSession {
            fs: self.clone(),
            link: Arc::new(LinkState::default()),
        }
    }

    async fn enter(&self) -> OpGuard {
        let now = self.tracker.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.tracker.max_active.fetch_max(now, Ordering::SeqCst);
        self.tracker.total.fetch_add(1, Ordering::SeqCst);
        let guard = OpGuard {
            tracker: self.tracker.clone(),
        };
        let delay = *self.op_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        guard
    }
}

struct OpGuard {
    tracker: Arc<Tracker>,
}

impl Drop for OpGuard {
    fn drop(&mut self) {
        self.tracker.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Flags a test flips to break a link
#[derive(Default)]
struct LinkState {
    dead: AtomicBool,
    muted: AtomicBool,
    closed: AtomicBool,
}

/// `FileSession` over a `MemoryFs`
pub struct MemoryFileSession {
    fs: MemoryFs,
    link: Arc<LinkState>,
}

impl MemoryFileSession {
    fn check_link(&self) -> Result<(), SftpError> {
        if self.link.dead.load(Ordering::SeqCst) {
            Err(SftpError::ChannelError("channel closed".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl FileSession for MemoryFileSession {
    async fn read_dir(&self, path: &str) -> Result<Vec<RemoteEntry>, SftpError> {
        let _op = self.fs.enter().await;
        self.check_link()?;
        let path = normalize(path);
        let nodes = self.fs.nodes.lock();
        match nodes.get(&path) {
            Some(Node::Dir) => {}
            Some(Node::File(_)) => return Err(SftpError::NotADirectory(path)),
            None => return Err(SftpError::FileNotFound(path)),
        }
        Ok(nodes
            .iter()
            .filter(|(p, _)| p.as_str() != "/" && parent_of(p) == path)
            .map(|(p, node)| {
                let name = p.rsplit('/').next().unwrap_or_default();
                match node {
                    Node::Dir => RemoteEntry::dir(name),
                    Node::File(bytes) => RemoteEntry::file(name, bytes.len() as u64),
                }
            })
            .collect())
    }

    async fn stat(&self, path: &str) -> Result<RemoteMetadata, SftpError> {
        let _op = self.fs.enter().await;
        self.check_link()?;
        let path = normalize(path);
        match self.fs.nodes.lock().get(&path) {
            Some(Node::Dir) => Ok(RemoteMetadata {
                kind: EntryKind::Directory,
                size: 0,
            }),
            Some(Node::File(bytes)) => Ok(RemoteMetadata {
                kind: EntryKind::File,
                size: bytes.len() as u64,
            }),
            None => Err(SftpError::FileNotFound(path)),
        }
    }

    async fn open_read(&self, path: &str) -> Result<RemoteReader, SftpError> {
        let _op = self.fs.enter().await;
        self.check_link()?;
        let path = normalize(path);
        match self.fs.nodes.lock().get(&path) {
            Some(Node::File(bytes)) => Ok(Box::new(Cursor::new(bytes.clone()))),
            Some(Node::Dir) => Err(SftpError::ProtocolError(format!(
                "{}: is a directory",
                path
            ))),
            None => Err(SftpError::FileNotFound(path)),
        }
    }

    async fn create(&self, path: &str) -> Result<RemoteWriter, SftpError> {
        let _op = self.fs.enter().await;
        self.check_link()?;
        let path = normalize(path);
        let mut nodes = self.fs.nodes.lock();
        match nodes.get(&parent_of(&path)) {
            Some(Node::Dir) => {}
            _ => return Err(SftpError::FileNotFound(path)),
        }
        if let Some(Node::Dir) = nodes.get(&path) {
            return Err(SftpError::ProtocolError(format!(
                "{}: is a directory",
                path
            )));
        }
        nodes.insert(path.clone(), Node::File(Vec::new()));
        Ok(Box::new(MemoryWriter {
            fs: self.fs.clone(),
            path,
        }))
    }

    async fn create_dir(&self, path: &str) -> Result<(), SftpError> {
        let _op = self.fs.enter().await;
        self.check_link()?;
        let path = normalize(path);
        let mut nodes = self.fs.nodes.lock();
        if nodes.contains_key(&path) {
            return Err(SftpError::AlreadyExists(path));
        }
        match nodes.get(&parent_of(&path)) {
            Some(Node::Dir) => {
                nodes.insert(path, Node::Dir);
                Ok(())
            }
            _ => Err(SftpError::FileNotFound(path)),
        }
    }

    async fn remove_file(&self, path: &str) -> Result<(), SftpError> {
        let _op = self.fs.enter().await;
        self.check_link()?;
        let path = normalize(path);
        let mut nodes = self.fs.nodes.lock();
        match nodes.get(&path) {
            Some(Node::File(_)) => {
                nodes.remove(&path);
                Ok(())
            }
            Some(Node::Dir) => Err(SftpError::ProtocolError(format!(
                "{}: is a directory",
                path
            ))),
            None => Err(SftpError::FileNotFound(path)),
        }
    }

    async fn remove_dir(&self, path: &str) -> Result<(), SftpError> {
        let _op = self.fs.enter().await;
        self.check_link()?;
        let path = normalize(path);
        let mut nodes = self.fs.nodes.lock();
        match nodes.get(&path) {
            Some(Node::Dir) if path != "/" => {}
            Some(_) => return Err(SftpError::NotADirectory(path)),
            None => return Err(SftpError::FileNotFound(path)),
        }
        if nodes.keys().any(|p| p != "/" && parent_of(p) == path) {
            return Err(SftpError::ProtocolError(format!(
                "{}: directory not empty",
                path
            )));
        }
        nodes.remove(&path);
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> Result<(), SftpError> {
        let _op = self.fs.enter().await;
        self.check_link()?;
        let from = normalize(from);
        let to = normalize(to);
        let mut nodes = self.fs.nodes.lock();
        if !nodes.contains_key(&from) {
            return Err(SftpError::FileNotFound(from));
        }
        if nodes.contains_key(&to) {
            return Err(SftpError::AlreadyExists(to));
        }
        let prefix = format!("{}/", from);
        let moved: Vec<String> = nodes
            .keys()
            .filter(|p| **p == from || p.starts_with(&prefix))
            .cloned()
            .collect();
        for old in moved {
            if let Some(node) = nodes.remove(&old) {
                let new = format!("{}{}", to, &old[from.len()..]);
                nodes.insert(new, node);
            }
        }
        Ok(())
    }

    async fn close(&self) {}
}

/// Appends every write straight into the shared tree
struct MemoryWriter {
    fs: MemoryFs,
    path: String,
}

impl AsyncWrite for MemoryWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let mut nodes = self.fs.nodes.lock();
        match nodes.get_mut(&self.path) {
            Some(Node::File(bytes)) => {
                bytes.extend_from_slice(buf);
                Poll::Ready(Ok(buf.len()))
            }
            _ => Poll::Ready(Err(io::Error::new(
                io::ErrorKind::NotFound,
                "file vanished",
            ))),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Transport handed out by `MemoryConnector`
pub struct MemoryTransport {
    id: String,
    fs: MemoryFs,
    link: Arc<LinkState>,
    refuse_files: bool,
}

#[async_trait]
impl Transport for MemoryTransport {
    fn id(&self) -> &str {
        &self.id
    }

    async fn keepalive(&self, timeout: Duration) -> PingResult {
        if self.link.dead.load(Ordering::SeqCst) {
            return PingResult::IoError;
        }
        if self.link.muted.load(Ordering::SeqCst) {
            tokio::time::sleep(timeout).await;
            return PingResult::Timeout;
        }
        PingResult::Ok
    }

    async fn open_file_session(&self) -> Result<Box<dyn FileSession>, SftpError> {
        if self.link.dead.load(Ordering::SeqCst) {
            return Err(SftpError::ChannelError("channel closed".to_string()));
        }
        if self.refuse_files {
            return Err(SftpError::SubsystemNotAvailable(
                "subsystem request failed".to_string(),
            ));
        }
        Ok(Box::new(MemoryFileSession {
            fs: self.fs.clone(),
            link: self.link.clone(),
        }))
    }

    async fn close(&self) {
        self.link.dead.store(true, Ordering::SeqCst);
        self.link.closed.store(true, Ordering::SeqCst);
    }
}

/// Hands out memory transports for one accepted set of credentials
#[derive(Clone)]
pub struct MemoryConnector {
    fs: MemoryFs,
    accepted: Arc<Mutex<Option<Credentials>>>,
    links: Arc<Mutex<Vec<Arc<LinkState>>>>,
    dials: Arc<AtomicUsize>,
    refuse_files: Arc<AtomicBool>,
}

impl MemoryConnector {
    pub fn new(fs: MemoryFs, accepted: Credentials) -> Self {
        Self {
            fs,
            accepted: Arc::new(Mutex::new(Some(accepted))),
            links: Arc::new(Mutex::new(Vec::new())),
            dials: Arc::new(AtomicUsize::new(0)),
            refuse_files: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Number of `connect` calls, successful or not
    pub fn dial_count(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }

    /// Drop every link handed out so far
    pub fn kill_all(&self) {
        for link in self.links.lock().iter() {
            link.dead.store(true, Ordering::SeqCst);
        }
    }

    /// Stop answering keepalives on every link handed out so far
    pub fn mute_all(&self) {
        for link in self.links.lock().iter() {
            link.muted.store(true, Ordering::SeqCst);
        }
    }

    /// Reject all future dials
    pub fn revoke(&self) {
        *self.accepted.lock() = None;
    }

    /// Accept a different set of credentials from now on
    pub fn accept(&self, credentials: Credentials) {
        *self.accepted.lock() = Some(credentials);
    }

    /// Make future transports fail to open a file session
    pub fn refuse_file_sessions(&self, refuse: bool) {
        self.refuse_files.store(refuse, Ordering::SeqCst);
    }

    /// Transports that were explicitly closed
    pub fn closed_count(&self) -> usize {
        self.links
            .lock()
            .iter()
            .filter(|l| l.closed.load(Ordering::SeqCst))
            .count()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, credentials: &Credentials) -> Result<Box<dyn Transport>, SshError> {
        let n = self.dials.fetch_add(1, Ordering::SeqCst) + 1;
        let accepted = self.accepted.lock().clone();
        match accepted {
            None => {
                return Err(SshError::AuthenticationFailed(
                    "Password authentication rejected".to_string(),
                ))
            }
            Some(ok) if ok.host != credentials.host || ok.port != credentials.port => {
                return Err(SshError::ConnectionFailed(format!(
                    "{}: connection refused",
                    credentials.address()
                )))
            }
            Some(ok) if ok != *credentials => {
                return Err(SshError::AuthenticationFailed(
                    "Password authentication rejected".to_string(),
                ))
            }
            Some(_) => {}
        }

        let link = Arc::new(LinkState::default());
        self.links.lock().push(link.clone());
        Ok(Box::new(MemoryTransport {
            id: format!("mem-{}", n),
            fs: self.fs.clone(),
            link,
            refuse_files: self.refuse_files.load(Ordering::SeqCst),
        }))
    }
}
