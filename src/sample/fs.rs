//! Local filesystem driver
//!
//! Maps normalized virtual paths under a root directory. Normalization
//! drops `..` at the root, so no path resolves outside of it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use std::fs::Metadata;
use std::io;
use std::path::PathBuf;
use tokio::fs::{self, OpenOptions};

use crate::driver::{ClientContext, ClientHandlingDriver, FileInfo, FileStream, OpenMode};
use crate::error::DriverError;
use crate::protocol::path::normalize;

pub struct LocalFs {
    root: PathBuf,
}

impl LocalFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// On-disk location of a virtual path.
    pub fn real_path(&self, virtual_path: &str) -> PathBuf {
        let normalized = normalize(virtual_path);
        self.root.join(normalized.trim_start_matches('/'))
    }
}

fn map_io(path: &str, e: io::Error) -> DriverError {
    match e.kind() {
        io::ErrorKind::NotFound => DriverError::NotFound(path.to_string()),
        io::ErrorKind::PermissionDenied => DriverError::PermissionDenied(path.to_string()),
        _ => DriverError::Io(e),
    }
}

fn file_info(name: String, metadata: &Metadata) -> FileInfo {
    let modified = metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());
    FileInfo {
        name,
        size: if metadata.is_dir() { 0 } else { metadata.len() },
        modified,
        is_dir: metadata.is_dir(),
        mode: permission_bits(metadata),
    }
}

#[cfg(unix)]
fn permission_bits(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn permission_bits(metadata: &Metadata) -> u32 {
    match (metadata.is_dir(), metadata.permissions().readonly()) {
        (true, _) => 0o755,
        (false, true) => 0o444,
        (false, false) => 0o644,
    }
}

#[async_trait]
impl ClientHandlingDriver for LocalFs {
    async fn change_directory(
        &self,
        _cc: &dyn ClientContext,
        directory: &str,
    ) -> Result<(), DriverError> {
        let metadata = fs::metadata(self.real_path(directory))
            .await
            .map_err(|e| map_io(directory, e))?;
        if metadata.is_dir() {
            Ok(())
        } else {
            Err(DriverError::InvalidPath(format!(
                "{} is not a directory",
                directory
            )))
        }
    }

    async fn make_directory(
        &self,
        _cc: &dyn ClientContext,
        directory: &str,
    ) -> Result<(), DriverError> {
        fs::create_dir(self.real_path(directory))
            .await
            .map_err(|e| map_io(directory, e))
    }

    async fn list_files(&self, cc: &dyn ClientContext) -> Result<Vec<FileInfo>, DriverError> {
        let mut entries = fs::read_dir(self.real_path(cc.path()))
            .await
            .map_err(|e| map_io(cc.path(), e))?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            let name = entry.file_name().to_string_lossy().into_owned();
            files.push(file_info(name, &metadata));
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    async fn open_file(
        &self,
        _cc: &dyn ClientContext,
        path: &str,
        mode: OpenMode,
    ) -> Result<Box<dyn FileStream>, DriverError> {
        let mut options = OpenOptions::new();
        match mode {
            OpenMode::Read => options.read(true),
            OpenMode::Write => options.write(true).create(true).truncate(true),
            OpenMode::Resume => options.write(true).create(true),
            OpenMode::Append => options.append(true).create(true),
        };

        let file = options
            .open(self.real_path(path))
            .await
            .map_err(|e| map_io(path, e))?;
        Ok(Box::new(file))
    }

    async fn delete_file(&self, _cc: &dyn ClientContext, path: &str) -> Result<(), DriverError> {
        let real = self.real_path(path);
        let metadata = fs::metadata(&real).await.map_err(|e| map_io(path, e))?;
        let removed = if metadata.is_dir() {
            fs::remove_dir(&real).await
        } else {
            fs::remove_file(&real).await
        };
        removed.map_err(|e| map_io(path, e))
    }

    async fn file_info(&self, _cc: &dyn ClientContext, path: &str) -> Result<FileInfo, DriverError> {
        let metadata = fs::metadata(self.real_path(path))
            .await
            .map_err(|e| map_io(path, e))?;
        let name = normalize(path)
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        Ok(file_info(name, &metadata))
    }

    async fn rename_file(
        &self,
        _cc: &dyn ClientContext,
        from: &str,
        to: &str,
    ) -> Result<(), DriverError> {
        fs::rename(self.real_path(from), self.real_path(to))
            .await
            .map_err(|e| map_io(from, e))
    }

    async fn can_allocate(&self, _cc: &dyn ClientContext, _size: u64) -> Result<bool, DriverError> {
        Ok(true)
    }

    async fn notify_write(&self, cc: &dyn ClientContext, path: &str) -> Result<(), DriverError> {
        debug!("Client {} wrote {}", cc.id(), path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ContextView;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn cc(path: &str) -> ContextView {
        ContextView::new(1, "127.0.0.1:5000".parse().unwrap(), path, "bob")
    }

    #[test]
    fn real_path_stays_under_root() {
        let fs = LocalFs::new("/srv/ftp");
        assert_eq!(fs.real_path("/docs/a.txt"), PathBuf::from("/srv/ftp/docs/a.txt"));
        assert_eq!(fs.real_path("/../../etc/passwd"), PathBuf::from("/srv/ftp/etc/passwd"));
        assert_eq!(fs.real_path("/"), PathBuf::from("/srv/ftp/"));
    }

    #[tokio::test]
    async fn write_list_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFs::new(dir.path());

        fs.make_directory(&cc("/"), "/docs").await.unwrap();
        let mut file = fs.open_file(&cc("/"), "/docs/a.txt", OpenMode::Write).await.unwrap();
        file.write_all(b"hello").await.unwrap();
        file.flush().await.unwrap();
        drop(file);

        let listing = fs.list_files(&cc("/docs")).await.unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].name, "a.txt");
        assert_eq!(listing[0].size, 5);
        assert!(!listing[0].is_dir);

        let mut file = fs.open_file(&cc("/"), "/docs/a.txt", OpenMode::Read).await.unwrap();
        let mut contents = String::new();
        file.read_to_string(&mut contents).await.unwrap();
        assert_eq!(contents, "hello");
    }

    #[tokio::test]
    async fn append_and_resume_keep_content() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("log.txt"), b"abc").unwrap();
        let fs = LocalFs::new(dir.path());

        let mut file = fs.open_file(&cc("/"), "/log.txt", OpenMode::Append).await.unwrap();
        file.write_all(b"def").await.unwrap();
        file.flush().await.unwrap();
        drop(file);
        assert_eq!(std::fs::read(dir.path().join("log.txt")).unwrap(), b"abcdef");

        let file = fs.open_file(&cc("/"), "/log.txt", OpenMode::Resume).await.unwrap();
        drop(file);
        assert_eq!(std::fs::read(dir.path().join("log.txt")).unwrap(), b"abcdef");
    }

    #[tokio::test]
    async fn cwd_rejects_files_and_missing_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("plain.txt"), b"x").unwrap();
        let fs = LocalFs::new(dir.path());

        assert!(matches!(
            fs.change_directory(&cc("/"), "/plain.txt").await,
            Err(DriverError::InvalidPath(_))
        ));
        assert!(matches!(
            fs.change_directory(&cc("/"), "/missing").await,
            Err(DriverError::NotFound(_))
        ));
        assert!(fs.change_directory(&cc("/"), "/").await.is_ok());
    }

    #[tokio::test]
    async fn rename_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("old")).unwrap();
        let fs = LocalFs::new(dir.path());

        fs.rename_file(&cc("/"), "/a.txt", "/b.txt").await.unwrap();
        assert!(dir.path().join("b.txt").exists());
        assert_eq!(fs.file_info(&cc("/"), "/b.txt").await.unwrap().name, "b.txt");

        fs.delete_file(&cc("/"), "/b.txt").await.unwrap();
        fs.delete_file(&cc("/"), "/old").await.unwrap();
        assert!(!dir.path().join("b.txt").exists());
        assert!(!dir.path().join("old").exists());
    }
}
