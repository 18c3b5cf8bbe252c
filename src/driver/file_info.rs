//! File metadata and open modes exchanged with filesystem drivers.

use chrono::{DateTime, Utc};

/// How `ClientHandlingDriver::open_file` must open a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read only.
    Read,
    /// Write, creating the file and truncating existing content.
    Write,
    /// Write, creating the file but keeping existing content (restarted
    /// upload; the engine seeks to the restart offset).
    Resume,
    /// Append to the end, creating the file if needed.
    Append,
}

/// Metadata of a file or directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub is_dir: bool,
    /// Unix permission bits (`0o755`).
    pub mode: u32,
}

impl FileInfo {
    /// `ls -l` style mode string, e.g. `drwxr-xr-x`.
    pub fn mode_string(&self) -> String {
        let mut out = String::with_capacity(10);
        out.push(if self.is_dir { 'd' } else { '-' });
        for shift in [6, 3, 0] {
            let bits = (self.mode >> shift) & 0o7;
            out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
            out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
            out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
        }
        out
    }

    /// One `LIST` line (without line terminator).
    pub fn list_line(&self) -> String {
        format!(
            "{} 1 ftp ftp {:>12} {} {}",
            self.mode_string(),
            self.size,
            self.modified.format("%b %e %H:%M"),
            self.name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(is_dir: bool, mode: u32) -> FileInfo {
        FileInfo {
            name: "report.txt".into(),
            size: 1234,
            modified: Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 0).unwrap(),
            is_dir,
            mode,
        }
    }

    #[test]
    fn mode_string_renders_permission_bits() {
        assert_eq!(entry(false, 0o644).mode_string(), "-rw-r--r--");
        assert_eq!(entry(true, 0o755).mode_string(), "drwxr-xr-x");
        assert_eq!(entry(false, 0o000).mode_string(), "----------");
    }

    #[test]
    fn list_line_matches_ls_layout() {
        assert_eq!(
            entry(false, 0o644).list_line(),
            "-rw-r--r-- 1 ftp ftp         1234 Mar  5 14:07 report.txt"
        );
    }
}
