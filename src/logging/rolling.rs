//! Size-based log rotation.
//!
//! tracing-appender only rolls by time, so this is a minimal writer that
//! renames `<file>` to `<file>.1` (shifting older backups up to `.N`) once
//! the live file would exceed the size limit.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Shared handle to the rotating log file. Clones write to the same file.
#[derive(Clone)]
pub struct RollingFileWriter {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    path: PathBuf,
    max_bytes: u64,
    backups: u32,
    file: File,
    written: u64,
}

impl RollingFileWriter {
    pub fn open(path: PathBuf, max_bytes: u64, backups: u32) -> io::Result<Self> {
        let file = open_append(&path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            inner: Arc::new(Mutex::new(Inner {
                path,
                max_bytes,
                backups,
                file,
                written,
            })),
        })
    }
}

impl Inner {
    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        // Shift file.log.9 -> file.log.10, ..., then file.log -> file.log.1.
        // The oldest backup past the cap falls off.
        for i in (1..self.backups).rev() {
            let from = backup_path(&self.path, i);
            if from.exists() {
                let _ = std::fs::rename(&from, backup_path(&self.path, i + 1));
            }
        }
        if self.backups > 0 {
            let _ = std::fs::rename(&self.path, backup_path(&self.path, 1));
        }
        self.file = open_append(&self.path)?;
        self.written = 0;
        Ok(())
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn backup_path(path: &Path, n: u32) -> PathBuf {
    let mut os = path.to_path_buf().into_os_string();
    os.push(format!(".{n}"));
    PathBuf::from(os)
}

impl Write for RollingFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self.inner.lock().unwrap();
        // Never rotate an empty file; an oversized single record still lands.
        if inner.written > 0 && inner.written + buf.len() as u64 > inner.max_bytes {
            inner.rotate()?;
        }
        let n = inner.file.write(buf)?;
        inner.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().unwrap().file.flush()
    }
}
