//! Log file output
//!
//! Opens the file the subscriber writes to when `logging.log_file` is set.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

/// Open or create a log file for appending, creating parent directories
pub fn open_log_file(path: &str) -> io::Result<File> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}

/// A `MakeWriter` for the subscriber; writes are serialized by the mutex
pub fn file_writer(path: &str) -> io::Result<Mutex<File>> {
    open_log_file(path).map(Mutex::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_open_log_file_creates_parents_and_appends() {
        let dir = std::env::temp_dir().join(format!("edge-starter-log-{}", std::process::id()));
        let path = dir.join("nested").join("edge.log");
        let path_str = path.to_str().unwrap();

        writeln!(open_log_file(path_str).unwrap(), "first").unwrap();
        writeln!(file_writer(path_str).unwrap().lock().unwrap(), "second").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "first\nsecond\n");
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
