//! G-code file reading and writing
//!
//! Files are streamed line by line so whole prints never have to sit in
//! memory.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

/// Buffer size for reading and writing large files (256 KB)
const IO_BUFFER_SIZE: usize = 256 * 1024;

/// File read statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileReadStats {
    /// Total bytes read
    pub bytes_read: u64,
    /// Total lines read
    pub lines_read: u64,
    /// File size in bytes
    pub file_size: u64,
}

/// G-code file reader with streaming support
pub struct GcodeFileReader {
    path: PathBuf,
    file_size: u64,
}

impl GcodeFileReader {
    /// Create a new G-code file reader
    ///
    /// # Errors
    /// Returns error if file does not exist or cannot be accessed
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Err(anyhow!("File does not exist: {}", path.display()));
        }

        if !path.is_file() {
            return Err(anyhow!("Path is not a file: {}", path.display()));
        }

        let file_size = fs::metadata(&path)?.len();

        Ok(Self { path, file_size })
    }

    /// Get file size in bytes
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Get file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read file with line-by-line streaming callback
    ///
    /// Line endings (`\n` or `\r\n`) are stripped. Bytes that are not valid
    /// UTF-8 are replaced with U+FFFD so one bad comment cannot stop a job.
    ///
    /// # Errors
    /// Returns error if file cannot be read or callback returns error
    pub fn read_lines<F>(&self, mut callback: F) -> Result<FileReadStats>
    where
        F: FnMut(&str) -> Result<()>,
    {
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        let mut reader = BufReader::with_capacity(IO_BUFFER_SIZE, file);

        let mut lines_read = 0u64;
        let mut bytes_read = 0u64;
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let n = reader
                .read_until(b'\n', &mut buf)
                .with_context(|| format!("Failed to read {}", self.path.display()))?;
            if n == 0 {
                break;
            }
            bytes_read += n as u64;

            let mut bytes = buf.as_slice();
            if let Some(rest) = bytes.strip_suffix(b"\n") {
                bytes = rest;
                if let Some(rest) = bytes.strip_suffix(b"\r") {
                    bytes = rest;
                }
            }

            let line = String::from_utf8_lossy(bytes);
            callback(&line)?;
            lines_read += 1;
        }

        Ok(FileReadStats {
            bytes_read,
            lines_read,
            file_size: self.file_size,
        })
    }
}

/// Buffered line writer for processed output
pub struct GcodeFileWriter {
    writer: BufWriter<File>,
    lines_written: u64,
}

impl GcodeFileWriter {
    /// Create (or truncate) the output file
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        Ok(Self {
            writer: BufWriter::with_capacity(IO_BUFFER_SIZE, file),
            lines_written: 0,
        })
    }

    /// Write one line followed by a newline
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.lines_written += 1;
        Ok(())
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    /// Flush buffered output to disk
    pub fn finish(mut self) -> Result<u64> {
        self.writer.flush()?;
        Ok(self.lines_written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(GcodeFileReader::new(dir.path().join("missing.gcode")).is_err());
        assert!(GcodeFileReader::new(dir.path()).is_err());
    }

    #[test]
    fn test_write_then_stream() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.gcode");

        let mut writer = GcodeFileWriter::create(&path).unwrap();
        writer.write_line("G28").unwrap();
        writer.write_line("G1 X10").unwrap();
        assert_eq!(writer.finish().unwrap(), 2);

        let reader = GcodeFileReader::new(&path).unwrap();
        let mut lines = Vec::new();
        let stats = reader
            .read_lines(|line| {
                lines.push(line.to_string());
                Ok(())
            })
            .unwrap();

        assert_eq!(lines, vec!["G28", "G1 X10"]);
        assert_eq!(stats.lines_read, 2);
        assert_eq!(stats.bytes_read, reader.file_size());
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("latin1.gcode");
        fs::write(&path, b"G28\r\n; nozzle 215 \xB0C\nG1 X10").unwrap();

        let reader = GcodeFileReader::new(&path).unwrap();
        let mut lines = Vec::new();
        let stats = reader
            .read_lines(|line| {
                lines.push(line.to_string());
                Ok(())
            })
            .unwrap();

        assert_eq!(lines, vec!["G28", "; nozzle 215 \u{FFFD}C", "G1 X10"]);
        assert_eq!(stats.lines_read, 3);
        assert_eq!(stats.bytes_read, reader.file_size());
    }
}
