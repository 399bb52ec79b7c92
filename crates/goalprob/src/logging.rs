use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_FILE_NAME: &str = "goalprob.log";

/// Log file size that triggers trimming (5 MB)
const MAX_LOG_SIZE: u64 = 5 * 1024 * 1024;
/// Most recent bytes kept after trimming (1 MB)
const KEEP_SIZE: u64 = 1024 * 1024;

const ROTATION_MARKER: &[u8] = b"--- goalprob log trimmed ---\n";

/// Trim `log_path` down to its last `keep` bytes once it grows past `max`.
///
/// The cut is moved forward to the next line start so no partial record
/// survives. Returns whether the file was trimmed.
pub(crate) fn trim_log(log_path: &Path, max: u64, keep: u64) -> io::Result<bool> {
    let len = match fs::metadata(log_path) {
        Ok(metadata) => metadata.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    if len <= max {
        return Ok(false);
    }

    let mut tail = Vec::new();
    {
        let mut file = File::open(log_path)?;
        file.seek(SeekFrom::Start(len.saturating_sub(keep)))?;
        file.read_to_end(&mut tail)?;
    }
    let line_start = tail
        .iter()
        .position(|&b| b == b'\n')
        .map_or(0, |i| i + 1);

    let mut file = File::create(log_path)?;
    file.write_all(ROTATION_MARKER)?;
    file.write_all(&tail[line_start..])?;
    Ok(true)
}

/// Hands out writers over one shared, append-mode log file
#[derive(Clone)]
struct SharedFile {
    file: Arc<Mutex<File>>,
}

struct SharedFileWriter {
    file: Arc<Mutex<File>>,
}

impl SharedFileWriter {
    fn with_file<T>(&self, f: impl FnOnce(&mut File) -> io::Result<T>) -> io::Result<T> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;
        f(&mut file)
    }
}

impl Write for SharedFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.with_file(|file| file.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.with_file(|file| file.flush())
    }
}

impl<'a> MakeWriter<'a> for SharedFile {
    type Writer = SharedFileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        SharedFileWriter {
            file: Arc::clone(&self.file),
        }
    }
}

/// Default filter directive for a CLI `--log-level` value
pub(crate) fn default_directive(level: &str) -> String {
    format!("goalprob={level},goalprob_core={level}")
}

/// Initialize tracing for the command-line front end.
///
/// With a log directory, records go to `{log_dir}/goalprob.log`, trimmed to
/// its last 1MB once it passes 5MB. Without one they go to stderr. `RUST_LOG`
/// overrides `level` when set.
pub fn init_logging(log_dir: Option<&Path>, level: &str) -> color_eyre::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)));

    let (writer, ansi, destination) = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let log_path = dir.join(LOG_FILE_NAME);
            if let Err(e) = trim_log(&log_path, MAX_LOG_SIZE, KEEP_SIZE) {
                eprintln!("Warning: failed to trim {}: {e}", log_path.display());
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)?;
            let shared = SharedFile {
                file: Arc::new(Mutex::new(file)),
            };
            (
                BoxMakeWriter::new(shared),
                false,
                log_path.display().to_string(),
            )
        }
        None => (BoxMakeWriter::new(io::stderr), true, "stderr".to_string()),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(ansi)
                .with_target(true),
        )
        .try_init()?;

    tracing::debug!(%destination, "Logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_not_trimmed() {
        let dir = TempDir::new().unwrap();
        assert!(!trim_log(&dir.path().join(LOG_FILE_NAME), 10, 5).unwrap());
    }

    #[test]
    fn test_small_file_left_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(LOG_FILE_NAME);
        fs::write(&path, "one\ntwo\n").unwrap();

        assert!(!trim_log(&path, 64, 16).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn test_oversized_file_keeps_whole_recent_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(LOG_FILE_NAME);
        let lines: String = (0..100).map(|i| format!("line {i:03}\n")).collect();
        fs::write(&path, &lines).unwrap();

        // Each line is 9 bytes, so the last 30 bytes start mid-line
        assert!(trim_log(&path, 100, 30).unwrap());
        let trimmed = fs::read_to_string(&path).unwrap();
        let mut rest = trimmed.lines();
        assert_eq!(rest.next(), Some("--- goalprob log trimmed ---"));
        assert_eq!(rest.collect::<Vec<_>>(), ["line 097", "line 098", "line 099"]);
    }

    #[test]
    fn test_default_directive() {
        assert_eq!(
            default_directive("debug"),
            "goalprob=debug,goalprob_core=debug"
        );
    }
}
