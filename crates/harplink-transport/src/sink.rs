//! Traffic capture sinks.
//!
//! The framed reader can tee every byte written to and every validated
//! frame received from the device into a [`TrafficSink`], along with a
//! monotonic timestamp. The canonical implementation is [`FileSink`],
//! the append-only binary capture the host scripts pass a file name
//! for.
//!
//! Sink failures are reported through logging but never block or
//! corrupt the live protocol exchange.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

use harplink_core::Result;

/// Destination for raw traffic capture.
///
/// `timestamp` is monotonic time since the sink was attached. The
/// caller (the framed reader) treats a returned error as advisory: it
/// is logged and the protocol exchange continues.
pub trait TrafficSink: Send {
    /// Append one span of raw bytes.
    fn write(&mut self, bytes: &[u8], timestamp: Duration) -> Result<()>;
}

/// Append-only file capture of raw device traffic.
pub struct FileSink {
    file: File,
    opened_at: Instant,
}

impl FileSink {
    /// Create (or truncate) a capture file at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(FileSink {
            file,
            opened_at: Instant::now(),
        })
    }

    /// Monotonic time since this sink was created.
    pub fn elapsed(&self) -> Duration {
        self.opened_at.elapsed()
    }
}

impl TrafficSink for FileSink {
    fn write(&mut self, bytes: &[u8], _timestamp: Duration) -> Result<()> {
        self.file.write_all(bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sink that records every span it is handed.
    pub struct VecSink {
        pub spans: Vec<(Vec<u8>, Duration)>,
    }

    impl TrafficSink for VecSink {
        fn write(&mut self, bytes: &[u8], timestamp: Duration) -> Result<()> {
            self.spans.push((bytes.to_vec(), timestamp));
            Ok(())
        }
    }

    #[test]
    fn file_sink_appends_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.bin");

        let mut sink = FileSink::create(&path).unwrap();
        sink.write(&[0x01, 0x02], Duration::from_millis(1)).unwrap();
        sink.write(&[0x03], Duration::from_millis(2)).unwrap();
        drop(sink);

        let contents = std::fs::read(&path).unwrap();
        assert_eq!(contents, vec![0x01, 0x02, 0x03]);
    }

    #[test]
    fn vec_sink_records_timestamps() {
        let mut sink = VecSink { spans: Vec::new() };
        sink.write(&[0xAA], Duration::from_millis(5)).unwrap();
        assert_eq!(sink.spans.len(), 1);
        assert_eq!(sink.spans[0].0, vec![0xAA]);
        assert_eq!(sink.spans[0].1, Duration::from_millis(5));
    }
}
