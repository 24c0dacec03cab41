//! File compression driver
//!
//! Feeds each input file through the chunk scheduler and reconciler in order.
//! The trailing run of every file is held back as the carry, because the next
//! file may continue it; the stream behaves as if all inputs had been
//! concatenated before encoding. Nothing reaches the destination unless every
//! input was encoded.

use std::fs::File;
use std::io::{self, Read, Write};
use std::ops::Deref;
use std::path::Path;

use memmap2::Mmap;
use tracing::{debug, debug_span};

use crate::error::{WzipError, WzipResult};
use crate::format::RecordWriter;
use crate::reconcile::reconcile;
use crate::rle::Run;
use crate::scheduler::{schedule, ChunkPlan};

/// Contents of one input file
pub enum InputBuffer {
    /// Zero-length file, never mapped
    Empty,
    Mapped(Mmap),
    /// Pipe or zero-size pseudo-file, read in full
    Read(Vec<u8>),
}

impl Deref for InputBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            InputBuffer::Empty => &[],
            InputBuffer::Mapped(mmap) => &mmap[..],
            InputBuffer::Read(data) => &data[..],
        }
    }
}

/// Open an input file and map or read its contents
///
/// Regular files are mapped read-only. Pipes, and regular files reporting a
/// size of zero (e.g. under `/proc`), are read to the end since their size
/// says nothing about their contents. Devices and sockets are rejected.
pub fn load_input(path: &Path) -> WzipResult<InputBuffer> {
    let mut file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => WzipError::FileNotFound(path.display().to_string()),
        _ => WzipError::input(path.display(), e),
    })?;
    let metadata = file
        .metadata()
        .map_err(|e| WzipError::input(path.display(), e))?;
    let file_type = metadata.file_type();

    if file_type.is_dir() {
        return Err(WzipError::invalid_argument(format!(
            "{} is a directory",
            path.display()
        )));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::FileTypeExt;
        if file_type.is_block_device() || file_type.is_char_device() || file_type.is_socket() {
            return Err(WzipError::invalid_argument(format!(
                "{} is not a regular file",
                path.display()
            )));
        }
    }

    // Mapping a zero-length file fails on several platforms
    if !file_type.is_file() || metadata.len() == 0 {
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|e| WzipError::input(path.display(), e))?;
        return Ok(if data.is_empty() {
            InputBuffer::Empty
        } else {
            InputBuffer::Read(data)
        });
    }

    // The mapping is private and read-only; it lives until the file is encoded.
    let mmap =
        unsafe { Mmap::map(&file) }.map_err(|e| WzipError::input(path.display(), e))?;
    Ok(InputBuffer::Mapped(mmap))
}

/// Totals for one invocation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompressStats {
    pub files: usize,
    pub input_bytes: u64,
    pub records: u64,
    pub output_bytes: u64,
}

/// Encodes a sequence of buffers as one logical stream
pub struct StreamEncoder<W: Write> {
    plan: ChunkPlan,
    out: RecordWriter<W>,
    carry: Option<Run>,
    files: usize,
    input_bytes: u64,
}

impl<W: Write> StreamEncoder<W> {
    pub fn new(plan: ChunkPlan, writer: W) -> Self {
        Self {
            plan,
            out: RecordWriter::new(writer),
            carry: None,
            files: 0,
            input_bytes: 0,
        }
    }

    /// Encode the next buffer of the stream
    ///
    /// Runs that can no longer grow are written immediately; the trailing
    /// run stays pending until the next buffer or `finish`.
    pub fn push(&mut self, buffer: &[u8]) -> WzipResult<()> {
        let results = schedule(buffer, &self.plan)?;
        let chunks = results.len();

        let reconciled = reconcile(results, self.carry.take());
        let emitted = reconciled.runs.len();
        self.out.write_runs(reconciled.runs)?;
        self.carry = reconciled.carry;

        self.files += 1;
        self.input_bytes += buffer.len() as u64;
        debug!(bytes = buffer.len(), chunks, emitted, "encoded input");
        Ok(())
    }

    /// Emit the pending run, flush, and return the destination
    pub fn finish(mut self) -> WzipResult<(W, CompressStats)> {
        // End of stream: the carry can no longer grow
        self.out.write_runs(self.carry.take())?;

        let stats = CompressStats {
            files: self.files,
            input_bytes: self.input_bytes,
            records: self.out.records(),
            output_bytes: self.out.bytes(),
        };
        let writer = self.out.finish()?;
        Ok((writer, stats))
    }
}

/// Compress `paths`, in order, into one record stream on `writer`
///
/// The stream is assembled in memory and written in one piece once every
/// file has been encoded; a failing file leaves `writer` untouched.
pub fn compress_files<P, W>(
    paths: &[P],
    plan: ChunkPlan,
    mut writer: W,
) -> WzipResult<(W, CompressStats)>
where
    P: AsRef<Path>,
    W: Write,
{
    let mut encoder = StreamEncoder::new(plan, Vec::new());

    for path in paths {
        let path = path.as_ref();
        let _span = debug_span!("file", path = %path.display()).entered();

        let input = load_input(path)?;
        encoder.push(&input)?;
    }

    let (encoded, stats) = encoder.finish()?;
    writer.write_all(&encoded)?;
    writer.flush()?;
    debug!(
        files = stats.files,
        input_bytes = stats.input_bytes,
        records = stats.records,
        output_bytes = stats.output_bytes,
        "compression complete"
    );
    Ok((writer, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::RECORD_SIZE;
    use std::num::NonZeroUsize;
    use tempfile::TempDir;

    fn records(out: &[u8]) -> Vec<(u32, u8)> {
        out.chunks_exact(RECORD_SIZE)
            .map(|r| (u32::from_ne_bytes([r[0], r[1], r[2], r[3]]), r[4]))
            .collect()
    }

    fn write_inputs(dir: &TempDir, contents: &[&str]) -> Vec<std::path::PathBuf> {
        contents
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let path = dir.path().join(format!("input{i}"));
                std::fs::write(&path, c).unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn test_cross_file_merge() {
        let dir = TempDir::new().unwrap();
        let paths = write_inputs(&dir, &["xxx", "xxyy"]);

        let (out, stats) = compress_files(&paths, ChunkPlan::default(), Vec::new()).unwrap();
        assert_eq!(records(&out), vec![(5, b'x'), (2, b'y')]);
        assert_eq!(stats.files, 2);
        assert_eq!(stats.input_bytes, 7);
        assert_eq!(stats.records, 2);
        assert_eq!(stats.output_bytes, 10);
    }

    #[test]
    fn test_empty_file_yields_nothing() {
        let dir = TempDir::new().unwrap();
        let paths = write_inputs(&dir, &[""]);

        let (out, stats) = compress_files(&paths, ChunkPlan::default(), Vec::new()).unwrap();
        assert!(out.is_empty());
        assert_eq!(stats.records, 0);
    }

    #[test]
    fn test_empty_file_between_inputs_keeps_run() {
        let dir = TempDir::new().unwrap();
        let paths = write_inputs(&dir, &["aa", "", "ab"]);

        let (out, _) = compress_files(&paths, ChunkPlan::default(), Vec::new()).unwrap();
        assert_eq!(records(&out), vec![(3, b'a'), (1, b'b')]);
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");

        let err = compress_files(&[missing], ChunkPlan::default(), Vec::new()).unwrap_err();
        assert!(matches!(err, WzipError::FileNotFound(_)));
    }

    #[test]
    fn test_failing_file_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut paths = write_inputs(&dir, &["abc"]);
        paths.push(dir.path().join("gone"));

        let mut out = Vec::new();
        let err = compress_files(&paths, ChunkPlan::default(), &mut out).unwrap_err();
        assert!(matches!(err, WzipError::FileNotFound(_)));
        assert!(out.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_file_is_not_reported_missing() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let locked = dir.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        let path = locked.join("input");
        std::fs::write(&path, "abc").unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        let result = load_input(&path);
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        // Root ignores directory permissions
        if let Err(err) = result {
            assert!(matches!(err, WzipError::Input { .. }), "got {err:?}");
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_device_is_rejected() {
        let err = load_input(Path::new("/dev/null")).err().unwrap();
        assert!(matches!(err, WzipError::InvalidArgument(_)));
    }

    #[test]
    fn test_directory_is_rejected() {
        let dir = TempDir::new().unwrap();

        let err = compress_files(&[dir.path()], ChunkPlan::default(), Vec::new()).unwrap_err();
        assert!(matches!(err, WzipError::InvalidArgument(_)));
    }

    #[test]
    fn test_mapped_file_split_across_workers() {
        let dir = TempDir::new().unwrap();
        let data = "a".repeat(5000) + &"b".repeat(5000);
        let paths = write_inputs(&dir, &[data.as_str()]);

        let plan = ChunkPlan::new(NonZeroUsize::new(3).unwrap(), 4096);
        let (out, _) = compress_files(&paths, plan, Vec::new()).unwrap();
        assert_eq!(records(&out), vec![(5000, b'a'), (5000, b'b')]);
    }

    #[test]
    fn test_stream_encoder_buffers() {
        let plan = ChunkPlan::new(NonZeroUsize::new(2).unwrap(), 0);
        let mut encoder = StreamEncoder::new(plan, Vec::new());
        encoder.push(b"aaaaaa").unwrap();
        encoder.push(b"").unwrap();
        encoder.push(b"ab").unwrap();

        let (out, stats) = encoder.finish().unwrap();
        assert_eq!(records(&out), vec![(7, b'a'), (1, b'b')]);
        assert_eq!(stats.files, 3);
        assert_eq!(stats.input_bytes, 8);
    }
}
