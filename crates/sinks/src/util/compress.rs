//! LZ4 compression of superseded log files
//!
//! Files are compressed to `<name>.lz4` with the LZ4 frame format, keep the
//! original modification time, and the source is removed once the frame is
//! finished.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use filetime::FileTime;
use lz4_flex::frame::FrameEncoder;

/// Extension appended to compressed files
pub const COMPRESSED_EXTENSION: &str = "lz4";

/// Default I/O buffer size (64KB)
const BUFFER_SIZE: usize = 64 * 1024;

/// Whether `path` already carries the compressed extension
pub fn is_compressed(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == COMPRESSED_EXTENSION)
}

/// Compress `path` into a sibling `.lz4` file and remove the original
///
/// Returns the path of the compressed file. On error the original is left in
/// place and any partial output is removed.
pub fn compress_file(path: &Path) -> io::Result<PathBuf> {
    let mut target = path.as_os_str().to_owned();
    target.push(".");
    target.push(COMPRESSED_EXTENSION);
    let target = PathBuf::from(target);

    let metadata = fs::metadata(path)?;
    let mtime = FileTime::from_last_modification_time(&metadata);

    if let Err(e) = write_frame(path, &target) {
        let _ = fs::remove_file(&target);
        return Err(e);
    }

    filetime::set_file_mtime(&target, mtime)?;
    fs::remove_file(path)?;

    tracing::debug!(
        source = %path.display(),
        target = %target.display(),
        "compressed log file"
    );

    Ok(target)
}

fn write_frame(source: &Path, target: &Path) -> io::Result<()> {
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, File::open(source)?);
    let file = File::options()
        .write(true)
        .create_new(true)
        .open(target)?;
    let mut encoder = FrameEncoder::new(BufWriter::with_capacity(BUFFER_SIZE, file));

    io::copy(&mut reader, &mut encoder)?;

    // Finish the LZ4 frame; the BufWriter must still be flushed explicitly
    let mut buf_writer = encoder.finish().map_err(io::Error::other)?;
    io::Write::flush(&mut buf_writer)?;
    buf_writer.get_ref().sync_all()?;
    Ok(())
}
