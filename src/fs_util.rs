use std::fs::{self, OpenOptions};
use std::io::{self, Read, Write};

use camino::Utf8Path;
use tempfile::Builder;

use crate::error::SyncError;

/// Streams `reader` into `destination` through a temp file in the same
/// directory. The destination only appears once the copy completed; on any
/// error the temp file is removed when it goes out of scope.
pub fn copy_stream_atomic(reader: &mut dyn Read, destination: &Utf8Path) -> Result<u64, SyncError> {
    let parent = destination
        .parent()
        .ok_or_else(|| SyncError::Filesystem(format!("invalid destination path {destination}")))?;
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| SyncError::Filesystem(err.to_string()))?;
    let mut temp = Builder::new()
        .prefix(".enigma-download")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| SyncError::Filesystem(err.to_string()))?;
    let written = io::copy(reader, temp.as_file_mut())
        .map_err(|err| SyncError::Filesystem(format!("copy to {destination}: {err}")))?;
    temp.as_file_mut()
        .flush()
        .map_err(|err| SyncError::Filesystem(err.to_string()))?;
    temp.persist_noclobber(destination.as_std_path())
        .map_err(|err| SyncError::Filesystem(format!("persist {destination}: {}", err.error)))?;
    Ok(written)
}

/// Appends one line to `path`, writing `header` first when the file is new.
pub fn append_line(path: &Utf8Path, header: &str, line: &str) -> Result<(), SyncError> {
    let is_new = !path.as_std_path().exists();
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path.as_std_path())
        .map_err(|err| SyncError::Filesystem(format!("open {path}: {err}")))?;
    if is_new {
        writeln!(file, "{header}").map_err(|err| SyncError::Filesystem(err.to_string()))?;
    }
    writeln!(file, "{line}").map_err(|err| SyncError::Filesystem(err.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use camino::Utf8PathBuf;

    use super::*;

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
        }
    }

    #[test]
    fn failed_copy_leaves_no_destination() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let destination = root.join("G1.gbff");

        assert!(copy_stream_atomic(&mut FailingReader, &destination).is_err());
        assert!(!destination.exists());
        assert_eq!(fs::read_dir(root.as_std_path()).unwrap().count(), 0);

        let written = copy_stream_atomic(&mut Cursor::new(b"LOCUS".to_vec()), &destination).unwrap();
        assert_eq!(written, 5);
        assert_eq!(fs::read_to_string(destination.as_std_path()).unwrap(), "LOCUS");
    }

    #[test]
    fn header_written_once() {
        let temp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("log.txt")).unwrap();
        append_line(&path, "#h", "a").unwrap();
        append_line(&path, "#h", "b").unwrap();
        assert_eq!(fs::read_to_string(path.as_std_path()).unwrap(), "#h\na\nb\n");
    }
}
