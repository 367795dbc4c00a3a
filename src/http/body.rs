use bytes::Bytes;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Read size for file-backed bodies.
pub const FILE_CHUNK_SIZE: usize = 8192;

/// A response body streamed from a file.
///
/// The size is taken when the file is opened and becomes the response's
/// Content-Length; iteration stops after that many bytes.
#[derive(Debug)]
pub struct FileBody {
    file: File,
    len: u64,
    remaining: u64,
}

impl FileBody {
    /// Opens a regular file. Directories and other special files are refused.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::open(path)?;
        let metadata = file.metadata()?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "not a regular file",
            ));
        }
        let len = metadata.len();
        Ok(Self {
            file,
            len,
            remaining: len,
        })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Iterator for FileBody {
    type Item = anyhow::Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let want = self.remaining.min(FILE_CHUNK_SIZE as u64) as usize;
        let mut buf = vec![0u8; want];
        match self.file.read(&mut buf) {
            Ok(0) => Some(Err(anyhow::anyhow!(
                "file shrank by {} bytes while being served",
                self.remaining
            ))),
            Ok(n) => {
                buf.truncate(n);
                self.remaining -= n as u64;
                Some(Ok(Bytes::from(buf)))
            }
            Err(e) => Some(Err(e.into())),
        }
    }
}
