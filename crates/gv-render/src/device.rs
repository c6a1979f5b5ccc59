//! Output sinks. All writes go through one interface supporting a
//! file handle, an auto-growing in-memory buffer, and a caller
//! callback; compressed formats wrap the sink in a gzip stream whose
//! CRC32 and length trailer are written at close.

use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

pub enum Sink {
    File(BufWriter<File>),
    Buffer(Vec<u8>),
    Callback(Box<dyn FnMut(&[u8]) + Send>),
    Gzip(Box<GzEncoder<Sink2>>),
}

/// The inner target of a gzip wrapper; gzip-over-gzip is not a thing
/// this driver produces.
pub enum Sink2 {
    File(BufWriter<File>),
    Buffer(Vec<u8>),
    Callback(Box<dyn FnMut(&[u8]) + Send>),
}

impl Write for Sink2 {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Sink2::File(f) => f.write(buf),
            Sink2::Buffer(b) => {
                b.extend_from_slice(buf);
                Ok(buf.len())
            }
            Sink2::Callback(cb) => {
                cb(buf);
                Ok(buf.len())
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink2::File(f) => f.flush(),
            Sink2::Buffer(_) | Sink2::Callback(_) => Ok(()),
        }
    }
}

impl Sink {
    pub fn file(path: &Path) -> io::Result<Sink> {
        Ok(Sink::File(BufWriter::new(File::create(path)?)))
    }

    pub fn buffer() -> Sink {
        Sink::Buffer(Vec::new())
    }

    pub fn callback(f: impl FnMut(&[u8]) + Send + 'static) -> Sink {
        Sink::Callback(Box::new(f))
    }

    /// Wrap this sink in a gzip stream (gzip header now, CRC32 and
    /// input length at close).
    pub fn compressed(self) -> Sink {
        let inner = match self {
            Sink::File(f) => Sink2::File(f),
            Sink::Buffer(b) => Sink2::Buffer(b),
            Sink::Callback(cb) => Sink2::Callback(cb),
            gz @ Sink::Gzip(_) => return gz,
        };
        Sink::Gzip(Box::new(GzEncoder::new(inner, Compression::default())))
    }

    /// Close the sink. The gzip trailer is flushed here; an in-memory
    /// buffer (compressed or not) is returned to the caller.
    pub fn finish(self) -> io::Result<Option<Vec<u8>>> {
        match self {
            Sink::File(mut f) => {
                f.flush()?;
                Ok(None)
            }
            Sink::Buffer(b) => Ok(Some(b)),
            Sink::Callback(_) => Ok(None),
            Sink::Gzip(gz) => match gz.finish()? {
                Sink2::File(mut f) => {
                    f.flush()?;
                    Ok(None)
                }
                Sink2::Buffer(b) => Ok(Some(b)),
                Sink2::Callback(_) => Ok(None),
            },
        }
    }
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Sink::File(f) => f.write(buf),
            Sink::Buffer(b) => {
                b.extend_from_slice(buf);
                Ok(buf.len())
            }
            Sink::Callback(cb) => {
                cb(buf);
                Ok(buf.len())
            }
            Sink::Gzip(gz) => gz.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink::File(f) => f.flush(),
            Sink::Buffer(_) | Sink::Callback(_) => Ok(()),
            Sink::Gzip(gz) => gz.flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_sink_grows() {
        let mut s = Sink::buffer();
        s.write_all(b"hello ").unwrap();
        s.write_all(b"world").unwrap();
        assert_eq!(s.finish().unwrap().unwrap(), b"hello world");
    }

    #[test]
    fn callback_sink_sees_every_chunk() {
        use std::sync::{Arc, Mutex};
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        let mut s = Sink::callback(move |chunk| {
            seen2.lock().unwrap().extend_from_slice(chunk);
        });
        s.write_all(b"abc").unwrap();
        s.write_all(b"def").unwrap();
        s.finish().unwrap();
        assert_eq!(&*seen.lock().unwrap(), b"abcdef");
    }

    #[test]
    fn gzip_sink_produces_a_gzip_stream() {
        let mut s = Sink::buffer().compressed();
        s.write_all(b"the same text repeated; the same text repeated")
            .unwrap();
        let out = s.finish().unwrap().unwrap();
        // gzip magic and deflate method
        assert_eq!(&out[..3], &[0x1f, 0x8b, 0x08]);
        // trailer carries the input length (mod 2^32) in the last 4 bytes
        let isize = u32::from_le_bytes(out[out.len() - 4..].try_into().unwrap());
        assert_eq!(isize, 46);
    }
}
