//! Input sources of the outer interpreter

use crate::exception::Exception;
use std::io::{self, BufRead};

/// The active input source: a stream or an in-memory text with a cursor.
pub enum Source<'io> {
    Reader(Box<dyn BufRead + 'io>),
    Text { text: Vec<u8>, cursor: usize },
}

impl<'io> Source<'io> {
    pub fn text(s: &str) -> Source<'io> {
        Source::Text {
            text: s.as_bytes().to_vec(),
            cursor: 0,
        }
    }

    /// Next byte, `None` at end of input.
    pub fn read_byte(&mut self) -> Result<Option<u8>, Exception> {
        match self {
            Source::Text { text, cursor } => {
                let b = text.get(*cursor).copied();
                if b.is_some() {
                    *cursor += 1;
                }
                Ok(b)
            }
            Source::Reader(reader) => loop {
                let b = match reader.fill_buf() {
                    Ok(buf) => buf.first().copied(),
                    Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(_) => return Err(Exception::FileIOException),
                };
                if b.is_some() {
                    reader.consume(1);
                }
                return Ok(b);
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Read};

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "broken"))
        }
    }

    #[test]
    fn test_text_source() {
        let mut s = Source::text("ab");
        assert_eq!(s.read_byte(), Ok(Some(b'a')));
        assert_eq!(s.read_byte(), Ok(Some(b'b')));
        assert_eq!(s.read_byte(), Ok(None));
        assert_eq!(s.read_byte(), Ok(None));
    }

    #[test]
    fn test_reader_source() {
        let mut s = Source::Reader(Box::new(BufReader::new(&b"x"[..])));
        assert_eq!(s.read_byte(), Ok(Some(b'x')));
        assert_eq!(s.read_byte(), Ok(None));
    }

    #[test]
    fn test_read_fault() {
        let mut s = Source::Reader(Box::new(BufReader::new(Broken)));
        assert_eq!(s.read_byte(), Err(Exception::FileIOException));
    }
}
