//! Little-endian stream primitives for the binary format.
//!
//! All multi-byte integers in a KDBX file are little-endian; `byteorder`
//! supplies the typed reads and writes.  The hashing adapters tee every
//! byte they transfer into a running SHA-256 so the header codec can
//! produce its integrity digest over exactly the bytes on the wire.

use std::io::{self, Read, Write};

use sha2::{Digest, Sha256};

// The typed little-endian surface used throughout the format layer.
pub use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

/// Read exactly `len` bytes into a fresh buffer.
pub fn read_vec<R: Read>(reader: &mut R, len: usize) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// A reader that folds everything it reads into a SHA-256 digest.
pub struct HashingReader<R> {
    inner: R,
    digest: Sha256,
}

impl<R: Read> HashingReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            digest: Sha256::new(),
        }
    }

    /// Digest of every byte read so far.
    pub fn finalize(self) -> [u8; 32] {
        self.digest.finalize().into()
    }
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.digest.update(&buf[..n]);
        Ok(n)
    }
}

/// A writer that folds everything it writes into a SHA-256 digest.
pub struct HashingWriter<W> {
    inner: W,
    digest: Sha256,
}

impl<W: Write> HashingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            digest: Sha256::new(),
        }
    }

    /// Digest of every byte written so far.
    pub fn finalize(self) -> [u8; 32] {
        self.digest.finalize().into()
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.digest.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn hashing_reader_digests_exactly_what_was_read() {
        let data = b"0123456789";
        let mut reader = HashingReader::new(Cursor::new(&data[..]));

        let head = read_vec(&mut reader, 4).unwrap();
        assert_eq!(&head, b"0123");

        // Only the four consumed bytes are part of the digest.
        let expected: [u8; 32] = Sha256::digest(b"0123").into();
        assert_eq!(reader.finalize(), expected);
    }

    #[test]
    fn reader_and_writer_digests_agree() {
        let data = b"\x01\x02\x03\x04little-endian";

        let mut writer = HashingWriter::new(Vec::new());
        writer.write_all(data).unwrap();

        let mut reader = HashingReader::new(Cursor::new(&data[..]));
        read_vec(&mut reader, data.len()).unwrap();

        assert_eq!(writer.finalize(), reader.finalize());
    }
}
