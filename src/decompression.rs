use flate2::read::MultiGzDecoder;
use std::io::{self, Chain, Cursor, Read};

const GZIP_MAGIC: [u8; 3] = [0x1F, 0x8B, 0x08];
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Compression detected from the first bytes of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    Zstd,
    None,
}

impl Compression {
    pub fn detect(head: &[u8]) -> Self {
        if head.starts_with(&GZIP_MAGIC) {
            Compression::Gzip
        } else if head.starts_with(&ZSTD_MAGIC) {
            Compression::Zstd
        } else {
            Compression::None
        }
    }
}

/// Read up to four bytes without losing them: the returned reader replays them
fn peek_head<R: Read>(mut reader: R) -> io::Result<([u8; 4], usize, Chain<Cursor<Vec<u8>>, R>)> {
    let mut head = [0u8; 4];
    let mut filled = 0;
    // A pipe may deliver fewer bytes than asked for
    while filled < head.len() {
        match reader.read(&mut head[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    let prefix = Cursor::new(head[..filled].to_vec());
    Ok((head, filled, prefix.chain(reader)))
}

/// Wrap `reader` in a gzip or zstd decoder when its magic bytes say so
pub fn maybe_decompress<R: Read + Send + 'static>(
    reader: R,
) -> io::Result<(Compression, Box<dyn Read + Send>)> {
    let (head, filled, chained) = peek_head(reader)?;
    let compression = Compression::detect(&head[..filled]);
    let decoded: Box<dyn Read + Send> = match compression {
        Compression::Gzip => Box::new(MultiGzDecoder::new(chained)),
        Compression::Zstd => Box::new(zstd::Decoder::new(chained)?),
        Compression::None => Box::new(chained),
    };
    Ok((compression, decoded))
}
