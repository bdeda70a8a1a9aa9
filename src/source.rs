//! Reading GnuCash book files from disk.

use crate::error::Result;
use flate2::read::GzDecoder;
use log::{debug, error};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Decompresses `bytes` if they are gzip, otherwise returns them as UTF-8.
///
/// GnuCash compresses by default but can also save plain XML.
pub fn decode(bytes: &[u8]) -> Result<String> {
    if bytes.starts_with(&GZIP_MAGIC) {
        let mut contents = String::new();
        GzDecoder::new(bytes).read_to_string(&mut contents)?;
        Ok(contents)
    } else {
        let contents = std::str::from_utf8(bytes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(contents.to_string())
    }
}

/// Path of the raw XML dump written next to `path`.
pub fn dump_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".xml");
    PathBuf::from(name)
}

/// Reads and decompresses a book file.
///
/// With `dump_xml`, the decompressed document is also written to
/// `<path>.xml`. A failed dump is logged and otherwise ignored.
pub fn read_book(path: &Path, dump_xml: bool) -> Result<String> {
    let bytes = fs::read(path)?;
    let contents = decode(&bytes)?;

    if dump_xml {
        let out = dump_path(path);
        match fs::write(&out, &contents) {
            Ok(()) => debug!("Written {} bytes to {}", contents.len(), out.display()),
            Err(e) => error!("Error writing output XML {}: {}", out.display(), e),
        }
    }

    Ok(contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const XML: &str = "<gnc-v2/>";

    fn gzip(text: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_decode_gzip_and_plain() {
        assert_eq!(decode(&gzip(XML)).unwrap(), XML);
        assert_eq!(decode(XML.as_bytes()).unwrap(), XML);
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        assert!(decode(&[0xff, 0xfe, 0x00]).is_err());
    }

    #[test]
    fn test_read_book_with_dump() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("household.gnucash");
        fs::write(&path, gzip(XML)).unwrap();

        assert_eq!(read_book(&path, true).unwrap(), XML);
        assert_eq!(dump_path(&path), dir.path().join("household.gnucash.xml"));
        assert_eq!(fs::read_to_string(dump_path(&path)).unwrap(), XML);
    }

    #[test]
    fn test_read_book_missing_file() {
        assert!(read_book(Path::new("does/not/exist.gnucash"), false).is_err());
    }
}
