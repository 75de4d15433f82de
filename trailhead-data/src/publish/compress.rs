//! Gzip compression of finished snapshot files.

use std::io::{self, BufReader, BufWriter, Read, Write};

use camino::{Utf8Path, Utf8PathBuf};
use flate2::Compression;
use flate2::write::GzEncoder;
use trailhead_fs::{create_utf8_file, open_utf8_file};

/// Path of the compressed artefact written next to `snapshot`.
#[must_use]
pub fn compressed_path(snapshot: &Utf8Path) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{snapshot}.gz"))
}

/// Stream `source` through a gzip encoder into `target`.
///
/// Returns the number of uncompressed bytes read. `target` is only complete
/// once this returns `Ok`.
pub fn gzip_file(source: &Utf8Path, target: &Utf8Path) -> io::Result<u64> {
    let mut input = BufReader::new(open_utf8_file(source)?);
    let output = BufWriter::new(create_utf8_file(target)?);
    let mut encoder = GzEncoder::new(output, Compression::default());
    let copied = io::copy(&mut input, &mut encoder)?;
    let mut output = encoder.finish()?;
    output.flush()?;
    Ok(copied)
}

/// Read a whole file into memory.
pub fn read_file(path: &Utf8Path) -> io::Result<Vec<u8>> {
    let mut body = Vec::new();
    open_utf8_file(path)?.read_to_end(&mut body)?;
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    fn compressed_path_appends_extension() {
        let path = compressed_path(Utf8Path::new("/tmp/exports/tenant_3_features.db"));

        assert_eq!(path.as_str(), "/tmp/exports/tenant_3_features.db.gz");
    }

    #[rstest]
    fn gzip_round_trips_contents() {
        let dir = TempDir::new().expect("create temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 path");
        let source = root.join("tenant_1_features.db");
        let payload = b"SQLite format 3\0".repeat(64);
        create_utf8_file(&source)
            .and_then(|mut file| file.write_all(&payload))
            .expect("write source");
        let target = compressed_path(&source);

        let copied = gzip_file(&source, &target).expect("compress");

        assert_eq!(copied, payload.len() as u64);
        let mut decoded = Vec::new();
        GzDecoder::new(read_file(&target).expect("read target").as_slice())
            .read_to_end(&mut decoded)
            .expect("decode");
        assert_eq!(decoded, payload);
    }

    #[rstest]
    fn missing_source_is_an_error() {
        let dir = TempDir::new().expect("create temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 path");

        let err = gzip_file(&root.join("absent.db"), &root.join("absent.db.gz"))
            .expect_err("source missing");

        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
