use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::DocId;

/// File names of the optional gzipped caches stored next to the index.
pub const FIELD_LENGTH_CACHE_FILE: &str = "idx.cache.flength.gz";
pub const EXTERNAL_ID_CACHE_FILE: &str = "idx.cache.eid.gz";

/// Per-document field lengths, read from a gzipped text sidecar.
///
/// Format: a header of comma-separated field names, a line with the
/// corpus size, then one comma-separated row of integer lengths per
/// document, in field-name order.
pub struct FieldLengthCache {
    lengths: HashMap<String, Vec<u32>>,
}

impl FieldLengthCache {
    pub fn open(path: &Path) -> Result<FieldLengthCache> {
        let file = File::open(path)?;
        let mut lines = BufReader::new(GzDecoder::new(file)).lines();

        let header = match lines.next() {
            Some(line) => line?,
            None => return Err(Error::new(
                ErrorKind::Parse,
                format!("{}: missing field-name header", path.display()),
            )),
        };
        let field_names: Vec<String> = header.split(',').map(|f| f.to_string()).collect();

        let corpus_size: usize = match lines.next() {
            Some(line) => line?.trim().parse().map_err(|_| {
                Error::new(
                    ErrorKind::Parse,
                    format!("{}: bad corpus size", path.display()),
                )
            })?,
            None => 0,
        };

        let mut lengths: HashMap<String, Vec<u32>> = field_names
            .iter()
            .map(|f| (f.clone(), Vec::with_capacity(corpus_size)))
            .collect();

        for _ in 0..corpus_size {
            let row = match lines.next() {
                Some(line) => line?,
                None => return Err(Error::new(
                    ErrorKind::Parse,
                    format!("{}: fewer rows than corpus size", path.display()),
                )),
            };
            for (name, value) in field_names.iter().zip(row.split(',')) {
                let length = value.trim().parse().map_err(|_| {
                    Error::new(
                        ErrorKind::Parse,
                        format!("{}: bad field length '{}'", path.display(), value),
                    )
                })?;
                if let Some(column) = lengths.get_mut(name) {
                    column.push(length);
                }
            }
        }

        Ok(FieldLengthCache { lengths })
    }

    /// Cached length, or None when the field or document is unknown.
    pub fn field_length(&self, field: &str, docid: DocId) -> Option<u32> {
        self.lengths
            .get(field)
            .and_then(|column| column.get(docid.value() as usize))
            .copied()
    }
}

/// External document ids, read from a gzipped text sidecar. The header
/// line is discarded; line n+1 holds the external id of internal docid n.
pub struct ExternalIdCache {
    ids: Vec<String>,
}

impl ExternalIdCache {
    pub fn open(path: &Path) -> Result<ExternalIdCache> {
        let file = File::open(path)?;
        let reader = BufReader::new(GzDecoder::new(file));

        let mut ids = Vec::new();
        for (n, line) in reader.lines().enumerate() {
            if n == 0 {
                line?; // header
                continue;
            }
            ids.push(line?);
        }

        Ok(ExternalIdCache { ids })
    }

    pub fn external_id(&self, docid: DocId) -> Option<&str> {
        self.ids.get(docid.value() as usize).map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    fn write_gz(path: &Path, contents: &str) {
        let file = File::create(path).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(contents.as_bytes()).unwrap();
        encoder.finish().unwrap();
    }

    #[test]
    fn test_field_length_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FIELD_LENGTH_CACHE_FILE);
        write_gz(&path, "body,title\n3\n10,2\n7,0\n42,5\n");

        let cache = FieldLengthCache::open(&path).unwrap();
        assert_eq!(cache.field_length("body", DocId(0)), Some(10));
        assert_eq!(cache.field_length("title", DocId(2)), Some(5));
        assert_eq!(cache.field_length("body", DocId(3)), None);
        assert_eq!(cache.field_length("url", DocId(0)), None);
    }

    #[test]
    fn test_field_length_cache_truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FIELD_LENGTH_CACHE_FILE);
        write_gz(&path, "body\n3\n10\n");

        assert!(FieldLengthCache::open(&path).is_err());
    }

    #[test]
    fn test_external_id_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(EXTERNAL_ID_CACHE_FILE);
        write_gz(&path, "externalId\nclueweb09-en0000-00-00001\nclueweb09-en0000-00-00002\n");

        let cache = ExternalIdCache::open(&path).unwrap();
        assert_eq!(
            cache.external_id(DocId(0)),
            Some("clueweb09-en0000-00-00001")
        );
        assert_eq!(
            cache.external_id(DocId(1)),
            Some("clueweb09-en0000-00-00002")
        );
        assert_eq!(cache.external_id(DocId(2)), None);
    }
}
