//! Upload → validate → parse → store.

use encoding_rs::{Encoding, EUC_KR};
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;

use chatlens_parser::{LogFormat, LogParser};
use chatlens_persist::{IngestOutcome, RoomStore, RoomTarget};
use chatlens_stats::SnapshotCache;
use chatlens_types::FileMeta;

use crate::error::{IngestError, Result};

/// Default upload limit: 50 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

const ACCEPTED_EXTENSIONS: [&str; 2] = ["txt", "csv"];

/// Result of one upload.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub outcome: IngestOutcome,
    pub format: LogFormat,
    pub parsed_messages: usize,
    pub skipped_lines: usize,
    pub continuation_lines: usize,
}

/// Orchestrates an upload into the room store.
///
/// The file name only gates the accepted types; the content itself is
/// checked before parsing. The file id is the hex SHA-256 of the raw bytes,
/// so uploading the same export twice is a no-op.
#[derive(Clone)]
pub struct IngestionService {
    parser: LogParser,
    store: Arc<dyn RoomStore>,
    cache: Arc<SnapshotCache>,
    max_upload_bytes: usize,
}

impl IngestionService {
    pub fn new(parser: LogParser, store: Arc<dyn RoomStore>, cache: Arc<SnapshotCache>) -> Self {
        Self {
            parser,
            store,
            cache,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, limit: usize) -> Self {
        self.max_upload_bytes = limit;
        self
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    pub async fn ingest(&self, file_name: &str, bytes: &[u8], target: RoomTarget) -> Result<IngestReport> {
        let text = self.validate(file_name, bytes)?;
        let file_id = file_id(bytes);

        let report = self.parser.parse(&text)?;
        let parsed_messages = report.messages.len();
        tracing::debug!(
            file_id = %file_id,
            format = ?report.format,
            parsed_messages,
            skipped = report.skipped_lines,
            "Parsed upload"
        );

        let meta = FileMeta {
            id: file_id,
            original_name: file_name.to_string(),
            byte_size: bytes.len() as u64,
            parsed_message_count: parsed_messages,
        };
        let outcome = self.store.ingest(target, report.messages, meta).await?;

        if !outcome.duplicate {
            self.cache.invalidate(&outcome.room.id).await;
        }

        tracing::info!(
            room_id = %outcome.room.id,
            file_id = %outcome.file.id,
            new_messages = outcome.new_messages,
            duplicate = outcome.duplicate,
            "Upload ingested"
        );

        Ok(IngestReport {
            outcome,
            format: report.format,
            parsed_messages,
            skipped_lines: report.skipped_lines,
            continuation_lines: report.continuation_lines,
        })
    }

    /// Check the upload and return its decoded text without a byte-order mark.
    pub fn validate<'a>(&self, file_name: &str, bytes: &'a [u8]) -> Result<Cow<'a, str>> {
        let extension = Path::new(file_name.trim())
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension {
            Some(ext) if ACCEPTED_EXTENSIONS.contains(&ext.as_str()) => {}
            _ => {
                return Err(IngestError::InvalidInput(format!(
                    "unsupported file type '{}', expected .txt or .csv",
                    file_name
                )))
            }
        }

        if bytes.len() > self.max_upload_bytes {
            return Err(IngestError::TooLarge {
                size: bytes.len(),
                limit: self.max_upload_bytes,
            });
        }

        let text = decode(bytes)?;
        if text.trim().is_empty() {
            return Err(IngestError::InvalidInput("file is empty".to_string()));
        }
        if text.contains('\0') {
            return Err(IngestError::InvalidInput("file contains NUL bytes; not a text export".to_string()));
        }
        Ok(text)
    }
}

/// Decode an export: a byte-order mark picks UTF-8 or UTF-16, otherwise
/// UTF-8 and then CP949 (Korean Windows PC exports) are tried.
fn decode(bytes: &[u8]) -> Result<Cow<'_, str>> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, had_errors) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        if had_errors {
            return Err(IngestError::InvalidInput(format!("file is not valid {}", encoding.name())));
        }
        return Ok(text);
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok(Cow::Borrowed(text));
    }

    // EUC_KR in encoding_rs is the windows-949 superset.
    let (text, had_errors) = EUC_KR.decode_without_bom_handling(bytes);
    if had_errors {
        return Err(IngestError::InvalidInput(
            "file is neither UTF-8 nor CP949 text".to_string(),
        ));
    }
    tracing::debug!(bytes = bytes.len(), "Decoded upload as CP949");
    Ok(text)
}

/// Hex SHA-256 of the uploaded bytes
pub fn file_id(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatlens_persist::MemoryRoomStore;

    fn service(limit: usize) -> IngestionService {
        IngestionService::new(
            LogParser::default(),
            Arc::new(MemoryRoomStore::new()),
            Arc::new(SnapshotCache::new()),
        )
        .with_max_upload_bytes(limit)
    }

    #[test]
    fn test_extension_is_checked_case_insensitively() {
        let svc = service(1024);
        assert!(svc.validate("Chat.TXT", b"hello").is_ok());
        assert!(svc.validate("export.csv", b"a,b").is_ok());
        assert!(matches!(svc.validate("photo.png", b"hello"), Err(IngestError::InvalidInput(_))));
        assert!(matches!(svc.validate("noextension", b"hello"), Err(IngestError::InvalidInput(_))));
    }

    #[test]
    fn test_content_is_checked() {
        let svc = service(16);
        assert!(matches!(svc.validate("a.txt", b" \n\t"), Err(IngestError::InvalidInput(_))));
        assert!(matches!(svc.validate("a.txt", b"\xEF\xBB\xBF"), Err(IngestError::InvalidInput(_))));
        assert!(matches!(svc.validate("a.txt", b"ab\0cd"), Err(IngestError::InvalidInput(_))));
        assert!(matches!(svc.validate("a.txt", b"\xff\xfe"), Err(IngestError::InvalidInput(_))));
        assert!(matches!(svc.validate("a.txt", b"\xff\xff\xff"), Err(IngestError::InvalidInput(_))));
        assert!(matches!(
            svc.validate("a.txt", &[b'a'; 17]),
            Err(IngestError::TooLarge { size: 17, limit: 16 })
        ));
    }

    #[test]
    fn test_bom_is_stripped() {
        let svc = service(1024);
        assert_eq!(svc.validate("a.txt", "\u{feff}안녕".as_bytes()).unwrap(), "안녕");

        let mut utf16 = vec![0xFF, 0xFE];
        utf16.extend("안녕".encode_utf16().flat_map(u16::to_le_bytes));
        assert_eq!(svc.validate("a.txt", &utf16).unwrap(), "안녕");
    }

    #[test]
    fn test_cp949_export_is_decoded() {
        let svc = service(1024);
        let line = "2024년 1월 15일 오후 1:23, 김철수 : 똠방각하 안녕하세요";
        let (bytes, _, unmappable) = EUC_KR.encode(line);
        assert!(!unmappable);
        assert!(std::str::from_utf8(&bytes).is_err());

        assert_eq!(svc.validate("KakaoTalk_PC.txt", &bytes).unwrap(), line);
    }

    #[test]
    fn test_file_id_is_content_hash() {
        assert_eq!(
            file_id(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(file_id(b"abc"), file_id(b"abc"));
        assert_ne!(file_id(b"abc"), file_id(b"abd"));
    }
}
