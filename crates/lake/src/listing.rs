//! `ListObjectsV2` response parsing.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::LakeError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectEntry {
    pub key: String,
    pub size: u64,
}

impl ObjectEntry {
    /// Keys ending in `/` are folder placeholders, not files.
    pub fn is_dir_marker(&self) -> bool {
        self.key.ends_with('/')
    }

    /// Last path segment of the key.
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub objects: Vec<ObjectEntry>,
    pub is_truncated: bool,
    pub next_continuation_token: Option<String>,
    pub key_count: Option<usize>,
}

/// Parse a `ListBucketResult` document. An S3 `<Error>` document is turned
/// into [`LakeError::Remote`].
pub fn parse_list_page(xml: &str) -> Result<ListPage, LakeError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut page = ListPage::default();
    let mut current: Option<ObjectEntry> = None;
    let mut error_code: Option<String> = None;
    let mut error_message = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = e.name().as_ref().to_vec();
                if name == b"Contents" {
                    current = Some(ObjectEntry::default());
                }
                stack.push(name);
            }
            Ok(Event::End(ref e)) => {
                stack.pop();
                if e.name().as_ref() == b"Contents" {
                    if let Some(entry) = current.take() {
                        page.objects.push(entry);
                    }
                }
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| LakeError::Listing(err.to_string()))?
                    .into_owned();
                let n = stack.len();
                let leaf = stack.last().map(Vec::as_slice);
                let parent = if n >= 2 { Some(stack[n - 2].as_slice()) } else { None };

                match (parent, leaf) {
                    (Some(b"Contents"), Some(b"Key")) => {
                        if let Some(entry) = current.as_mut() {
                            entry.key = text;
                        }
                    }
                    (Some(b"Contents"), Some(b"Size")) => {
                        if let Some(entry) = current.as_mut() {
                            entry.size = text.parse().unwrap_or(0);
                        }
                    }
                    (Some(b"ListBucketResult"), Some(b"IsTruncated")) => {
                        page.is_truncated = text.eq_ignore_ascii_case("true");
                    }
                    (Some(b"ListBucketResult"), Some(b"NextContinuationToken")) => {
                        page.next_continuation_token = Some(text);
                    }
                    (Some(b"ListBucketResult"), Some(b"KeyCount")) => {
                        page.key_count = text.parse().ok();
                    }
                    (Some(b"Error"), Some(b"Code")) => error_code = Some(text),
                    (Some(b"Error"), Some(b"Message")) => error_message = text,
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(LakeError::Listing(format!(
                    "at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    if let Some(code) = error_code {
        return Err(LakeError::Remote {
            code,
            message: error_message,
        });
    }
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>oedi-data-lake</Name>
  <Prefix>pvdaq/parquet/metrics/</Prefix>
  <KeyCount>2</KeyCount>
  <MaxKeys>1000</MaxKeys>
  <IsTruncated>true</IsTruncated>
  <NextContinuationToken>1ueGcxLPRx1Tr/XYExHnhbYLgveDs2J/wm36Hy4vbOwM=</NextContinuationToken>
  <Contents>
    <Key>pvdaq/parquet/metrics/</Key>
    <Size>0</Size>
  </Contents>
  <Contents>
    <Key>pvdaq/parquet/metrics/metrics__part000.parquet</Key>
    <LastModified>2023-08-01T00:00:00.000Z</LastModified>
    <Size>52311</Size>
    <StorageClass>STANDARD</StorageClass>
  </Contents>
</ListBucketResult>"#;

    #[test]
    fn parses_keys_and_continuation() {
        let page = parse_list_page(PAGE).unwrap();
        assert_eq!(page.objects.len(), 2);
        assert!(page.objects[0].is_dir_marker());
        assert_eq!(page.objects[1].file_name(), "metrics__part000.parquet");
        assert_eq!(page.objects[1].size, 52311);
        assert!(page.is_truncated);
        assert_eq!(
            page.next_continuation_token.as_deref(),
            Some("1ueGcxLPRx1Tr/XYExHnhbYLgveDs2J/wm36Hy4vbOwM=")
        );
        assert_eq!(page.key_count, Some(2));
    }

    #[test]
    fn empty_listing() {
        let xml = r#"<ListBucketResult><KeyCount>0</KeyCount><IsTruncated>false</IsTruncated></ListBucketResult>"#;
        let page = parse_list_page(xml).unwrap();
        assert!(page.objects.is_empty());
        assert!(!page.is_truncated);
        assert_eq!(page.next_continuation_token, None);
    }

    #[test]
    fn escaped_key() {
        let xml = "<ListBucketResult><Contents><Key>a/R&amp;D.csv</Key></Contents></ListBucketResult>";
        let page = parse_list_page(xml).unwrap();
        assert_eq!(page.objects[0].key, "a/R&D.csv");
    }

    #[test]
    fn error_document() {
        let xml = "<Error><Code>NoSuchBucket</Code><Message>The specified bucket does not exist</Message></Error>";
        match parse_list_page(xml).unwrap_err() {
            LakeError::Remote { code, message } => {
                assert_eq!(code, "NoSuchBucket");
                assert!(message.contains("does not exist"));
            }
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn malformed_document() {
        let err = parse_list_page("<ListBucketResult><Contents></ListBucketResult>").unwrap_err();
        assert!(matches!(err, LakeError::Listing(_)));
    }
}
