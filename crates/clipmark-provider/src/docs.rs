//! Google Docs/Drive implementation of the document provider.
//!
//! Docs API indices count positions in the document body, which includes
//! structural gaps (the body starts at index 1, tables add offsets). The
//! adapter extracts the plain text from the document's text runs and keeps
//! a span table so API indices translate to offsets into that plain text;
//! segment offsets stored locally always refer to the extracted text.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use clipmark_core::{
    DocumentProvider, DocumentSnapshot, Error, MarkerRange, ProviderCredential, ProviderFile,
    Result,
};

/// Docs API base URL.
pub const DOCS_API_BASE: &str = "https://docs.googleapis.com/v1";

/// Drive API base URL.
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Named ranges owned by clipmark are prefixed so foreign ranges in the
/// same document are ignored.
const MARKER_PREFIX: &str = "clipmark:";

/// HTTP timeout for provider calls (seconds).
const PROVIDER_TIMEOUT_SECS: u64 = 60;

/// Build the named-range name for a segment.
pub fn marker_name(segment_id: Uuid) -> String {
    format!("{}{}", MARKER_PREFIX, segment_id)
}

/// Parse a named-range name back into a segment id.
pub fn parse_marker_name(name: &str) -> Option<Uuid> {
    name.strip_prefix(MARKER_PREFIX)
        .and_then(|rest| Uuid::parse_str(rest).ok())
}

// =============================================================================
// DOCS DOCUMENT JSON
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocsDocument {
    title: Option<String>,
    body: Option<DocsBody>,
    named_ranges: Option<HashMap<String, NamedRangeList>>,
}

#[derive(Debug, Deserialize)]
struct DocsBody {
    #[serde(default)]
    content: Vec<StructuralElement>,
}

#[derive(Debug, Deserialize)]
struct StructuralElement {
    paragraph: Option<Paragraph>,
}

#[derive(Debug, Deserialize)]
struct Paragraph {
    #[serde(default)]
    elements: Vec<ParagraphElement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParagraphElement {
    start_index: Option<i64>,
    text_run: Option<TextRun>,
}

#[derive(Debug, Deserialize)]
struct TextRun {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamedRangeList {
    #[serde(default)]
    named_ranges: Vec<NamedRange>,
}

#[derive(Debug, Deserialize)]
struct NamedRange {
    name: Option<String>,
    #[serde(default)]
    ranges: Vec<ApiRange>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiRange {
    start_index: Option<i64>,
    end_index: Option<i64>,
}

// =============================================================================
// TEXT EXTRACTION
// =============================================================================

/// One contiguous text run: where it sits in API index space and where its
/// first character landed in the extracted plain text.
#[derive(Debug, Clone)]
struct TextSpan {
    api_start: i64,
    api_end: i64,
    char_start: i64,
}

/// Extracted plain text plus the span table for index translation.
#[derive(Debug, Clone, Default)]
struct ExtractedText {
    text: String,
    spans: Vec<TextSpan>,
}

impl ExtractedText {
    fn total_chars(&self) -> i64 {
        self.text.chars().count() as i64
    }

    /// Translate an API index into a plain-text character offset,
    /// clamping indices that fall in structural gaps to the nearest span.
    fn to_char_offset(&self, api_index: i64) -> i64 {
        for span in &self.spans {
            if api_index < span.api_start {
                return span.char_start;
            }
            if api_index <= span.api_end {
                return span.char_start + (api_index - span.api_start);
            }
        }
        self.total_chars()
    }
}

fn extract_text(doc: &DocsDocument) -> ExtractedText {
    let mut extracted = ExtractedText::default();
    let Some(body) = &doc.body else {
        return extracted;
    };

    let mut char_cursor: i64 = 0;
    for element in &body.content {
        let Some(paragraph) = &element.paragraph else {
            continue;
        };
        for pe in &paragraph.elements {
            let (Some(start_index), Some(run)) = (pe.start_index, &pe.text_run) else {
                continue;
            };
            let Some(content) = &run.content else {
                continue;
            };
            if content.is_empty() {
                continue;
            }
            let run_chars = content.chars().count() as i64;
            extracted.spans.push(TextSpan {
                api_start: start_index,
                api_end: start_index + run_chars,
                char_start: char_cursor,
            });
            extracted.text.push_str(content);
            char_cursor += run_chars;
        }
    }
    extracted
}

fn extract_ranges(doc: &DocsDocument, extracted: &ExtractedText) -> HashMap<Uuid, MarkerRange> {
    let mut ranges = HashMap::new();
    let Some(named_ranges) = &doc.named_ranges else {
        return ranges;
    };

    for (name, list) in named_ranges {
        let Some(segment_id) = parse_marker_name(name) else {
            continue;
        };
        // A named range can be split into several sub-ranges by edits;
        // the marker covers their hull.
        let mut start: Option<i64> = None;
        let mut end: Option<i64> = None;
        for nr in &list.named_ranges {
            if nr.name.as_deref() != Some(name.as_str()) {
                continue;
            }
            for range in &nr.ranges {
                if let Some(s) = range.start_index {
                    start = Some(start.map_or(s, |cur: i64| cur.min(s)));
                }
                if let Some(e) = range.end_index {
                    end = Some(end.map_or(e, |cur: i64| cur.max(e)));
                }
            }
        }
        let (Some(start), Some(end)) = (start, end) else {
            continue;
        };
        let start_char = extracted.to_char_offset(start);
        let end_char = extracted.to_char_offset(end);
        if end_char <= start_char {
            continue;
        }
        ranges.insert(
            segment_id,
            MarkerRange {
                start: start_char as i32,
                end: end_char as i32,
            },
        );
    }
    ranges
}

// =============================================================================
// DRIVE LISTING JSON
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    modified_time: Option<DateTime<Utc>>,
}

// =============================================================================
// PROVIDER
// =============================================================================

/// Google Docs/Drive document provider.
pub struct GoogleDocsProvider {
    client: Client,
    docs_base: String,
    drive_base: String,
}

impl GoogleDocsProvider {
    /// Create a provider against the public Google endpoints.
    pub fn new() -> Self {
        Self::with_bases(DOCS_API_BASE.to_string(), DRIVE_API_BASE.to_string())
    }

    /// Create a provider against custom base URLs (test servers).
    pub fn with_bases(docs_base: String, drive_base: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(PROVIDER_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            docs_base,
            drive_base,
        }
    }

    /// Map a provider HTTP status to the right error.
    ///
    /// 403/404 mean the document was deleted or permission revoked: the
    /// expected access-lost terminal state, not a bug.
    fn map_error_status(status: StatusCode, context: &str) -> Error {
        match status {
            StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                Error::ProviderAccessLost(format!("{}: {}", context, status))
            }
            _ => Error::Provider(format!("{}: {}", context, status)),
        }
    }
}

impl Default for GoogleDocsProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentProvider for GoogleDocsProvider {
    async fn fetch_snapshot(
        &self,
        credential: &ProviderCredential,
        provider_file_id: &str,
    ) -> Result<DocumentSnapshot> {
        let url = format!("{}/documents/{}", self.docs_base, provider_file_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&credential.access_token)
            .send()
            .await
            .map_err(Error::from)?;

        if !response.status().is_success() {
            return Err(Self::map_error_status(
                response.status(),
                &format!("fetching document {}", provider_file_id),
            ));
        }

        let doc: DocsDocument = response.json().await.map_err(Error::from)?;
        let extracted = extract_text(&doc);
        let ranges = extract_ranges(&doc, &extracted);

        debug!(
            subsystem = "provider",
            component = "docs",
            op = "fetch_snapshot",
            provider_file_id,
            text_chars = extracted.text.chars().count(),
            marker_count = ranges.len(),
            "Fetched document snapshot"
        );

        Ok(DocumentSnapshot {
            title: doc.title.unwrap_or_default(),
            text: extracted.text,
            ranges,
            last_modified_at: None,
        })
    }

    async fn list_folder(
        &self,
        credential: &ProviderCredential,
        folder_id: &str,
    ) -> Result<Vec<ProviderFile>> {
        let query = format!(
            "'{}' in parents and mimeType = 'application/vnd.google-apps.document' and trashed = false",
            folder_id.replace('\'', "\\'")
        );

        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(format!("{}/files", self.drive_base))
                .bearer_auth(&credential.access_token)
                .query(&[
                    ("q", query.as_str()),
                    ("fields", "nextPageToken, files(id, name, modifiedTime)"),
                    ("pageSize", "100"),
                ]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request.send().await.map_err(Error::from)?;
            if !response.status().is_success() {
                return Err(Self::map_error_status(
                    response.status(),
                    &format!("listing folder {}", folder_id),
                ));
            }

            let page: DriveFileList = response.json().await.map_err(Error::from)?;
            files.extend(page.files.into_iter().map(|f| ProviderFile {
                provider_file_id: f.id,
                title: f.name,
                last_modified_at: f.modified_time,
            }));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(files)
    }

    async fn create_marker(
        &self,
        credential: &ProviderCredential,
        provider_file_id: &str,
        segment_id: Uuid,
        range: MarkerRange,
    ) -> Result<()> {
        // Segment offsets are plain-text offsets; the document body starts
        // at API index 1.
        let body = json!({
            "requests": [{
                "createNamedRange": {
                    "name": marker_name(segment_id),
                    "range": {
                        "startIndex": range.start as i64 + 1,
                        "endIndex": range.end as i64 + 1,
                    }
                }
            }]
        });

        let url = format!("{}/documents/{}:batchUpdate", self.docs_base, provider_file_id);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&credential.access_token)
            .json(&body)
            .send()
            .await
            .map_err(Error::from)?;

        if !response.status().is_success() {
            return Err(Self::map_error_status(
                response.status(),
                &format!("creating marker in {}", provider_file_id),
            ));
        }
        Ok(())
    }

    async fn delete_marker(
        &self,
        credential: &ProviderCredential,
        provider_file_id: &str,
        segment_id: Uuid,
    ) -> Result<()> {
        let body = json!({
            "requests": [{
                "deleteNamedRange": {
                    "name": marker_name(segment_id),
                }
            }]
        });

        let url = format!("{}/documents/{}:batchUpdate", self.docs_base, provider_file_id);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&credential.access_token)
            .json(&body)
            .send()
            .await
            .map_err(Error::from)?;

        // Deleting an already-gone marker is not worth failing the caller.
        if response.status() == StatusCode::BAD_REQUEST {
            warn!(
                subsystem = "provider",
                component = "docs",
                op = "delete_marker",
                provider_file_id,
                segment_id = %segment_id,
                "Marker already absent"
            );
            return Ok(());
        }
        if !response.status().is_success() {
            return Err(Self::map_error_status(
                response.status(),
                &format!("deleting marker in {}", provider_file_id),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_name_roundtrip() {
        let id = Uuid::new_v4();
        assert_eq!(parse_marker_name(&marker_name(id)), Some(id));
    }

    #[test]
    fn test_parse_marker_name_rejects_foreign_ranges() {
        assert_eq!(parse_marker_name("someone-elses-range"), None);
        assert_eq!(parse_marker_name("clipmark:not-a-uuid"), None);
    }

    fn doc_from_json(value: serde_json::Value) -> DocsDocument {
        serde_json::from_value(value).expect("valid docs document")
    }

    #[test]
    fn test_extract_text_concatenates_runs() {
        let doc = doc_from_json(json!({
            "title": "Set List",
            "body": { "content": [
                { "sectionBreak": {} },
                { "paragraph": { "elements": [
                    { "startIndex": 1, "textRun": { "content": "gas station " } },
                    { "startIndex": 13, "textRun": { "content": "hands\n" } }
                ]}}
            ]}
        }));

        let extracted = extract_text(&doc);
        assert_eq!(extracted.text, "gas station hands\n");
        assert_eq!(extracted.spans.len(), 2);
    }

    #[test]
    fn test_api_index_translation_skips_structural_gap() {
        // Two paragraphs; the second starts at API index 20 after a
        // structural gap, but at plain-text offset 6.
        let doc = doc_from_json(json!({
            "body": { "content": [
                { "paragraph": { "elements": [
                    { "startIndex": 1, "textRun": { "content": "intro\n" } }
                ]}},
                { "paragraph": { "elements": [
                    { "startIndex": 20, "textRun": { "content": "punchline\n" } }
                ]}}
            ]}
        }));
        let extracted = extract_text(&doc);

        assert_eq!(extracted.to_char_offset(1), 0);
        assert_eq!(extracted.to_char_offset(4), 3);
        assert_eq!(extracted.to_char_offset(20), 6);
        assert_eq!(extracted.to_char_offset(25), 11);
        // An index in the gap clamps to the start of the next span.
        assert_eq!(extracted.to_char_offset(10), 6);
        // Past the end clamps to total length.
        assert_eq!(extracted.to_char_offset(999), 16);
    }

    #[test]
    fn test_extract_ranges_maps_markers_to_char_offsets() {
        let id = Uuid::new_v4();
        let doc = doc_from_json(json!({
            "body": { "content": [
                { "paragraph": { "elements": [
                    { "startIndex": 1, "textRun": { "content": "the gas station bit\n" } }
                ]}}
            ]},
            "namedRanges": {
                (marker_name(id)): { "namedRanges": [
                    { "name": marker_name(id), "ranges": [
                        { "startIndex": 5, "endIndex": 16 }
                    ]}
                ]}
            }
        }));

        let extracted = extract_text(&doc);
        let ranges = extract_ranges(&doc, &extracted);

        let range = ranges.get(&id).expect("marker resolved");
        assert_eq!((range.start, range.end), (4, 15));
        assert_eq!(
            clipmark_core::slice_by_chars(&extracted.text, range.start, range.end),
            "gas station"
        );
    }

    #[test]
    fn test_extract_ranges_merges_split_subranges() {
        let id = Uuid::new_v4();
        let doc = doc_from_json(json!({
            "body": { "content": [
                { "paragraph": { "elements": [
                    { "startIndex": 1, "textRun": { "content": "abcdefghij\n" } }
                ]}}
            ]},
            "namedRanges": {
                (marker_name(id)): { "namedRanges": [
                    { "name": marker_name(id), "ranges": [
                        { "startIndex": 3, "endIndex": 5 },
                        { "startIndex": 7, "endIndex": 9 }
                    ]}
                ]}
            }
        }));

        let extracted = extract_text(&doc);
        let ranges = extract_ranges(&doc, &extracted);
        // Hull of both sub-ranges.
        assert_eq!(
            ranges.get(&id),
            Some(&MarkerRange { start: 2, end: 8 })
        );
    }

    #[test]
    fn test_extract_ranges_ignores_foreign_names() {
        let doc = doc_from_json(json!({
            "body": { "content": [
                { "paragraph": { "elements": [
                    { "startIndex": 1, "textRun": { "content": "text\n" } }
                ]}}
            ]},
            "namedRanges": {
                "other-tool:123": { "namedRanges": [
                    { "name": "other-tool:123", "ranges": [
                        { "startIndex": 1, "endIndex": 3 }
                    ]}
                ]}
            }
        }));

        let extracted = extract_text(&doc);
        assert!(extract_ranges(&doc, &extracted).is_empty());
    }
}
