//! HTTP request handlers.

use crate::catalog::Resolution;
use crate::error::{AppError, Result};
use crate::opds::{Feed, FeedKind};
use crate::server::AppState;
use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, StatusCode, Uri, header},
    response::Response,
};
use chrono::{DateTime, SubsecRound, Utc};
use std::io::SeekFrom;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use uuid::Uuid;

/// Fallback type for files with an unknown extension.
const OCTET_STREAM: &str = "application/octet-stream";

fn internal(e: axum::http::Error) -> AppError {
    AppError::Internal(e.to_string())
}

/// Format an instant as an HTTP date.
fn http_date(instant: &DateTime<Utc>) -> String {
    instant.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Resolve any request path to a feed or a file.
pub async fn serve_path(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response<Body>> {
    let resolver = Arc::clone(&state.resolver);
    let raw_path = uri.path().to_string();

    let resolution = tokio::task::spawn_blocking(move || resolver.resolve(&raw_path))
        .await
        .map_err(|e| AppError::Internal(format!("resolver task failed: {}", e)))??;

    match resolution {
        Resolution::Feed { kind, feed } => {
            feed_response(&feed, kind, state.clock.now(), &headers)
        }
        Resolution::File { path, media_type } => file_response(&path, &media_type, &headers).await,
    }
}

// ============================================================================
// FEEDS
// ============================================================================

/// Serialize a feed, honouring conditional and range request headers.
pub(crate) fn feed_response(
    feed: &Feed,
    kind: FeedKind,
    last_modified: DateTime<Utc>,
    headers: &HeaderMap,
) -> Result<Response<Body>> {
    let xml = feed.to_xml(kind).inspect_err(|e| {
        tracing::error!(path = %feed.id, error = %e, "Failed to serialize feed");
    })?;

    let etag = format!("\"{}\"", Uuid::new_v5(&Uuid::NAMESPACE_OID, xml.as_bytes()));
    let builder = Response::builder()
        .header(header::ETAG, etag.as_str())
        .header(header::LAST_MODIFIED, http_date(&last_modified))
        .header(header::ACCEPT_RANGES, "bytes");

    if not_modified(headers, Some(etag.as_str()), last_modified) {
        return builder
            .status(StatusCode::NOT_MODIFIED)
            .body(Body::empty())
            .map_err(internal);
    }

    let builder = builder.header(header::CONTENT_TYPE, kind.media_type());
    let len = xml.len() as u64;
    let response = match parse_range(range_header(headers), len) {
        ByteRange::Full => builder
            .status(StatusCode::OK)
            .header(header::CONTENT_LENGTH, len)
            .body(Body::from(xml)),
        ByteRange::Partial { start, end } => {
            let slice = xml.as_bytes()[start as usize..=end as usize].to_vec();
            builder
                .status(StatusCode::PARTIAL_CONTENT)
                .header(
                    header::CONTENT_RANGE,
                    format!("bytes {}-{}/{}", start, end, len),
                )
                .header(header::CONTENT_LENGTH, slice.len())
                .body(Body::from(slice))
        }
        ByteRange::Unsatisfiable => builder
            .status(StatusCode::RANGE_NOT_SATISFIABLE)
            .header(header::CONTENT_RANGE, format!("bytes */{}", len))
            .body(Body::empty()),
    };

    response.map_err(internal)
}

/// `If-None-Match` wins over `If-Modified-Since` when both are present.
///
/// Without an entity tag only `*` matches. HTTP dates carry whole seconds,
/// so `last_modified` is compared at that precision.
fn not_modified(headers: &HeaderMap, etag: Option<&str>, last_modified: DateTime<Utc>) -> bool {
    if let Some(value) = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
    {
        return value.split(',').map(str::trim).any(|tag| {
            tag == "*"
                || etag.is_some_and(|etag| tag == etag || tag.strip_prefix("W/") == Some(etag))
        });
    }

    headers
        .get(header::IF_MODIFIED_SINCE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
        .is_some_and(|since| last_modified.trunc_subsecs(0) <= since.with_timezone(&Utc))
}

fn range_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::RANGE).and_then(|v| v.to_str().ok())
}

// ============================================================================
// FILES
// ============================================================================

/// Outcome of a `Range` header against a file length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ByteRange {
    /// No usable range; send the whole file.
    Full,
    /// Inclusive byte range.
    Partial { start: u64, end: u64 },
    /// The range lies outside the file.
    Unsatisfiable,
}

/// Parse a single `bytes=` range. Multi-range and malformed headers are ignored.
pub(crate) fn parse_range(header: Option<&str>, len: u64) -> ByteRange {
    let Some(ranges) = header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return ByteRange::Full;
    };
    if ranges.contains(',') {
        return ByteRange::Full;
    }
    let Some((start, end)) = ranges.split_once('-') else {
        return ByteRange::Full;
    };
    let (start, end) = (start.trim(), end.trim());

    match (start.parse::<u64>(), end.parse::<u64>()) {
        // "0-499"
        (Ok(start), Ok(end)) if start <= end => {
            if start >= len {
                ByteRange::Unsatisfiable
            } else {
                ByteRange::Partial {
                    start,
                    end: end.min(len - 1),
                }
            }
        }
        // "500-"
        (Ok(start), Err(_)) if end.is_empty() => {
            if start >= len {
                ByteRange::Unsatisfiable
            } else {
                ByteRange::Partial { start, end: len - 1 }
            }
        }
        // "-500"
        (Err(_), Ok(suffix)) if start.is_empty() => {
            if suffix == 0 || len == 0 {
                ByteRange::Unsatisfiable
            } else {
                ByteRange::Partial {
                    start: len.saturating_sub(suffix),
                    end: len - 1,
                }
            }
        }
        _ => ByteRange::Full,
    }
}

/// Stream a content file, whole or as a single byte range.
async fn file_response(path: &Path, media_type: &str, headers: &HeaderMap) -> Result<Response<Body>> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| AppError::from_fs(path, e))?;
    let metadata = file
        .metadata()
        .await
        .map_err(|e| AppError::from_fs(path, e))?;
    let len = metadata.len();
    let modified = metadata.modified().ok().map(DateTime::<Utc>::from);

    let content_type = if media_type.is_empty() {
        OCTET_STREAM
    } else {
        media_type
    };

    let mut builder = Response::builder().header(header::ACCEPT_RANGES, "bytes");
    if let Some(modified) = modified {
        builder = builder.header(header::LAST_MODIFIED, http_date(&modified));
    }

    if modified.is_some_and(|modified| not_modified(headers, None, modified)) {
        return builder
            .status(StatusCode::NOT_MODIFIED)
            .body(Body::empty())
            .map_err(internal);
    }

    let builder = builder.header(header::CONTENT_TYPE, content_type);
    let response = match parse_range(range_header(headers), len) {
        ByteRange::Full => builder
            .status(StatusCode::OK)
            .header(header::CONTENT_LENGTH, len)
            .body(Body::from_stream(ReaderStream::new(file))),
        ByteRange::Partial { start, end } => {
            file.seek(SeekFrom::Start(start))
                .await
                .map_err(|e| AppError::from_fs(path, e))?;
            let length = end - start + 1;

            builder
                .status(StatusCode::PARTIAL_CONTENT)
                .header(
                    header::CONTENT_RANGE,
                    format!("bytes {}-{}/{}", start, end, len),
                )
                .header(header::CONTENT_LENGTH, length)
                .body(Body::from_stream(ReaderStream::new(file.take(length))))
        }
        ByteRange::Unsatisfiable => builder
            .status(StatusCode::RANGE_NOT_SATISFIABLE)
            .header(header::CONTENT_RANGE, format!("bytes */{}", len))
            .body(Body::empty()),
    };

    response.map_err(internal)
}
