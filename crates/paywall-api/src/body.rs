//! # Raw Body Reader
//!
//! Collects a request body into one immutable buffer before anything looks
//! at it. The webhook signature covers the exact bytes on the wire, so the
//! body is never decoded here.

use axum::body::{Body, Bytes};
use paywall_core::WebhookError;

/// Upper bound on a webhook payload
pub const WEBHOOK_BODY_LIMIT: usize = 1024 * 1024;

/// Read the whole body. A stream error or an oversized body is a transport
/// failure; the caller treats it as a missing body.
pub async fn read_raw_body(body: Body, limit: usize) -> Result<Bytes, WebhookError> {
    axum::body::to_bytes(body, limit)
        .await
        .map_err(|e| WebhookError::Transport(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[tokio::test]
    async fn test_preserves_bytes_exactly() {
        let raw: &[u8] = &[b'{', 0xff, 0x00, b' ', b'}', b'\r', b'\n'];
        let bytes = read_raw_body(Body::from(raw.to_vec()), WEBHOOK_BODY_LIMIT)
            .await
            .unwrap();
        assert_eq!(&bytes[..], raw);
    }

    #[tokio::test]
    async fn test_concatenates_chunks_in_order() {
        let chunks = vec![
            Ok::<_, io::Error>(Bytes::from_static(b"{\"type\":")),
            Ok(Bytes::from_static(b"\"foo.bar\"")),
            Ok(Bytes::from_static(b"}")),
        ];
        let body = Body::from_stream(futures::stream::iter(chunks));

        let bytes = read_raw_body(body, WEBHOOK_BODY_LIMIT).await.unwrap();
        assert_eq!(&bytes[..], b"{\"type\":\"foo.bar\"}");
    }

    #[tokio::test]
    async fn test_stream_error_is_transport_error() {
        let chunks = vec![
            Ok(Bytes::from_static(b"{\"type\"")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "peer reset")),
        ];
        let body = Body::from_stream(futures::stream::iter(chunks));

        assert!(matches!(
            read_raw_body(body, WEBHOOK_BODY_LIMIT).await,
            Err(WebhookError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let body = Body::from(vec![b'a'; 64]);
        assert!(matches!(
            read_raw_body(body, 16).await,
            Err(WebhookError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_body() {
        let bytes = read_raw_body(Body::empty(), WEBHOOK_BODY_LIMIT).await.unwrap();
        assert!(bytes.is_empty());
    }
}
