//! Line framing for streamed HTTP bodies.
//!
//! Network chunks do not align with protocol records: a JSON object or an
//! SSE `data:` line may be split across chunks, or several may arrive in one.

use async_stream::try_stream;
use docchat_core::{AppError, AppResult};
use futures::{Stream, StreamExt};

/// Re-frame a byte stream into trimmed, non-empty text lines.
pub(crate) fn lines<S, B, E>(bytes: S) -> impl Stream<Item = AppResult<String>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: std::fmt::Display + Send,
{
    try_stream! {
        let mut buffer: Vec<u8> = Vec::new();
        futures::pin_mut!(bytes);

        while let Some(chunk) = bytes.next().await {
            let chunk = chunk.map_err(|e| AppError::Llm(format!("Stream error: {}", e)))?;
            buffer.extend_from_slice(chunk.as_ref());

            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = buffer.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&raw).trim().to_string();
                if !line.is_empty() {
                    yield line;
                }
            }
        }

        let rest = String::from_utf8_lossy(&buffer).trim().to_string();
        if !rest.is_empty() {
            yield rest;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = Result<&'static [u8], String>> {
        futures::stream::iter(
            parts
                .iter()
                .map(|p| Ok::<_, String>(p.as_bytes()))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn test_lines_split_across_chunks() {
        let framed: Vec<String> = lines(chunks(&["{\"a\":", "1}\n{\"b\"", ":2}\n"]))
            .map(|l| l.unwrap())
            .collect()
            .await;
        assert_eq!(framed, vec!["{\"a\":1}", "{\"b\":2}"]);
    }

    #[tokio::test]
    async fn test_lines_many_per_chunk_and_trailing() {
        let framed: Vec<String> = lines(chunks(&["one\n\ntwo\nthr", "ee"]))
            .map(|l| l.unwrap())
            .collect()
            .await;
        assert_eq!(framed, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_lines_multibyte_split() {
        let text = "주택 청약\n";
        let bytes = text.as_bytes();
        let (head, tail) = bytes.split_at(4);
        let head: &'static [u8] = Box::leak(head.to_vec().into_boxed_slice());
        let tail: &'static [u8] = Box::leak(tail.to_vec().into_boxed_slice());
        let source = futures::stream::iter(vec![Ok::<_, String>(head), Ok(tail)]);

        let framed: Vec<String> = lines(source).map(|l| l.unwrap()).collect().await;
        assert_eq!(framed, vec!["주택 청약"]);
    }

    #[tokio::test]
    async fn test_lines_transport_error() {
        let source = futures::stream::iter(vec![
            Ok::<&'static [u8], String>(b"ok\n"),
            Err("connection reset".to_string()),
        ]);
        let framed: Vec<AppResult<String>> = lines(source).collect().await;
        assert_eq!(framed.len(), 2);
        assert!(framed[1].is_err());
    }
}
