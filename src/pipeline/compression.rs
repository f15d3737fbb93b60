//! Response compression.
//!
//! Negotiates a content coding from `Accept-Encoding` against the offered
//! list and compresses the final body. Cookies are attached after this
//! stage, so they are never part of the compressed payload.

use std::io::{self, Write};

use axum::http::{header, HeaderValue, Method, StatusCode};
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;

use crate::config::CompressionConfig;
use crate::pipeline::context::ResponseDraft;

/// Supported content codings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Gzip,
    Deflate,
}

impl Encoding {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "gzip" | "x-gzip" => Some(Encoding::Gzip),
            "deflate" => Some(Encoding::Deflate),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Gzip => "gzip",
            Encoding::Deflate => "deflate",
        }
    }

    pub fn encode(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        match self {
            Encoding::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(data)?;
                encoder.finish()
            }
            Encoding::Deflate => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(data)?;
                encoder.finish()
            }
        }
    }
}

fn compressible(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence.starts_with("text/")
        || essence.ends_with("json")
        || essence.ends_with("javascript")
        || essence.ends_with("xml")
        || essence == "image/svg+xml"
}

/// Parsed `Accept-Encoding` entry.
struct Accepted<'a> {
    coding: &'a str,
    q: f32,
}

fn parse_accept_encoding(header: &str) -> Vec<Accepted<'_>> {
    header
        .split(',')
        .filter_map(|item| {
            let mut parts = item.split(';');
            let coding = parts.next()?.trim();
            if coding.is_empty() {
                return None;
            }
            let q = parts
                .filter_map(|p| p.trim().strip_prefix("q="))
                .find_map(|q| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0);
            Some(Accepted { coding, q })
        })
        .collect()
}

/// Compresses response bodies for clients that accept it.
#[derive(Debug, Clone)]
pub struct CompressionEncoder {
    enabled: bool,
    offered: Vec<Encoding>,
    min_size: usize,
}

impl CompressionEncoder {
    pub fn new(offered: Vec<Encoding>, min_size: usize) -> Self {
        Self {
            enabled: !offered.is_empty(),
            offered,
            min_size,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            offered: Vec::new(),
            min_size: 0,
        }
    }

    pub fn from_config(config: &CompressionConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }
        let offered = config
            .encodings
            .iter()
            .filter_map(|token| {
                let encoding = Encoding::from_token(token);
                if encoding.is_none() {
                    tracing::warn!(encoding = %token, "Ignoring unknown compression encoding");
                }
                encoding
            })
            .collect();
        Self::new(offered, config.min_size)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Best offered encoding for an `Accept-Encoding` value.
    ///
    /// Highest q wins; ties go to the server's preference order. `*` stands
    /// for any offered encoding the client did not name, and `q=0` refuses.
    pub fn negotiate(&self, accept: Option<&str>) -> Option<Encoding> {
        let accepted = parse_accept_encoding(accept?);
        let wildcard = accepted.iter().find(|a| a.coding == "*").map(|a| a.q);

        let mut best: Option<(Encoding, f32)> = None;
        for encoding in &self.offered {
            let q = accepted
                .iter()
                .find(|a| Encoding::from_token(a.coding) == Some(*encoding))
                .map(|a| a.q)
                .or(wildcard);
            let Some(q) = q.filter(|q| *q > 0.0) else {
                continue;
            };
            if best.map_or(true, |(_, best_q)| q > best_q) {
                best = Some((*encoding, q));
            }
        }
        best.map(|(encoding, _)| encoding)
    }

    /// Compress `draft` in place when the request and response allow it.
    pub fn apply(&self, method: &Method, accept: Option<&str>, draft: &mut ResponseDraft) {
        if !self.enabled
            || *method == Method::HEAD
            || draft.body.len() < self.min_size
            || draft.status == StatusCode::NO_CONTENT
            || draft.status == StatusCode::NOT_MODIFIED
            || draft.headers.contains_key(header::CONTENT_ENCODING)
        {
            return;
        }
        let is_compressible = draft
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(compressible);
        if !is_compressible {
            return;
        }

        // Every compressible response varies by encoding, compressed or not.
        draft
            .headers
            .append(header::VARY, HeaderValue::from_static("accept-encoding"));

        let Some(encoding) = self.negotiate(accept) else {
            return;
        };
        match encoding.encode(&draft.body) {
            Ok(compressed) => {
                tracing::trace!(
                    encoding = encoding.as_str(),
                    original = draft.body.len(),
                    compressed = compressed.len(),
                    "Compressed response body"
                );
                draft.body = compressed.into();
                draft.headers.insert(
                    header::CONTENT_ENCODING,
                    HeaderValue::from_static(encoding.as_str()),
                );
                draft.headers.remove(header::CONTENT_LENGTH);
            }
            Err(e) => {
                tracing::warn!(error = %e, encoding = encoding.as_str(), "Compression failed, sending identity body");
            }
        }
    }
}
