//! Content-type sniffing for downloaded payloads.
//!
//! Payloads carry no declared type, so the storage suffix is inferred from
//! their leading bytes using the WHATWG MIME sniffing signatures.

/// Only this many leading bytes are inspected.
pub const SNIFF_LEN: usize = 512;

/// Byte-pattern signature, optionally masked.
struct Signature {
    /// `None` means the pattern must match exactly.
    mask: Option<&'static [u8]>,
    pattern: &'static [u8],
    /// Leading whitespace is skipped before matching.
    skip_ws: bool,
    content_type: &'static str,
}

impl Signature {
    const fn exact(pattern: &'static [u8], content_type: &'static str) -> Self {
        Self { mask: None, pattern, skip_ws: false, content_type }
    }

    const fn masked(
        mask: &'static [u8],
        pattern: &'static [u8],
        content_type: &'static str,
    ) -> Self {
        Self { mask: Some(mask), pattern, skip_ws: false, content_type }
    }

    fn matches(&self, data: &[u8]) -> bool {
        let data = if self.skip_ws { skip_whitespace(data) } else { data };
        if data.len() < self.pattern.len() {
            return false;
        }
        match self.mask {
            None => data.starts_with(self.pattern),
            Some(mask) => data
                .iter()
                .zip(mask)
                .zip(self.pattern)
                .all(|((byte, mask), expected)| byte & mask == *expected),
        }
    }
}

// ====== SIGNATURES ======

/// HTML tags recognised at the start of a document (upper-case).
const HTML_TAGS: &[&[u8]] = &[
    b"<!DOCTYPE HTML",
    b"<HTML",
    b"<HEAD",
    b"<SCRIPT",
    b"<IFRAME",
    b"<H1",
    b"<DIV",
    b"<FONT",
    b"<TABLE",
    b"<A",
    b"<STYLE",
    b"<TITLE",
    b"<B",
    b"<BODY",
    b"<BR",
    b"<P",
    b"<!--",
];

static SIGNATURES: &[Signature] = &[
    Signature {
        mask: None,
        pattern: b"<?xml",
        skip_ws: true,
        content_type: "text/xml",
    },
    Signature::exact(b"%PDF-", "application/pdf"),
    Signature::exact(b"%!PS-Adobe-", "application/postscript"),
    // Byte order marks
    Signature::exact(b"\xFE\xFF", "text/plain"),
    Signature::exact(b"\xFF\xFE", "text/plain"),
    Signature::exact(b"\xEF\xBB\xBF", "text/plain"),
    // Images
    Signature::exact(b"\x00\x00\x01\x00", "image/x-icon"),
    Signature::exact(b"\x00\x00\x02\x00", "image/x-icon"),
    Signature::exact(b"BM", "image/bmp"),
    Signature::exact(b"GIF87a", "image/gif"),
    Signature::exact(b"GIF89a", "image/gif"),
    Signature::masked(
        b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF\xFF\xFF",
        b"RIFF\x00\x00\x00\x00WEBPVP",
        "image/webp",
    ),
    Signature::exact(b"\x89PNG\x0D\x0A\x1A\x0A", "image/png"),
    Signature::exact(b"\xFF\xD8\xFF", "image/jpeg"),
    // Audio
    Signature::exact(b"ID3", "audio/mpeg"),
    Signature::exact(b"OggS\x00", "application/ogg"),
    Signature::exact(b"fLaC", "audio/flac"),
    // Archives
    Signature::exact(b"\x1F\x8B\x08", "application/x-gzip"),
    Signature::exact(b"PK\x03\x04", "application/zip"),
    Signature::exact(b"Rar!\x1A\x07\x00", "application/x-rar-compressed"),
    Signature::exact(b"Rar!\x1A\x07\x01\x00", "application/x-rar-compressed"),
];

fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b'\t' | b'\n' | b'\x0C' | b'\r' | b' ')
}

fn skip_whitespace(data: &[u8]) -> &[u8] {
    let start = data.iter().position(|b| !is_whitespace(*b)).unwrap_or(data.len());
    &data[start..]
}

/// Case-insensitive HTML tag match, terminated by a space or `>`.
fn is_html(data: &[u8]) -> bool {
    let data = skip_whitespace(data);
    HTML_TAGS.iter().any(|tag| {
        data.len() > tag.len()
            && data[..tag.len()].eq_ignore_ascii_case(tag)
            && matches!(data[tag.len()], b' ' | b'>')
    })
}

/// Bytes that never occur in plain text.
fn is_binary(byte: u8) -> bool {
    matches!(byte, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}

/// Sniff the content type of a payload from its leading bytes.
///
/// Returns a bare `type/subtype` without parameters, or `None` when the
/// content is empty or matches no known signature.
pub fn sniff_content_type(data: &[u8]) -> Option<&'static str> {
    let data = &data[..data.len().min(SNIFF_LEN)];
    if data.is_empty() {
        return None;
    }

    if is_html(data) {
        return Some("text/html");
    }

    if let Some(sig) = SIGNATURES.iter().find(|sig| sig.matches(data)) {
        return Some(sig.content_type);
    }

    if !data.iter().copied().any(is_binary) {
        return Some("text/plain");
    }

    None
}

/// Derive a file suffix (including the leading dot) from a content type.
///
/// `image/png` becomes `.png`. A type without `/`, or one with more than
/// two segments whose first segment is not `image`, is used whole. No type
/// yields an empty suffix.
pub fn suffix_for_content_type(content_type: Option<&str>) -> String {
    let content_type = match content_type {
        Some(ct) if !ct.is_empty() => ct,
        _ => return String::new(),
    };

    let segments: Vec<&str> = content_type.split('/').collect();
    match segments.as_slice() {
        [_] => format!(".{}", content_type),
        [first, ..] if segments.len() > 2 && *first != "image" => format!(".{}", content_type),
        [_, subtype, ..] => format!(".{}", subtype),
        [] => String::new(),
    }
}

/// Sniff a payload and derive its storage suffix.
pub fn derive_suffix(data: &[u8]) -> String {
    suffix_for_content_type(sniff_content_type(data))
}
