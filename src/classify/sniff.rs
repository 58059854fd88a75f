//! Extension resolution with content sniffing
//!
//! A file's extension comes from its name when the name has a suffix. For
//! names without one, the first bytes of the file are inspected and the
//! detected media type's subtype becomes the extension token (`image/jpeg`
//! gives `jpeg`, `text/plain` gives `plain`).

use image::ImageFormat;
use log::{trace, warn};
use std::ffi::OsStr;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Number of leading bytes inspected when sniffing
pub const SNIFF_LEN: usize = 8 * 1024;

/// Media type reported for content that matches nothing more specific
pub const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// Media type reported for zero-length files
pub const EMPTY_MEDIA_TYPE: &str = "inode/x-empty";

/// Image formats trusted from `image::guess_format`
///
/// Formats identified by short ASCII prefixes (PNM, HDR, farbfeld) are left
/// out; they misfire on ordinary text.
const SNIFFED_IMAGE_FORMATS: &[ImageFormat] = &[
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Gif,
    ImageFormat::WebP,
    ImageFormat::Tiff,
    ImageFormat::Bmp,
    ImageFormat::Ico,
    ImageFormat::Avif,
];

/// Signatures at a fixed offset: (offset, magic bytes, media type)
const SIGNATURES: &[(usize, &[u8], &str)] = &[
    (0, b"%PDF-", "application/pdf"),
    (0, b"PK\x03\x04", "application/zip"),
    (0, b"PK\x05\x06", "application/zip"),
    (0, b"\x1f\x8b", "application/gzip"),
    (0, b"BZh", "application/x-bzip2"),
    (0, b"\xfd7zXZ\x00", "application/x-xz"),
    (0, b"7z\xbc\xaf\x27\x1c", "application/x-7z-compressed"),
    (0, b"Rar!\x1a\x07", "application/x-rar"),
    (257, b"ustar", "application/x-tar"),
    (0, b"ID3", "audio/mpeg"),
    (0, b"OggS", "audio/ogg"),
    (0, b"fLaC", "audio/flac"),
    (0, b"\x1a\x45\xdf\xa3", "video/x-matroska"),
    (4, b"ftypqt", "video/quicktime"),
    (4, b"ftyp", "video/mp4"),
    (0, b"\x7fELF", "application/x-executable"),
    (0, b"SQLite format 3\x00", "application/vnd.sqlite3"),
];

/// Split a file name into base name and lowercase extension
///
/// The extension is whatever follows the last dot. Names without a dot,
/// dotfiles such as `.bashrc`, and names ending in a dot have no extension;
/// a trailing dot is dropped from the base. The base keeps the original
/// bytes; a suffix that is not valid UTF-8 is left in the base.
pub fn split_file_name(file_name: &OsStr) -> (&OsStr, Option<String>) {
    let path = Path::new(file_name);
    match (path.file_stem(), path.extension().map(OsStr::to_str)) {
        (Some(stem), Some(Some(""))) => (stem, None),
        (Some(stem), Some(Some(ext))) => (stem, Some(ext.to_lowercase())),
        _ => (file_name, None),
    }
}

/// Resolve the extension for a file
///
/// Uses the suffix of `file_name` when present, otherwise sniffs the
/// content at `path`. Returns an empty string only when the file could not
/// be read for sniffing.
pub fn resolve_extension(path: &Path, file_name: &OsStr) -> String {
    if let (_, Some(ext)) = split_file_name(file_name) {
        return ext;
    }

    match sniff_file(path) {
        Ok(media_type) => {
            let token = media_subtype(media_type).to_string();
            trace!(
                "Sniffed {} as {} (extension '{}')",
                path.display(),
                media_type,
                token
            );
            token
        }
        Err(e) => {
            warn!("Could not sniff content of {}: {}", path.display(), e);
            String::new()
        }
    }
}

/// Read the head of a file and detect its media type
pub fn sniff_file(path: &Path) -> std::io::Result<&'static str> {
    let file = File::open(path)?;
    let mut head = Vec::with_capacity(SNIFF_LEN);
    file.take(SNIFF_LEN as u64).read_to_end(&mut head)?;
    Ok(sniff_media_type(&head))
}

/// Detect a media type from the leading bytes of a file
pub fn sniff_media_type(head: &[u8]) -> &'static str {
    if head.is_empty() {
        return EMPTY_MEDIA_TYPE;
    }

    if let Ok(format) = image::guess_format(head) {
        if SNIFFED_IMAGE_FORMATS.contains(&format) {
            return format.to_mime_type();
        }
    }

    for (offset, magic, media_type) in SIGNATURES {
        if head.len() >= offset + magic.len() && &head[*offset..offset + magic.len()] == *magic {
            return *media_type;
        }
    }

    if looks_like_text(head) {
        return "text/plain";
    }

    FALLBACK_MEDIA_TYPE
}

/// Extension token for a media type: `image/jpeg` → `jpeg`
///
/// The subtype is used, except for `audio/mpeg` which would otherwise read
/// as the video extension.
pub fn media_subtype(media_type: &str) -> &str {
    match media_type {
        "audio/mpeg" => "mp3",
        _ => media_type.rsplit('/').next().unwrap_or(media_type),
    }
}

/// UTF-8 without NUL bytes; a multi-byte sequence cut off by the read limit
/// still counts as text.
fn looks_like_text(head: &[u8]) -> bool {
    if head.contains(&0) {
        return false;
    }

    match std::str::from_utf8(head) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none(),
    }
}
