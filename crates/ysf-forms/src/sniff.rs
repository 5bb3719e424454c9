//! MIME type detection for uploaded files.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::debug;

/// Returned when a file's type can not be determined.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Guesses the MIME type of a stored upload.
pub trait MimeSniffer: Send + Sync {
    /// Returns the best guess for the file at `path`, or [`OCTET_STREAM`]
    /// when inconclusive. `extension` is the client filename's extension.
    fn sniff(&self, path: &Path, extension: &str) -> String;
}

/// Sniffs well-known magic numbers, then falls back to the extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct MagicSniffer;

impl MimeSniffer for MagicSniffer {
    fn sniff(&self, path: &Path, extension: &str) -> String {
        match read_head(path) {
            Ok(head) => {
                if let Some(mime) = from_magic(&head) {
                    return mime.to_string();
                }
            }
            Err(err) => debug!(path = %path.display(), %err, "could not read upload for sniffing"),
        }

        mime_guess::from_ext(extension)
            .first_or_octet_stream()
            .to_string()
    }
}

fn read_head(path: &Path) -> std::io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut head = [0u8; 16];
    let n = file.read(&mut head)?;
    Ok(head[..n].to_vec())
}

fn from_magic(head: &[u8]) -> Option<&'static str> {
    const SIGNATURES: &[(&[u8], &str)] = &[
        (b"\x89PNG\r\n\x1a\n", "image/png"),
        (b"\xff\xd8\xff", "image/jpeg"),
        (b"GIF87a", "image/gif"),
        (b"GIF89a", "image/gif"),
        (b"%PDF-", "application/pdf"),
        (b"PK\x03\x04", "application/zip"),
        (b"BM", "image/bmp"),
    ];

    if head.len() >= 12 && &head[..4] == b"RIFF" && &head[8..12] == b"WEBP" {
        return Some("image/webp");
    }

    SIGNATURES
        .iter()
        .find(|(magic, _)| head.starts_with(magic))
        .map(|(_, mime)| *mime)
}
