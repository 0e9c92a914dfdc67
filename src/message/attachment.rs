use std::path::{Path, PathBuf};

use mime::Mime;

/// A file attached to a [`Message`](super::Message)
///
/// Only the path is recorded when the attachment is added. The file is read
/// while the message is being streamed, so a missing file is reported at send
/// time and does not prevent the rest of the message from being delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    name: String,
    path: PathBuf,
    content_type: Mime,
}

impl Attachment {
    /// Creates an attachment named after the file name of `path`
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::named(path, name)
    }

    /// Creates an attachment with an explicit display name (with extension)
    pub fn named<P: Into<PathBuf>, N: Into<String>>(path: P, name: N) -> Self {
        let name = name.into();
        let content_type = guess_content_type(&name);
        Attachment {
            name,
            path: path.into(),
            content_type,
        }
    }

    /// Overrides the content type guessed from the name
    pub fn content_type(mut self, content_type: Mime) -> Self {
        self.content_type = content_type;
        self
    }

    /// Display name, used in `name=` and `filename=` parameters
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Content type of the file
    pub fn mime(&self) -> &Mime {
        &self.content_type
    }
}

fn guess_content_type(name: &str) -> Mime {
    let extension = Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase());

    match extension.as_deref() {
        Some("txt") => mime::TEXT_PLAIN,
        Some("htm" | "html") => mime::TEXT_HTML,
        Some("css") => mime::TEXT_CSS,
        Some("csv") => mime::TEXT_CSV,
        Some("xml") => mime::TEXT_XML,
        Some("js") => mime::TEXT_JAVASCRIPT,
        Some("json") => mime::APPLICATION_JSON,
        Some("pdf") => mime::APPLICATION_PDF,
        Some("png") => mime::IMAGE_PNG,
        Some("jpg" | "jpeg") => mime::IMAGE_JPEG,
        Some("gif") => mime::IMAGE_GIF,
        Some("bmp") => mime::IMAGE_BMP,
        Some("svg") => mime::IMAGE_SVG,
        Some(other) => other_content_type(other),
        None => mime::APPLICATION_OCTET_STREAM,
    }
}

fn other_content_type(extension: &str) -> Mime {
    let essence = match extension {
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "doc" => "application/msword",
        "xls" => "application/vnd.ms-excel",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        _ => return mime::APPLICATION_OCTET_STREAM,
    };
    essence.parse().unwrap_or(mime::APPLICATION_OCTET_STREAM)
}
