//! Preview source resolution and classification
//!
//! Decides what to show and how, leaving the DOM work to the browser crate.

use serde::Serialize;

use crate::error::DocmapError;

/// How a document is displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PreviewKind {
    /// Native browser PDF viewer via `<embed>`
    Pdf,
    /// Plain `<img>`
    Image,
}

const PDF_MIME: &str = "application/pdf";
const IMAGE_MIMES: [&str; 3] = ["image/png", "image/jpeg", "image/jpg"];
const IMAGE_EXTENSIONS: [&str; 3] = [".png", ".jpg", ".jpeg"];

/// Classify a locally chosen file by its MIME type
pub fn classify_mime(mime: &str) -> Result<PreviewKind, DocmapError> {
    let mime = mime.trim().to_ascii_lowercase();
    if mime == PDF_MIME {
        Ok(PreviewKind::Pdf)
    } else if IMAGE_MIMES.contains(&mime.as_str()) {
        Ok(PreviewKind::Image)
    } else {
        Err(DocmapError::UnsupportedType(if mime.is_empty() {
            "unknown".to_string()
        } else {
            mime
        }))
    }
}

/// Classify a server URL by its path extension.
///
/// Returns `None` when the extension is not one we recognise.
pub fn classify_url(url: &str) -> Option<PreviewKind> {
    let path = url_path(url).to_ascii_lowercase();
    if path.ends_with(".pdf") {
        Some(PreviewKind::Pdf)
    } else if IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        Some(PreviewKind::Image)
    } else {
        None
    }
}

/// Strip query string and fragment
fn url_path(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}

/// Media URL for a path saved on the server
pub fn saved_path_url(media_prefix: &str, saved_path: &str) -> String {
    let prefix = media_prefix.trim_end_matches('/');
    let path = saved_path.trim().trim_start_matches('/');
    format!("{}/{}", prefix, path)
}

/// Append a cache-busting `v` parameter so the browser refetches the file
pub fn versioned_url(url: &str, version: u64) -> String {
    let (base, fragment) = match url.find('#') {
        Some(idx) => url.split_at(idx),
        None => (url, ""),
    };
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{}{}v={}{}", base, separator, version, fragment)
}

/// Where a server-side preview comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewSource {
    /// `saved_pdf_path` query parameter, resolved under the media prefix
    SavedPath { url: String },
    /// `data-pdf-url` attribute on the existing preview element
    DataAttribute { url: String },
}

impl PreviewSource {
    /// Pick the start-up source. A saved path wins, but only when it points
    /// at a PDF; otherwise the data attribute is used if present.
    pub fn resolve(
        media_prefix: &str,
        saved_path: Option<&str>,
        data_url: Option<&str>,
    ) -> Option<Self> {
        let saved = saved_path
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| saved_path_url(media_prefix, p))
            .filter(|url| classify_url(url) == Some(PreviewKind::Pdf));

        if let Some(url) = saved {
            return Some(PreviewSource::SavedPath { url });
        }

        data_url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(|u| PreviewSource::DataAttribute { url: u.to_string() })
    }

    pub fn url(&self) -> &str {
        match self {
            PreviewSource::SavedPath { url } | PreviewSource::DataAttribute { url } => url,
        }
    }

    /// Data attributes without a recognised extension are server documents,
    /// which are PDFs.
    pub fn kind(&self) -> PreviewKind {
        classify_url(self.url()).unwrap_or(PreviewKind::Pdf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_classify_mime() {
        assert_eq!(classify_mime("application/pdf"), Ok(PreviewKind::Pdf));
        assert_eq!(classify_mime("image/png"), Ok(PreviewKind::Image));
        assert_eq!(classify_mime("image/jpeg"), Ok(PreviewKind::Image));
        assert_eq!(classify_mime("image/jpg"), Ok(PreviewKind::Image));
        assert_eq!(classify_mime("IMAGE/PNG"), Ok(PreviewKind::Image));
    }

    #[test]
    fn test_classify_mime_unsupported() {
        assert_eq!(
            classify_mime("image/gif"),
            Err(DocmapError::UnsupportedType("image/gif".to_string()))
        );
        assert_eq!(
            classify_mime(""),
            Err(DocmapError::UnsupportedType("unknown".to_string()))
        );
    }

    #[test]
    fn test_classify_url_ignores_query_and_fragment() {
        assert_eq!(classify_url("/media/a/b.PDF?v=1"), Some(PreviewKind::Pdf));
        assert_eq!(classify_url("/media/scan.jpeg#top"), Some(PreviewKind::Image));
        assert_eq!(classify_url("/media/notes.txt"), None);
        assert_eq!(classify_url("/download?file=x.pdf"), None);
    }

    #[test]
    fn test_saved_path_url_joins_once() {
        assert_eq!(saved_path_url("/media/", "docs/a.pdf"), "/media/docs/a.pdf");
        assert_eq!(saved_path_url("/media", "/docs/a.pdf"), "/media/docs/a.pdf");
    }

    #[test]
    fn test_versioned_url() {
        assert_eq!(versioned_url("/media/a.pdf", 42), "/media/a.pdf?v=42");
        assert_eq!(versioned_url("/media/a.pdf?x=1", 42), "/media/a.pdf?x=1&v=42");
        assert_eq!(versioned_url("/media/a.pdf#page=2", 7), "/media/a.pdf?v=7#page=2");
    }

    #[test]
    fn test_resolve_prefers_saved_pdf() {
        let source = PreviewSource::resolve("/media/", Some("inbox/po.pdf"), Some("/other.pdf"));
        assert_eq!(
            source,
            Some(PreviewSource::SavedPath {
                url: "/media/inbox/po.pdf".to_string()
            })
        );
    }

    #[test]
    fn test_resolve_skips_non_pdf_saved_path() {
        let source = PreviewSource::resolve("/media/", Some("inbox/po.png"), Some("/stored/42"));
        assert_eq!(
            source,
            Some(PreviewSource::DataAttribute {
                url: "/stored/42".to_string()
            })
        );
        assert_eq!(source.unwrap().kind(), PreviewKind::Pdf);
    }

    #[test]
    fn test_resolve_nothing() {
        assert_eq!(PreviewSource::resolve("/media/", None, None), None);
        assert_eq!(PreviewSource::resolve("/media/", Some(" "), Some("")), None);
    }

    #[test]
    fn test_data_attribute_image_kind() {
        let source = PreviewSource::DataAttribute {
            url: "/media/receipt.jpg".to_string(),
        };
        assert_eq!(source.kind(), PreviewKind::Image);
    }
}
