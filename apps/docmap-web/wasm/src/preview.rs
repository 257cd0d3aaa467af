//! Preview rendering: PDFs through the browser's native viewer, images as
//! plain `<img>` tags, failures as inline text.

use docmap_core::{DocmapError, Labels, PreviewKind};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    Document, Element, HtmlAnchorElement, HtmlElement, HtmlEmbedElement, HtmlImageElement,
    Response,
};

use crate::dom;

pub const WRAPPER_CLASS: &str = "file-preview-wrapper";
pub const EMBED_CLASS: &str = "pdf-preview-embed";

/// Fetch a server-stored document to make sure it is reachable before
/// pointing an embed at it. The body is read and discarded.
pub async fn fetch_document(url: &str) -> Result<(), DocmapError> {
    let fetch_failed = |e: JsValue| DocmapError::FetchFailed {
        url: url.to_string(),
        reason: dom::describe_js_error(&e),
    };

    let window = dom::window().map_err(fetch_failed)?;
    let response = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(fetch_failed)?;
    let response: Response = response
        .dyn_into()
        .map_err(|_| fetch_failed(JsValue::from_str("fetch did not return a Response")))?;

    if !response.ok() {
        return Err(DocmapError::HttpStatus {
            url: url.to_string(),
            status: response.status(),
        });
    }

    JsFuture::from(response.blob().map_err(fetch_failed)?)
        .await
        .map_err(fetch_failed)?;
    Ok(())
}

/// Append the viewer for `src` to `container`.
///
/// PDFs from the server also get a download link; local files do not.
pub fn render(
    document: &Document,
    container: &Element,
    kind: PreviewKind,
    src: &str,
    labels: &Labels,
    with_download: bool,
) -> Result<(), JsValue> {
    match kind {
        PreviewKind::Pdf => {
            let holder: HtmlElement = dom::create(document, "div")?;
            let embed = pdf_embed(document, src)?;
            holder.append_child(&embed)?;
            if with_download {
                let link = download_link(document, src, &labels.download)?;
                holder.append_child(&link)?;
            }
            container.append_child(&holder)?;
        }
        PreviewKind::Image => {
            let img = image(document, src, &labels.image_alt)?;
            container.append_child(&img)?;
        }
    }
    Ok(())
}

pub fn render_error(document: &Document, container: &Element, text: &str) -> Result<(), JsValue> {
    let message = dom::error_message(document, text)?;
    container.append_child(&message)?;
    Ok(())
}

fn pdf_embed(document: &Document, src: &str) -> Result<HtmlEmbedElement, JsValue> {
    let embed: HtmlEmbedElement = dom::create(document, "embed")?;
    embed.set_src(src);
    embed.set_type("application/pdf");
    embed.set_class_name(EMBED_CLASS);
    Ok(embed)
}

fn download_link(document: &Document, href: &str, text: &str) -> Result<HtmlElement, JsValue> {
    let p: HtmlElement = dom::create(document, "p")?;
    let link: HtmlAnchorElement = dom::create(document, "a")?;
    link.set_href(href);
    link.set_target("_blank");
    link.set_text_content(Some(text));
    p.append_child(&link)?;
    Ok(p)
}

fn image(document: &Document, src: &str, alt: &str) -> Result<HtmlImageElement, JsValue> {
    let img: HtmlImageElement = dom::create(document, "img")?;
    img.set_src(src);
    img.set_alt(alt);
    dom::set_styles(&img, &[("max-width", "100%"), ("max-height", "400px")])?;
    Ok(img)
}
