//! Form enhancer: ties the preview renderer and the mapping editor to the
//! upload form.
//!
//! Every render request bumps a generation counter. A fetch that completes
//! after a newer request was made is ignored, so a slow response for an old
//! file never overwrites the preview of the current one.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use docmap_core::{
    classify_mime, versioned_url, CanonicalKeys, DocmapError, EnhancerConfig, PreviewSource,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, Event, File, HtmlElement, HtmlInputElement, Url};

use crate::dom;
use crate::editor::{EditorSettings, MappingEditor};
use crate::preview::{self, WRAPPER_CLASS};

const EXISTING_WRAPPER_ID: &str = "existingWrapper";

struct EnhancerState {
    config: EnhancerConfig,
    options: CanonicalKeys,
    document: Document,
    file_input: Option<HtmlInputElement>,
    existing_preview: Option<Element>,
    preview_container: HtmlElement,
    editor: Option<MappingEditor>,
    generation: u64,
    object_url: Option<String>,
}

impl EnhancerState {
    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn editor_settings(&self) -> EditorSettings {
        EditorSettings {
            options: self.options.clone(),
            labels: self.config.labels.clone(),
            target_selector: self.config.target_field_selector.clone(),
        }
    }

    /// Replace any current editor with a fresh one inside `container`,
    /// prefilled from the form's mapping field
    fn attach_editor(&mut self, container: &Element) -> Result<(), JsValue> {
        self.editor = None;
        let prefill = dom::query(&self.document, &self.config.prefill_field_selector)
            .and_then(|field| dom::read_field(&field))
            .unwrap_or_default();
        let editor = MappingEditor::from_prefill(container, &prefill, self.editor_settings())?;
        self.editor = Some(editor);
        Ok(())
    }

    fn clear_previews(&mut self) -> Result<(), JsValue> {
        self.editor = None;
        self.preview_container.set_inner_html("");
        self.revoke_object_url();
        self.clear_existing()
    }

    /// Empty the existing preview element, sparing the preview container
    /// when it was mounted there
    fn clear_existing(&self) -> Result<(), JsValue> {
        match &self.existing_preview {
            Some(existing) => dom::clear_children_except(existing, &self.preview_container),
            None => Ok(()),
        }
    }

    fn revoke_object_url(&mut self) {
        if let Some(url) = self.object_url.take() {
            let _ = Url::revoke_object_url(&url);
        }
    }

    /// Show what a server fetch produced
    fn finish_server_preview(
        &mut self,
        source: &PreviewSource,
        fetched: Result<(), DocmapError>,
    ) -> Result<(), JsValue> {
        let document = self.document.clone();
        let labels = self.config.labels.clone();

        match (source, fetched) {
            (PreviewSource::SavedPath { .. }, Ok(())) => {
                let src = versioned_url(source.url(), dom::now_millis());
                let container: Element = self.preview_container.clone().into();
                container.set_inner_html("");
                preview::render(&document, &container, source.kind(), &src, &labels, true)?;
                self.attach_editor(&container)
            }
            (PreviewSource::DataAttribute { .. }, Ok(())) => {
                let existing = match &self.existing_preview {
                    Some(existing) => existing.clone(),
                    None => return Ok(()),
                };
                let src = versioned_url(source.url(), dom::now_millis());
                self.clear_existing()?;
                let wrapper = document.create_element("div")?;
                wrapper.set_class_name(WRAPPER_CLASS);
                wrapper.set_id(EXISTING_WRAPPER_ID);
                existing.append_child(&wrapper)?;
                preview::render(&document, &wrapper, source.kind(), &src, &labels, true)?;
                self.attach_editor(&wrapper)
            }
            (PreviewSource::SavedPath { .. }, Err(e)) => {
                web_sys::console::error_2(&"PDF preview failed:".into(), &e.to_string().into());
                self.preview_container.set_inner_html("");
                preview::render_error(
                    &document,
                    &self.preview_container,
                    &labels.saved_path_failed,
                )
            }
            (PreviewSource::DataAttribute { .. }, Err(e)) => {
                web_sys::console::error_2(&"PDF preview error:".into(), &e.to_string().into());
                match &self.existing_preview {
                    Some(existing) => {
                        self.clear_existing()?;
                        preview::render_error(&document, existing, &labels.existing_preview_failed)
                    }
                    None => Ok(()),
                }
            }
        }
    }

    /// Preview a file the user just picked
    fn show_local_file(&mut self, file: &File) -> Result<(), JsValue> {
        self.next_generation();
        self.clear_previews()?;

        let document = self.document.clone();
        let container: Element = self.preview_container.clone().into();

        match classify_mime(&file.type_()) {
            Ok(kind) => {
                let url = Url::create_object_url_with_blob(file)?;
                self.object_url = Some(url.clone());
                preview::render(&document, &container, kind, &url, &self.config.labels, false)?;
                self.attach_editor(&container)
            }
            Err(e) => {
                web_sys::console::warn_1(&e.to_string().into());
                preview::render_error(&document, &container, &self.config.labels.unsupported_type)
            }
        }
    }
}

/// Upload-form enhancer: preview plus mapping editor
///
/// Freeing the handle detaches the file input listener and removes the
/// preview container along with the editor. Pages that construct one directly must keep it alive for as long
/// as the form is shown; `attachFormEnhancer` holds its own instance for the
/// lifetime of the page instead.
#[wasm_bindgen]
pub struct FormEnhancer {
    state: Rc<RefCell<EnhancerState>>,
    on_change: Option<Closure<dyn FnMut(Event)>>,
}

impl FormEnhancer {
    pub fn with_config(config: EnhancerConfig) -> Result<Self, JsValue> {
        config
            .validate()
            .map_err(|e| JsValue::from_str(&e.to_string()))?;

        let window = dom::window()?;
        let document = dom::document()?;

        let options = match &config.options {
            Some(options) => options.clone(),
            None => dom::global_options(&window, &config.options_global),
        };

        let file_input = dom::query(&document, &config.file_input_selector)
            .and_then(|el| el.dyn_into::<HtmlInputElement>().ok());
        if file_input.is_none() {
            web_sys::console::warn_1(
                &format!("File input {} not found", config.file_input_selector).into(),
            );
        }
        let existing_preview = dom::query(&document, &config.existing_preview_selector);

        let preview_container: HtmlElement = dom::create(&document, "div")?;
        preview_container.class_list().add_1(WRAPPER_CLASS)?;

        Ok(Self {
            state: Rc::new(RefCell::new(EnhancerState {
                config,
                options,
                document,
                file_input,
                existing_preview,
                preview_container,
                editor: None,
                generation: 0,
                object_url: None,
            })),
            on_change: None,
        })
    }

    /// Place the preview container after the file input's flex container,
    /// after the file input itself, or inside the existing preview element
    fn mount_container(&self) -> Result<(), JsValue> {
        let state = self.state.borrow();
        let container: &Element = &state.preview_container;

        if let Some(input) = &state.file_input {
            if let Some(flex) = input.closest(&state.config.flex_container_selector)? {
                if dom::insert_after(&flex, container)? {
                    return Ok(());
                }
            }
            if dom::insert_after(input, container)? {
                return Ok(());
            }
        }
        if let Some(existing) = &state.existing_preview {
            existing.append_child(container)?;
        }
        Ok(())
    }

    /// Start-up source, if any: saved path query parameter, then the
    /// existing preview's data attribute
    fn initial_source(&self) -> Result<Option<PreviewSource>, JsValue> {
        let state = self.state.borrow();
        let window = dom::window()?;
        let saved_path = dom::query_param(&window, &state.config.saved_path_param);
        let data_url = state
            .existing_preview
            .as_ref()
            .and_then(|el| el.dyn_ref::<HtmlElement>())
            .and_then(|el| el.dataset().get("pdfUrl"));
        Ok(PreviewSource::resolve(
            &state.config.media_prefix,
            saved_path.as_deref(),
            data_url.as_deref(),
        ))
    }

    fn bind_file_input(&mut self) -> Result<(), JsValue> {
        let input = match self.state.borrow().file_input.clone() {
            Some(input) => input,
            None => return Ok(()),
        };

        let weak = Rc::downgrade(&self.state);
        let on_change = Closure::wrap(Box::new(move |_event: Event| {
            handle_file_change(&weak);
        }) as Box<dyn FnMut(Event)>);
        input.add_event_listener_with_callback("change", on_change.as_ref().unchecked_ref())?;
        self.on_change = Some(on_change);
        Ok(())
    }

    pub fn generation(&self) -> u64 {
        self.state.borrow().generation
    }

    /// Object URL backing the current local preview, if any
    pub fn object_url(&self) -> Option<String> {
        self.state.borrow().object_url.clone()
    }
}

#[wasm_bindgen]
impl FormEnhancer {
    /// Create an enhancer; `config` is an optional object of overrides
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<FormEnhancer, JsValue> {
        Self::with_config(config_from_js(config)?)
    }

    /// Insert the preview container, show any stored document and start
    /// listening for file selections
    pub fn start(&mut self) -> Result<(), JsValue> {
        self.state.borrow_mut().clear_previews()?;
        self.mount_container()?;

        if let Some(source) = self.initial_source()? {
            show_server_source(&self.state, source);
        }

        if self.on_change.is_none() {
            self.bind_file_input()?;
        }
        Ok(())
    }

    /// Preview a file directly, as if it had been picked in the file input
    #[wasm_bindgen(js_name = previewFile)]
    pub fn preview_file(&self, file: &File) -> Result<(), JsValue> {
        self.state.borrow_mut().show_local_file(file)
    }

    /// Save the current mapping. Returns the status text, or `None` when no
    /// editor is shown.
    #[wasm_bindgen(js_name = saveMapping)]
    pub fn save_mapping(&self) -> Result<Option<String>, JsValue> {
        let state = self.state.borrow();
        match &state.editor {
            Some(editor) => editor.save().map(Some),
            None => Ok(None),
        }
    }

    #[wasm_bindgen(js_name = hasEditor)]
    pub fn has_editor(&self) -> bool {
        self.state.borrow().editor.is_some()
    }
}

impl Drop for FormEnhancer {
    fn drop(&mut self) {
        let Ok(mut state) = self.state.try_borrow_mut() else {
            return;
        };
        if let (Some(input), Some(on_change)) = (&state.file_input, &self.on_change) {
            let _ = input
                .remove_event_listener_with_callback("change", on_change.as_ref().unchecked_ref());
        }
        state.editor = None;
        state.revoke_object_url();
        state.preview_container.remove();
    }
}

/// Accepts nothing, an overrides object, or the same overrides as a JSON
/// string (e.g. read from a `data-` attribute)
fn config_from_js(config: JsValue) -> Result<EnhancerConfig, JsValue> {
    if config.is_undefined() || config.is_null() {
        return Ok(EnhancerConfig::default());
    }
    if let Some(json) = config.as_string() {
        return EnhancerConfig::from_json(&json).map_err(|e| JsValue::from_str(&e.to_string()));
    }
    serde_wasm_bindgen::from_value(config)
        .map_err(|e| JsValue::from_str(&format!("Invalid configuration: {}", e)))
}

fn handle_file_change(state: &Weak<RefCell<EnhancerState>>) {
    let Some(state) = state.upgrade() else {
        return;
    };
    let file = state
        .borrow()
        .file_input
        .as_ref()
        .and_then(|input| input.files())
        .and_then(|files| files.get(0));
    let Some(file) = file else {
        return;
    };
    let shown = state.borrow_mut().show_local_file(&file);
    if let Err(e) = shown {
        web_sys::console::error_2(&"File preview failed:".into(), &e);
    }
}

/// Fetch a server document and render it unless a newer request superseded
/// this one in the meantime
fn show_server_source(state: &Rc<RefCell<EnhancerState>>, source: PreviewSource) {
    let generation = state.borrow_mut().next_generation();
    let weak = Rc::downgrade(state);

    wasm_bindgen_futures::spawn_local(async move {
        let fetched = preview::fetch_document(source.url()).await;

        let Some(state) = weak.upgrade() else {
            return;
        };
        let mut state = state.borrow_mut();
        if state.generation != generation {
            web_sys::console::log_1(
                &format!("Discarding stale preview for {}", source.url()).into(),
            );
            return;
        }
        if let Err(e) = state.finish_server_preview(&source, fetched) {
            web_sys::console::error_2(&"Preview rendering failed:".into(), &e);
        }
    });
}

thread_local! {
    static ATTACHED: RefCell<Option<FormEnhancer>> = const { RefCell::new(None) };
}

/// Build and start an enhancer once the document has finished parsing.
///
/// The enhancer stays attached until the page unloads or
/// `detachFormEnhancer` is called; attaching again replaces it.
#[wasm_bindgen(js_name = attachFormEnhancer)]
pub async fn attach_form_enhancer(config: JsValue) -> Result<(), JsValue> {
    let config = config_from_js(config)?;
    let document = dom::document()?;

    if document.ready_state() == "loading" {
        wasm_bindgen_futures::JsFuture::from(dom_content_loaded(&document)).await?;
    }

    detach_form_enhancer();
    let mut enhancer = FormEnhancer::with_config(config)?;
    enhancer.start()?;
    ATTACHED.with(|attached| *attached.borrow_mut() = Some(enhancer));
    Ok(())
}

/// Tear down the enhancer installed by `attachFormEnhancer`, if any
#[wasm_bindgen(js_name = detachFormEnhancer)]
pub fn detach_form_enhancer() {
    let previous = ATTACHED.with(|attached| attached.borrow_mut().take());
    drop(previous);
}

/// Run `f` against the enhancer installed by `attachFormEnhancer`
pub fn with_attached<R>(f: impl FnOnce(&FormEnhancer) -> R) -> Option<R> {
    ATTACHED.with(|attached| attached.borrow().as_ref().map(f))
}

fn dom_content_loaded(document: &Document) -> js_sys::Promise {
    let document = document.clone();
    js_sys::Promise::new(&mut move |resolve, _reject| {
        let onload = Closure::once(Box::new(move |_event: Event| {
            let _ = resolve.call0(&JsValue::NULL);
        }) as Box<dyn FnOnce(_)>);
        let _ = document.add_event_listener_with_callback(
            "DOMContentLoaded",
            onload.as_ref().unchecked_ref(),
        );
        onload.forget();
    })
}

#[cfg(test)]
#[cfg(target_arch = "wasm32")]
mod wasm_tests {
    use super::*;
    use docmap_core::Labels;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn config(prefix: &str) -> EnhancerConfig {
        EnhancerConfig {
            file_input_selector: format!("#{}-document", prefix),
            existing_preview_selector: format!("#{}-existing", prefix),
            prefill_field_selector: format!("#{}-extra", prefix),
            target_field_selector: format!("#{}-extra", prefix),
            options: Some(CanonicalKeys::new(["description", "price"])),
            ..EnhancerConfig::default()
        }
    }

    fn form(prefix: &str, prefill: &str) -> Element {
        let document = dom::document().unwrap();
        let form = document.create_element("form").unwrap();
        form.set_inner_html(&format!(
            r#"<div class="flex-container"><input type="file" id="{p}-document"></div>
               <div id="{p}-existing"></div>
               <textarea id="{p}-extra" name="extra_data">{prefill}</textarea>"#,
            p = prefix,
            prefill = prefill
        ));
        document.body().unwrap().append_child(&form).unwrap();
        form
    }

    /// Same form with `data-pdf-url` on the existing preview and, when
    /// `with_input` is false, no file input at all
    fn stored_form(prefix: &str, with_input: bool) -> Element {
        let document = dom::document().unwrap();
        let form = document.create_element("form").unwrap();
        let input = if with_input {
            format!(
                r#"<div class="flex-container"><input type="file" id="{}-document"></div>"#,
                prefix
            )
        } else {
            String::new()
        };
        form.set_inner_html(&format!(
            r#"{input}
               <div id="{p}-existing" data-pdf-url="/missing-{p}-0000.pdf"></div>
               <textarea id="{p}-extra" name="extra_data"></textarea>"#,
            input = input,
            p = prefix
        ));
        document.body().unwrap().append_child(&form).unwrap();
        form
    }

    /// Wait long enough for a fetch against the test server to settle
    async fn settle() {
        let promise = js_sys::Promise::new(&mut |resolve, _reject| {
            dom::window()
                .unwrap()
                .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, 1000)
                .unwrap();
        });
        wasm_bindgen_futures::JsFuture::from(promise).await.unwrap();
    }

    fn blob_file(name: &str, mime: &str) -> File {
        let parts = js_sys::Array::of1(&JsValue::from_str("%PDF-1.7"));
        let options = web_sys::FilePropertyBag::new();
        options.set_type(mime);
        File::new_with_str_sequence_and_options(&parts, name, &options).unwrap()
    }

    #[wasm_bindgen_test]
    fn test_container_follows_flex_container() {
        let form = form("mount", "");
        let mut enhancer = FormEnhancer::with_config(config("mount")).unwrap();
        enhancer.start().unwrap();
        let flex = form.query_selector(".flex-container").unwrap().unwrap();
        let next = flex.next_element_sibling().unwrap();
        assert!(next.class_list().contains(WRAPPER_CLASS));
    }

    #[wasm_bindgen_test]
    fn test_local_pdf_gets_editor_with_prefill() {
        let form = form("local", r#"{"Item": "description"}"#);
        let mut enhancer = FormEnhancer::with_config(config("local")).unwrap();
        enhancer.start().unwrap();
        enhancer
            .preview_file(&blob_file("po.pdf", "application/pdf"))
            .unwrap();

        assert!(enhancer.has_editor());
        assert!(form.query_selector("embed").unwrap().is_some());
        let input: HtmlInputElement = form
            .query_selector(".input-row input")
            .unwrap()
            .unwrap()
            .dyn_into()
            .unwrap();
        assert_eq!(input.value(), "Item");
    }

    #[wasm_bindgen_test]
    fn test_unsupported_file_shows_error_and_no_editor() {
        let form = form("unsupported", "");
        let mut enhancer = FormEnhancer::with_config(config("unsupported")).unwrap();
        enhancer.start().unwrap();
        enhancer
            .preview_file(&blob_file("notes.txt", "text/plain"))
            .unwrap();

        assert!(!enhancer.has_editor());
        let error = form.query_selector(".preview-error").unwrap().unwrap();
        assert_eq!(error.text_content().unwrap(), Labels::default().unsupported_type);
    }

    #[wasm_bindgen_test]
    fn test_new_file_replaces_editor_and_bumps_generation() {
        let form = form("replace", "");
        let mut enhancer = FormEnhancer::with_config(config("replace")).unwrap();
        enhancer.start().unwrap();
        let before = enhancer.generation();
        enhancer.preview_file(&blob_file("a.png", "image/png")).unwrap();
        enhancer.preview_file(&blob_file("b.pdf", "application/pdf")).unwrap();

        assert!(enhancer.generation() >= before + 2);
        assert_eq!(form.query_selector_all("#dynamicInputSection").unwrap().length(), 1);
        assert!(form.query_selector("img").unwrap().is_none());
    }

    #[wasm_bindgen_test]
    fn test_save_mapping_through_enhancer() {
        let form = form("persist", r#"{"Item": "description", "Item ": "price"}"#);
        let mut enhancer = FormEnhancer::with_config(config("persist")).unwrap();
        enhancer.start().unwrap();
        assert_eq!(enhancer.save_mapping().unwrap(), None);

        enhancer
            .preview_file(&blob_file("po.pdf", "application/pdf"))
            .unwrap();
        let status = enhancer.save_mapping().unwrap();
        assert_eq!(status.as_deref(), Some("✅ Mapping set in extra_data"));

        let field: web_sys::HtmlTextAreaElement = form
            .query_selector("textarea")
            .unwrap()
            .unwrap()
            .dyn_into()
            .unwrap();
        assert_eq!(
            field.value(),
            "{\n  \"Item\": \"description\",\n  \"Item_2\": \"price\"\n}"
        );
    }

    #[wasm_bindgen_test]
    fn test_config_from_undefined_is_default() {
        let config = config_from_js(JsValue::UNDEFINED).unwrap();
        assert_eq!(config, EnhancerConfig::default());
    }

    #[wasm_bindgen_test]
    fn test_config_from_json_string() {
        let config = config_from_js(JsValue::from_str(r#"{"mediaPrefix": "/files/"}"#)).unwrap();
        assert_eq!(config.media_prefix, "/files/");
        assert!(config_from_js(JsValue::from_str(r#"{"targetFieldSelector": ""}"#)).is_err());
    }

    #[wasm_bindgen_test]
    async fn test_missing_stored_document_shows_error() {
        let form = stored_form("failing", true);
        let mut enhancer = FormEnhancer::with_config(config("failing")).unwrap();
        enhancer.start().unwrap();
        settle().await;

        let existing = form.query_selector("#failing-existing").unwrap().unwrap();
        let error = existing.query_selector(".preview-error").unwrap().unwrap();
        assert_eq!(error.text_content().unwrap(), Labels::default().existing_preview_failed);
        assert!(!enhancer.has_editor());
    }

    #[wasm_bindgen_test]
    async fn test_late_fetch_does_not_replace_local_preview() {
        let form = stored_form("stale", true);
        let mut enhancer = FormEnhancer::with_config(config("stale")).unwrap();
        enhancer.start().unwrap();
        enhancer
            .preview_file(&blob_file("po.pdf", "application/pdf"))
            .unwrap();
        settle().await;

        assert!(form.query_selector(".preview-error").unwrap().is_none());
        assert!(form.query_selector("embed").unwrap().is_some());
        assert!(enhancer.has_editor());
        assert_eq!(form.query_selector_all("#dynamicInputSection").unwrap().length(), 1);
    }

    #[wasm_bindgen_test]
    async fn test_next_file_revokes_previous_object_url() {
        let _form = form("revoke", "");
        let mut enhancer = FormEnhancer::with_config(config("revoke")).unwrap();
        enhancer.start().unwrap();

        enhancer.preview_file(&blob_file("a.pdf", "application/pdf")).unwrap();
        let first = enhancer.object_url().unwrap();
        enhancer.preview_file(&blob_file("b.pdf", "application/pdf")).unwrap();
        let second = enhancer.object_url().unwrap();

        assert_ne!(first, second);
        assert!(preview::fetch_document(&first).await.is_err());
        assert!(preview::fetch_document(&second).await.is_ok());
    }

    #[wasm_bindgen_test]
    async fn test_container_inside_existing_preview_survives_errors() {
        let form = stored_form("nested", false);
        let mut enhancer = FormEnhancer::with_config(config("nested")).unwrap();
        enhancer.start().unwrap();
        settle().await;

        let existing = form.query_selector("#nested-existing").unwrap().unwrap();
        assert!(existing.query_selector(".preview-error").unwrap().is_some());
        let container = existing.query_selector(&format!(".{}", WRAPPER_CLASS)).unwrap();
        assert!(container.is_some());

        enhancer
            .preview_file(&blob_file("po.pdf", "application/pdf"))
            .unwrap();
        assert!(existing.query_selector(".preview-error").unwrap().is_none());
        assert!(existing.query_selector("embed").unwrap().is_some());
        assert!(enhancer.has_editor());
    }

    #[wasm_bindgen_test]
    async fn test_attached_enhancer_outlives_the_call() {
        let form = form("attached", r#"{"Item": "price"}"#);
        let config = serde_wasm_bindgen::to_value(&config("attached")).unwrap();
        attach_form_enhancer(config).await.unwrap();

        let shown = with_attached(|enhancer| {
            enhancer.preview_file(&blob_file("po.pdf", "application/pdf"))
        });
        assert!(matches!(shown, Some(Ok(()))));
        assert_eq!(with_attached(FormEnhancer::has_editor), Some(true));
        assert!(form.query_selector("#dynamicInputSection").unwrap().is_some());

        detach_form_enhancer();
        assert!(with_attached(FormEnhancer::has_editor).is_none());
        assert!(form.query_selector("#dynamicInputSection").unwrap().is_none());
    }
}
