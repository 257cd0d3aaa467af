//! Mapping editor component
//!
//! Renders `div#dynamicInputSection` with one row per mapping entry and the
//! add/save controls. Each editor owns its rows and the click handlers bound
//! to its own buttons; dropping the editor removes its section and releases
//! the handlers.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use docmap_core::{rows_for_prefill, CanonicalKeys, Labels, Mapping, RowDraft, SaveStatus};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    Document, Element, HtmlButtonElement, HtmlElement, HtmlInputElement, HtmlOptionElement,
    HtmlSelectElement, MouseEvent, Node,
};

use crate::dom;

pub const SECTION_ID: &str = "dynamicInputSection";

type ClickHandler = Closure<dyn FnMut(MouseEvent)>;

/// What an editor needs besides its container and rows
#[derive(Debug, Clone, Default)]
pub struct EditorSettings {
    pub options: CanonicalKeys,
    pub labels: Labels,
    /// Selector of the field Save writes into
    pub target_selector: String,
}

struct RowView {
    id: u32,
    element: HtmlElement,
    input: HtmlInputElement,
    select: HtmlSelectElement,
    _on_delete: ClickHandler,
}

impl RowView {
    fn draft(&self) -> RowDraft {
        RowDraft::new(self.input.value(), self.select.value())
    }
}

struct EditorState {
    document: Document,
    settings: EditorSettings,
    section: HtmlElement,
    controls: HtmlElement,
    status: HtmlElement,
    rows: Vec<RowView>,
    next_row_id: u32,
}

impl EditorState {
    fn build_row(state: &Rc<RefCell<EditorState>>, draft: &RowDraft) -> Result<(), JsValue> {
        let (document, id) = {
            let mut s = state.borrow_mut();
            let id = s.next_row_id;
            s.next_row_id += 1;
            (s.document.clone(), id)
        };

        let row: HtmlElement = dom::create(&document, "div")?;
        row.set_class_name("input-row");

        let input: HtmlInputElement = dom::create(&document, "input")?;
        input.set_type("text");
        input.set_name(&format!("field_{}", id));
        input.set_class_name("text-field");
        input.set_value(&draft.key);

        let select: HtmlSelectElement = dom::create(&document, "select")?;
        select.set_name(&format!("dropdown_{}", id));
        select.set_class_name("dropdown-field");

        let delete: HtmlButtonElement = dom::create(&document, "button")?;
        delete.set_type("button");
        delete.set_class_name("deleteRowBtn btn btn-sm btn-danger");
        delete.set_attribute("aria-label", "Delete row")?;
        dom::set_styles(
            &delete,
            &[
                ("margin-left", "10px"),
                ("border", "0"),
                ("background", "none"),
                ("cursor", "pointer"),
            ],
        )?;
        let icon = document.create_element("i")?;
        icon.set_class_name("fas fa-trash-alt");
        delete.append_child(&icon)?;

        {
            let s = state.borrow();
            input.set_placeholder(&s.settings.labels.key_placeholder);

            let prompt = HtmlOptionElement::new_with_text_and_value(
                &s.settings.labels.select_prompt,
                "",
            )?;
            select.append_child(&prompt)?;
            for key in s.settings.options.iter() {
                let option = HtmlOptionElement::new_with_text_and_value(key, key)?;
                select.append_child(&option)?;
            }
            select.set_value(draft.selection(&s.settings.options).unwrap_or(""));
        }

        row.append_child(&input)?;
        row.append_child(&select)?;
        row.append_child(&delete)?;

        let weak = Rc::downgrade(state);
        let on_delete = Closure::wrap(Box::new(move |_event: MouseEvent| {
            if let Some(state) = weak.upgrade() {
                state.borrow_mut().remove_row(id);
            }
        }) as Box<dyn FnMut(MouseEvent)>);
        delete.add_event_listener_with_callback("click", on_delete.as_ref().unchecked_ref())?;

        let mut s = state.borrow_mut();
        let controls: &Node = &s.controls;
        s.section.insert_before(&row, Some(controls))?;
        s.rows.push(RowView {
            id,
            element: row,
            input,
            select,
            _on_delete: on_delete,
        });

        Ok(())
    }

    fn remove_row(&mut self, id: u32) -> bool {
        match self.rows.iter().position(|row| row.id == id) {
            Some(index) => {
                let row = self.rows.remove(index);
                row.element.remove();
                true
            }
            None => false,
        }
    }

    fn drafts(&self) -> Vec<RowDraft> {
        self.rows.iter().map(RowView::draft).collect()
    }

    fn save(&self) -> Result<SaveStatus, JsValue> {
        let json = Mapping::from_rows(&self.drafts())
            .to_json_pretty()
            .map_err(|e| JsValue::from_str(&e.to_string()))?;

        let written = dom::query(&self.document, &self.settings.target_selector)
            .map(|field| dom::write_field(&field, &json))
            .unwrap_or(false);

        let status = if written {
            SaveStatus::Saved
        } else {
            web_sys::console::warn_1(
                &format!(
                    "Mapping not saved: no writable field matches {}",
                    self.settings.target_selector
                )
                .into(),
            );
            SaveStatus::TargetMissing
        };
        self.status
            .set_text_content(Some(status.message(&self.settings.labels)));
        Ok(status)
    }
}

/// Editable list of (key, canonical key) rows attached to a container
#[wasm_bindgen]
pub struct MappingEditor {
    state: Rc<RefCell<EditorState>>,
    _on_add: ClickHandler,
    _on_save: ClickHandler,
}

impl MappingEditor {
    /// Build the editor inside `container` with one row per draft, or a
    /// single blank row when `rows` is empty
    pub fn attach(
        container: &Element,
        rows: Vec<RowDraft>,
        settings: EditorSettings,
    ) -> Result<Self, JsValue> {
        let document = dom::document()?;

        let section: HtmlElement = dom::create(&document, "div")?;
        section.set_id(SECTION_ID);

        let heading: HtmlElement = dom::create(&document, "h4")?;
        heading.set_text_content(Some(settings.labels.heading.as_str()));
        dom::set_styles(
            &heading,
            &[
                ("padding-left", "0"),
                ("margin-bottom", "10px"),
                ("margin-top", "20px"),
                ("font-weight", "bold"),
                ("font-size", "15px"),
            ],
        )?;
        section.append_child(&heading)?;

        let controls: HtmlElement = dom::create(&document, "div")?;
        dom::set_styles(&controls, &[("margin-top", "10px")])?;

        let add: HtmlButtonElement = dom::create(&document, "button")?;
        add.set_type("button");
        add.set_id("addInputBtn");
        add.set_class_name("btn btn-sm btn-secondary button");
        add.set_text_content(Some(settings.labels.add_row.as_str()));

        let save: HtmlButtonElement = dom::create(&document, "button")?;
        save.set_type("button");
        save.set_id("saveMappingBtn");
        save.set_class_name("btn btn-sm btn-secondary button");
        save.set_text_content(Some(settings.labels.save.as_str()));
        dom::set_styles(&save, &[("margin-left", "10px")])?;

        let status: HtmlElement = dom::create(&document, "span")?;
        status.set_id("saveStatus");
        dom::set_styles(&status, &[("margin-left", "10px"), ("color", "green")])?;

        controls.append_child(&add)?;
        controls.append_child(&save)?;
        controls.append_child(&status)?;
        section.append_child(&controls)?;

        let state = Rc::new(RefCell::new(EditorState {
            document,
            settings,
            section: section.clone(),
            controls,
            status,
            rows: Vec::new(),
            next_row_id: 0,
        }));

        for draft in docmap_core::initial_rows(rows) {
            EditorState::build_row(&state, &draft)?;
        }

        let on_add = click_handler(Rc::downgrade(&state), |state| {
            EditorState::build_row(&state, &RowDraft::blank())
        });
        add.add_event_listener_with_callback("click", on_add.as_ref().unchecked_ref())?;

        let on_save = click_handler(Rc::downgrade(&state), |state| {
            let saved = state.borrow().save();
            saved.map(|_| ())
        });
        save.add_event_listener_with_callback("click", on_save.as_ref().unchecked_ref())?;

        container.append_child(&section)?;

        Ok(Self {
            state,
            _on_add: on_add,
            _on_save: on_save,
        })
    }

    /// Like [`MappingEditor::attach`], starting from a saved JSON blob.
    /// A blob that does not parse is logged and treated as empty.
    pub fn from_prefill(
        container: &Element,
        prefill_json: &str,
        settings: EditorSettings,
    ) -> Result<Self, JsValue> {
        let (rows, warning) = rows_for_prefill(prefill_json);
        if let Some(e) = warning {
            web_sys::console::warn_2(
                &"Couldn't parse extra_data JSON".into(),
                &e.to_string().into(),
            );
        }
        Self::attach(container, rows, settings)
    }

    /// Current rows in display order
    pub fn rows(&self) -> Vec<RowDraft> {
        self.state.borrow().drafts()
    }

    pub fn save_status(&self) -> Result<SaveStatus, JsValue> {
        self.state.borrow().save()
    }

    pub fn section(&self) -> HtmlElement {
        self.state.borrow().section.clone()
    }
}

#[wasm_bindgen]
impl MappingEditor {
    /// Create an editor inside `container`
    ///
    /// `options` is an array of allowed values; `targetSelector` defaults to
    /// `#id_extra_data`.
    #[wasm_bindgen(constructor)]
    pub fn new(
        container: &Element,
        prefill_json: &str,
        options: JsValue,
        target_selector: Option<String>,
    ) -> Result<MappingEditor, JsValue> {
        let options: Vec<String> = if options.is_undefined() || options.is_null() {
            Vec::new()
        } else {
            serde_wasm_bindgen::from_value(options)
                .map_err(|e| JsValue::from_str(&format!("Invalid options: {}", e)))?
        };
        let defaults = docmap_core::EnhancerConfig::default();
        let settings = EditorSettings {
            options: CanonicalKeys::new(options),
            labels: defaults.labels,
            target_selector: target_selector.unwrap_or(defaults.target_field_selector),
        };
        Self::from_prefill(container, prefill_json, settings)
    }

    /// Append a blank row before the controls
    #[wasm_bindgen(js_name = addRow)]
    pub fn add_row(&self) -> Result<(), JsValue> {
        EditorState::build_row(&self.state, &RowDraft::blank())
    }

    /// Remove the row at `index` (display order)
    #[wasm_bindgen(js_name = deleteRow)]
    pub fn delete_row(&self, index: usize) -> Result<(), JsValue> {
        let mut state = self.state.borrow_mut();
        let id = state
            .rows
            .get(index)
            .map(|row| row.id)
            .ok_or_else(|| JsValue::from_str("Row index out of bounds"))?;
        state.remove_row(id);
        Ok(())
    }

    /// Write the mapping into the target field and return the status text
    pub fn save(&self) -> Result<String, JsValue> {
        let state = self.state.borrow();
        let status = state.save()?;
        Ok(status.message(&state.settings.labels).to_string())
    }

    #[wasm_bindgen(js_name = rowCount)]
    pub fn row_count(&self) -> usize {
        self.state.borrow().rows.len()
    }

    /// The JSON a save would write, without writing it
    #[wasm_bindgen(js_name = currentMapping)]
    pub fn current_mapping(&self) -> Result<String, JsValue> {
        Mapping::from_rows(&self.rows())
            .to_json_pretty()
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

impl Drop for MappingEditor {
    fn drop(&mut self) {
        if let Ok(state) = self.state.try_borrow() {
            state.section.remove();
        }
    }
}

fn click_handler<F>(state: Weak<RefCell<EditorState>>, action: F) -> ClickHandler
where
    F: Fn(Rc<RefCell<EditorState>>) -> Result<(), JsValue> + 'static,
{
    Closure::wrap(Box::new(move |_event: MouseEvent| {
        if let Some(state) = state.upgrade() {
            if let Err(e) = action(state) {
                web_sys::console::error_2(&"Mapping editor action failed:".into(), &e);
            }
        }
    }) as Box<dyn FnMut(MouseEvent)>)
}
