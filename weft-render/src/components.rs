//! The HTML component tree produced by layouts. Components serialize
//! themselves to markup and, for input components, parse submitted raw
//! strings back into typed slot values through their bound converter.

use serde::{Deserialize, Serialize};

use crate::converters::Converter;
use crate::error::RenderResult;
use crate::model::MetaSlotKey;
use crate::value::Value;

/// Ties an input component to the slot it edits and the converter fixed at
/// render time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputBinding {
    pub target: MetaSlotKey,
    pub converter: Converter,
}

impl InputBinding {
    pub fn new(target: MetaSlotKey, converter: Converter) -> Self {
        InputBinding { target, converter }
    }

    pub fn field_name(&self) -> String {
        self.target.field_name()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HtmlText {
    pub text: String,
    /// Unescaped fragments are reserved for markup produced by the
    /// framework itself.
    pub escaped: bool,
}

impl HtmlText {
    pub fn new(text: &str) -> Self {
        HtmlText {
            text: text.to_string(),
            escaped: true,
        }
    }

    pub fn raw(text: &str) -> Self {
        HtmlText {
            text: text.to_string(),
            escaped: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HtmlBlock {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<HtmlComponent>,
}

impl HtmlBlock {
    pub fn new(tag: &str) -> Self {
        HtmlBlock {
            tag: tag.to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.push((name.to_string(), value.to_string()));
        self
    }

    pub fn add_child(&mut self, child: HtmlComponent) {
        self.children.push(child);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HtmlTextInput {
    pub binding: InputBinding,
    pub value: String,
    pub size: Option<u32>,
    pub max_length: Option<usize>,
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HtmlHiddenField {
    pub name: String,
    pub value: String,
    /// Present when the hidden field carries a slot value; absent for
    /// framework bookkeeping fields.
    pub binding: Option<InputBinding>,
}

impl HtmlHiddenField {
    pub fn bookkeeping(name: &str, value: &str) -> Self {
        HtmlHiddenField {
            name: name.to_string(),
            value: value.to_string(),
            binding: None,
        }
    }

    pub fn bound(binding: InputBinding, value: &str) -> Self {
        HtmlHiddenField {
            name: binding.field_name(),
            value: value.to_string(),
            binding: Some(binding),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HtmlCheckBox {
    pub binding: InputBinding,
    pub checked: bool,
    /// `None` renders a boolean checkbox (submitted = true); `Some` makes
    /// this box one member of a value group folding into a list.
    pub user_value: Option<String>,
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HtmlRadioButton {
    pub binding: InputBinding,
    pub user_value: String,
    pub checked: bool,
    /// Optional label text rendered next to the button in a span.
    pub text: Option<String>,
}

impl HtmlRadioButton {
    /// Check this button iff the assigned serialized value matches its own
    /// user value.
    pub fn reconcile(&mut self, value: &str) {
        self.checked = self.user_value == value;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HtmlMenuOption {
    pub key: String,
    pub label: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HtmlMenu {
    pub binding: InputBinding,
    /// Title of the leading "no value" option; hidden when `None`.
    pub default_title: Option<String>,
    pub options: Vec<HtmlMenuOption>,
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HtmlList {
    pub ordered: bool,
    pub items: Vec<HtmlComponent>,
    pub item_classes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HtmlTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<HtmlComponent>>,
    pub classes: Option<String>,
}

/// A node of the rendered component tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HtmlComponent {
    Text(HtmlText),
    Block(HtmlBlock),
    TextInput(HtmlTextInput),
    Hidden(HtmlHiddenField),
    CheckBox(HtmlCheckBox),
    RadioButton(HtmlRadioButton),
    Menu(HtmlMenu),
    List(HtmlList),
    Table(HtmlTable),
}

impl HtmlComponent {
    /// The slot binding, for input components.
    pub fn binding(&self) -> Option<&InputBinding> {
        match self {
            HtmlComponent::TextInput(input) => Some(&input.binding),
            HtmlComponent::Hidden(hidden) => hidden.binding.as_ref(),
            HtmlComponent::CheckBox(checkbox) => Some(&checkbox.binding),
            HtmlComponent::RadioButton(radio) => Some(&radio.binding),
            HtmlComponent::Menu(menu) => Some(&menu.binding),
            _ => None,
        }
    }

    /// Depth-first visit of every input component in document order.
    pub fn walk_inputs<'a>(&'a self, visit: &mut dyn FnMut(&'a HtmlComponent)) {
        match self {
            HtmlComponent::Block(block) => {
                for child in &block.children {
                    child.walk_inputs(visit);
                }
            }
            HtmlComponent::List(list) => {
                for item in &list.items {
                    item.walk_inputs(visit);
                }
            }
            HtmlComponent::Table(table) => {
                for row in &table.rows {
                    for cell in row {
                        cell.walk_inputs(visit);
                    }
                }
            }
            HtmlComponent::Text(_) => {}
            _ => {
                if self.binding().is_some() {
                    visit(self);
                }
            }
        }
    }

    /// Parse the raw strings submitted under this component's field name
    /// into a typed value. Unchecked checkboxes and unselected radio groups
    /// submit nothing, so `raws` may be empty.
    pub fn read_submitted(&self, raws: &[String]) -> RenderResult<Value> {
        let field;
        let converter;
        match self {
            HtmlComponent::TextInput(input) => {
                field = input.binding.field_name();
                converter = &input.binding.converter;
            }
            HtmlComponent::Menu(menu) => {
                field = menu.binding.field_name();
                converter = &menu.binding.converter;
            }
            HtmlComponent::RadioButton(radio) => {
                let raw = raws.first().map(String::as_str).unwrap_or("");
                return radio.binding.converter.convert(&radio.binding.field_name(), raw);
            }
            HtmlComponent::CheckBox(checkbox) => {
                return match &checkbox.user_value {
                    // Boolean checkbox: presence means true.
                    None => Ok(Value::Bool(!raws.is_empty())),
                    Some(_) => {
                        let field = checkbox.binding.field_name();
                        let mut items = Vec::with_capacity(raws.len());
                        for raw in raws {
                            items.push(checkbox.binding.converter.convert(&field, raw)?);
                        }
                        Ok(Value::List(items))
                    }
                };
            }
            HtmlComponent::Hidden(hidden) => {
                let Some(binding) = &hidden.binding else {
                    return Ok(Value::Null);
                };
                field = binding.field_name();
                converter = &binding.converter;
            }
            _ => return Ok(Value::Null),
        }
        let raw = raws.first().map(String::as_str).unwrap_or("");
        converter.convert(&field, raw)
    }

    /// Serialize this component (and its subtree) to markup.
    pub fn render(&self, out: &mut String) {
        match self {
            HtmlComponent::Text(text) => {
                if text.escaped {
                    out.push_str(&escape_text(&text.text));
                } else {
                    out.push_str(&text.text);
                }
            }
            HtmlComponent::Block(block) => {
                out.push('<');
                out.push_str(&block.tag);
                for (name, value) in &block.attributes {
                    push_attribute(out, name, value);
                }
                out.push('>');
                for child in &block.children {
                    child.render(out);
                }
                out.push_str("</");
                out.push_str(&block.tag);
                out.push('>');
            }
            HtmlComponent::TextInput(input) => {
                out.push_str("<input type=\"text\"");
                push_attribute(out, "name", &input.binding.field_name());
                push_attribute(out, "value", &input.value);
                if let Some(size) = input.size {
                    push_attribute(out, "size", &size.to_string());
                }
                if let Some(max) = input.max_length {
                    push_attribute(out, "maxlength", &max.to_string());
                }
                if input.disabled {
                    out.push_str(" disabled");
                }
                out.push_str("/>");
            }
            HtmlComponent::Hidden(hidden) => {
                out.push_str("<input type=\"hidden\"");
                push_attribute(out, "name", &hidden.name);
                push_attribute(out, "value", &hidden.value);
                out.push_str("/>");
            }
            HtmlComponent::CheckBox(checkbox) => {
                out.push_str("<input type=\"checkbox\"");
                push_attribute(out, "name", &checkbox.binding.field_name());
                push_attribute(
                    out,
                    "value",
                    checkbox.user_value.as_deref().unwrap_or("true"),
                );
                if checkbox.checked {
                    out.push_str(" checked");
                }
                if checkbox.disabled {
                    out.push_str(" disabled");
                }
                out.push_str("/>");
            }
            HtmlComponent::RadioButton(radio) => {
                if radio.text.is_some() {
                    out.push_str("<span>");
                }
                out.push_str("<input type=\"radio\"");
                push_attribute(out, "name", &radio.binding.field_name());
                push_attribute(out, "value", &radio.user_value);
                if radio.checked {
                    out.push_str(" checked");
                }
                out.push_str("/>");
                if let Some(text) = &radio.text {
                    out.push_str(&escape_text(text));
                    out.push_str("</span>");
                }
            }
            HtmlComponent::Menu(menu) => {
                out.push_str("<select");
                push_attribute(out, "name", &menu.binding.field_name());
                if menu.disabled {
                    out.push_str(" disabled");
                }
                out.push('>');
                if let Some(title) = &menu.default_title {
                    let selected = !menu.options.iter().any(|option| option.selected);
                    out.push_str("<option value=\"\"");
                    if selected {
                        out.push_str(" selected");
                    }
                    out.push('>');
                    out.push_str(&escape_text(title));
                    out.push_str("</option>");
                }
                for option in &menu.options {
                    out.push_str("<option");
                    push_attribute(out, "value", &option.key);
                    if option.selected {
                        out.push_str(" selected");
                    }
                    out.push('>');
                    out.push_str(&escape_text(&option.label));
                    out.push_str("</option>");
                }
                out.push_str("</select>");
            }
            HtmlComponent::List(list) => {
                let tag = if list.ordered { "ol" } else { "ul" };
                out.push('<');
                out.push_str(tag);
                out.push('>');
                for item in &list.items {
                    out.push_str("<li");
                    if let Some(classes) = &list.item_classes {
                        push_attribute(out, "class", classes);
                    }
                    out.push('>');
                    item.render(out);
                    out.push_str("</li>");
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            HtmlComponent::Table(table) => {
                out.push_str("<table");
                if let Some(classes) = &table.classes {
                    push_attribute(out, "class", classes);
                }
                out.push('>');
                if !table.headers.is_empty() {
                    out.push_str("<tr>");
                    for header in &table.headers {
                        out.push_str("<th>");
                        out.push_str(&escape_text(header));
                        out.push_str("</th>");
                    }
                    out.push_str("</tr>");
                }
                for row in &table.rows {
                    out.push_str("<tr>");
                    for cell in row {
                        out.push_str("<td>");
                        cell.render(out);
                        out.push_str("</td>");
                    }
                    out.push_str("</tr>");
                }
                out.push_str("</table>");
            }
        }
    }

    pub fn render_to_string(&self) -> String {
        let mut out = String::new();
        self.render(&mut out);
        out
    }
}

fn push_attribute(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&escape_attribute(value));
    out.push('"');
}

pub fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
