//! Renderers and layouts. A renderer is a configuration-bound object whose
//! settable properties come from the matched registry binding; it produces
//! a layout for the target, and the layout produces the component tree. A
//! fresh layout is built for every render pass.

use std::sync::Arc;

use crate::components::{
    HtmlBlock, HtmlCheckBox, HtmlComponent, HtmlHiddenField, HtmlList, HtmlMenu, HtmlMenuOption,
    HtmlRadioButton, HtmlTable, HtmlText, HtmlTextInput, InputBinding,
};
use crate::context::{RenderContext, RenderMode};
use crate::converters::{Converter, MenuOption};
use crate::error::{RenderError, RenderResult};
use crate::model::{MetaObject, MetaSlot};
use crate::value::{DomainObject, Value};

/// What a renderer has been asked to present.
#[derive(Clone, Copy)]
pub enum RenderTarget<'a> {
    Object(&'a MetaObject),
    Slot(&'a MetaObject, &'a MetaSlot),
    Value(&'a Value),
}

/// Produces the component tree for one target. Layout objects are single
/// use: iterating layouts consume their sequence while building.
pub trait Layout {
    fn create(
        &mut self,
        ctx: &mut RenderContext<'_>,
        target: RenderTarget<'_>,
    ) -> RenderResult<HtmlComponent>;

    /// Applied to the finished component (css classes and the like).
    fn apply_style(&self, _component: &mut HtmlComponent) {}
}

/// A configuration-bound rendering strategy.
pub trait Renderer: Send + Sync {
    /// Apply a configured property by name. Returns false for an unknown
    /// property so the registry can log it.
    fn set_property(&mut self, name: &str, value: &str) -> bool;

    /// Build the single-use layout for this pass.
    fn layout(&self) -> Box<dyn Layout + '_>;

    fn render(
        &self,
        ctx: &mut RenderContext<'_>,
        target: RenderTarget<'_>,
    ) -> RenderResult<HtmlComponent> {
        let mut layout = self.layout();
        let mut component = layout.create(ctx, target)?;
        layout.apply_style(&mut component);
        Ok(component)
    }
}

/// Enumerates the possible values of a selection slot.
pub trait DataProvider: Send + Sync {
    fn provide(&self, object: &dyn DomainObject, current: &Value) -> Vec<MenuOption>;
}

/// All renderer constructors available to configuration by class name.
pub fn builtin_renderers() -> Vec<(&'static str, fn() -> Box<dyn Renderer>)> {
    vec![
        ("value", || Box::new(ValueRenderer)),
        ("integer", || Box::new(IntegerRenderer::default())),
        ("decimal", || Box::new(DecimalRenderer::default())),
        ("string-input", || Box::new(StringInputRenderer::default())),
        ("boolean-input", || Box::new(BooleanInputRenderer::default())),
        ("standard-object", || {
            Box::new(StandardObjectRenderer::default())
        }),
        ("list", || Box::new(ListRenderer::default())),
        ("menu-option-list", || {
            Box::new(MenuOptionListRenderer::default())
        }),
        ("radio-option-list", || {
            Box::new(RadioOptionListRenderer::default())
        }),
        ("tabular", || Box::new(TabularRenderer::default())),
    ]
}

/// Render a meta object through the registry, with an optional call-level
/// layout name.
pub fn render_object(
    ctx: &mut RenderContext<'_>,
    meta: &MetaObject,
    layout: Option<&str>,
) -> RenderResult<HtmlComponent> {
    let kit = ctx.kit;
    let renderer = kit.find_renderer(ctx.mode, meta.type_name(), layout, ctx.types)?;
    renderer.render(ctx, RenderTarget::Object(meta))
}

/// Render one slot. Hidden slots become bound hidden fields; read-only
/// slots are presented in output mode even inside an input form.
pub fn render_slot(
    ctx: &mut RenderContext<'_>,
    meta: &MetaObject,
    slot: &MetaSlot,
) -> RenderResult<HtmlComponent> {
    if slot.hidden {
        let serialized = slot.converter().serialize(slot.value());
        return Ok(HtmlComponent::Hidden(HtmlHiddenField::bound(
            InputBinding::new(slot.key().clone(), slot.converter().clone()),
            &serialized,
        )));
    }

    let mode = if ctx.mode == RenderMode::Input && slot.read_only {
        RenderMode::Output
    } else {
        ctx.mode
    };

    let kit = ctx.kit;
    let renderer = kit.find_renderer(mode, slot.kind().type_name(), slot.layout.as_deref(), ctx.types)?;
    let saved = ctx.mode;
    ctx.mode = mode;
    let result = renderer.render(ctx, RenderTarget::Slot(meta, slot));
    ctx.mode = saved;
    result
}

/// Render a bare value (list elements, table cells).
pub fn render_value(
    ctx: &mut RenderContext<'_>,
    value: &Value,
    layout: Option<&str>,
) -> RenderResult<HtmlComponent> {
    let Some(kind) = value.kind() else {
        return Ok(HtmlComponent::Text(HtmlText::new("")));
    };
    let kit = ctx.kit;
    let renderer = kit.find_renderer(ctx.mode, kind.type_name(), layout, ctx.types)?;
    renderer.render(ctx, RenderTarget::Value(value))
}

fn parse_flag(value: &str) -> bool {
    value == "true"
}

fn target_slot<'a>(target: RenderTarget<'a>, renderer: &str) -> RenderResult<(&'a MetaObject, &'a MetaSlot)> {
    match target {
        RenderTarget::Slot(meta, slot) => Ok((meta, slot)),
        _ => Err(RenderError::Configuration(format!(
            "renderer '{}' presents slots only",
            renderer
        ))),
    }
}

// ─── value ───────────────────────────────────────────────────────────────────

/// Plain text presentation of a value through its converter.
pub struct ValueRenderer;

struct ValueLayout;

impl Layout for ValueLayout {
    fn create(
        &mut self,
        _ctx: &mut RenderContext<'_>,
        target: RenderTarget<'_>,
    ) -> RenderResult<HtmlComponent> {
        let text = match target {
            RenderTarget::Slot(_, slot) => slot.converter().serialize(slot.value()),
            RenderTarget::Value(value) => match value.kind() {
                Some(kind) => Converter::default_for(kind).serialize(value),
                None => String::new(),
            },
            RenderTarget::Object(_) => {
                return Err(RenderError::Configuration(
                    "renderer 'value' presents slots and values only".to_string(),
                ))
            }
        };
        Ok(HtmlComponent::Text(HtmlText::new(&text)))
    }
}

impl Renderer for ValueRenderer {
    fn set_property(&mut self, _name: &str, _value: &str) -> bool {
        false
    }

    fn layout(&self) -> Box<dyn Layout + '_> {
        Box::new(ValueLayout)
    }
}

// ─── integer ─────────────────────────────────────────────────────────────────

/// Integer presentation with a configurable base.
pub struct IntegerRenderer {
    base: u32,
}

impl Default for IntegerRenderer {
    fn default() -> Self {
        IntegerRenderer { base: 10 }
    }
}

struct IntegerLayout<'r> {
    renderer: &'r IntegerRenderer,
}

impl Layout for IntegerLayout<'_> {
    fn create(
        &mut self,
        _ctx: &mut RenderContext<'_>,
        target: RenderTarget<'_>,
    ) -> RenderResult<HtmlComponent> {
        let value = match target {
            RenderTarget::Slot(_, slot) => slot.value().clone(),
            RenderTarget::Value(value) => value.clone(),
            RenderTarget::Object(_) => {
                return Err(RenderError::Configuration(
                    "renderer 'integer' presents slots and values only".to_string(),
                ))
            }
        };
        let text = match value {
            Value::Int(i) => match self.renderer.base {
                2 => format!("{:b}", i),
                8 => format!("{:o}", i),
                16 => format!("{:x}", i),
                _ => i.to_string(),
            },
            Value::Null => String::new(),
            other => Converter::Text.serialize(&other),
        };
        Ok(HtmlComponent::Text(HtmlText::new(&text)))
    }
}

impl Renderer for IntegerRenderer {
    fn set_property(&mut self, name: &str, value: &str) -> bool {
        match name {
            "base" => {
                if let Ok(base) = value.parse() {
                    self.base = base;
                }
                true
            }
            _ => false,
        }
    }

    fn layout(&self) -> Box<dyn Layout + '_> {
        Box::new(IntegerLayout { renderer: self })
    }
}

// ─── decimal ─────────────────────────────────────────────────────────────────

/// Decimal presentation; the format pattern's fraction part sets the
/// number of digits (e.g. "0.00" prints two).
pub struct DecimalRenderer {
    format: String,
}

impl Default for DecimalRenderer {
    fn default() -> Self {
        DecimalRenderer {
            format: "0.00".to_string(),
        }
    }
}

impl DecimalRenderer {
    fn fraction_digits(&self) -> usize {
        self.format
            .rsplit_once('.')
            .map(|(_, fraction)| fraction.len())
            .unwrap_or(0)
    }
}

struct DecimalLayout<'r> {
    renderer: &'r DecimalRenderer,
}

impl Layout for DecimalLayout<'_> {
    fn create(
        &mut self,
        _ctx: &mut RenderContext<'_>,
        target: RenderTarget<'_>,
    ) -> RenderResult<HtmlComponent> {
        let value = match target {
            RenderTarget::Slot(_, slot) => slot.value().clone(),
            RenderTarget::Value(value) => value.clone(),
            RenderTarget::Object(_) => {
                return Err(RenderError::Configuration(
                    "renderer 'decimal' presents slots and values only".to_string(),
                ))
            }
        };
        let text = match value {
            Value::Decimal(d) => format!("{:.*}", self.renderer.fraction_digits(), d),
            Value::Int(i) => format!("{:.*}", self.renderer.fraction_digits(), i as f64),
            Value::Null => String::new(),
            other => Converter::Text.serialize(&other),
        };
        Ok(HtmlComponent::Text(HtmlText::new(&text)))
    }
}

impl Renderer for DecimalRenderer {
    fn set_property(&mut self, name: &str, value: &str) -> bool {
        match name {
            "format" => {
                self.format = value.to_string();
                true
            }
            _ => false,
        }
    }

    fn layout(&self) -> Box<dyn Layout + '_> {
        Box::new(DecimalLayout { renderer: self })
    }
}

// ─── string-input ────────────────────────────────────────────────────────────

/// Standard string input: a text field bound to the slot.
#[derive(Default)]
pub struct StringInputRenderer {
    size: Option<u32>,
    max_length: Option<usize>,
    disabled: bool,
}

struct StringInputLayout<'r> {
    renderer: &'r StringInputRenderer,
}

impl Layout for StringInputLayout<'_> {
    fn create(
        &mut self,
        _ctx: &mut RenderContext<'_>,
        target: RenderTarget<'_>,
    ) -> RenderResult<HtmlComponent> {
        let (_, slot) = target_slot(target, "string-input")?;
        Ok(HtmlComponent::TextInput(HtmlTextInput {
            binding: InputBinding::new(slot.key().clone(), slot.converter().clone()),
            value: slot.converter().serialize(slot.value()),
            size: self.renderer.size,
            max_length: self.renderer.max_length,
            disabled: self.renderer.disabled,
        }))
    }
}

impl Renderer for StringInputRenderer {
    fn set_property(&mut self, name: &str, value: &str) -> bool {
        match name {
            "size" => {
                self.size = value.parse().ok();
                true
            }
            "max-length" => {
                self.max_length = value.parse().ok();
                true
            }
            "disabled" => {
                self.disabled = parse_flag(value);
                true
            }
            _ => false,
        }
    }

    fn layout(&self) -> Box<dyn Layout + '_> {
        Box::new(StringInputLayout { renderer: self })
    }
}

// ─── boolean-input ───────────────────────────────────────────────────────────

/// Boolean input: a checkbox checked from the slot's value.
#[derive(Default)]
pub struct BooleanInputRenderer {
    disabled: bool,
}

struct BooleanInputLayout<'r> {
    renderer: &'r BooleanInputRenderer,
}

impl Layout for BooleanInputLayout<'_> {
    fn create(
        &mut self,
        _ctx: &mut RenderContext<'_>,
        target: RenderTarget<'_>,
    ) -> RenderResult<HtmlComponent> {
        let (_, slot) = target_slot(target, "boolean-input")?;
        Ok(HtmlComponent::CheckBox(HtmlCheckBox {
            binding: InputBinding::new(slot.key().clone(), slot.converter().clone()),
            checked: slot.value().as_bool().unwrap_or(false),
            user_value: None,
            disabled: self.renderer.disabled,
        }))
    }
}

impl Renderer for BooleanInputRenderer {
    fn set_property(&mut self, name: &str, value: &str) -> bool {
        match name {
            "disabled" => {
                self.disabled = parse_flag(value);
                true
            }
            _ => false,
        }
    }

    fn layout(&self) -> Box<dyn Layout + '_> {
        Box::new(BooleanInputLayout { renderer: self })
    }
}

// ─── standard-object ─────────────────────────────────────────────────────────

/// Default object presentation: one labeled row per visible slot, with
/// per-slot error annotations after a failed submission.
#[derive(Default)]
pub struct StandardObjectRenderer {
    classes: Option<String>,
}

struct StandardObjectLayout<'r> {
    renderer: &'r StandardObjectRenderer,
}

impl Layout for StandardObjectLayout<'_> {
    fn create(
        &mut self,
        ctx: &mut RenderContext<'_>,
        target: RenderTarget<'_>,
    ) -> RenderResult<HtmlComponent> {
        let RenderTarget::Object(meta) = target else {
            return Err(RenderError::Configuration(
                "renderer 'standard-object' presents objects only".to_string(),
            ));
        };

        let mut block = HtmlBlock::new("div");
        if let Some(classes) = &self.renderer.classes {
            block = block.with_attribute("class", classes);
        }

        for slot in meta.slots() {
            if slot.hidden {
                block.add_child(render_slot(ctx, meta, slot)?);
                continue;
            }

            let mut row = HtmlBlock::new("div");
            let label = ctx
                .bundles
                .message(slot.bundle.as_deref(), &slot.label_key, &[]);
            let mut label_block = HtmlBlock::new("label");
            label_block.add_child(HtmlComponent::Text(HtmlText::new(&label)));
            row.add_child(HtmlComponent::Block(label_block));
            row.add_child(render_slot(ctx, meta, slot)?);

            for error_key in slot.errors() {
                let message = ctx.bundles.message(slot.bundle.as_deref(), error_key, &[]);
                let mut error_block = HtmlBlock::new("span").with_attribute("class", "error");
                error_block.add_child(HtmlComponent::Text(HtmlText::new(&message)));
                row.add_child(HtmlComponent::Block(error_block));
            }

            block.add_child(HtmlComponent::Block(row));
        }

        Ok(HtmlComponent::Block(block))
    }
}

impl Renderer for StandardObjectRenderer {
    fn set_property(&mut self, name: &str, value: &str) -> bool {
        match name {
            "classes" => {
                self.classes = Some(value.to_string());
                true
            }
            _ => false,
        }
    }

    fn layout(&self) -> Box<dyn Layout + '_> {
        Box::new(StandardObjectLayout { renderer: self })
    }
}

// ─── list ────────────────────────────────────────────────────────────────────

/// Presents a list value as an html list, one element at a time.
#[derive(Default)]
pub struct ListRenderer {
    ordered: bool,
    each_layout: Option<String>,
    null_label: Option<String>,
    item_classes: Option<String>,
}

struct ListLayout<'r> {
    renderer: &'r ListRenderer,
}

impl Layout for ListLayout<'_> {
    fn create(
        &mut self,
        ctx: &mut RenderContext<'_>,
        target: RenderTarget<'_>,
    ) -> RenderResult<HtmlComponent> {
        let elements: Vec<Value> = match target {
            RenderTarget::Slot(_, slot) => match slot.value() {
                Value::List(items) => items.clone(),
                Value::Null => Vec::new(),
                other => vec![other.clone()],
            },
            RenderTarget::Value(Value::List(items)) => items.clone(),
            RenderTarget::Value(other) => vec![other.clone()],
            RenderTarget::Object(_) => {
                return Err(RenderError::Configuration(
                    "renderer 'list' presents slots and values only".to_string(),
                ))
            }
        };

        let mut items = Vec::with_capacity(elements.len());
        let mut iterator = elements.into_iter();
        while let Some(element) = iterator.next() {
            if element.is_null() {
                if let Some(label) = &self.renderer.null_label {
                    items.push(HtmlComponent::Text(HtmlText::new(label)));
                    continue;
                }
            }
            items.push(render_value(
                ctx,
                &element,
                self.renderer.each_layout.as_deref(),
            )?);
        }

        Ok(HtmlComponent::List(HtmlList {
            ordered: self.renderer.ordered,
            items,
            item_classes: self.renderer.item_classes.clone(),
        }))
    }
}

impl Renderer for ListRenderer {
    fn set_property(&mut self, name: &str, value: &str) -> bool {
        match name {
            "ordered" => {
                self.ordered = parse_flag(value);
                true
            }
            "each-layout" => {
                self.each_layout = Some(value.to_string());
                true
            }
            "null-label" => {
                self.null_label = Some(value.to_string());
                true
            }
            "item-classes" => {
                self.item_classes = Some(value.to_string());
                true
            }
            _ => false,
        }
    }

    fn layout(&self) -> Box<dyn Layout + '_> {
        Box::new(ListLayout { renderer: self })
    }
}

// ─── option lists ────────────────────────────────────────────────────────────

fn enumerate_options(
    ctx: &mut RenderContext<'_>,
    meta: &MetaObject,
    slot: &MetaSlot,
    provider_name: Option<&str>,
    save_options: bool,
) -> RenderResult<Vec<MenuOption>> {
    let attribute_key = format!("options:{}", slot.key().field_name());

    if let Some(saved) = ctx.attributes.get::<Vec<MenuOption>>(&attribute_key) {
        return Ok(saved.clone());
    }

    let name = provider_name.ok_or_else(|| {
        RenderError::Configuration("an option list renderer requires a 'provider'".to_string())
    })?;
    let kit = ctx.kit;
    let provider = Arc::clone(kit.provider(name)?);
    let options = provider.provide(meta.object(), slot.value());

    // Persisting the enumerated set keeps submitted keys resolvable even
    // when the provider is not deterministic between requests.
    if save_options {
        ctx.attributes.set(&attribute_key, options.clone());
    }
    Ok(options)
}

/// Single-value selection presented as an html menu over a provider's
/// option set.
#[derive(Default)]
pub struct MenuOptionListRenderer {
    provider: Option<String>,
    default_text: Option<String>,
    null_option_hidden: bool,
    save_options: bool,
}

struct MenuOptionLayout<'r> {
    renderer: &'r MenuOptionListRenderer,
}

impl Layout for MenuOptionLayout<'_> {
    fn create(
        &mut self,
        ctx: &mut RenderContext<'_>,
        target: RenderTarget<'_>,
    ) -> RenderResult<HtmlComponent> {
        let (meta, slot) = target_slot(target, "menu-option-list")?;
        let options = enumerate_options(
            ctx,
            meta,
            slot,
            self.renderer.provider.as_deref(),
            self.renderer.save_options,
        )?;

        let converter = Converter::Options(options.clone());
        let selected_key = converter.serialize(slot.value());

        let html_options = options
            .iter()
            .map(|option| HtmlMenuOption {
                key: option.key.clone(),
                label: option.label.clone(),
                selected: !selected_key.is_empty() && option.key == selected_key,
            })
            .collect();

        let default_title = if self.renderer.null_option_hidden {
            None
        } else {
            Some(self.renderer.default_text.clone().unwrap_or_else(|| {
                ctx.bundles
                    .message(Some("renderers"), "renderers.menu.default.title", &[])
            }))
        };

        Ok(HtmlComponent::Menu(HtmlMenu {
            binding: InputBinding::new(slot.key().clone(), converter),
            default_title,
            options: html_options,
            disabled: false,
        }))
    }
}

impl Renderer for MenuOptionListRenderer {
    fn set_property(&mut self, name: &str, value: &str) -> bool {
        match name {
            "provider" => {
                self.provider = Some(value.to_string());
                true
            }
            "default-text" => {
                self.default_text = Some(value.to_string());
                true
            }
            "null-option-hidden" => {
                self.null_option_hidden = parse_flag(value);
                true
            }
            "save-options" => {
                self.save_options = parse_flag(value);
                true
            }
            _ => false,
        }
    }

    fn layout(&self) -> Box<dyn Layout + '_> {
        Box::new(MenuOptionLayout { renderer: self })
    }
}

/// Single-value selection presented as a group of radio buttons.
#[derive(Default)]
pub struct RadioOptionListRenderer {
    provider: Option<String>,
    save_options: bool,
}

struct RadioOptionLayout<'r> {
    renderer: &'r RadioOptionListRenderer,
}

impl Layout for RadioOptionLayout<'_> {
    fn create(
        &mut self,
        ctx: &mut RenderContext<'_>,
        target: RenderTarget<'_>,
    ) -> RenderResult<HtmlComponent> {
        let (meta, slot) = target_slot(target, "radio-option-list")?;
        let options = enumerate_options(
            ctx,
            meta,
            slot,
            self.renderer.provider.as_deref(),
            self.renderer.save_options,
        )?;

        let converter = Converter::Options(options.clone());
        let selected_key = converter.serialize(slot.value());

        let mut block = HtmlBlock::new("div");
        for option in &options {
            let mut radio = HtmlRadioButton {
                binding: InputBinding::new(slot.key().clone(), converter.clone()),
                user_value: option.key.clone(),
                checked: false,
                text: Some(option.label.clone()),
            };
            radio.reconcile(&selected_key);
            block.add_child(HtmlComponent::RadioButton(radio));
        }
        Ok(HtmlComponent::Block(block))
    }
}

impl Renderer for RadioOptionListRenderer {
    fn set_property(&mut self, name: &str, value: &str) -> bool {
        match name {
            "provider" => {
                self.provider = Some(value.to_string());
                true
            }
            "save-options" => {
                self.save_options = parse_flag(value);
                true
            }
            _ => false,
        }
    }

    fn layout(&self) -> Box<dyn Layout + '_> {
        Box::new(RadioOptionLayout { renderer: self })
    }
}

// ─── tabular ─────────────────────────────────────────────────────────────────

/// Presents an object's child meta objects as table rows, one column per
/// visible slot of the first row.
#[derive(Default)]
pub struct TabularRenderer {
    classes: Option<String>,
}

struct TabularLayout<'r> {
    renderer: &'r TabularRenderer,
}

impl Layout for TabularLayout<'_> {
    fn create(
        &mut self,
        ctx: &mut RenderContext<'_>,
        target: RenderTarget<'_>,
    ) -> RenderResult<HtmlComponent> {
        let RenderTarget::Object(meta) = target else {
            return Err(RenderError::Configuration(
                "renderer 'tabular' presents objects only".to_string(),
            ));
        };

        let headers = match meta.children().first() {
            Some(first) => first
                .slots()
                .iter()
                .filter(|slot| !slot.hidden)
                .map(|slot| {
                    ctx.bundles
                        .message(slot.bundle.as_deref(), &slot.label_key, &[])
                })
                .collect(),
            None => Vec::new(),
        };

        let mut rows = Vec::with_capacity(meta.children().len());
        for child in meta.children() {
            let mut cells = Vec::new();
            for slot in child.slots() {
                if slot.hidden {
                    continue;
                }
                cells.push(render_slot(ctx, child, slot)?);
            }
            rows.push(cells);
        }

        Ok(HtmlComponent::Table(HtmlTable {
            headers,
            rows,
            classes: self.renderer.classes.clone(),
        }))
    }
}

impl Renderer for TabularRenderer {
    fn set_property(&mut self, name: &str, value: &str) -> bool {
        match name {
            "classes" => {
                self.classes = Some(value.to_string());
                true
            }
            _ => false,
        }
    }

    fn layout(&self) -> Box<dyn Layout + '_> {
        Box::new(TabularLayout { renderer: self })
    }
}
