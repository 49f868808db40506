//! Mounting: render a resolved renderable to HTML.
//!
//! Invokes the renderable inside its realm and walks the resulting element
//! tree into an HTML string. Any JavaScript throw along the way folds into
//! `Failure{render}`; the walk itself is bounded by a depth cap so cyclic
//! component trees terminate.

use boa_engine::object::builtins::JsArray;
use boa_engine::{
    js_string, Context, JsError, JsNativeError, JsObject, JsString, JsValue, Source,
};

use vitrine_transform::Failure;

use crate::element::{is_element, FRAGMENT_TYPE};
use crate::loader::js_error_message;
use crate::resolve::{Renderable, RenderableKind};

/// Maximum element-tree nesting before the walk aborts.
const MAX_DEPTH: usize = 128;

/// Invoked with a class-like component; constructs it and calls `render`.
const CLASS_TRAMPOLINE: &str = r#"(function (Component, props) {
    var instance = new Component(props);
    return typeof instance.render === "function" ? instance.render() : null;
})"#;

/// Void elements close without children.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

enum RenderError {
    Js(JsError),
    Depth,
}

impl From<JsError> for RenderError {
    fn from(error: JsError) -> Self {
        Self::Js(error)
    }
}

impl Renderable {
    /// Invoke the renderable and serialize its output tree to HTML.
    ///
    /// `source_text` is the raw per-render input; element-instance exports
    /// get it re-applied as their `code` prop.
    pub fn render_html(&mut self, source_text: &str) -> Result<String, Failure> {
        let tree = self.invoke(source_text)?;

        let mut out = String::new();
        match write_node(&tree, &mut self.context, &mut out, 0) {
            Ok(()) => Ok(out),
            Err(RenderError::Depth) => Err(Failure::render("maximum render depth exceeded")),
            Err(RenderError::Js(e)) => {
                let message = js_error_message(&e, &mut self.context);
                Err(Failure::render(message))
            }
        }
    }

    fn invoke(&mut self, source_text: &str) -> Result<JsValue, Failure> {
        let result = match self.kind() {
            RenderableKind::Function => {
                let props = JsObject::with_object_proto(self.context.intrinsics());
                self.value
                    .call(&JsValue::undefined(), &[props.into()], &mut self.context)
            }
            RenderableKind::ClassLike => self.invoke_class(),
            RenderableKind::Element => self.adapt_element(source_text),
        };

        result.map_err(|e| {
            let message = js_error_message(&e, &mut self.context);
            Failure::render(message)
        })
    }

    fn invoke_class(&mut self) -> Result<JsValue, JsError> {
        let trampoline = self.context.eval(Source::from_bytes(CLASS_TRAMPOLINE))?;
        let trampoline = match trampoline.as_object() {
            Some(object) if object.is_callable() => object.clone(),
            _ => {
                return Err(JsNativeError::typ()
                    .with_message("internal: class trampoline is not callable")
                    .into())
            }
        };

        let props = JsObject::with_object_proto(self.context.intrinsics());
        trampoline.call(
            &JsValue::undefined(),
            &[self.value.clone().into(), props.into()],
            &mut self.context,
        )
    }

    /// Synthesized adapter for pre-built element exports: a copy of the
    /// element whose props carry the raw source under `code`.
    fn adapt_element(&mut self, source_text: &str) -> Result<JsValue, JsError> {
        let element = self.value.clone();
        let context = &mut self.context;

        let props = element.get(js_string!("props"), context)?;
        let adapted_props = JsObject::with_object_proto(context.intrinsics());
        if let Some(source_props) = props.as_object() {
            for key in source_props.own_property_keys(context)? {
                let value = source_props.get(key.clone(), context)?;
                adapted_props.set(key, value, false, context)?;
            }
        }
        adapted_props.set(
            js_string!("code"),
            JsString::from(source_text),
            false,
            context,
        )?;

        let adapted = JsObject::with_object_proto(context.intrinsics());
        adapted.set(
            js_string!("$$vitrine"),
            js_string!("vitrine.element"),
            false,
            context,
        )?;
        adapted.set(
            js_string!("type"),
            element.get(js_string!("type"), context)?,
            false,
            context,
        )?;
        adapted.set(js_string!("props"), adapted_props, false, context)?;
        adapted.set(
            js_string!("children"),
            element.get(js_string!("children"), context)?,
            false,
            context,
        )?;

        Ok(adapted.into())
    }
}

fn write_node(
    value: &JsValue,
    context: &mut Context,
    out: &mut String,
    depth: usize,
) -> Result<(), RenderError> {
    if depth > MAX_DEPTH {
        return Err(RenderError::Depth);
    }

    // Nulls and booleans render nothing, matching component conventions.
    if value.is_null_or_undefined() || value.as_boolean().is_some() {
        return Ok(());
    }

    if let Some(text) = value.as_string() {
        out.push_str(&escape_html(&text.to_std_string_escaped()));
        return Ok(());
    }

    if let Some(number) = value.as_number() {
        out.push_str(&format_number(number));
        return Ok(());
    }

    let Some(object) = value.as_object() else {
        return Err(invalid_child());
    };

    if JsArray::from_object(object.clone()).is_ok() {
        let length = object
            .get(js_string!("length"), context)?
            .to_length(context)?;
        for index in 0..length {
            let child = object.get(index as u32, context)?;
            write_node(&child, context, out, depth + 1)?;
        }
        return Ok(());
    }

    if is_element(&object.clone().into(), context) {
        return write_element(&object, context, out, depth);
    }

    Err(invalid_child())
}

fn write_element(
    element: &JsObject,
    context: &mut Context,
    out: &mut String,
    depth: usize,
) -> Result<(), RenderError> {
    let element_type = element.get(js_string!("type"), context)?;
    let props = element.get(js_string!("props"), context)?;
    let children = effective_children(element, &props, context)?;

    // Component-typed element: invoke it and recurse on the output.
    if let Some(component) = element_type.as_object().filter(|o| o.is_callable()) {
        let call_props = props_with_children(&props, children.as_ref(), context)?;
        let output = component.call(&JsValue::undefined(), &[call_props.into()], context)?;
        return write_node(&output, context, out, depth + 1);
    }

    let Some(tag) = element_type.as_string().map(|s| s.to_std_string_escaped()) else {
        return Err(invalid_type());
    };

    if tag == FRAGMENT_TYPE {
        if let Some(children) = children {
            write_node(&children, context, out, depth + 1)?;
        }
        return Ok(());
    }

    if !is_valid_tag(&tag) {
        return Err(invalid_type());
    }

    out.push('<');
    out.push_str(&tag);
    write_attributes(&props, context, out)?;

    if VOID_ELEMENTS.contains(&tag.as_str()) {
        out.push_str(" />");
        return Ok(());
    }

    out.push('>');
    if let Some(children) = children {
        write_node(&children, context, out, depth + 1)?;
    }
    out.push_str("</");
    out.push_str(&tag);
    out.push('>');

    Ok(())
}

/// Children from the element's own array when present, else `props.children`.
fn effective_children(
    element: &JsObject,
    props: &JsValue,
    context: &mut Context,
) -> Result<Option<JsValue>, RenderError> {
    let children = element.get(js_string!("children"), context)?;
    if let Some(array) = children.as_object() {
        let length = array
            .get(js_string!("length"), context)?
            .to_length(context)?;
        if length > 0 {
            return Ok(Some(children));
        }
    }

    let from_props = match props.as_object() {
        Some(object) => object.get(js_string!("children"), context)?,
        None => JsValue::undefined(),
    };

    if from_props.is_undefined() {
        Ok(None)
    } else {
        Ok(Some(from_props))
    }
}

fn props_with_children(
    props: &JsValue,
    children: Option<&JsValue>,
    context: &mut Context,
) -> Result<JsObject, RenderError> {
    let merged = JsObject::with_object_proto(context.intrinsics());

    if let Some(source) = props.as_object() {
        for key in source.own_property_keys(context)? {
            let value = source.get(key.clone(), context)?;
            merged.set(key, value, false, context)?;
        }
    }

    if let Some(children) = children {
        merged.set(js_string!("children"), children.clone(), false, context)?;
    }

    Ok(merged)
}

fn write_attributes(
    props: &JsValue,
    context: &mut Context,
    out: &mut String,
) -> Result<(), RenderError> {
    let Some(object) = props.as_object() else {
        return Ok(());
    };

    for key in object.own_property_keys(context)? {
        let name = key.to_string();

        let mapped = match name.as_str() {
            "children" | "key" | "ref" | "dangerouslySetInnerHTML" => continue,
            "className" => "class".to_string(),
            "htmlFor" => "for".to_string(),
            other if is_event_handler(other) => continue,
            other => other.to_string(),
        };

        if !is_valid_attr_name(&mapped) {
            continue;
        }

        let value = object.get(key, context)?;

        if name == "style" {
            if let Some(style) = value.as_object().filter(|o| !o.is_callable()) {
                let css = style_attribute(&style, context)?;
                if !css.is_empty() {
                    out.push_str(&format!(" style=\"{}\"", escape_html(&css)));
                }
                continue;
            }
        }

        if let Some(text) = value.as_string() {
            out.push_str(&format!(
                " {mapped}=\"{}\"",
                escape_html(&text.to_std_string_escaped())
            ));
        } else if let Some(number) = value.as_number() {
            out.push_str(&format!(" {mapped}=\"{}\"", format_number(number)));
        } else if value.as_boolean() == Some(true) {
            out.push(' ');
            out.push_str(&mapped);
        }
        // false, null, undefined, functions, and objects produce no markup.
    }

    Ok(())
}

fn style_attribute(style: &JsObject, context: &mut Context) -> Result<String, RenderError> {
    let mut css = String::new();

    for key in style.own_property_keys(context)? {
        let value = style.get(key.clone(), context)?;
        let text = if let Some(s) = value.as_string() {
            s.to_std_string_escaped()
        } else if let Some(n) = value.as_number() {
            format_number(n)
        } else {
            continue;
        };

        if !css.is_empty() {
            css.push_str("; ");
        }
        css.push_str(&camel_to_kebab(&key.to_string()));
        css.push_str(": ");
        css.push_str(&text);
    }

    Ok(css)
}

fn invalid_child() -> RenderError {
    RenderError::Js(
        JsNativeError::typ()
            .with_message("objects are not valid as a preview child")
            .into(),
    )
}

fn invalid_type() -> RenderError {
    RenderError::Js(
        JsNativeError::typ()
            .with_message("invalid element type")
            .into(),
    )
}

/// `onClick`-style props never reach markup.
fn is_event_handler(name: &str) -> bool {
    name.starts_with("on")
        && name
            .chars()
            .nth(2)
            .map(|c| c.is_ascii_uppercase())
            .unwrap_or(false)
}

fn is_valid_tag(tag: &str) -> bool {
    let mut chars = tag.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
}

fn is_valid_attr_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Convert a camelCase style property to its CSS form.
fn camel_to_kebab(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Escape HTML special characters including single quotes.
fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vitrine_transform::{Stage, TransformedModule};

    use crate::bindings::SandboxConfig;
    use crate::loader::load;

    fn render(code: &str) -> Result<String, Failure> {
        render_with_source(code, "<raw source>")
    }

    fn render_with_source(code: &str, source_text: &str) -> Result<String, Failure> {
        let module = TransformedModule {
            label: "test.tsx".to_string(),
            code: code.to_string(),
        };
        let mut renderable = load(&module, &SandboxConfig::default())?.resolve()?;
        renderable.render_html(source_text)
    }

    #[test]
    fn renders_nothing_for_null_output() {
        let html = render("exports.default = function Hi() { return null; };").unwrap();

        assert_eq!(html, "");
    }

    #[test]
    fn renders_element_tree_with_attributes() {
        let html = render(
            r#"const V = require("vitrine");
exports.default = function Card() {
  return V.createElement("div", { className: "box", id: "card" }, "hello");
};"#,
        )
        .unwrap();

        assert_eq!(html, r#"<div class="box" id="card">hello</div>"#);
    }

    #[test]
    fn escapes_text_children() {
        let html = render(
            r#"const V = require("vitrine");
exports.default = function X() { return V.createElement("p", null, "<script>alert(1)</script>"); };"#,
        )
        .unwrap();

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn flattens_fragments() {
        let html = render(
            r#"const V = require("vitrine");
exports.default = function F() { return V.createElement(V.Fragment, null, "a", "b"); };"#,
        )
        .unwrap();

        assert_eq!(html, "ab");
    }

    #[test]
    fn invokes_nested_function_components() {
        let html = render(
            r#"const V = require("vitrine");
function Child(props) { return V.createElement("span", null, props.name); }
exports.default = function Parent() { return V.createElement(Child, { name: "x" }); };"#,
        )
        .unwrap();

        assert_eq!(html, "<span>x</span>");
    }

    #[test]
    fn renders_class_components() {
        let html = render(
            r#"const V = require("vitrine");
class Widget {
  constructor(props) { this.props = props; }
  render() { return V.createElement("span", null, "w"); }
}
exports.default = Widget;"#,
        )
        .unwrap();

        assert_eq!(html, "<span>w</span>");
    }

    #[test]
    fn element_exports_get_the_code_prop() {
        let html = render_with_source(
            r#"const V = require("vitrine");
exports.default = V.createElement("pre", null, "snippet");"#,
            "RAW TEXT",
        )
        .unwrap();

        assert_eq!(html, r#"<pre code="RAW TEXT">snippet</pre>"#);
    }

    #[test]
    fn render_throw_becomes_render_failure() {
        let failure = render(
            r#"exports.default = function Bad() { throw new Error("x"); };"#,
        )
        .unwrap_err();

        assert_eq!(failure.stage, Stage::Render);
        assert!(failure.message.contains('x'));
    }

    #[test]
    fn cyclic_component_trees_hit_the_depth_cap() {
        let failure = render(
            r#"const V = require("vitrine");
function Loop() { return V.createElement(Loop, null); }
exports.default = Loop;"#,
        )
        .unwrap_err();

        assert_eq!(failure.stage, Stage::Render);
        assert!(failure.message.contains("depth"));
    }

    #[test]
    fn skips_event_handlers_and_false_attributes() {
        let html = render(
            r#"const V = require("vitrine");
exports.default = function B() {
  return V.createElement("button", { onClick: function () {}, disabled: true, hidden: false }, "go");
};"#,
        )
        .unwrap();

        assert_eq!(html, "<button disabled>go</button>");
    }

    #[test]
    fn serializes_style_objects() {
        let html = render(
            r#"const V = require("vitrine");
exports.default = function S() {
  return V.createElement("div", { style: { backgroundColor: "red", padding: 4 } });
};"#,
        )
        .unwrap();

        assert_eq!(
            html,
            r#"<div style="background-color: red; padding: 4"></div>"#
        );
    }

    #[test]
    fn closes_void_elements_without_children() {
        let html = render(
            r#"const V = require("vitrine");
exports.default = function R() { return V.createElement("br", null); };"#,
        )
        .unwrap();

        assert_eq!(html, "<br />");
    }

    #[test]
    fn renders_number_children() {
        let html = render(
            r#"const V = require("vitrine");
exports.default = function N() { return V.createElement("i", null, 42); };"#,
        )
        .unwrap();

        assert_eq!(html, "<i>42</i>");
    }

    #[test]
    fn formats_numbers_like_source() {
        assert_eq!(format_number(42.0), "42");
        assert_eq!(format_number(1.5), "1.5");
        assert_eq!(format_number(-3.0), "-3");
    }

    #[test]
    fn camel_case_becomes_kebab_case() {
        assert_eq!(camel_to_kebab("backgroundColor"), "background-color");
        assert_eq!(camel_to_kebab("padding"), "padding");
    }
}
