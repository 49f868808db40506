//! Component resolver.
//!
//! Inspects a loaded module's exports table and normalizes it into one
//! renderable handle: a function component, a class-like component (callable
//! whose prototype carries `render`), or a pre-built element instance. This
//! is pure classification; the candidate is never invoked here.

use boa_engine::{js_string, Context, JsObject, JsValue};
use serde::{Deserialize, Serialize};

use vitrine_transform::Failure;

use crate::element::is_element;
use crate::loader::{js_error_message, LoadedModule};

/// Normalized renderable shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderableKind {
    /// Plain function component.
    Function,
    /// Class-like component: constructed, then its `render` method invoked.
    ClassLike,
    /// Pre-built element instance, mounted through a synthesized adapter.
    Element,
}

impl RenderableKind {
    /// Stable lowercase name for logs and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderableKind::Function => "function",
            RenderableKind::ClassLike => "class",
            RenderableKind::Element => "element",
        }
    }
}

impl std::fmt::Display for RenderableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mounted-ready renderable: the classified candidate plus the realm it
/// lives in.
#[derive(Debug)]
pub struct Renderable {
    pub(crate) context: Context,
    pub(crate) value: JsObject,
    pub(crate) label: String,
    kind: RenderableKind,
}

impl Renderable {
    /// The normalized shape this renderable was classified as.
    pub fn kind(&self) -> RenderableKind {
        self.kind
    }

    /// Diagnostic label inherited from the module.
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl LoadedModule {
    /// Normalize the exports table into a renderable handle.
    ///
    /// Candidate precedence: the conventional `default` slot if the table
    /// carries one, else the table value itself (covers whole-table
    /// reassignment like `module.exports = App`).
    pub fn resolve(mut self) -> Result<Renderable, Failure> {
        let candidate = self.candidate()?;

        let classified = match candidate.as_object() {
            Some(object) if object.is_callable() => {
                let object = object.clone();
                let kind = if is_class_like(&object, &mut self.context) {
                    RenderableKind::ClassLike
                } else {
                    RenderableKind::Function
                };
                Some((object, kind))
            }
            Some(object) => {
                let object = object.clone();
                if is_element(&candidate, &mut self.context) {
                    Some((object, RenderableKind::Element))
                } else {
                    None
                }
            }
            None => None,
        };

        match classified {
            Some((value, kind)) => {
                tracing::debug!(label = %self.label, kind = %kind, "resolved renderable");
                Ok(Renderable {
                    context: self.context,
                    value,
                    label: self.label,
                    kind,
                })
            }
            None => Err(Failure::resolve("no renderable export found")),
        }
    }

    fn candidate(&mut self) -> Result<JsValue, Failure> {
        let exports = self.exports.clone();

        if let Some(table) = exports.as_object() {
            let has_default = table
                .has_own_property(js_string!("default"), &mut self.context)
                .map_err(|e| Failure::resolve(js_error_message(&e, &mut self.context)))?;

            if has_default {
                let slot = table
                    .get(js_string!("default"), &mut self.context)
                    .map_err(|e| Failure::resolve(js_error_message(&e, &mut self.context)))?;
                if !slot.is_undefined() {
                    return Ok(slot);
                }
            }
        }

        Ok(exports)
    }
}

/// A callable counts as class-like when its prototype owns a `render`
/// property.
fn is_class_like(object: &JsObject, context: &mut Context) -> bool {
    let Ok(prototype) = object.get(js_string!("prototype"), context) else {
        return false;
    };
    let Some(prototype) = prototype.as_object() else {
        return false;
    };
    prototype
        .has_own_property(js_string!("render"), context)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_transform::{Stage, TransformedModule};

    use crate::bindings::SandboxConfig;
    use crate::loader::load;

    fn resolve_code(code: &str) -> Result<Renderable, Failure> {
        let module = TransformedModule {
            label: "test.tsx".to_string(),
            code: code.to_string(),
        };
        load(&module, &SandboxConfig::default())?.resolve()
    }

    #[test]
    fn resolves_default_function_export() {
        let renderable =
            resolve_code("exports.default = function Hi() { return null; };").unwrap();

        assert_eq!(renderable.kind(), RenderableKind::Function);
    }

    #[test]
    fn resolves_class_with_render() {
        let renderable = resolve_code(
            "class Widget { render() { return null; } }\nexports.default = Widget;",
        )
        .unwrap();

        assert_eq!(renderable.kind(), RenderableKind::ClassLike);
    }

    #[test]
    fn classes_without_render_resolve_as_functions() {
        let renderable =
            resolve_code("class Bare { constructor() {} }\nexports.default = Bare;").unwrap();

        assert_eq!(renderable.kind(), RenderableKind::Function);
    }

    #[test]
    fn resolves_element_instance_export() {
        let renderable = resolve_code(
            r#"const V = require("vitrine");
exports.default = V.createElement("div", null, "static");"#,
        )
        .unwrap();

        assert_eq!(renderable.kind(), RenderableKind::Element);
    }

    #[test]
    fn resolves_whole_table_reassignment() {
        let renderable =
            resolve_code("module.exports = function App() { return null; };").unwrap();

        assert_eq!(renderable.kind(), RenderableKind::Function);
    }

    #[test]
    fn rejects_primitive_default_export() {
        let failure = resolve_code("exports.default = 42;").unwrap_err();

        assert_eq!(failure.stage, Stage::Resolve);
        assert_eq!(failure.message, "no renderable export found");
    }

    #[test]
    fn rejects_empty_exports_table() {
        let failure = resolve_code("const unused = 1;").unwrap_err();

        assert_eq!(failure.stage, Stage::Resolve);
        assert_eq!(failure.message, "no renderable export found");
    }

    #[test]
    fn rejects_plain_object_export() {
        let failure = resolve_code(r#"exports.default = { type: "div" };"#).unwrap_err();

        assert_eq!(failure.stage, Stage::Resolve);
    }
}
