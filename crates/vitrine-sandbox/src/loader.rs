//! Module loader.
//!
//! Wraps transformed module text in a function whose parameter list is the
//! entire capability surface, evaluates it in a fresh realm, and calls it
//! with the host bindings. A fresh realm per load means repeated loads of the
//! same text are independently evaluated and cannot observe each other's
//! state.

use std::path::Path;

use boa_engine::{js_string, Context, JsError, JsValue, Source};

use vitrine_transform::{Failure, TransformedModule, RENDER_BINDING};

use crate::bindings::{HostBindings, SandboxConfig};

/// A module that has been evaluated against the host bindings.
///
/// Owns the execution realm; the exports table only has meaning inside it.
#[derive(Debug)]
pub struct LoadedModule {
    pub(crate) context: Context,
    pub(crate) exports: JsValue,
    pub(crate) label: String,
}

/// Evaluate transformed module text and capture its exports table.
///
/// Execution errors of any kind (reference errors, thrown values, exceeded
/// runtime limits) fold into `Failure{load}`. A module that never assigns an
/// export is not an error at this stage.
pub fn load(module: &TransformedModule, config: &SandboxConfig) -> Result<LoadedModule, Failure> {
    let mut context = HostBindings::fresh_context(config);

    let bindings = HostBindings::install(&mut context, config)
        .map_err(|e| Failure::load(js_error_message(&e, &mut context)))?;

    // The wrapper's parameter list is the sandbox boundary: these four names
    // are the only free identifiers the module body can resolve against.
    let wrapper_source = format!(
        "(function({RENDER_BINDING}, require, module, exports) {{\n\"use strict\";\n{}\nreturn module.exports;\n}})",
        module.code
    );

    let wrapper = context
        .eval(Source::from_reader(
            wrapper_source.as_bytes(),
            Some(Path::new(&module.label)),
        ))
        .map_err(|e| Failure::load(js_error_message(&e, &mut context)))?;

    let wrapper_fn = match wrapper.as_object() {
        Some(object) if object.is_callable() => object.clone(),
        _ => {
            return Err(Failure::load(
                "internal: module wrapper did not evaluate to a function",
            ))
        }
    };

    let args = [
        bindings.library.into(),
        bindings.require,
        bindings.module.into(),
        bindings.exports.into(),
    ];

    match wrapper_fn.call(&JsValue::undefined(), &args, &mut context) {
        Ok(exports) => {
            tracing::debug!(label = %module.label, "module evaluated");
            Ok(LoadedModule {
                context,
                exports,
                label: module.label.clone(),
            })
        }
        Err(e) => {
            let message = js_error_message(&e, &mut context);
            Err(Failure::load(message))
        }
    }
}

impl LoadedModule {
    /// Names on the exports table, for diagnostics.
    pub fn export_names(&mut self) -> Vec<String> {
        let Some(table) = self.exports.as_object() else {
            return Vec::new();
        };
        let Ok(keys) = table.own_property_keys(&mut self.context) else {
            return Vec::new();
        };
        keys.iter().map(|key| key.to_string()).collect()
    }
}

/// Best-effort message extraction from a JavaScript error, in preference
/// order: an Error instance's `message`, a thrown string value, anything else
/// stringified.
pub(crate) fn js_error_message(error: &JsError, context: &mut Context) -> String {
    let value = error.to_opaque(context);

    if let Some(object) = value.as_object() {
        if let Ok(message) = object.get(js_string!("message"), context) {
            if let Some(text) = message.as_string() {
                let text = text.to_std_string_escaped();
                if !text.is_empty() {
                    return text;
                }
            }
        }
    }

    if let Some(text) = value.as_string() {
        return text.to_std_string_escaped();
    }

    value.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_transform::Stage;

    fn lowered(code: &str) -> TransformedModule {
        TransformedModule {
            label: "test.tsx".to_string(),
            code: code.to_string(),
        }
    }

    fn load_code(code: &str) -> Result<LoadedModule, Failure> {
        load(&lowered(code), &SandboxConfig::default())
    }

    #[test]
    fn captures_default_export() {
        let mut module =
            load_code("exports.default = function Hi() { return null; };").unwrap();

        assert_eq!(module.export_names(), vec!["default".to_string()]);
    }

    #[test]
    fn tolerates_missing_exports() {
        let mut module = load_code("const unused = 1;").unwrap();

        assert!(module.export_names().is_empty());
    }

    #[test]
    fn folds_reference_errors_into_load_failures() {
        let failure = load_code("exports.default = missingIdentifier;").unwrap_err();

        assert_eq!(failure.stage, Stage::Load);
        assert!(failure.message.contains("missingIdentifier"));
    }

    #[test]
    fn folds_thrown_values_into_load_failures() {
        let failure = load_code(r#"throw new Error("boom");"#).unwrap_err();

        assert_eq!(failure.stage, Stage::Load);
        assert!(failure.message.contains("boom"));
    }

    #[test]
    fn unknown_imports_degrade_to_placeholders() {
        let module = load_code(
            r#"const styled = require("styled-components");
exports.default = function S() { return null; };"#,
        );

        assert!(module.is_ok());
    }

    #[test]
    fn ambient_host_capabilities_are_absent() {
        let mut module = load_code(
            "exports.default = [typeof document, typeof window, typeof fetch].join();",
        )
        .unwrap();

        let value = module
            .exports
            .as_object()
            .unwrap()
            .get(js_string!("default"), &mut module.context)
            .unwrap();

        assert_eq!(
            value.as_string().unwrap().to_std_string_escaped(),
            "undefined,undefined,undefined"
        );
    }

    #[test]
    fn repeated_loads_do_not_share_state() {
        let code = "globalThis.__counter = (globalThis.__counter || 0) + 1;\nexports.default = globalThis.__counter;";

        for _ in 0..2 {
            let mut module = load_code(code).unwrap();
            let value = module
                .exports
                .as_object()
                .unwrap()
                .get(js_string!("default"), &mut module.context)
                .unwrap();

            assert_eq!(value.as_number(), Some(1.0));
        }
    }

    #[test]
    fn module_exports_reassignment_is_honored() {
        let module =
            load_code("module.exports = function Table() { return null; };").unwrap();

        assert!(module
            .exports
            .as_object()
            .map(|o| o.is_callable())
            .unwrap_or(false));
    }
}
