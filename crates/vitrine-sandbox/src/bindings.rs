//! Host bindings injected into the sandboxed module scope.
//!
//! The scope a module executes in exposes exactly what is built here: the
//! rendering-library object, the allow-list `require`, and a fresh
//! `module`/`exports` pair. Nothing reaches the sandbox implicitly; the
//! execution realm itself carries only the language builtins.

use std::sync::LazyLock;

use boa_engine::object::{FunctionObjectBuilder, ObjectInitializer};
use boa_engine::property::Attribute;
use boa_engine::{
    js_string, Context, JsArgs, JsObject, JsResult, JsString, JsValue, NativeFunction,
};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::element;

/// Canonical specifier for the rendering library.
pub const LIBRARY_SPECIFIER: &str = "vitrine";

/// Canonical specifier for the JSX runtime surface.
pub const JSX_RUNTIME_SPECIFIER: &str = "vitrine/jsx-runtime";

/// Sandbox configuration: runtime limits and the import alias table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Upper bound on loop iterations during evaluation.
    #[serde(default = "default_loop_limit")]
    pub loop_limit: u64,

    /// Upper bound on call recursion during evaluation.
    #[serde(default = "default_recursion_limit")]
    pub recursion_limit: usize,

    /// Extra import specifiers resolved to the rendering library. Generated
    /// snippets habitually import the ecosystem names these stand in for.
    #[serde(default = "default_aliases")]
    pub aliases: Vec<String>,
}

fn default_loop_limit() -> u64 {
    1_000_000
}

fn default_recursion_limit() -> usize {
    512
}

fn default_aliases() -> Vec<String> {
    vec!["react".to_string(), "preact".to_string()]
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            loop_limit: default_loop_limit(),
            recursion_limit: default_recursion_limit(),
            aliases: default_aliases(),
        }
    }
}

/// The capability set passed to a module wrapper, in parameter order.
pub struct HostBindings {
    /// The rendering-library object (`Vitrine`).
    pub library: JsObject,

    /// The allow-list `require` function.
    pub require: JsValue,

    /// The `module` object (`{ exports: {} }`).
    pub module: JsObject,

    /// The initial `exports` table, aliased by `module.exports`.
    pub exports: JsObject,
}

impl HostBindings {
    /// Build a fresh execution context with the configured runtime limits.
    pub fn fresh_context(config: &SandboxConfig) -> Context {
        let mut context = Context::default();
        context
            .runtime_limits_mut()
            .set_loop_iteration_limit(config.loop_limit);
        context
            .runtime_limits_mut()
            .set_recursion_limit(config.recursion_limit);
        context
    }

    /// Construct the bindings inside `context`.
    pub fn install(context: &mut Context, config: &SandboxConfig) -> JsResult<Self> {
        let library = render_library(context);
        let jsx_runtime = jsx_runtime(context, &library)?;

        // The module registry backs `require`: every resolvable specifier is
        // a property, aliases included. Anything absent degrades to an inert
        // placeholder at call time. Null prototype so specifiers like
        // "toString" cannot resolve prototype members.
        let registry = JsObject::with_null_proto();
        registry.set(
            js_string!("vitrine"),
            library.clone(),
            false,
            context,
        )?;
        registry.set(
            js_string!("vitrine/jsx-runtime"),
            jsx_runtime,
            false,
            context,
        )?;
        for alias in &config.aliases {
            registry.set(
                JsString::from(alias.as_str()),
                library.clone(),
                false,
                context,
            )?;
        }

        let require = FunctionObjectBuilder::new(
            context.realm(),
            NativeFunction::from_copy_closure_with_captures(
                |_this, args, registry, context| {
                    let request = args
                        .get_or_undefined(0)
                        .to_string(context)?
                        .to_std_string_escaped();
                    let key = normalize_specifier(&request);

                    let resolved = registry.get(JsString::from(key.as_str()), context)?;
                    if resolved.is_undefined() {
                        tracing::warn!(
                            specifier = %request,
                            "unresolvable import, substituting inert placeholder"
                        );
                        return Ok(JsObject::with_object_proto(context.intrinsics()).into());
                    }
                    Ok(resolved)
                },
                registry,
            ),
        )
        .name(js_string!("require"))
        .length(1)
        .build();

        let exports = JsObject::with_object_proto(context.intrinsics());
        let module = ObjectInitializer::new(context)
            .property(js_string!("exports"), exports.clone(), Attribute::all())
            .build();

        Ok(Self {
            library,
            require: require.into(),
            module,
            exports,
        })
    }
}

/// Build the rendering-library object.
fn render_library(context: &mut Context) -> JsObject {
    ObjectInitializer::new(context)
        .function(
            NativeFunction::from_fn_ptr(element::create_element),
            js_string!("createElement"),
            2,
        )
        .function(
            NativeFunction::from_fn_ptr(element::is_valid_element),
            js_string!("isValidElement"),
            1,
        )
        .property(
            js_string!("Fragment"),
            js_string!("vitrine.fragment"),
            Attribute::all(),
        )
        .build()
}

/// Build the JSX runtime surface (`jsx`, `jsxs`, `Fragment`).
fn jsx_runtime(context: &mut Context, library: &JsObject) -> JsResult<JsObject> {
    let fragment = library.get(js_string!("Fragment"), context)?;

    Ok(ObjectInitializer::new(context)
        .function(NativeFunction::from_fn_ptr(element::jsx), js_string!("jsx"), 2)
        .function(
            NativeFunction::from_fn_ptr(element::jsx),
            js_string!("jsxs"),
            2,
        )
        .property(js_string!("Fragment"), fragment, Attribute::all())
        .build())
}

static SPECIFIER_TRIM_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Version suffixes ("react@18.2.0") and source extensions are noise for
    // allow-list lookup.
    Regex::new(r"(@\d[\w.\-]*$)|(\.(js|mjs|cjs|ts|tsx|jsx)$)").expect("Invalid specifier regex")
});

/// Normalize an import specifier before allow-list lookup.
fn normalize_specifier(request: &str) -> String {
    SPECIFIER_TRIM_RE.replace_all(request.trim(), "").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_specifiers() {
        assert_eq!(normalize_specifier("react@18.2.0"), "react");
        assert_eq!(normalize_specifier(" vitrine "), "vitrine");
        assert_eq!(normalize_specifier("./Button.tsx"), "./Button");
        assert_eq!(
            normalize_specifier("vitrine/jsx-runtime"),
            "vitrine/jsx-runtime"
        );
    }

    #[test]
    fn default_config_keeps_common_aliases() {
        let config = SandboxConfig::default();

        assert!(config.aliases.contains(&"react".to_string()));
        assert!(config.loop_limit > 0);
    }

    #[test]
    fn installs_library_and_require() {
        let config = SandboxConfig::default();
        let mut context = HostBindings::fresh_context(&config);
        let bindings = HostBindings::install(&mut context, &config).unwrap();

        let create = bindings
            .library
            .get(js_string!("createElement"), &mut context)
            .unwrap();
        assert!(create.as_object().map(|o| o.is_callable()).unwrap_or(false));

        let exports = bindings
            .module
            .get(js_string!("exports"), &mut context)
            .unwrap();
        assert!(exports.as_object().is_some());
    }
}
