//! TSX/JSX source transformer.
//!
//! Converts an untrusted component source string into text the sandbox can
//! run directly: TypeScript syntax stripped, JSX lowered to calls on the
//! injected rendering-library binding, ES module syntax lowered to
//! `require`/`exports` (see [`crate::lower`]). Pure text-in/text-out; the
//! module label only feeds diagnostic attribution.

use std::path::Path;

use oxc_allocator::Allocator;
use oxc_codegen::Codegen;
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::SourceType;
use oxc_transformer::{JsxOptions, JsxRuntime, TransformOptions, Transformer};
use serde::{Deserialize, Serialize};

use crate::failure::Failure;
use crate::lower::lower_modules;

/// Name of the rendering-library binding the loader injects. The JSX pragma
/// compiles element syntax into calls on this binding, so transformed code
/// only runs inside a scope that provides it.
pub const RENDER_BINDING: &str = "Vitrine";

/// Options for a transform run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    /// JSX factory expression (classic runtime).
    #[serde(default = "default_pragma")]
    pub jsx_pragma: String,

    /// JSX fragment expression.
    #[serde(default = "default_fragment")]
    pub jsx_fragment: String,
}

fn default_pragma() -> String {
    format!("{RENDER_BINDING}.createElement")
}

fn default_fragment() -> String {
    format!("{RENDER_BINDING}.Fragment")
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            jsx_pragma: default_pragma(),
            jsx_fragment: default_fragment(),
        }
    }
}

/// Successfully transformed module text.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedModule {
    /// Caller-assigned label, carried through for diagnostic attribution.
    pub label: String,

    /// Executable script text: no markup or type syntax remaining, exports
    /// assigned onto the injected `exports` table.
    pub code: String,
}

/// Transform a raw source string into executable module text.
///
/// Empty or whitespace-only input fails immediately with `"no code provided"`
/// without invoking the compiler. All compiler diagnostics are folded into a
/// [`Failure`] with the first message up front and the rest in `detail`.
pub fn transform(
    source: &str,
    module_label: &str,
    config: &TransformConfig,
) -> Result<TransformedModule, Failure> {
    if source.trim().is_empty() {
        return Err(Failure::transform("no code provided"));
    }

    let stripped = strip(source, module_label, config)?;
    let code = lower_modules(&stripped, module_label)?;

    tracing::debug!(label = module_label, bytes = code.len(), "transformed module");

    Ok(TransformedModule {
        label: module_label.to_string(),
        code,
    })
}

/// Strip type syntax and lower JSX, leaving plain ES module text.
fn strip(source: &str, module_label: &str, config: &TransformConfig) -> Result<String, Failure> {
    let allocator = Allocator::default();
    let source_type =
        SourceType::from_path(Path::new(module_label)).unwrap_or_else(|_| SourceType::tsx());

    let parsed = Parser::new(&allocator, source, source_type).parse();
    if parsed.panicked || !parsed.errors.is_empty() {
        return Err(diagnostics_failure(&parsed.errors, "source is not parseable"));
    }

    let mut program = parsed.program;
    let scoping = SemanticBuilder::new()
        .build(&program)
        .semantic
        .into_scoping();

    let options = TransformOptions {
        jsx: JsxOptions {
            runtime: JsxRuntime::Classic,
            pragma: Some(config.jsx_pragma.clone()),
            pragma_frag: Some(config.jsx_fragment.clone()),
            ..JsxOptions::default()
        },
        ..TransformOptions::default()
    };

    let result = Transformer::new(&allocator, Path::new(module_label), &options)
        .build_with_scoping(scoping, &mut program);
    if !result.errors.is_empty() {
        return Err(diagnostics_failure(
            &result.errors,
            "source could not be transformed",
        ));
    }

    Ok(Codegen::new().build(&program).code)
}

/// Fold compiler diagnostics into a transform failure.
fn diagnostics_failure<D: std::fmt::Display>(errors: &[D], fallback: &str) -> Failure {
    let mut messages = errors.iter().map(|e| e.to_string());
    let first = messages.next().unwrap_or_else(|| fallback.to_string());
    let rest: Vec<String> = messages.collect();

    let failure = Failure::transform(first);
    if rest.is_empty() {
        failure
    } else {
        failure.with_detail(rest.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::Stage;

    fn run(source: &str) -> Result<TransformedModule, Failure> {
        transform(source, "snippet.tsx", &TransformConfig::default())
    }

    #[test]
    fn rejects_empty_input() {
        for source in ["", "   ", "\n\t\n"] {
            let failure = run(source).unwrap_err();
            assert_eq!(failure.stage, Stage::Transform);
            assert_eq!(failure.message, "no code provided");
        }
    }

    #[test]
    fn rejects_invalid_syntax_with_message() {
        let failure = run("this is not valid syntax {{{").unwrap_err();

        assert_eq!(failure.stage, Stage::Transform);
        assert!(!failure.message.is_empty());
    }

    #[test]
    fn lowers_default_function_export() {
        let module = run("export default function Hi() { return null; }").unwrap();

        assert!(module.code.contains("function Hi()"));
        assert!(module.code.contains("exports.default = Hi;"));
        assert!(!module.code.contains("export default"));
    }

    #[test]
    fn lowers_jsx_to_render_binding_calls() {
        let module =
            run(r#"export default function App() { return <div className="x">hi</div>; }"#)
                .unwrap();

        assert!(module.code.contains("Vitrine.createElement("));
        assert!(!module.code.contains("<div"));
    }

    #[test]
    fn strips_type_annotations() {
        let module = run(
            "const count: number = 1;\nexport default function Tally(): null { return null; }",
        )
        .unwrap();

        assert!(!module.code.contains(": number"));
        assert!(module.code.contains("exports.default = Tally;"));
    }

    #[test]
    fn keeps_label_for_attribution() {
        let module = transform(
            "export default function A() { return null; }",
            "preview-7.tsx",
            &TransformConfig::default(),
        )
        .unwrap();

        assert_eq!(module.label, "preview-7.tsx");
    }
}
