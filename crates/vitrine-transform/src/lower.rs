//! ES module syntax lowering.
//!
//! The sandbox evaluates module text as a plain script inside a function
//! wrapper, so top-level `import`/`export` statements are rewritten into
//! `require()` calls and assignments onto the injected `exports` table.
//! `export default` lands in `exports.default`, giving the resolver a stable
//! default slot next to the full module-object table.

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    BindingPatternKind, Declaration, ExportAllDeclaration, ExportDefaultDeclaration,
    ExportDefaultDeclarationKind, ExportNamedDeclaration, ImportDeclaration,
    ImportDeclarationSpecifier, ModuleExportName, Statement,
};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType, Span};

use crate::failure::Failure;

/// Rewrite all top-level module syntax in `code` (plain JS, post-strip) into
/// `require`/`exports` form.
pub fn lower_modules(code: &str, module_label: &str) -> Result<String, Failure> {
    let allocator = Allocator::default();
    let parsed = Parser::new(&allocator, code, SourceType::mjs()).parse();
    if parsed.panicked || !parsed.errors.is_empty() {
        // Stripped output should always re-parse; if it does not, surface a
        // transform failure with the offending text instead of panicking.
        return Err(Failure::transform(format!(
            "internal: stripped output for {module_label} failed to re-parse"
        ))
        .with_detail(code.to_string()));
    }

    let mut edits: Vec<(Span, String)> = Vec::new();
    let mut temp_seq = 0usize;

    for stmt in &parsed.program.body {
        match stmt {
            Statement::ImportDeclaration(decl) => {
                edits.push((decl.span, lower_import(decl, &mut temp_seq)));
            }
            Statement::ExportDefaultDeclaration(decl) => {
                edits.push((decl.span, lower_export_default(decl, code)));
            }
            Statement::ExportNamedDeclaration(decl) => {
                edits.push((decl.span, lower_export_named(decl, code, &mut temp_seq)));
            }
            Statement::ExportAllDeclaration(decl) => {
                edits.push((decl.span, lower_export_all(decl)));
            }
            _ => {}
        }
    }

    Ok(apply_edits(code, edits))
}

/// Splice replacements into `code`. Spans are top-level statements, so they
/// never overlap.
fn apply_edits(code: &str, mut edits: Vec<(Span, String)>) -> String {
    if edits.is_empty() {
        return code.to_string();
    }

    edits.sort_by_key(|(span, _)| span.start);

    let mut out = String::with_capacity(code.len());
    let mut cursor = 0usize;
    for (span, replacement) in edits {
        out.push_str(&code[cursor..span.start as usize]);
        out.push_str(&replacement);
        cursor = span.end as usize;
    }
    out.push_str(&code[cursor..]);
    out
}

fn lower_import(decl: &ImportDeclaration, temp_seq: &mut usize) -> String {
    let request = js_string_literal(decl.source.value.as_str());

    let specifiers: Vec<_> = decl.specifiers.iter().flatten().collect();
    if specifiers.is_empty() {
        return format!("require({request});");
    }

    let module_var = format!("__vitrine_m{temp_seq}");
    *temp_seq += 1;

    let mut out = format!("const {module_var} = require({request});");
    let mut destructured: Vec<String> = Vec::new();

    for specifier in specifiers {
        match specifier {
            ImportDeclarationSpecifier::ImportDefaultSpecifier(spec) => {
                // Interop: a module with a default slot yields the slot, a
                // bare binding object yields itself.
                out.push_str(&format!(
                    " const {local} = {module_var} && {module_var}.default !== undefined ? {module_var}.default : {module_var};",
                    local = spec.local.name.as_str()
                ));
            }
            ImportDeclarationSpecifier::ImportNamespaceSpecifier(spec) => {
                out.push_str(&format!(
                    " const {local} = {module_var};",
                    local = spec.local.name.as_str()
                ));
            }
            ImportDeclarationSpecifier::ImportSpecifier(spec) => {
                let imported = export_name(&spec.imported);
                let local = spec.local.name.as_str();
                if is_identifier(&imported) {
                    if imported == local {
                        destructured.push(imported);
                    } else {
                        destructured.push(format!("{imported}: {local}"));
                    }
                } else {
                    out.push_str(&format!(
                        " const {local} = {module_var}[{}];",
                        js_string_literal(&imported)
                    ));
                }
            }
        }
    }

    if !destructured.is_empty() {
        out.push_str(&format!(
            " const {{ {} }} = {module_var};",
            destructured.join(", ")
        ));
    }

    out
}

fn lower_export_default(decl: &ExportDefaultDeclaration, code: &str) -> String {
    match &decl.declaration {
        ExportDefaultDeclarationKind::FunctionDeclaration(func) => {
            let text = slice(code, func.span);
            match &func.id {
                Some(id) => format!("{text}\nexports.default = {};", id.name.as_str()),
                None => format!("exports.default = {text};"),
            }
        }
        ExportDefaultDeclarationKind::ClassDeclaration(class) => {
            let text = slice(code, class.span);
            match &class.id {
                Some(id) => format!("{text}\nexports.default = {};", id.name.as_str()),
                None => format!("exports.default = {text};"),
            }
        }
        kind => format!("exports.default = {};", slice(code, kind.span())),
    }
}

fn lower_export_named(
    decl: &ExportNamedDeclaration,
    code: &str,
    temp_seq: &mut usize,
) -> String {
    // `export` + declaration: keep the declaration, then mirror every bound
    // name onto the exports table.
    if let Some(declaration) = &decl.declaration {
        let mut out = slice(code, declaration.span()).to_string();
        for name in declaration_names(declaration) {
            out.push_str(&format!("\nexports.{name} = {name};"));
        }
        return out;
    }

    // Re-export from another module.
    if let Some(source) = &decl.source {
        let module_var = format!("__vitrine_m{temp_seq}");
        *temp_seq += 1;

        let mut out = format!(
            "const {module_var} = require({});",
            js_string_literal(source.value.as_str())
        );
        for specifier in &decl.specifiers {
            let local = export_name(&specifier.local);
            let exported = export_name(&specifier.exported);
            out.push_str(&format!(
                " {} = {module_var}{};",
                exports_slot(&exported),
                property_access(&local)
            ));
        }
        return out;
    }

    // Plain export list of local bindings.
    let mut out = String::new();
    for specifier in &decl.specifiers {
        let local = export_name(&specifier.local);
        let exported = export_name(&specifier.exported);
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&format!("{} = {local};", exports_slot(&exported)));
    }
    out
}

fn lower_export_all(decl: &ExportAllDeclaration) -> String {
    let request = js_string_literal(decl.source.value.as_str());
    match &decl.exported {
        Some(name) => format!(
            "{} = require({request});",
            exports_slot(&export_name(name))
        ),
        None => format!("Object.assign(exports, require({request}));"),
    }
}

/// All identifiers bound by an exported declaration, including destructuring
/// patterns.
fn declaration_names(decl: &Declaration) -> Vec<String> {
    match decl {
        Declaration::VariableDeclaration(var) => var
            .declarations
            .iter()
            .flat_map(|d| binding_names(&d.id.kind))
            .collect(),
        Declaration::FunctionDeclaration(func) => {
            func.id.iter().map(|id| id.name.to_string()).collect()
        }
        Declaration::ClassDeclaration(class) => {
            class.id.iter().map(|id| id.name.to_string()).collect()
        }
        _ => Vec::new(),
    }
}

fn binding_names(kind: &BindingPatternKind) -> Vec<String> {
    match kind {
        BindingPatternKind::BindingIdentifier(id) => vec![id.name.to_string()],
        BindingPatternKind::ObjectPattern(pattern) => {
            let mut names: Vec<String> = pattern
                .properties
                .iter()
                .flat_map(|p| binding_names(&p.value.kind))
                .collect();
            if let Some(rest) = &pattern.rest {
                names.extend(binding_names(&rest.argument.kind));
            }
            names
        }
        BindingPatternKind::ArrayPattern(pattern) => {
            let mut names: Vec<String> = pattern
                .elements
                .iter()
                .flatten()
                .flat_map(|p| binding_names(&p.kind))
                .collect();
            if let Some(rest) = &pattern.rest {
                names.extend(binding_names(&rest.argument.kind));
            }
            names
        }
        BindingPatternKind::AssignmentPattern(pattern) => binding_names(&pattern.left.kind),
    }
}

fn export_name(name: &ModuleExportName) -> String {
    match name {
        ModuleExportName::IdentifierName(n) => n.name.to_string(),
        ModuleExportName::IdentifierReference(n) => n.name.to_string(),
        ModuleExportName::StringLiteral(s) => s.value.to_string(),
    }
}

/// `exports.<name>` when the name is identifier-safe, bracket form otherwise.
fn exports_slot(name: &str) -> String {
    if is_identifier(name) {
        format!("exports.{name}")
    } else {
        format!("exports[{}]", js_string_literal(name))
    }
}

fn property_access(name: &str) -> String {
    if is_identifier(name) {
        format!(".{name}")
    } else {
        format!("[{}]", js_string_literal(name))
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn js_string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

fn slice(code: &str, span: Span) -> &str {
    &code[span.start as usize..span.end as usize]
}
