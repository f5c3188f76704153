//! Declaration (`.d.ts`) output and the signature text derived from it.

use std::collections::BTreeSet;

use crate::analysis::ModuleInfo;
use crate::ast::*;
use crate::printer::Output;
use crate::span::LineIndex;
use crate::types::{write_params, Symbol};

/// Prints the declaration file of an analyzed module.
pub fn declaration_output(info: &ModuleInfo) -> Output {
    let index = LineIndex::new(&info.text);
    let items = &info.unit.items;

    // Locals that appear in export lists are printed without `export`, as are
    // local enums that printed types refer to.
    let mut needed: BTreeSet<&str> = BTreeSet::new();
    for item in items {
        if let Item::ExportList(list) = item {
            needed.extend(list.names.iter().map(|name| name.local.text.as_str()));
        }
    }
    let mut mentioned = Vec::new();
    for item in items {
        if let Some((name, exported)) = declared_name(item) {
            if exported || needed.contains(name) || !info.is_module {
                if let Some(symbol) = info.symbols.get(name) {
                    symbol_enum_names(symbol, &mut mentioned);
                }
            }
        }
    }
    needed.extend(mentioned.iter().copied());

    let mut referenced: Vec<&str> = Vec::new();
    let mut printed: BTreeSet<&str> = BTreeSet::new();
    let mut has_export = false;
    let mut body = Output::new();
    for item in items {
        match item {
            Item::ExportFrom(decl) => {
                has_export = true;
                let line = match &decl.names {
                    Some(names) => format!(
                        "export {{ {} }} from \"{}\";",
                        export_names(names),
                        decl.specifier.value
                    ),
                    None => format!("export * from \"{}\";", decl.specifier.value),
                };
                body.mapped(line, decl.span, &index);
            }
            Item::ExportList(list) => {
                has_export = true;
                body.mapped(format!("export {{ {} }};", export_names(&list.names)), list.span, &index);
            }
            _ => {
                let Some((name, exported)) = declared_name(item) else {
                    continue;
                };
                let prefix = if !info.is_module {
                    "declare "
                } else if exported {
                    "export declare "
                } else if needed.contains(name) {
                    "declare "
                } else {
                    continue;
                };
                let Some(symbol) = info.symbols.get(name) else {
                    continue;
                };
                if !printed.insert(name) {
                    continue;
                }
                has_export |= exported;
                symbol_enum_names(symbol, &mut referenced);
                print_declaration(&mut body, item, prefix, symbol, &index);
            }
        }
    }

    let mut out = Output::new();
    for reference in &info.unit.references {
        out.mapped(
            format!("/// <reference path=\"{}\" />", reference.text),
            reference.span,
            &index,
        );
    }
    for item in items {
        let Item::Import(import) = item else {
            continue;
        };
        let kept: Vec<&ImportName> = import
            .names
            .iter()
            .filter(|name| referenced.contains(&name.local.text.as_str()))
            .collect();
        if !kept.is_empty() {
            let names: Vec<String> = kept
                .iter()
                .map(|name| name_pair(&name.imported.text, &name.local.text))
                .collect();
            out.mapped(
                format!("import {{ {} }} from \"{}\";", names.join(", "), import.specifier.value),
                import.span,
                &index,
            );
        }
    }
    out.append(body);
    if info.is_module && !has_export {
        out.line("export {};", None);
    }
    out
}

/// The text whose hash is the file's signature: the declaration output plus
/// the resolved shape of every re-exported name, so an edit behind a
/// re-export is visible to the re-exporting file's dependents.
pub fn signature_text(info: &ModuleInfo) -> String {
    let mut text = declaration_output(info).text();
    for (name, symbol) in &info.reexports {
        text.push_str(&format!("//# shape {name}: {}\n", symbol.shape()));
    }
    text
}

fn declared_name(item: &Item) -> Option<(&str, bool)> {
    let (name, exported) = match item {
        Item::Var(decl) => (&decl.name, decl.exported),
        Item::Function(decl) => (&decl.name, decl.exported),
        Item::Enum(decl) => (&decl.name, decl.exported),
        _ => return None,
    };
    (!name.text.is_empty()).then_some((name.text.as_str(), exported))
}

fn symbol_enum_names<'a>(symbol: &'a Symbol, out: &mut Vec<&'a str>) {
    match symbol {
        Symbol::Value { ty, .. } => ty.enum_names(out),
        Symbol::Function(sig) => {
            for (_, param) in &sig.params {
                param.enum_names(out);
            }
            sig.ret.enum_names(out);
        }
        Symbol::Enum(_) => {}
    }
}

fn print_declaration(out: &mut Output, item: &Item, prefix: &str, symbol: &Symbol, index: &LineIndex) {
    match (item, symbol) {
        (Item::Var(decl), Symbol::Value { ty, is_const }) => {
            let line = if *is_const && ty.is_literal() {
                format!("{prefix}const {} = {ty};", decl.name.text)
            } else {
                format!("{prefix}{} {}: {ty};", decl.kind.as_str(), decl.name.text)
            };
            out.mapped(line, decl.span, index);
        }
        (Item::Function(decl), Symbol::Function(sig)) => {
            let mut params = String::new();
            // Writing into a String cannot fail.
            let _ = write_params(&mut params, &sig.params);
            out.mapped(
                format!("{prefix}function {}({params}): {};", decl.name.text, sig.ret),
                decl.span,
                index,
            );
        }
        (Item::Enum(decl), Symbol::Enum(info)) => {
            let keyword = if info.is_const { "const enum" } else { "enum" };
            out.mapped(format!("{prefix}{keyword} {} {{", decl.name.text), decl.span, index);
            out.indent();
            let count = info.members.len();
            for (i, (name, value)) in info.members.iter().enumerate() {
                let comma = if i + 1 < count { "," } else { "" };
                let line = match value {
                    Some(value) => format!("{name} = {value}{comma}"),
                    None => format!("{name}{comma}"),
                };
                let span = decl
                    .members
                    .iter()
                    .find(|member| &member.name.text == name)
                    .map_or(decl.span, |member| member.name.span);
                out.mapped(line, span, index);
            }
            out.dedent();
            out.line("}", None);
        }
        _ => {}
    }
}

fn name_pair(first: &str, second: &str) -> String {
    if first == second {
        first.to_string()
    } else {
        format!("{first} as {second}")
    }
}

fn export_names(names: &[ExportName]) -> String {
    names
        .iter()
        .map(|name| name_pair(&name.local.text, &name.exported.text))
        .collect::<Vec<_>>()
        .join(", ")
}
