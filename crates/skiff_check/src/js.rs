//! JavaScript output.
//!
//! Types are erased, `declare` items and `const enum` declarations are
//! dropped and `const enum` member accesses are replaced by their values.
//! Imports that end up unused as values are elided. With
//! `module = "commonjs"`, imports and exports are lowered to `require` and
//! `exports`.

use std::collections::{HashMap, HashSet};

use skiff_config::{CompilerOptions, ModuleKind, Target};

use crate::analysis::ModuleInfo;
use crate::ast::*;
use crate::printer::Output;
use crate::span::LineIndex;
use crate::types::{EnumValue, Symbol};

/// Prints the JavaScript for an analyzed module.
pub fn js_output(info: &ModuleInfo, options: &CompilerOptions) -> Output {
    let mut printer = JsPrinter::new(info, options);
    printer.print();
    printer.out
}

struct JsPrinter<'a> {
    info: &'a ModuleInfo,
    index: LineIndex,
    commonjs: bool,
    es5: bool,
    used: HashSet<&'a str>,
    aliases: HashMap<&'a str, String>,
    exported_vars: HashSet<&'a str>,
    shadowed: HashSet<&'a str>,
    out: Output,
}

impl<'a> JsPrinter<'a> {
    fn new(info: &'a ModuleInfo, options: &CompilerOptions) -> Self {
        let mut used = HashSet::new();
        for item in &info.unit.items {
            collect_item_uses(item, info, &mut used);
        }
        let exported_vars = info
            .unit
            .items
            .iter()
            .filter_map(|item| match item {
                Item::Var(decl) if decl.exported && !decl.declare => Some(decl.name.text.as_str()),
                _ => None,
            })
            .collect();
        Self {
            info,
            index: LineIndex::new(&info.text),
            commonjs: options.module == ModuleKind::CommonJs && info.is_module,
            es5: options.target == Target::Es5,
            used,
            aliases: HashMap::new(),
            exported_vars,
            shadowed: HashSet::new(),
            out: Output::new(),
        }
    }

    fn keyword(&self, kind: VarKind) -> &'static str {
        if self.es5 {
            "var"
        } else {
            kind.as_str()
        }
    }

    fn line(&mut self, text: impl AsRef<str>, span: crate::span::Span) {
        self.out.mapped(text, span, &self.index);
    }

    fn print(&mut self) {
        let info = self.info;
        if self.commonjs {
            self.out.line("\"use strict\";", None);
            self.out
                .line("Object.defineProperty(exports, \"__esModule\", { value: true });", None);
            let has_star = info
                .unit
                .items
                .iter()
                .any(|item| matches!(item, Item::ExportFrom(ExportFromDecl { names: None, .. })));
            if has_star {
                self.out.line(
                    "var __exportStar = (this && this.__exportStar) || function (m, exports) {",
                    None,
                );
                self.out.indent();
                self.out.line(
                    "for (var p in m) if (p !== \"default\" && !Object.prototype.hasOwnProperty.call(exports, p)) exports[p] = m[p];",
                    None,
                );
                self.out.dedent();
                self.out.line("};", None);
            }
            for item in &info.unit.items {
                if let Item::Function(decl) = item {
                    if decl.exported && !decl.declare && decl.body.is_some() {
                        let name = &decl.name.text;
                        self.line(format!("exports.{name} = {name};"), decl.name.span);
                    }
                }
            }
        }
        let mut module_syntax = false;
        for item in &info.unit.items {
            module_syntax |= self.print_item(item);
        }
        if info.is_module && !self.commonjs && !module_syntax {
            self.out.line("export {};", None);
        }
    }

    /// Prints one item; returns `true` if it printed an import or export.
    fn print_item(&mut self, item: &'a Item) -> bool {
        match item {
            Item::Import(decl) => self.print_import(decl),
            Item::ExportFrom(decl) => self.print_export_from(decl),
            Item::ExportList(list) => self.print_export_list(list),
            Item::Var(decl) if !decl.declare => {
                let export = decl.exported && !self.commonjs;
                let init = decl.init.as_ref().map(|init| self.expr(init));
                let line = if decl.exported && self.commonjs {
                    format!(
                        "exports.{} = {};",
                        decl.name.text,
                        init.as_deref().unwrap_or("void 0")
                    )
                } else {
                    let prefix = if export { "export " } else { "" };
                    let keyword = self.keyword(decl.kind);
                    match init {
                        Some(init) => format!("{prefix}{keyword} {} = {init};", decl.name.text),
                        None => format!("{prefix}{keyword} {};", decl.name.text),
                    }
                };
                self.line(line, decl.span);
                export
            }
            Item::Function(decl) if !decl.declare => match &decl.body {
                Some(body) => {
                    let export = decl.exported && !self.commonjs;
                    self.print_function(decl, body, export);
                    export
                }
                None => false,
            },
            Item::Enum(decl) if !decl.declare && !decl.is_const => {
                let export = decl.exported && !self.commonjs;
                self.print_enum(decl, export);
                export
            }
            Item::Expr(expr, span) => {
                let text = self.expr(expr);
                self.line(format!("{text};"), *span);
                false
            }
            _ => false,
        }
    }

    fn alias(&mut self, specifier: &'a str) -> String {
        if let Some(alias) = self.aliases.get(specifier) {
            return alias.clone();
        }
        let base = specifier.rsplit('/').next().unwrap_or(specifier);
        let base = base
            .strip_suffix(".js")
            .or_else(|| base.strip_suffix(".ts"))
            .unwrap_or(base);
        let mut stem: String = base
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '$' { c } else { '_' })
            .collect();
        if stem.is_empty() || stem.starts_with(|c: char| c.is_ascii_digit()) {
            stem.insert(0, '_');
        }
        let mut n = 1;
        let alias = loop {
            let candidate = format!("{stem}_{n}");
            if !self.aliases.values().any(|taken| *taken == candidate) {
                break candidate;
            }
            n += 1;
        };
        self.aliases.insert(specifier, alias.clone());
        alias
    }

    fn print_import(&mut self, decl: &'a ImportDecl) -> bool {
        let specifier = decl.specifier.value.as_str();
        if decl.names.is_empty() {
            let line = if self.commonjs {
                format!("require(\"{specifier}\");")
            } else {
                format!("import \"{specifier}\";")
            };
            self.line(line, decl.span);
            return !self.commonjs;
        }
        let kept: Vec<&ImportName> = decl
            .names
            .iter()
            .filter(|name| {
                let local = name.local.text.as_str();
                let const_enum = self
                    .info
                    .imports
                    .get(local)
                    .and_then(|binding| binding.symbol.as_ref())
                    .is_some_and(Symbol::is_const_enum);
                !const_enum && self.used.contains(local)
            })
            .collect();
        if kept.is_empty() {
            return false;
        }
        if self.commonjs {
            let alias = self.alias(specifier);
            let keyword = self.keyword(VarKind::Const);
            self.line(format!("{keyword} {alias} = require(\"{specifier}\");"), decl.span);
            return false;
        }
        let names: Vec<String> = kept
            .iter()
            .map(|name| pair(&name.imported.text, &name.local.text))
            .collect();
        self.line(
            format!("import {{ {} }} from \"{specifier}\";", names.join(", ")),
            decl.span,
        );
        true
    }

    fn print_export_from(&mut self, decl: &'a ExportFromDecl) -> bool {
        let specifier = decl.specifier.value.as_str();
        let Some(names) = &decl.names else {
            let line = if self.commonjs {
                format!("__exportStar(require(\"{specifier}\"), exports);")
            } else {
                format!("export * from \"{specifier}\";")
            };
            self.line(line, decl.span);
            return !self.commonjs;
        };
        let info = self.info;
        let kept: Vec<&ExportName> = names
            .iter()
            .filter(|name| {
                !info
                    .reexports
                    .iter()
                    .any(|(exported, symbol)| *exported == name.exported.text && symbol.is_const_enum())
            })
            .collect();
        if kept.is_empty() {
            return false;
        }
        if self.commonjs {
            let alias = self.alias(specifier);
            let keyword = self.keyword(VarKind::Const);
            self.line(format!("{keyword} {alias} = require(\"{specifier}\");"), decl.span);
            for name in kept {
                self.line(
                    format!(
                        "Object.defineProperty(exports, \"{}\", {{ enumerable: true, get: function () {{ return {alias}.{}; }} }});",
                        name.exported.text, name.local.text
                    ),
                    decl.span,
                );
            }
            return false;
        }
        let list: Vec<String> = kept
            .iter()
            .map(|name| pair(&name.local.text, &name.exported.text))
            .collect();
        self.line(
            format!("export {{ {} }} from \"{specifier}\";", list.join(", ")),
            decl.span,
        );
        true
    }

    fn print_export_list(&mut self, list: &'a ExportListDecl) -> bool {
        let info = self.info;
        let kept: Vec<&ExportName> = list
            .names
            .iter()
            .filter(|name| has_runtime_value(info, &name.local.text))
            .collect();
        if kept.is_empty() {
            return false;
        }
        if self.commonjs {
            for name in kept {
                let value = self.ident(&name.local.text);
                self.line(format!("exports.{} = {value};", name.exported.text), list.span);
            }
            return false;
        }
        let names: Vec<String> = kept
            .iter()
            .map(|name| pair(&name.local.text, &name.exported.text))
            .collect();
        self.line(format!("export {{ {} }};", names.join(", ")), list.span);
        true
    }

    fn print_function(&mut self, decl: &'a FunctionDecl, body: &'a [Stmt], export: bool) {
        let params: Vec<&str> = decl.params.iter().map(|p| p.name.text.as_str()).collect();
        let saved = std::mem::take(&mut self.shadowed);
        self.shadowed.extend(params.iter().copied());
        for stmt in body {
            if let Stmt::Var(var) = stmt {
                self.shadowed.insert(var.name.text.as_str());
            }
        }
        let prefix = if export { "export " } else { "" };
        self.line(
            format!("{prefix}function {}({}) {{", decl.name.text, params.join(", ")),
            decl.span,
        );
        self.out.indent();
        for stmt in body {
            let line = match stmt {
                Stmt::Var(var) => {
                    let keyword = self.keyword(var.kind);
                    match &var.init {
                        Some(init) => format!("{keyword} {} = {};", var.name.text, self.expr(init)),
                        None => format!("{keyword} {};", var.name.text),
                    }
                }
                Stmt::Return(Some(value), _) => format!("return {};", self.expr(value)),
                Stmt::Return(None, _) => "return;".to_string(),
                Stmt::Expr(expr, _) => format!("{};", self.expr(expr)),
                Stmt::Error(_) => continue,
            };
            self.line(line, stmt.span());
        }
        self.out.dedent();
        self.out.line("}", None);
        self.shadowed = saved;
    }

    fn print_enum(&mut self, decl: &'a EnumDecl, export: bool) {
        let name = &decl.name.text;
        let prefix = if export { "export " } else { "" };
        self.line(format!("{prefix}var {name};"), decl.span);
        self.line(format!("(function ({name}) {{"), decl.span);
        self.out.indent();
        let values = match self.info.symbols.get(name.as_str()) {
            Some(Symbol::Enum(info)) => Some(info.clone()),
            _ => None,
        };
        for member in &decl.members {
            let key = &member.name.text;
            if key.is_empty() {
                continue;
            }
            let value = values
                .as_ref()
                .and_then(|info| info.member(key).cloned().flatten());
            let line = match value {
                Some(EnumValue::String(text)) => format!("{name}[\"{key}\"] = {text};"),
                Some(number) => format!("{name}[{name}[\"{key}\"] = {number}] = \"{key}\";"),
                None => {
                    let init = member
                        .init
                        .as_ref()
                        .map_or_else(|| "void 0".to_string(), |init| self.expr(init));
                    format!("{name}[{name}[\"{key}\"] = {init}] = \"{key}\";")
                }
            };
            self.line(line, member.name.span);
        }
        self.out.dedent();
        let target = if decl.exported && self.commonjs {
            format!("exports.{name} = {name} = {{}}")
        } else {
            format!("{name} = {{}}")
        };
        self.out.line(format!("}})({name} || ({target}));"), None);
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// Rewrites a module-scope name for CommonJS.
    fn ident(&mut self, name: &str) -> String {
        if !self.commonjs || self.shadowed.contains(name) {
            return name.to_string();
        }
        if self.exported_vars.contains(name) {
            return format!("exports.{name}");
        }
        let info = self.info;
        match info.imports.get(name) {
            Some(binding) if !info.symbols.contains_key(name) => {
                let alias = self.alias(&binding.specifier);
                format!("{alias}.{}", binding.imported)
            }
            _ => name.to_string(),
        }
    }

    fn expr(&mut self, expr: &Expr) -> String {
        match expr {
            Expr::Number(raw, _) => raw.clone(),
            Expr::String(lit) => lit.raw.clone(),
            Expr::Bool(value, _) => value.to_string(),
            Expr::Ident(name) => self.ident(&name.text),
            Expr::Paren(inner, _) => format!("({})", self.expr(inner)),
            Expr::Error(_) => String::new(),
            Expr::Member {
                object,
                property,
                span,
            } => {
                if let Some(value) = self.info.inlined.get(span) {
                    let object = match object.as_ref() {
                        Expr::Ident(name) => name.text.as_str(),
                        _ => "",
                    };
                    return format!("{value} /* {object}.{} */", property.text);
                }
                format!("{}.{}", self.expr(object), property.text)
            }
            Expr::Call { callee, args, .. } => {
                let mut callee_text = self.expr(callee);
                if let Expr::Ident(name) = callee.as_ref() {
                    if callee_text != name.text && !callee_text.starts_with("exports.") {
                        callee_text = format!("(0, {callee_text})");
                    }
                }
                let args: Vec<String> = args.iter().map(|arg| self.expr(arg)).collect();
                format!("{callee_text}({})", args.join(", "))
            }
            Expr::Unary { op, operand, .. } => {
                let operand = self.expr(operand);
                match op {
                    UnaryOp::Neg => format!("-{operand}"),
                    UnaryOp::Not => format!("!{operand}"),
                }
            }
            Expr::Binary { op, lhs, rhs, .. } => {
                format!("{} {} {}", self.expr(lhs), op.as_str(), self.expr(rhs))
            }
        }
    }
}

fn pair(first: &str, second: &str) -> String {
    if first == second {
        first.to_string()
    } else {
        format!("{first} as {second}")
    }
}

/// Returns `false` for names that only exist at the type level.
fn has_runtime_value(info: &ModuleInfo, name: &str) -> bool {
    let declared_only = info.unit.items.iter().any(|item| match item {
        Item::Var(decl) => decl.declare && decl.name.text == name,
        Item::Function(decl) => (decl.declare || decl.body.is_none()) && decl.name.text == name,
        Item::Enum(decl) => (decl.declare || decl.is_const) && decl.name.text == name,
        _ => false,
    });
    !declared_only && !info.lookup(name).is_some_and(Symbol::is_const_enum)
}

fn collect_item_uses<'a>(item: &'a Item, info: &ModuleInfo, used: &mut HashSet<&'a str>) {
    match item {
        Item::Var(decl) if !decl.declare => {
            if let Some(init) = &decl.init {
                collect_uses(init, info, used);
            }
        }
        Item::Function(FunctionDecl {
            declare: false,
            body: Some(body),
            ..
        }) => {
            for stmt in body {
                match stmt {
                    Stmt::Var(VarDecl { init: Some(expr), .. })
                    | Stmt::Return(Some(expr), _)
                    | Stmt::Expr(expr, _) => collect_uses(expr, info, used),
                    _ => {}
                }
            }
        }
        Item::Enum(decl) if !decl.declare && !decl.is_const => {
            for member in &decl.members {
                if let Some(init) = &member.init {
                    collect_uses(init, info, used);
                }
            }
        }
        Item::Expr(expr, _) => collect_uses(expr, info, used),
        Item::ExportList(list) => {
            used.extend(list.names.iter().map(|name| name.local.text.as_str()));
        }
        _ => {}
    }
}

fn collect_uses<'a>(expr: &'a Expr, info: &ModuleInfo, used: &mut HashSet<&'a str>) {
    match expr {
        Expr::Ident(name) => {
            used.insert(&name.text);
        }
        Expr::Member { span, .. } if info.inlined.contains_key(span) => {}
        Expr::Member { object, .. } => collect_uses(object, info, used),
        Expr::Call { callee, args, .. } => {
            collect_uses(callee, info, used);
            for arg in args {
                collect_uses(arg, info, used);
            }
        }
        Expr::Unary { operand, .. } => collect_uses(operand, info, used),
        Expr::Binary { lhs, rhs, .. } => {
            collect_uses(lhs, info, used);
            collect_uses(rhs, info, used);
        }
        Expr::Paren(inner, _) => collect_uses(inner, info, used),
        Expr::Number(..) | Expr::String(_) | Expr::Bool(..) | Expr::Error(_) => {}
    }
}
