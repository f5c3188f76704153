//! Name resolution and type checking.
//!
//! An [`Analyzer`] checks one file at a time and memoizes the result, so the
//! files a checked file imports are analyzed once per analyzer. Module-scope
//! declarations are typed on demand: a `const` initializer calling a
//! function declared further down types that function first. Cycles between
//! declarations or between files resolve to `any` instead of looping.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;

use skiff_incremental::{FileId, ProgramView};

use crate::ast::*;
use crate::codes::*;
use crate::parser::parse;
use crate::span::Span;
use crate::types::{normalize_number, quote_string, EnumInfo, EnumValue, FnSig, Symbol, Ty};

/// Names every file can use without importing them.
const BUILTINS: &[&str] = &["console", "Math", "JSON", "undefined", "NaN", "Infinity"];

/// An imported name.
#[derive(Clone, Debug)]
pub struct ImportBinding {
    /// The module specifier as written.
    pub specifier: String,
    /// The exported name in the target module.
    pub imported: String,
    /// What it refers to; `None` if the target is missing, lacks the name, or
    /// was still being analyzed.
    pub symbol: Option<Symbol>,
}

/// Everything known about one analyzed file.
#[derive(Debug)]
pub struct ModuleInfo {
    pub file: FileId,
    pub path: String,
    pub text: String,
    pub unit: SourceUnit,
    pub is_module: bool,
    /// Problems in this file, ordered by position.
    pub problems: Vec<Problem>,
    /// Module-scope declarations.
    pub symbols: BTreeMap<String, Symbol>,
    /// Imported names by local name.
    pub imports: BTreeMap<String, ImportBinding>,
    /// Exported names, re-exports included.
    pub exports: BTreeMap<String, Symbol>,
    /// Names re-exported from other modules, in source order.
    pub reexports: Vec<(String, Symbol)>,
    /// Values of `const enum` member accesses, keyed by the access span.
    pub inlined: HashMap<Span, EnumValue>,
}

impl ModuleInfo {
    /// Looks up a module-scope name, declarations first.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.symbols
            .get(name)
            .or_else(|| self.imports.get(name).and_then(|b| b.symbol.as_ref()))
    }
}

/// Analyzes files of one program, memoizing per file.
pub struct Analyzer<'p> {
    program: &'p dyn ProgramView,
    modules: HashMap<FileId, Rc<ModuleInfo>>,
    in_progress: HashSet<FileId>,
    globals: Option<Rc<BTreeMap<String, Symbol>>>,
}

impl<'p> Analyzer<'p> {
    /// Creates an analyzer over `program`.
    pub fn new(program: &'p dyn ProgramView) -> Self {
        Self {
            program,
            modules: HashMap::new(),
            in_progress: HashSet::new(),
            globals: None,
        }
    }

    /// Analyzes `file`. Returns `None` if the file is not in the program or
    /// is already being analyzed further up an import cycle.
    pub fn analyze(&mut self, file: FileId) -> Option<Rc<ModuleInfo>> {
        if let Some(info) = self.modules.get(&file) {
            return Some(Rc::clone(info));
        }
        let program = self.program;
        let path = program.file_path(file)?;
        let text = program.file_text(file)?;
        if !self.in_progress.insert(file) {
            return None;
        }
        tracing::trace!(target: "skiff.check", path, "analyzing");
        let globals = self.globals();
        let (unit, problems) = parse(text);
        let info = FileChecker::new(self, file, &unit, globals, problems).run();
        self.in_progress.remove(&file);
        let info = Rc::new(ModuleInfo {
            file,
            path: path.to_string(),
            text: text.to_string(),
            is_module: unit.is_module(),
            unit,
            ..info
        });
        self.modules.insert(file, Rc::clone(&info));
        Some(info)
    }

    /// Top-level declarations of every script file. Scripts are typed in
    /// isolation, so a global referring to another global is `any` here.
    fn globals(&mut self) -> Rc<BTreeMap<String, Symbol>> {
        if let Some(globals) = &self.globals {
            return Rc::clone(globals);
        }
        let mut map = BTreeMap::new();
        for file in self.program.global_files() {
            let mut scratch = Analyzer {
                program: self.program,
                modules: HashMap::new(),
                in_progress: HashSet::new(),
                globals: Some(Rc::new(BTreeMap::new())),
            };
            let Some(info) = scratch.analyze(file) else {
                continue;
            };
            if info.is_module {
                continue;
            }
            for (name, symbol) in &info.symbols {
                map.entry(name.clone()).or_insert_with(|| symbol.clone());
            }
        }
        let globals = Rc::new(map);
        self.globals = Some(Rc::clone(&globals));
        globals
    }
}

#[derive(Clone, Copy)]
enum DeclKind<'u> {
    Var(&'u VarDecl),
    Function(&'u FunctionDecl),
    Enum(&'u EnumDecl),
}

enum State {
    Pending,
    InProgress,
    Done(Symbol),
}

struct Decl<'u> {
    name: &'u str,
    kind: DeclKind<'u>,
    state: State,
}

struct LocalVar {
    ty: Ty,
    /// End of the declaration; earlier uses are errors. Zero for parameters.
    end: u32,
}

#[derive(Default)]
struct Frame {
    locals: HashMap<String, LocalVar>,
    declared_ret: Option<Ty>,
    returns: Vec<Ty>,
}

struct FileChecker<'a, 'p, 'u> {
    analyzer: &'a mut Analyzer<'p>,
    file: FileId,
    unit: &'u SourceUnit,
    globals: Rc<BTreeMap<String, Symbol>>,
    problems: Vec<Problem>,
    decls: Vec<Decl<'u>>,
    by_name: HashMap<&'u str, usize>,
    imports: BTreeMap<String, ImportBinding>,
    inlined: HashMap<Span, EnumValue>,
    deferred_bodies: Vec<(&'u FunctionDecl, FnSig)>,
    frame: Option<Frame>,
}

impl<'a, 'p, 'u> FileChecker<'a, 'p, 'u> {
    fn new(
        analyzer: &'a mut Analyzer<'p>,
        file: FileId,
        unit: &'u SourceUnit,
        globals: Rc<BTreeMap<String, Symbol>>,
        problems: Vec<Problem>,
    ) -> Self {
        Self {
            analyzer,
            file,
            unit,
            globals,
            problems,
            decls: Vec::new(),
            by_name: HashMap::new(),
            imports: BTreeMap::new(),
            inlined: HashMap::new(),
            deferred_bodies: Vec::new(),
            frame: None,
        }
    }

    fn error(&mut self, code: skiff_diagnostics::DiagnosticCode, message: String, span: Span) {
        self.problems.push(Problem::new(code, message, span));
    }

    /// Runs every pass. Path, text and unit are filled in by the caller.
    fn run(mut self) -> ModuleInfo {
        let unit = self.unit;
        self.register(unit);
        for idx in 0..self.decls.len() {
            self.symbol_of(idx);
        }
        for (decl, sig) in std::mem::take(&mut self.deferred_bodies) {
            self.check_body(decl, &sig.params, Some(sig.ret.clone()));
        }
        for item in &unit.items {
            if let Item::Expr(expr, _) = item {
                self.type_of(expr);
            }
        }
        let (exports, reexports) = self.collect_exports(unit);

        let mut symbols = BTreeMap::new();
        for idx in 0..self.decls.len() {
            let name = self.decls[idx].name;
            let symbol = self.symbol_of(idx);
            symbols.entry(name.to_string()).or_insert(symbol);
        }
        let mut problems = self.problems;
        problems.sort_by_key(|problem| problem.span.start);
        ModuleInfo {
            file: self.file,
            path: String::new(),
            text: String::new(),
            unit: SourceUnit::default(),
            is_module: false,
            problems,
            symbols,
            imports: self.imports,
            exports,
            reexports,
            inlined: self.inlined,
        }
    }

    // ========================================================================
    // Declarations and imports
    // ========================================================================

    fn register(&mut self, unit: &'u SourceUnit) {
        for item in &unit.items {
            let (name, kind) = match item {
                Item::Var(decl) => (&decl.name, DeclKind::Var(decl)),
                Item::Function(decl) => (&decl.name, DeclKind::Function(decl)),
                Item::Enum(decl) => (&decl.name, DeclKind::Enum(decl)),
                Item::Import(decl) => {
                    self.register_import(decl);
                    continue;
                }
                _ => continue,
            };
            if name.text.is_empty() {
                continue;
            }
            if self.check_unique(name) {
                self.by_name.insert(name.text.as_str(), self.decls.len());
            }
            self.decls.push(Decl {
                name: &name.text,
                kind,
                state: State::Pending,
            });
        }
    }

    /// Reports a redeclaration; returns `true` if `name` is new.
    fn check_unique(&mut self, name: &Name) -> bool {
        if self.by_name.contains_key(name.text.as_str()) || self.imports.contains_key(&name.text) {
            self.error(
                REDECLARED,
                format!("Cannot redeclare block-scoped variable '{}'.", name.text),
                name.span,
            );
            return false;
        }
        true
    }

    fn resolve_module(&mut self, specifier: &StringLit) -> Option<Rc<ModuleInfo>> {
        let Some(target) = self.analyzer.program.resolve(self.file, &specifier.value) else {
            self.error(
                CANNOT_FIND_MODULE,
                format!(
                    "Cannot find module '{}' or its corresponding type declarations.",
                    specifier.value
                ),
                specifier.span,
            );
            return None;
        };
        self.analyzer.analyze(target)
    }

    /// Looks up `name` in a module's exports, reporting a missing member.
    fn exported(&mut self, module: &ModuleInfo, specifier: &StringLit, name: &Name) -> Option<Symbol> {
        let symbol = module.exports.get(&name.text).cloned();
        if symbol.is_none() {
            self.error(
                NO_EXPORTED_MEMBER,
                format!(
                    "Module '\"{}\"' has no exported member '{}'.",
                    specifier.value, name.text
                ),
                name.span,
            );
        }
        symbol
    }

    fn register_import(&mut self, decl: &ImportDecl) {
        let module = self.resolve_module(&decl.specifier);
        for name in &decl.names {
            if name.local.text.is_empty() {
                continue;
            }
            let symbol = match &module {
                Some(module) => self.exported(module, &decl.specifier, &name.imported),
                None => None,
            };
            if self.check_unique(&name.local) {
                self.imports.insert(
                    name.local.text.clone(),
                    ImportBinding {
                        specifier: decl.specifier.value.clone(),
                        imported: name.imported.text.clone(),
                        symbol,
                    },
                );
            }
        }
    }

    fn collect_exports(&mut self, unit: &'u SourceUnit) -> (BTreeMap<String, Symbol>, Vec<(String, Symbol)>) {
        let mut exports = BTreeMap::new();
        let mut reexports = Vec::new();
        let mut stars = Vec::new();
        for item in &unit.items {
            match item {
                Item::Var(VarDecl { exported: true, name, .. })
                | Item::Function(FunctionDecl { exported: true, name, .. })
                | Item::Enum(EnumDecl { exported: true, name, .. }) => {
                    if let Some(&idx) = self.by_name.get(name.text.as_str()) {
                        let symbol = self.symbol_of(idx);
                        exports.insert(name.text.clone(), symbol);
                    }
                }
                Item::ExportList(list) => {
                    for name in &list.names {
                        let symbol = match self.by_name.get(name.local.text.as_str()) {
                            Some(&idx) => Some(self.symbol_of(idx)),
                            None => match self.imports.get(&name.local.text) {
                                Some(binding) => binding.symbol.clone(),
                                None => {
                                    self.error(
                                        CANNOT_FIND_NAME,
                                        format!("Cannot find name '{}'.", name.local.text),
                                        name.local.span,
                                    );
                                    None
                                }
                            },
                        };
                        exports.insert(
                            name.exported.text.clone(),
                            symbol.unwrap_or_else(|| Symbol::constant(Ty::Any)),
                        );
                    }
                }
                Item::ExportFrom(decl) => {
                    let module = self.resolve_module(&decl.specifier);
                    match (&decl.names, module) {
                        (Some(names), module) => {
                            for name in names {
                                let symbol = match &module {
                                    Some(module) => self.exported(module, &decl.specifier, &name.local),
                                    None => None,
                                };
                                let symbol = symbol.unwrap_or_else(|| Symbol::constant(Ty::Any));
                                reexports.push((name.exported.text.clone(), symbol.clone()));
                                exports.insert(name.exported.text.clone(), symbol);
                            }
                        }
                        (None, Some(module)) => stars.push(module),
                        (None, None) => {}
                    }
                }
                _ => {}
            }
        }
        for module in stars {
            for (name, symbol) in &module.exports {
                if !exports.contains_key(name) {
                    exports.insert(name.clone(), symbol.clone());
                    reexports.push((name.clone(), symbol.clone()));
                }
            }
        }
        (exports, reexports)
    }

    // ========================================================================
    // Symbols
    // ========================================================================

    fn symbol_of(&mut self, idx: usize) -> Symbol {
        match &self.decls[idx].state {
            State::Done(symbol) => return symbol.clone(),
            State::InProgress => return Symbol::constant(Ty::Any),
            State::Pending => {}
        }
        self.decls[idx].state = State::InProgress;
        let saved = self.frame.take();
        let kind = self.decls[idx].kind;
        let symbol = match kind {
            DeclKind::Var(decl) => Symbol::Value {
                ty: self.var_type(decl),
                is_const: decl.kind == VarKind::Const,
            },
            DeclKind::Function(decl) => Symbol::Function(self.function_sig(decl)),
            DeclKind::Enum(decl) => Symbol::Enum(Rc::new(self.enum_info(decl))),
        };
        self.frame = saved;
        self.decls[idx].state = State::Done(symbol.clone());
        symbol
    }

    fn var_type(&mut self, decl: &VarDecl) -> Ty {
        let declared = decl.ty.as_ref().map(|ty| self.resolve_type(ty));
        let init = decl.init.as_ref().map(|init| (self.type_of(init), init.span()));
        if let (Some(target), Some((ty, span))) = (&declared, &init) {
            if !ty.assignable_to(target) {
                self.error(
                    NOT_ASSIGNABLE,
                    format!("Type '{ty}' is not assignable to type '{target}'."),
                    *span,
                );
            }
        }
        match (declared, init) {
            (Some(ty), _) => ty,
            (None, Some((ty, _))) if decl.kind == VarKind::Const => ty,
            (None, Some((ty, _))) => ty.widen(),
            (None, None) => Ty::Any,
        }
    }

    fn function_sig(&mut self, decl: &'u FunctionDecl) -> FnSig {
        let params: Vec<(String, Ty)> = decl
            .params
            .iter()
            .filter(|param| !param.name.text.is_empty())
            .map(|param| {
                let ty = param.ty.as_ref().map_or(Ty::Any, |ty| self.resolve_type(ty));
                (param.name.text.clone(), ty)
            })
            .collect();
        match &decl.ret {
            Some(ret) => {
                let sig = FnSig {
                    params,
                    ret: self.resolve_type(ret),
                };
                self.deferred_bodies.push((decl, sig.clone()));
                sig
            }
            None => {
                let ret = self.check_body(decl, &params, None);
                FnSig { params, ret }
            }
        }
    }

    /// Checks a function body and returns its return type.
    fn check_body(&mut self, decl: &FunctionDecl, params: &[(String, Ty)], declared: Option<Ty>) -> Ty {
        let Some(body) = &decl.body else {
            return declared.unwrap_or(Ty::Any);
        };
        let mut frame = Frame {
            declared_ret: declared.clone(),
            ..Frame::default()
        };
        for (name, ty) in params {
            frame.locals.insert(name.clone(), LocalVar { ty: ty.clone(), end: 0 });
        }
        let saved = self.frame.replace(frame);
        for stmt in body {
            if let Stmt::Var(var) = stmt {
                if var.name.text.is_empty() {
                    continue;
                }
                let exists = self
                    .frame
                    .as_ref()
                    .is_some_and(|frame| frame.locals.get(&var.name.text).is_some_and(|l| l.end > 0));
                if exists {
                    self.error(
                        REDECLARED,
                        format!("Cannot redeclare block-scoped variable '{}'.", var.name.text),
                        var.name.span,
                    );
                    continue;
                }
                if let Some(frame) = &mut self.frame {
                    frame.locals.insert(
                        var.name.text.clone(),
                        LocalVar {
                            ty: Ty::Any,
                            end: var.span.end,
                        },
                    );
                }
            }
        }
        for stmt in body {
            match stmt {
                Stmt::Var(var) => {
                    let ty = self.var_type(var);
                    if let Some(local) = self
                        .frame
                        .as_mut()
                        .and_then(|frame| frame.locals.get_mut(&var.name.text))
                    {
                        local.ty = ty;
                    }
                }
                Stmt::Return(value, span) => {
                    let ty = value.as_ref().map_or(Ty::Void, |value| self.type_of(value));
                    let declared = self.frame.as_ref().and_then(|frame| frame.declared_ret.clone());
                    if let Some(target) = declared {
                        if !ty.assignable_to(&target) {
                            let span = value.as_ref().map_or(*span, Expr::span);
                            self.error(
                                NOT_ASSIGNABLE,
                                format!("Type '{ty}' is not assignable to type '{target}'."),
                                span,
                            );
                        }
                    }
                    if let Some(frame) = &mut self.frame {
                        frame.returns.push(ty);
                    }
                }
                Stmt::Expr(expr, _) => {
                    self.type_of(expr);
                }
                Stmt::Error(_) => {}
            }
        }
        let frame = std::mem::replace(&mut self.frame, saved);
        match declared {
            Some(ty) => ty,
            None => frame
                .and_then(|frame| frame.returns.into_iter().next())
                .map_or(Ty::Void, |ty| ty.widen()),
        }
    }

    fn enum_info(&mut self, decl: &EnumDecl) -> EnumInfo {
        let mut members: Vec<(String, Option<EnumValue>)> = Vec::new();
        let mut next = Some(0.0);
        for member in &decl.members {
            if member.name.text.is_empty() {
                continue;
            }
            let value = match &member.init {
                None => match next {
                    Some(value) => Some(EnumValue::Number(value)),
                    None => {
                        self.error(
                            NON_CONSTANT_ENUM_MEMBER,
                            "Enum member must have initializer.".to_string(),
                            member.name.span,
                        );
                        None
                    }
                },
                Some(init) => match const_eval(init, &decl.name.text, &members) {
                    Some(value) => Some(value),
                    None => {
                        let before = self.problems.len();
                        self.type_of(init);
                        if self.problems.len() == before {
                            self.error(
                                NON_CONSTANT_ENUM_MEMBER,
                                "Enum member initializers must be constant expressions.".to_string(),
                                init.span(),
                            );
                        }
                        None
                    }
                },
            };
            next = match &value {
                Some(EnumValue::Number(value)) => Some(value + 1.0),
                _ => None,
            };
            members.push((member.name.text.clone(), value));
        }
        EnumInfo {
            name: decl.name.text.clone(),
            is_const: decl.is_const,
            members,
        }
    }

    // ========================================================================
    // Names and types
    // ========================================================================

    fn resolve_name(&mut self, name: &Name) -> Symbol {
        let pos = name.span.start;
        if let Some(local) = self.frame.as_ref().and_then(|frame| frame.locals.get(&name.text)) {
            let ty = local.ty.clone();
            if pos < local.end {
                self.used_before_declaration(name);
            }
            return Symbol::Value { ty, is_const: false };
        }
        if let Some(&idx) = self.by_name.get(name.text.as_str()) {
            if let DeclKind::Var(decl) = self.decls[idx].kind {
                if self.frame.is_none() && pos < decl.span.end {
                    self.used_before_declaration(name);
                    return Symbol::constant(Ty::Any);
                }
            }
            return self.symbol_of(idx);
        }
        if let Some(binding) = self.imports.get(&name.text) {
            return binding.symbol.clone().unwrap_or_else(|| Symbol::constant(Ty::Any));
        }
        if let Some(symbol) = self.globals.get(&name.text) {
            return symbol.clone();
        }
        match name.text.as_str() {
            "NaN" | "Infinity" => return Symbol::constant(Ty::Number),
            text if BUILTINS.contains(&text) => return Symbol::constant(Ty::Any),
            _ => {}
        }
        self.error(
            CANNOT_FIND_NAME,
            format!("Cannot find name '{}'.", name.text),
            name.span,
        );
        Symbol::constant(Ty::Any)
    }

    fn used_before_declaration(&mut self, name: &Name) {
        self.error(
            USED_BEFORE_DECLARATION,
            format!("Block-scoped variable '{}' used before its declaration.", name.text),
            name.span,
        );
    }

    fn resolve_type(&mut self, ann: &TypeAnn) -> Ty {
        match ann {
            TypeAnn::Number(_) => Ty::Number,
            TypeAnn::String(_) => Ty::String,
            TypeAnn::Boolean(_) => Ty::Boolean,
            TypeAnn::Void(_) => Ty::Void,
            TypeAnn::Any(_) | TypeAnn::Error(_) => Ty::Any,
            TypeAnn::NumberLit(raw, _) => Ty::NumberLit(normalize_number(raw)),
            TypeAnn::StringLit(lit) => Ty::StringLit(quote_string(&lit.value)),
            TypeAnn::BoolLit(value, _) => Ty::BoolLit(*value),
            TypeAnn::Named(name) => {
                let symbol = match self.by_name.get(name.text.as_str()) {
                    Some(&idx) => match self.decls[idx].kind {
                        DeclKind::Enum(_) => return Ty::Enum(name.text.clone()),
                        _ => None,
                    },
                    None => match self.imports.get(&name.text) {
                        Some(binding) if binding.symbol.is_none() => return Ty::Any,
                        Some(binding) => binding.symbol.clone(),
                        None => self.globals.get(&name.text).cloned(),
                    },
                };
                if let Some(Symbol::Enum(_)) = symbol {
                    return Ty::Enum(name.text.clone());
                }
                self.error(
                    CANNOT_FIND_NAME,
                    format!("Cannot find name '{}'.", name.text),
                    name.span,
                );
                Ty::Any
            }
        }
    }

    fn type_of(&mut self, expr: &Expr) -> Ty {
        match expr {
            Expr::Number(raw, _) => Ty::NumberLit(normalize_number(raw)),
            Expr::String(lit) => Ty::StringLit(quote_string(&lit.value)),
            Expr::Bool(value, _) => Ty::BoolLit(*value),
            Expr::Ident(name) => self.resolve_name(name).value_type(),
            Expr::Paren(inner, _) => self.type_of(inner),
            Expr::Error(_) => Ty::Any,
            Expr::Member {
                object,
                property,
                span,
            } => {
                if let Expr::Ident(name) = object.as_ref() {
                    if let Symbol::Enum(info) = self.resolve_name(name) {
                        return self.enum_member(&info, name, property, *span);
                    }
                } else {
                    self.type_of(object);
                }
                Ty::Any
            }
            Expr::Call { callee, args, .. } => {
                let callee = self.type_of(callee);
                let args: Vec<(Ty, Span)> = args.iter().map(|arg| (self.type_of(arg), arg.span())).collect();
                let Ty::Function(sig) = callee else {
                    return Ty::Any;
                };
                for ((arg, span), (_, param)) in args.iter().zip(&sig.params) {
                    if !arg.assignable_to(param) {
                        self.error(
                            BAD_ARGUMENT,
                            format!(
                                "Argument of type '{arg}' is not assignable to parameter of type '{param}'."
                            ),
                            *span,
                        );
                    }
                }
                sig.ret
            }
            Expr::Unary { op, operand, .. } => {
                let ty = self.type_of(operand);
                match (op, ty) {
                    (UnaryOp::Neg, Ty::NumberLit(text)) => Ty::NumberLit(negate(&text)),
                    (UnaryOp::Neg, _) => Ty::Number,
                    (UnaryOp::Not, _) => Ty::Boolean,
                }
            }
            Expr::Binary { op, lhs, rhs, .. } => {
                let lhs = self.type_of(lhs);
                let rhs = self.type_of(rhs);
                match op {
                    BinaryOp::Add if lhs.is_string_like() || rhs.is_string_like() => Ty::String,
                    BinaryOp::Add if lhs.is_number_like() && rhs.is_number_like() => Ty::Number,
                    BinaryOp::Add => Ty::Any,
                    BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => Ty::Number,
                    BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Eq | BinaryOp::StrictEq => Ty::Boolean,
                }
            }
        }
    }

    fn enum_member(&mut self, info: &EnumInfo, object: &Name, property: &Name, span: Span) -> Ty {
        match info.member(&property.text) {
            None => {
                self.error(
                    NO_PROPERTY,
                    format!(
                        "Property '{}' does not exist on type 'typeof {}'.",
                        property.text, object.text
                    ),
                    property.span,
                );
                Ty::Any
            }
            Some(Some(value)) if info.is_const => {
                self.inlined.insert(span, value.clone());
                value.ty()
            }
            Some(Some(EnumValue::String(text))) => Ty::StringLit(text.clone()),
            Some(_) => Ty::Enum(object.text.clone()),
        }
    }
}

fn negate(text: &str) -> String {
    match text.strip_prefix('-') {
        Some(rest) => rest.to_string(),
        None if text == "0" => text.to_string(),
        None => format!("-{text}"),
    }
}

/// Evaluates an enum member initializer. Earlier members are visible by
/// bare name or qualified by the enum's name.
fn const_eval(expr: &Expr, enum_name: &str, members: &[(String, Option<EnumValue>)]) -> Option<EnumValue> {
    let member = |name: &str| {
        members
            .iter()
            .find(|(member, _)| member == name)
            .and_then(|(_, value)| value.clone())
    };
    match expr {
        Expr::Number(raw, _) => {
            let cleaned: String = raw.chars().filter(|c| *c != '_').collect();
            cleaned.parse().ok().map(EnumValue::Number)
        }
        Expr::String(lit) => Some(EnumValue::String(quote_string(&lit.value))),
        Expr::Paren(inner, _) => const_eval(inner, enum_name, members),
        Expr::Ident(name) => member(&name.text),
        Expr::Member { object, property, .. } => match object.as_ref() {
            Expr::Ident(object) if object.text == enum_name => member(&property.text),
            _ => None,
        },
        Expr::Unary {
            op: UnaryOp::Neg,
            operand,
            ..
        } => match const_eval(operand, enum_name, members)? {
            EnumValue::Number(value) => Some(EnumValue::Number(-value)),
            EnumValue::String(_) => None,
        },
        Expr::Binary { op, lhs, rhs, .. } => {
            let lhs = const_eval(lhs, enum_name, members)?;
            let rhs = const_eval(rhs, enum_name, members)?;
            match (op, lhs, rhs) {
                (BinaryOp::Add, EnumValue::Number(a), EnumValue::Number(b)) => Some(EnumValue::Number(a + b)),
                (BinaryOp::Sub, EnumValue::Number(a), EnumValue::Number(b)) => Some(EnumValue::Number(a - b)),
                (BinaryOp::Mul, EnumValue::Number(a), EnumValue::Number(b)) => Some(EnumValue::Number(a * b)),
                (BinaryOp::Div, EnumValue::Number(a), EnumValue::Number(b)) => Some(EnumValue::Number(a / b)),
                (BinaryOp::Add, EnumValue::String(a), EnumValue::String(b)) => Some(EnumValue::String(
                    format!("{}{}", a.trim_end_matches('"'), b.trim_start_matches('"')),
                )),
                _ => None,
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    fn check(files: &[(&str, &str)], path: &str) -> Rc<ModuleInfo> {
        let program = testing::load(files);
        let mut analyzer = Analyzer::new(&program);
        let id = program.file_id(path).unwrap();
        analyzer.analyze(id).unwrap()
    }

    fn codes(info: &ModuleInfo) -> Vec<String> {
        info.problems.iter().map(|p| p.code.to_string()).collect()
    }

    #[test]
    fn const_keeps_literal_let_widens() {
        let info = check(&[("a.ts", "export const a = 10;\nexport let b = 'x';")], "a.ts");
        assert!(info.problems.is_empty());
        assert_eq!(info.exports["a"], Symbol::constant(Ty::NumberLit("10".into())));
        assert_eq!(
            info.exports["b"],
            Symbol::Value {
                ty: Ty::String,
                is_const: false
            }
        );
    }

    #[test]
    fn literals_flow_through_imports() {
        let files = [
            ("a.ts", "export const a = 10;"),
            ("b.ts", "import { a } from './a';\nexport const c = a;"),
        ];
        let info = check(&files, "b.ts");
        assert_eq!(info.exports["c"].value_type(), Ty::NumberLit("10".into()));
    }

    #[test]
    fn missing_module_and_member() {
        let files = [
            ("a.ts", "export const a = 1;"),
            ("b.ts", "import { z } from './a';\nimport { q } from './missing';"),
        ];
        let info = check(&files, "b.ts");
        assert_eq!(codes(&info), ["E2305", "E2307"]);
    }

    #[test]
    fn unknown_name_and_assignability() {
        let info = check(&[("a.ts", "const a: number = 'x';\nconst b = nope;")], "a.ts");
        assert_eq!(codes(&info), ["E2322", "E2304"]);
        assert_eq!(info.problems[0].message, "Type '\"x\"' is not assignable to type 'number'.");
    }

    #[test]
    fn use_before_declaration_at_top_level_only() {
        let info = check(
            &[("a.ts", "const a = b;\nconst b = 1;\nfunction f() { return c; }\nconst c = 2;")],
            "a.ts",
        );
        assert_eq!(codes(&info), ["E2448"]);
    }

    #[test]
    fn redeclaration() {
        let info = check(&[("a.ts", "const a = 1;\nlet a = 2;")], "a.ts");
        assert_eq!(codes(&info), ["E2451"]);
    }

    #[test]
    fn function_return_is_inferred_on_demand() {
        let info = check(
            &[("a.ts", "export const n = twice(2);\nfunction twice(x: number) { return x * 2; }")],
            "a.ts",
        );
        assert!(info.problems.is_empty(), "{:?}", info.problems);
        assert_eq!(info.exports["n"].value_type(), Ty::Number);
    }

    #[test]
    fn argument_checking() {
        let info = check(
            &[("a.ts", "function f(x: number): void {}\nf('s');")],
            "a.ts",
        );
        assert_eq!(codes(&info), ["E2345"]);
    }

    #[test]
    fn const_enum_members_are_inlined() {
        let info = check(
            &[("a.ts", "const enum E { A = 1, B, C = A * 10 }\nexport const x = E.C;\nE.Z;")],
            "a.ts",
        );
        assert_eq!(codes(&info), ["E2339"]);
        assert_eq!(info.exports["x"].value_type(), Ty::NumberLit("10".into()));
        let Symbol::Enum(e) = &info.symbols["E"] else {
            panic!("expected enum");
        };
        assert_eq!(e.members[1].1, Some(EnumValue::Number(2.0)));
        assert_eq!(info.inlined.len(), 1);
    }

    #[test]
    fn non_constant_enum_member() {
        let info = check(&[("a.ts", "export const enum E { A = 'a', B }")], "a.ts");
        assert_eq!(codes(&info), ["E2474"]);
    }

    #[test]
    fn scripts_provide_globals() {
        let files = [
            ("globals.d.ts", "declare const VERSION: string;"),
            ("main.ts", "export const v = VERSION;"),
        ];
        let info = check(&files, "main.ts");
        assert!(info.problems.is_empty(), "{:?}", info.problems);
        assert_eq!(info.exports["v"].value_type(), Ty::String);
    }

    #[test]
    fn star_reexport_and_import_cycle() {
        let files = [
            ("a.ts", "import { b } from './b';\nexport const a = 1;\nexport const viaB = b;"),
            ("b.ts", "import { a } from './a';\nexport const b = 2;\nexport const viaA = a;"),
            ("c.ts", "export * from './a';\nexport { b as renamed } from './b';"),
        ];
        let info = check(&files, "c.ts");
        assert!(info.problems.is_empty(), "{:?}", info.problems);
        assert!(info.exports.contains_key("a"));
        assert!(info.exports.contains_key("renamed"));
        assert_eq!(info.reexports[0].0, "renamed");
    }
}
