use dashmap::DashMap;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use tree_sitter::Node as TSNode;

use crate::parser::{
    extract_text, find_child_by_kind, find_children_by_kind, find_type_child, line_of, ParsedFile,
};

/// Resolved kind of a declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Interface,
    Struct,
    Enum,
    Record,
    Delegate,
}

#[derive(Debug, Clone)]
pub struct MethodSymbol {
    pub name: String,
    pub parameter_types: Vec<String>,
    pub is_virtual: bool,
    pub is_override: bool,
    pub is_abstract: bool,
    pub is_static: bool,
    pub is_constructor: bool,
    pub line_number: usize,
}

/// A field or property usable as an invocation receiver.
#[derive(Debug, Clone)]
pub struct MemberSlot {
    pub name: String,
    pub type_text: String,
    pub is_event: bool,
}

#[derive(Debug, Clone)]
pub struct TypeSymbol {
    pub name: String,
    pub namespace: String,
    pub kind: TypeKind,
    pub is_abstract: bool,
    pub base_types: Vec<String>,
    pub methods: Vec<MethodSymbol>,
    pub members: Vec<MemberSlot>,
    /// Using directives in scope at the declaration's file.
    pub usings: Vec<String>,
    pub file_path: PathBuf,
    pub line_number: usize,
}

impl TypeSymbol {
    pub fn qualified_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }
}

/// Everything the symbol table needs from one file.
#[derive(Debug, Default, Clone)]
pub struct FileFacts {
    pub usings: Vec<String>,
    pub types: Vec<TypeSymbol>,
}

/// Phase-one fold: gather every type declaration in the file, including the
/// kinds that are never extracted as entities, so phase two can resolve
/// references to them.
pub fn collect_facts(parsed: &ParsedFile) -> FileFacts {
    let mut facts = FileFacts::default();
    let root = parsed.root();
    visit(&root, parsed, &mut Vec::new(), &mut facts);
    for ty in &mut facts.types {
        ty.usings = facts.usings.clone();
    }
    facts
}

fn visit(node: &TSNode, parsed: &ParsedFile, ns_stack: &mut Vec<String>, facts: &mut FileFacts) {
    let source = parsed.source_bytes();
    match node.kind() {
        "using_directive" => {
            if let Some(name) = using_target(node, source) {
                facts.usings.push(name);
            }
            return;
        }
        // The file-scoped form carries the rest of the file's declarations
        // as its children.
        "namespace_declaration" | "file_scoped_namespace_declaration" => {
            let parts = namespace_parts(node, source);
            let depth = parts.len();
            ns_stack.extend(parts);
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                visit(&child, parsed, ns_stack, facts);
            }
            ns_stack.truncate(ns_stack.len() - depth);
            return;
        }
        "class_declaration" | "interface_declaration" | "struct_declaration"
        | "record_declaration" => {
            let kind = match node.kind() {
                "class_declaration" => TypeKind::Class,
                "interface_declaration" => TypeKind::Interface,
                "struct_declaration" => TypeKind::Struct,
                _ => TypeKind::Record,
            };
            collect_type(node, parsed, ns_stack, kind, facts);
            return;
        }
        "enum_declaration" => {
            if let Some(name_node) = find_child_by_kind(node, "identifier") {
                facts.types.push(TypeSymbol {
                    name: extract_text(&name_node, source).to_string(),
                    namespace: ns_stack.join("."),
                    kind: TypeKind::Enum,
                    is_abstract: false,
                    base_types: Vec::new(),
                    methods: Vec::new(),
                    members: Vec::new(),
                    usings: Vec::new(),
                    file_path: parsed.path.clone(),
                    line_number: line_of(node),
                });
            }
            return;
        }
        "delegate_declaration" => {
            collect_delegate(node, parsed, ns_stack, facts);
            return;
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        visit(&child, parsed, ns_stack, facts);
    }
}

fn collect_type(
    node: &TSNode,
    parsed: &ParsedFile,
    ns_stack: &mut Vec<String>,
    kind: TypeKind,
    facts: &mut FileFacts,
) {
    let source = parsed.source_bytes();
    let Some(name_node) = find_child_by_kind(node, "identifier") else {
        return;
    };
    let name = extract_text(&name_node, source).to_string();
    let modifiers = modifier_texts(node, source);

    let mut symbol = TypeSymbol {
        name: name.clone(),
        namespace: ns_stack.join("."),
        kind,
        is_abstract: modifiers.iter().any(|m| m == "abstract"),
        base_types: base_type_names(node, source),
        methods: Vec::new(),
        members: Vec::new(),
        usings: Vec::new(),
        file_path: parsed.path.clone(),
        line_number: line_of(node),
    };

    if let Some(body) = find_child_by_kind(node, "declaration_list") {
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            match member.kind() {
                "method_declaration" => {
                    if let Some(m) = method_symbol(&member, source, &name, false) {
                        symbol.methods.push(m);
                    }
                }
                "constructor_declaration" => {
                    if let Some(m) = method_symbol(&member, source, &name, true) {
                        symbol.methods.push(m);
                    }
                }
                "field_declaration" | "event_field_declaration" => {
                    let is_event = member.kind() == "event_field_declaration";
                    field_slots(&member, source, is_event, &mut symbol.members);
                }
                "property_declaration" => {
                    if let Some(slot) = property_slot(&member, source) {
                        symbol.members.push(slot);
                    }
                }
                "class_declaration" | "interface_declaration" | "struct_declaration"
                | "record_declaration" | "enum_declaration" | "delegate_declaration" => {
                    // Nested types share the enclosing namespace.
                    visit(&member, parsed, ns_stack, facts);
                }
                _ => {}
            }
        }
    }

    facts.types.push(symbol);
}

fn collect_delegate(
    node: &TSNode,
    parsed: &ParsedFile,
    ns_stack: &mut Vec<String>,
    facts: &mut FileFacts,
) {
    let source = parsed.source_bytes();
    // `delegate R Name(params);` — the name is the identifier right before
    // the parameter list; the return type may itself be an identifier.
    let mut cursor = node.walk();
    let children: Vec<TSNode> = node.children(&mut cursor).collect();
    let Some(param_index) = children.iter().position(|c| c.kind() == "parameter_list") else {
        return;
    };
    let Some(name_node) = children[..param_index]
        .iter()
        .rev()
        .find(|c| c.kind() == "identifier")
    else {
        return;
    };
    let name = extract_text(name_node, source).to_string();

    let invoke = MethodSymbol {
        name: "Invoke".to_string(),
        parameter_types: parameter_types(&children[param_index], source),
        is_virtual: false,
        is_override: false,
        is_abstract: false,
        is_static: false,
        is_constructor: false,
        line_number: line_of(node),
    };

    facts.types.push(TypeSymbol {
        name,
        namespace: ns_stack.join("."),
        kind: TypeKind::Delegate,
        is_abstract: false,
        base_types: Vec::new(),
        methods: vec![invoke],
        members: Vec::new(),
        usings: Vec::new(),
        file_path: parsed.path.clone(),
        line_number: line_of(node),
    });
}

fn method_symbol(
    node: &TSNode,
    source: &[u8],
    type_name: &str,
    is_constructor: bool,
) -> Option<MethodSymbol> {
    let name = if is_constructor {
        type_name.to_string()
    } else {
        method_name(node, source)?
    };
    let modifiers = modifier_texts(node, source);
    let params = find_child_by_kind(node, "parameter_list")
        .map(|p| parameter_types(&p, source))
        .unwrap_or_default();
    Some(MethodSymbol {
        name,
        parameter_types: params,
        is_virtual: modifiers.iter().any(|m| m == "virtual"),
        is_override: modifiers.iter().any(|m| m == "override"),
        is_abstract: modifiers.iter().any(|m| m == "abstract"),
        is_static: modifiers.iter().any(|m| m == "static"),
        is_constructor,
        line_number: line_of(node),
    })
}

/// Method name: the identifier right before the parameter list. The return
/// type can be an identifier too, so position matters.
pub fn method_name(node: &TSNode, source: &[u8]) -> Option<String> {
    let mut cursor = node.walk();
    let children: Vec<TSNode> = node.children(&mut cursor).collect();
    let param_index = children.iter().position(|c| c.kind() == "parameter_list")?;
    children[..param_index]
        .iter()
        .rev()
        .find(|c| c.kind() == "identifier")
        .map(|n| extract_text(n, source).to_string())
}

pub fn parameter_types(parameter_list: &TSNode, source: &[u8]) -> Vec<String> {
    let mut out = Vec::new();
    let mut cursor = parameter_list.walk();
    for param in parameter_list.named_children(&mut cursor) {
        if param.kind() != "parameter" {
            continue;
        }
        if let Some(ty) = find_type_child(&param) {
            out.push(extract_text(&ty, source).to_string());
        }
    }
    out
}

pub fn modifier_texts(node: &TSNode, source: &[u8]) -> Vec<String> {
    find_children_by_kind(node, "modifier")
        .iter()
        .map(|m| extract_text(m, source).to_string())
        .collect()
}

/// Raw names in the inheritance clause, in source order, whether or not they
/// resolve to anything.
pub fn base_type_names(node: &TSNode, source: &[u8]) -> Vec<String> {
    let Some(base_list) = find_child_by_kind(node, "base_list") else {
        return Vec::new();
    };
    let mut cursor = base_list.walk();
    base_list
        .named_children(&mut cursor)
        .filter(|c| {
            matches!(
                c.kind(),
                "identifier" | "qualified_name" | "generic_name" | "predefined_type"
            )
        })
        .map(|c| extract_text(&c, source).to_string())
        .collect()
}

fn field_slots(node: &TSNode, source: &[u8], is_event: bool, out: &mut Vec<MemberSlot>) {
    let Some(declaration) = find_child_by_kind(node, "variable_declaration") else {
        return;
    };
    let Some(type_node) = find_type_child(&declaration) else {
        return;
    };
    let type_text = extract_text(&type_node, source).to_string();
    for declarator in find_children_by_kind(&declaration, "variable_declarator") {
        if let Some(name_node) = find_child_by_kind(&declarator, "identifier") {
            out.push(MemberSlot {
                name: extract_text(&name_node, source).to_string(),
                type_text: type_text.clone(),
                is_event,
            });
        }
    }
}

fn property_slot(node: &TSNode, source: &[u8]) -> Option<MemberSlot> {
    let type_node = find_type_child(node)?;
    let mut cursor = node.walk();
    let name_node = node
        .children(&mut cursor)
        .filter(|c| c.kind() == "identifier")
        .last()?;
    if name_node.id() == type_node.id() {
        return None;
    }
    Some(MemberSlot {
        name: extract_text(&name_node, source).to_string(),
        type_text: extract_text(&type_node, source).to_string(),
        is_event: false,
    })
}

fn using_target(node: &TSNode, source: &[u8]) -> Option<String> {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "qualified_name" | "identifier" | "generic_name" | "alias_qualified_name" => {
                let text = extract_text(&child, source);
                if !text.is_empty() {
                    return Some(text.to_string());
                }
            }
            _ => {}
        }
    }
    None
}

/// Namespace name parts of a namespace declaration, e.g. `A.B` -> ["A", "B"].
pub fn namespace_parts(node: &TSNode, source: &[u8]) -> Vec<String> {
    let mut cursor = node.walk();
    let name = node
        .named_children(&mut cursor)
        .find(|c| matches!(c.kind(), "identifier" | "qualified_name"));
    match name {
        Some(n) => extract_text(&n, source)
            .split('.')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect(),
        None => Vec::new(),
    }
}

/// Whole-compilation symbol table. Built once from all file facts, then
/// queried read-only by every phase-two pass; forward references across
/// files resolve because nothing queries before the build completes.
#[derive(Debug, Default)]
pub struct SemanticModel {
    types: HashMap<String, TypeSymbol>,
    by_name: HashMap<String, Vec<String>>,
}

impl SemanticModel {
    pub fn build(facts: &[FileFacts]) -> Self {
        let table: DashMap<String, TypeSymbol> = DashMap::new();
        facts.par_iter().for_each(|file| {
            for ty in &file.types {
                table.insert(ty.qualified_name(), ty.clone());
            }
        });

        let types: HashMap<String, TypeSymbol> = table.into_iter().collect();
        let mut by_name: HashMap<String, Vec<String>> = HashMap::new();
        for (fq, ty) in &types {
            by_name.entry(ty.name.clone()).or_default().push(fq.clone());
        }
        for names in by_name.values_mut() {
            names.sort();
        }
        Self { types, by_name }
    }

    pub fn lookup(&self, qualified_name: &str) -> Option<&TypeSymbol> {
        self.types.get(qualified_name)
    }

    pub fn kind_of(&self, qualified_name: &str) -> Option<TypeKind> {
        self.types.get(qualified_name).map(|t| t.kind)
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Resolve a type reference as written in source, from the perspective of
    /// `namespace` with `usings` in scope. Walks enclosing namespace prefixes
    /// outward, then using directives, then falls back to a unique simple
    /// name match.
    pub fn resolve_type(&self, text: &str, namespace: &str, usings: &[String]) -> Option<&TypeSymbol> {
        let name = normalize_type_text(text);
        if name.is_empty() {
            return None;
        }

        let mut candidates = Vec::new();
        let parts: Vec<&str> = if namespace.is_empty() {
            Vec::new()
        } else {
            namespace.split('.').collect()
        };
        for i in (0..=parts.len()).rev() {
            if i == 0 {
                candidates.push(name.clone());
            } else {
                candidates.push(format!("{}.{}", parts[..i].join("."), name));
            }
        }
        for using in usings {
            candidates.push(format!("{}.{}", using, name));
        }
        for candidate in &candidates {
            if let Some(ty) = self.types.get(candidate) {
                return Some(ty);
            }
        }

        if !name.contains('.') {
            if let Some(matches) = self.by_name.get(&name) {
                if matches.len() == 1 {
                    return self.types.get(&matches[0]);
                }
            }
        }
        None
    }

    /// Find `name` on the type or up its inheritance chain. Exact arity wins
    /// over a name-only match within each type. Returns the declaring type,
    /// which decides interface dispatch.
    pub fn resolve_method(
        &self,
        type_fq: &str,
        name: &str,
        arity: usize,
    ) -> Option<(&TypeSymbol, &MethodSymbol)> {
        let mut visited = HashSet::new();
        self.resolve_method_inner(type_fq, name, arity, &mut visited)
    }

    fn resolve_method_inner<'a>(
        &'a self,
        type_fq: &str,
        name: &str,
        arity: usize,
        visited: &mut HashSet<String>,
    ) -> Option<(&'a TypeSymbol, &'a MethodSymbol)> {
        if !visited.insert(type_fq.to_string()) {
            return None;
        }
        let ty = self.types.get(type_fq)?;
        if let Some(m) = ty
            .methods
            .iter()
            .find(|m| !m.is_constructor && m.name == name && m.parameter_types.len() == arity)
        {
            return Some((ty, m));
        }
        if let Some(m) = ty
            .methods
            .iter()
            .find(|m| !m.is_constructor && m.name == name)
        {
            return Some((ty, m));
        }
        for base in &ty.base_types {
            if let Some(base_ty) = self.resolve_type(base, &ty.namespace, &ty.usings) {
                let base_fq = base_ty.qualified_name();
                if let Some(found) = self.resolve_method_inner(&base_fq, name, arity, visited) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Find a field/property/event on the type or up its inheritance chain.
    pub fn resolve_member(&self, type_fq: &str, name: &str) -> Option<(&TypeSymbol, &MemberSlot)> {
        let mut visited = HashSet::new();
        self.resolve_member_inner(type_fq, name, &mut visited)
    }

    fn resolve_member_inner<'a>(
        &'a self,
        type_fq: &str,
        name: &str,
        visited: &mut HashSet<String>,
    ) -> Option<(&'a TypeSymbol, &'a MemberSlot)> {
        if !visited.insert(type_fq.to_string()) {
            return None;
        }
        let ty = self.types.get(type_fq)?;
        if let Some(slot) = ty.members.iter().find(|m| m.name == name) {
            return Some((ty, slot));
        }
        for base in &ty.base_types {
            if let Some(base_ty) = self.resolve_type(base, &ty.namespace, &ty.usings) {
                let base_fq = base_ty.qualified_name();
                if let Some(found) = self.resolve_member_inner(&base_fq, name, visited) {
                    return Some(found);
                }
            }
        }
        None
    }

    pub fn resolve_constructor<'a>(
        &'a self,
        ty: &'a TypeSymbol,
        arity: usize,
    ) -> Option<&'a MethodSymbol> {
        ty.methods
            .iter()
            .find(|m| m.is_constructor && m.parameter_types.len() == arity)
            .or_else(|| ty.methods.iter().find(|m| m.is_constructor))
    }
}

/// Strip generic arguments, nullability, and array suffixes so the bare type
/// name is left for table lookup.
pub fn normalize_type_text(text: &str) -> String {
    let mut name = text.trim();
    if let Some(angle) = name.find('<') {
        name = &name[..angle];
    }
    let name = name.trim_end_matches("[]").trim_end_matches('?').trim();
    name.to_string()
}
