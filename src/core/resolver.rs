use std::collections::HashMap;
use std::path::PathBuf;
use tree_sitter::Node as TSNode;

use crate::core::model::{CallType, MethodCall, MethodNode};
use crate::core::semantics::{
    method_name, modifier_texts, namespace_parts, parameter_types, MethodSymbol, SemanticModel,
    TypeKind, TypeSymbol,
};
use crate::parser::{
    extract_text, find_child_by_kind, find_children_by_kind, find_type_child, line_of, ParsedFile,
};

/// Built-in namespaces dropped from the graph unless an allow-list overrides
/// filtering entirely.
pub const DEFAULT_DENY_NAMESPACES: &[&str] = &["System", "Microsoft"];

/// Prefix filter over callee namespaces. A non-empty allow-list is the only
/// active filter; the deny-list (always seeded with the built-in defaults)
/// applies only when no allow-list is configured.
#[derive(Debug, Clone)]
pub struct NamespaceFilter {
    allow: Vec<String>,
    deny: Vec<String>,
}

impl NamespaceFilter {
    pub fn new(allow: &[String], deny: &[String]) -> Self {
        let mut merged: Vec<String> = DEFAULT_DENY_NAMESPACES
            .iter()
            .map(|s| s.to_string())
            .collect();
        merged.extend(deny.iter().cloned());
        Self {
            allow: allow.to_vec(),
            deny: merged,
        }
    }

    pub fn permits(&self, namespace: &str) -> bool {
        if !self.allow.is_empty() {
            return self.allow.iter().any(|p| namespace.starts_with(p.as_str()));
        }
        !self.deny.iter().any(|p| namespace.starts_with(p.as_str()))
    }
}

/// Syntactic shape of an invocation, captured in phase one. Resolution
/// against the symbol table happens in phase two.
#[derive(Debug, Clone)]
pub enum InvocationTarget {
    /// `M(...)` with no receiver.
    Unqualified { name: String },
    /// `this.M(...)`.
    OnThis { name: String },
    /// `base.M(...)`.
    OnBase { name: String },
    /// Receiver is a local, parameter, or member with a known declared type.
    /// `handler(...)` on a delegate-typed value records `name` as `Invoke`.
    OnValue {
        declared_type: String,
        name: String,
        is_event: bool,
    },
    /// Receiver identifier with no local meaning; may be a type (static call)
    /// or an inherited member.
    OnIdentifier { receiver: String, name: String },
    /// Dotted receiver path, e.g. `MyApp.Util.M(...)`.
    OnQualified { path: String, name: String },
    /// `new T(...)`.
    Creation { type_text: String },
}

/// One lexical call site attributed to its enclosing method.
#[derive(Debug, Clone)]
pub struct CallSite {
    pub caller: MethodNode,
    pub enclosing_type: String,
    pub namespace: String,
    pub usings: Vec<String>,
    pub target: InvocationTarget,
    pub arity: usize,
    pub file_path: PathBuf,
    pub line_number: usize,
}

struct TypeCtx {
    name: String,
    namespace: String,
    qualified: String,
    is_interface: bool,
    /// member name -> (declared type text, is_event)
    members: HashMap<String, (String, bool)>,
}

/// Phase-one fold: walk every method body and record invocation shapes.
/// Invocations inside lambdas and local functions are attributed to the
/// enclosing declared method.
pub fn collect_call_sites(parsed: &ParsedFile, usings: &[String]) -> Vec<CallSite> {
    let mut collector = Collector {
        parsed,
        usings: usings.to_vec(),
        sites: Vec::new(),
    };
    let root = parsed.root();
    collector.walk_types(&root, &mut Vec::new());
    collector.sites
}

struct Collector<'a> {
    parsed: &'a ParsedFile,
    usings: Vec<String>,
    sites: Vec<CallSite>,
}

impl<'a> Collector<'a> {
    fn source(&self) -> &'a [u8] {
        self.parsed.source_bytes()
    }

    fn walk_types(&mut self, node: &TSNode, ns_stack: &mut Vec<String>) {
        match node.kind() {
            // The file-scoped form carries the rest of the file's
            // declarations as its children.
            "namespace_declaration" | "file_scoped_namespace_declaration" => {
                let parts = namespace_parts(node, self.source());
                let depth = parts.len();
                ns_stack.extend(parts);
                let mut cursor = node.walk();
                let children: Vec<TSNode> = node.named_children(&mut cursor).collect();
                for child in children {
                    self.walk_types(&child, ns_stack);
                }
                ns_stack.truncate(ns_stack.len() - depth);
                return;
            }
            "class_declaration" | "struct_declaration" | "record_declaration"
            | "interface_declaration" => {
                self.collect_type(node, ns_stack);
                return;
            }
            _ => {}
        }
        let mut cursor = node.walk();
        let children: Vec<TSNode> = node.named_children(&mut cursor).collect();
        for child in children {
            self.walk_types(&child, ns_stack);
        }
    }

    fn collect_type(&mut self, node: &TSNode, ns_stack: &mut Vec<String>) {
        let source = self.parsed.source_bytes();
        let Some(name_node) = find_child_by_kind(node, "identifier") else {
            return;
        };
        let name = extract_text(&name_node, source).to_string();
        let namespace = ns_stack.join(".");
        let qualified = if namespace.is_empty() {
            name.clone()
        } else {
            format!("{}.{}", namespace, name)
        };

        let Some(body) = find_child_by_kind(node, "declaration_list") else {
            return;
        };

        let mut ctx = TypeCtx {
            name,
            namespace,
            qualified,
            is_interface: node.kind() == "interface_declaration",
            members: HashMap::new(),
        };

        let mut cursor = body.walk();
        let members: Vec<TSNode> = body.named_children(&mut cursor).collect();
        for member in &members {
            match member.kind() {
                "field_declaration" | "event_field_declaration" => {
                    let is_event = member.kind() == "event_field_declaration";
                    let Some(declaration) = find_child_by_kind(member, "variable_declaration")
                    else {
                        continue;
                    };
                    let Some(type_node) = find_type_child(&declaration) else {
                        continue;
                    };
                    let type_text = extract_text(&type_node, source).to_string();
                    for declarator in find_children_by_kind(&declaration, "variable_declarator") {
                        if let Some(n) = find_child_by_kind(&declarator, "identifier") {
                            ctx.members.insert(
                                extract_text(&n, source).to_string(),
                                (type_text.clone(), is_event),
                            );
                        }
                    }
                }
                "property_declaration" => {
                    let Some(type_node) = find_type_child(member) else {
                        continue;
                    };
                    let mut p_cursor = member.walk();
                    let name_node = member
                        .children(&mut p_cursor)
                        .filter(|c| c.kind() == "identifier")
                        .last();
                    if let Some(n) = name_node {
                        if n.id() != type_node.id() {
                            ctx.members.insert(
                                extract_text(&n, source).to_string(),
                                (extract_text(&type_node, source).to_string(), false),
                            );
                        }
                    }
                }
                _ => {}
            }
        }

        for member in &members {
            match member.kind() {
                "method_declaration" => self.collect_method(member, &ctx, false),
                "constructor_declaration" => self.collect_method(member, &ctx, true),
                "class_declaration" | "struct_declaration" | "record_declaration"
                | "interface_declaration" => self.walk_types(member, ns_stack),
                _ => {}
            }
        }
    }

    fn collect_method(&mut self, node: &TSNode, ty: &TypeCtx, is_constructor: bool) {
        let source = self.parsed.source_bytes();
        let name = if is_constructor {
            ty.name.clone()
        } else {
            match method_name(node, source) {
                Some(name) => name,
                None => return,
            }
        };
        let modifiers = modifier_texts(node, source);
        let signature = find_child_by_kind(node, "parameter_list")
            .map(|p| parameter_types(&p, source))
            .unwrap_or_default();

        let caller = MethodNode {
            name,
            containing_type: ty.name.clone(),
            namespace: ty.namespace.clone(),
            file_path: self.parsed.path.clone(),
            line_number: line_of(node),
            is_abstract: modifiers.iter().any(|m| m == "abstract"),
            is_virtual: modifiers.iter().any(|m| m == "virtual" || m == "override"),
            is_interface_member: ty.is_interface,
            signature,
        };

        let mut locals: HashMap<String, String> = HashMap::new();
        if let Some(param_list) = find_child_by_kind(node, "parameter_list") {
            let mut cursor = param_list.walk();
            let params: Vec<TSNode> = param_list.named_children(&mut cursor).collect();
            for param in params {
                if param.kind() != "parameter" {
                    continue;
                }
                let type_node = find_type_child(&param);
                let mut p_cursor = param.walk();
                let name_node = param
                    .children(&mut p_cursor)
                    .filter(|c| c.kind() == "identifier")
                    .last();
                if let (Some(t), Some(n)) = (type_node, name_node) {
                    // `Foo x` yields two identifiers; the first is the type.
                    if t.id() != n.id() {
                        locals.insert(
                            extract_text(&n, source).to_string(),
                            extract_text(&t, source).to_string(),
                        );
                    }
                }
            }
        }

        let body = find_child_by_kind(node, "block")
            .or_else(|| find_child_by_kind(node, "arrow_expression_clause"));
        if let Some(body) = body {
            self.scan(&body, ty, &caller, &mut locals);
        }
    }

    fn scan(
        &mut self,
        node: &TSNode,
        ty: &TypeCtx,
        caller: &MethodNode,
        locals: &mut HashMap<String, String>,
    ) {
        match node.kind() {
            "local_declaration_statement" => self.record_locals(node, locals),
            "invocation_expression" => self.record_invocation(node, ty, caller, locals),
            "object_creation_expression" => self.record_creation(node, ty, caller),
            _ => {}
        }
        let mut cursor = node.walk();
        let children: Vec<TSNode> = node.named_children(&mut cursor).collect();
        for child in children {
            self.scan(&child, ty, caller, locals);
        }
    }

    fn record_locals(&mut self, node: &TSNode, locals: &mut HashMap<String, String>) {
        let source = self.parsed.source_bytes();
        let Some(declaration) = find_child_by_kind(node, "variable_declaration") else {
            return;
        };
        let Some(type_node) = find_type_child(&declaration) else {
            return;
        };
        let declared = extract_text(&type_node, source);
        for declarator in find_children_by_kind(&declaration, "variable_declarator") {
            let Some(name_node) = find_child_by_kind(&declarator, "identifier") else {
                continue;
            };
            let type_text = if declared == "var" {
                // `var x = new Foo(...)` pins the type to Foo; any other
                // initializer stays unknown and the receiver is unresolvable.
                match creation_type(&declarator, source) {
                    Some(inferred) => inferred,
                    None => continue,
                }
            } else {
                declared.to_string()
            };
            locals.insert(extract_text(&name_node, source).to_string(), type_text);
        }
    }

    fn record_invocation(
        &mut self,
        node: &TSNode,
        ty: &TypeCtx,
        caller: &MethodNode,
        locals: &HashMap<String, String>,
    ) {
        let source = self.parsed.source_bytes();
        let Some(function) = node.child(0) else {
            return;
        };

        let target = match function.kind() {
            "identifier" => {
                let name = extract_text(&function, source).to_string();
                if let Some(declared) = locals.get(&name) {
                    InvocationTarget::OnValue {
                        declared_type: declared.clone(),
                        name: "Invoke".to_string(),
                        is_event: false,
                    }
                } else if let Some((declared, is_event)) = ty.members.get(&name) {
                    InvocationTarget::OnValue {
                        declared_type: declared.clone(),
                        name: "Invoke".to_string(),
                        is_event: *is_event,
                    }
                } else {
                    InvocationTarget::Unqualified { name }
                }
            }
            "generic_name" => match find_child_by_kind(&function, "identifier") {
                Some(n) => InvocationTarget::Unqualified {
                    name: extract_text(&n, source).to_string(),
                },
                None => return,
            },
            "member_access_expression" => {
                let Some(name) = member_name(&function, source) else {
                    return;
                };
                let Some(receiver) = function.child(0) else {
                    return;
                };
                match self.classify_receiver(&receiver, name, ty, locals) {
                    Some(target) => target,
                    None => return,
                }
            }
            "conditional_access_expression" => {
                // `recv?.M(...)` — the conditional access wraps the member
                // binding that names the method.
                let Some(binding) = find_child_by_kind(&function, "member_binding_expression")
                else {
                    return;
                };
                let Some(name) = member_name(&binding, source) else {
                    return;
                };
                let Some(receiver) = function.named_child(0) else {
                    return;
                };
                match self.classify_receiver(&receiver, name, ty, locals) {
                    Some(target) => target,
                    None => return,
                }
            }
            _ => return,
        };

        self.sites.push(CallSite {
            caller: caller.clone(),
            enclosing_type: ty.qualified.clone(),
            namespace: ty.namespace.clone(),
            usings: self.usings.clone(),
            target,
            arity: argument_count(node),
            file_path: self.parsed.path.clone(),
            line_number: line_of(node),
        });
    }

    fn record_creation(&mut self, node: &TSNode, ty: &TypeCtx, caller: &MethodNode) {
        let source = self.parsed.source_bytes();
        let mut cursor = node.walk();
        let type_node = node.children(&mut cursor).find(|c| {
            matches!(
                c.kind(),
                "identifier" | "qualified_name" | "generic_name" | "predefined_type"
            )
        });
        let Some(type_node) = type_node else {
            return;
        };
        self.sites.push(CallSite {
            caller: caller.clone(),
            enclosing_type: ty.qualified.clone(),
            namespace: ty.namespace.clone(),
            usings: self.usings.clone(),
            target: InvocationTarget::Creation {
                type_text: extract_text(&type_node, source).to_string(),
            },
            arity: argument_count(node),
            file_path: self.parsed.path.clone(),
            line_number: line_of(node),
        });
    }

    fn classify_receiver(
        &self,
        receiver: &TSNode,
        name: String,
        ty: &TypeCtx,
        locals: &HashMap<String, String>,
    ) -> Option<InvocationTarget> {
        let source = self.parsed.source_bytes();
        let text = extract_text(receiver, source);
        if text == "this" {
            return Some(InvocationTarget::OnThis { name });
        }
        if text == "base" {
            return Some(InvocationTarget::OnBase { name });
        }
        match receiver.kind() {
            "identifier" => {
                if let Some(declared) = locals.get(text) {
                    Some(InvocationTarget::OnValue {
                        declared_type: declared.clone(),
                        name,
                        is_event: false,
                    })
                } else if let Some((declared, is_event)) = ty.members.get(text) {
                    Some(InvocationTarget::OnValue {
                        declared_type: declared.clone(),
                        name,
                        is_event: *is_event,
                    })
                } else {
                    Some(InvocationTarget::OnIdentifier {
                        receiver: text.to_string(),
                        name,
                    })
                }
            }
            "member_access_expression" | "qualified_name" => {
                if is_dotted_identifier(text) {
                    Some(InvocationTarget::OnQualified {
                        path: text.to_string(),
                        name,
                    })
                } else {
                    None
                }
            }
            // Chained calls, literals, casts: statically unresolvable, the
            // site contributes no edge.
            _ => None,
        }
    }
}

fn member_name(function: &TSNode, source: &[u8]) -> Option<String> {
    let mut cursor = function.walk();
    let name_node = function
        .children(&mut cursor)
        .filter(|c| matches!(c.kind(), "identifier" | "generic_name"))
        .last()?;
    if name_node.kind() == "generic_name" {
        let inner = find_child_by_kind(&name_node, "identifier")?;
        return Some(extract_text(&inner, source).to_string());
    }
    Some(extract_text(&name_node, source).to_string())
}

fn argument_count(invocation: &TSNode) -> usize {
    match find_child_by_kind(invocation, "argument_list") {
        Some(args) => {
            let mut cursor = args.walk();
            args.named_children(&mut cursor)
                .filter(|c| c.kind() == "argument")
                .count()
        }
        None => 0,
    }
}

fn creation_type(node: &TSNode, source: &[u8]) -> Option<String> {
    if node.kind() == "object_creation_expression" {
        let mut cursor = node.walk();
        let type_node = node.children(&mut cursor).find(|c| {
            matches!(
                c.kind(),
                "identifier" | "qualified_name" | "generic_name" | "predefined_type"
            )
        })?;
        return Some(extract_text(&type_node, source).to_string());
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if let Some(found) = creation_type(&child, source) {
            return Some(found);
        }
    }
    None
}

fn is_dotted_identifier(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '.')
}

/// Phase-two resolution: map call-site shapes onto the symbol table, classify
/// the dispatch kind, and apply the namespace filter. A site that does not
/// resolve contributes no edge.
pub struct CallGraphBuilder<'m> {
    model: &'m SemanticModel,
    filter: NamespaceFilter,
}

impl<'m> CallGraphBuilder<'m> {
    pub fn new(model: &'m SemanticModel, filter: NamespaceFilter) -> Self {
        Self { model, filter }
    }

    pub fn resolve(&self, site: &CallSite) -> Option<MethodCall> {
        let (callee, call_type) = self.resolve_target(site)?;
        if !self.filter.permits(&callee.namespace) {
            return None;
        }
        Some(MethodCall {
            caller: site.caller.clone(),
            callee,
            file_path: site.file_path.clone(),
            line_number: site.line_number,
            call_type,
        })
    }

    fn resolve_target(&self, site: &CallSite) -> Option<(MethodNode, CallType)> {
        match &site.target {
            InvocationTarget::Unqualified { name } | InvocationTarget::OnThis { name } => {
                if let Some(found) =
                    self.resolved_call(&site.enclosing_type, name, site.arity, None)
                {
                    return Some(found);
                }
                // `handler()` on an inherited delegate-typed member.
                let (declaring, slot) = self.model.resolve_member(&site.enclosing_type, name)?;
                self.delegate_invoke(&slot.type_text, declaring, site.arity, slot.is_event)
            }
            InvocationTarget::OnBase { name } => {
                let ty = self.model.lookup(&site.enclosing_type)?;
                for base in &ty.base_types {
                    let Some(base_ty) = self.model.resolve_type(base, &ty.namespace, &ty.usings)
                    else {
                        continue;
                    };
                    if base_ty.kind != TypeKind::Class {
                        continue;
                    }
                    let base_fq = base_ty.qualified_name();
                    if let Some(found) = self.resolved_call(&base_fq, name, site.arity, None) {
                        return Some(found);
                    }
                }
                None
            }
            InvocationTarget::OnValue {
                declared_type,
                name,
                is_event,
            } => {
                let ty = self
                    .model
                    .resolve_type(declared_type, &site.namespace, &site.usings)?;
                if ty.kind == TypeKind::Delegate {
                    if name != "Invoke" {
                        return None;
                    }
                    let fq = ty.qualified_name();
                    return self.resolved_call(&fq, "Invoke", site.arity, Some(*is_event));
                }
                let fq = ty.qualified_name();
                self.resolved_call(&fq, name, site.arity, None)
            }
            InvocationTarget::OnIdentifier { receiver, name } => {
                // An inherited member wins over a same-named type.
                if let Some((declaring, slot)) =
                    self.model.resolve_member(&site.enclosing_type, receiver)
                {
                    let member_ty = self.model.resolve_type(
                        &slot.type_text,
                        &declaring.namespace,
                        &declaring.usings,
                    )?;
                    if member_ty.kind == TypeKind::Delegate {
                        if name != "Invoke" {
                            return None;
                        }
                        let fq = member_ty.qualified_name();
                        return self.resolved_call(&fq, "Invoke", site.arity, Some(slot.is_event));
                    }
                    let fq = member_ty.qualified_name();
                    return self.resolved_call(&fq, name, site.arity, None);
                }
                let ty = self
                    .model
                    .resolve_type(receiver, &site.namespace, &site.usings)?;
                let fq = ty.qualified_name();
                self.resolved_call(&fq, name, site.arity, None)
            }
            InvocationTarget::OnQualified { path, name } => {
                let ty = self
                    .model
                    .resolve_type(path, &site.namespace, &site.usings)?;
                let fq = ty.qualified_name();
                self.resolved_call(&fq, name, site.arity, None)
            }
            InvocationTarget::Creation { type_text } => {
                let ty = self
                    .model
                    .resolve_type(type_text, &site.namespace, &site.usings)?;
                let callee = match self.model.resolve_constructor(ty, site.arity) {
                    Some(ctor) => method_node_from(ty, ctor),
                    // No declared constructor: synthesize the implicit one,
                    // anchored at the type declaration.
                    None => MethodNode {
                        name: ty.name.clone(),
                        containing_type: ty.name.clone(),
                        namespace: ty.namespace.clone(),
                        file_path: ty.file_path.clone(),
                        line_number: ty.line_number,
                        is_abstract: false,
                        is_virtual: false,
                        is_interface_member: false,
                        signature: Vec::new(),
                    },
                };
                Some((callee, CallType::Constructor))
            }
        }
    }

    fn resolved_call(
        &self,
        type_fq: &str,
        name: &str,
        arity: usize,
        event_raise: Option<bool>,
    ) -> Option<(MethodNode, CallType)> {
        let (declaring, symbol) = self.model.resolve_method(type_fq, name, arity)?;
        let call_type = classify(declaring, symbol, event_raise);
        Some((method_node_from(declaring, symbol), call_type))
    }

    fn delegate_invoke(
        &self,
        type_text: &str,
        declaring: &TypeSymbol,
        arity: usize,
        is_event: bool,
    ) -> Option<(MethodNode, CallType)> {
        let ty = self
            .model
            .resolve_type(type_text, &declaring.namespace, &declaring.usings)?;
        if ty.kind != TypeKind::Delegate {
            return None;
        }
        let fq = ty.qualified_name();
        self.resolved_call(&fq, "Invoke", arity, Some(is_event))
    }
}

/// Dispatch-kind classification. Interface membership beats virtual-ness,
/// which beats everything else; a delegate `Invoke` reached through an
/// `event` member is an event raise.
fn classify(declaring: &TypeSymbol, symbol: &MethodSymbol, event_raise: Option<bool>) -> CallType {
    if declaring.kind == TypeKind::Interface {
        CallType::Interface
    } else if symbol.is_virtual || symbol.is_override || symbol.is_abstract {
        CallType::Virtual
    } else if symbol.is_constructor {
        CallType::Constructor
    } else if declaring.kind == TypeKind::Delegate {
        match event_raise {
            Some(true) => CallType::Event,
            _ => CallType::Delegate,
        }
    } else {
        CallType::Direct
    }
}

fn method_node_from(declaring: &TypeSymbol, symbol: &MethodSymbol) -> MethodNode {
    MethodNode {
        name: symbol.name.clone(),
        containing_type: declaring.name.clone(),
        namespace: declaring.namespace.clone(),
        file_path: declaring.file_path.clone(),
        line_number: symbol.line_number,
        is_abstract: symbol.is_abstract,
        is_virtual: symbol.is_virtual || symbol.is_override,
        is_interface_member: declaring.kind == TypeKind::Interface,
        signature: symbol.parameter_types.clone(),
    }
}
