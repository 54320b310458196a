use tree_sitter::Node as TSNode;

use crate::core::model::{
    AccessLevel, ExtractedClass, ExtractedField, ExtractedMethod, ExtractedParameter,
    ExtractedProperty,
};
use crate::core::semantics::{
    base_type_names, method_name, modifier_texts, namespace_parts, SemanticModel, TypeKind,
};
use crate::parser::{
    extract_text, find_child_by_kind, find_children_by_kind, find_type_child, line_of, ParsedFile,
};

/// Walks one parsed file and builds the structural model. Only class
/// declarations become entities; structs, records, and interfaces are a
/// deliberate scope restriction and stay out of the extraction result even
/// though the symbol table knows them.
pub struct DeclarationExtractor<'a> {
    parsed: &'a ParsedFile,
    relative_path: String,
}

impl<'a> DeclarationExtractor<'a> {
    pub fn new(parsed: &'a ParsedFile, relative_path: &str) -> Self {
        Self {
            parsed,
            relative_path: relative_path.to_string(),
        }
    }

    pub fn extract(&self) -> Vec<ExtractedClass> {
        let mut classes = Vec::new();
        let root = self.parsed.root();
        self.walk(&root, &mut Vec::new(), &mut classes);
        classes
    }

    fn walk(&self, node: &TSNode, ns_stack: &mut Vec<String>, out: &mut Vec<ExtractedClass>) {
        let source = self.parsed.source_bytes();
        match node.kind() {
            // The file-scoped form carries the rest of the file's
            // declarations as its children.
            "namespace_declaration" | "file_scoped_namespace_declaration" => {
                let parts = namespace_parts(node, source);
                let depth = parts.len();
                ns_stack.extend(parts);
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.walk(&child, ns_stack, out);
                }
                ns_stack.truncate(ns_stack.len() - depth);
                return;
            }
            "class_declaration" => {
                if let Some(class) = self.extract_class(node, ns_stack) {
                    out.push(class);
                }
                // Nested classes are extracted as their own entities.
                if let Some(body) = find_child_by_kind(node, "declaration_list") {
                    let mut cursor = body.walk();
                    for child in body.named_children(&mut cursor) {
                        if child.kind() == "class_declaration" {
                            self.walk(&child, ns_stack, out);
                        }
                    }
                }
                return;
            }
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.walk(&child, ns_stack, out);
        }
    }

    fn extract_class(&self, node: &TSNode, ns_stack: &[String]) -> Option<ExtractedClass> {
        let source = self.parsed.source_bytes();
        let name_node = find_child_by_kind(node, "identifier")?;
        let modifiers = modifier_texts(node, source);

        let mut class = ExtractedClass {
            name: extract_text(&name_node, source).to_string(),
            namespace: ns_stack.join("."),
            is_abstract: modifiers.iter().any(|m| m == "abstract"),
            file_path: self.parsed.path.clone(),
            relative_path: self.relative_path.clone(),
            methods: Vec::new(),
            properties: Vec::new(),
            fields: Vec::new(),
            base_types: base_type_names(node, source),
            implemented_interfaces: Vec::new(),
        };

        if let Some(body) = find_child_by_kind(node, "declaration_list") {
            let mut cursor = body.walk();
            for member in body.named_children(&mut cursor) {
                match member.kind() {
                    "method_declaration" => {
                        if let Some(method) = self.extract_method(&member) {
                            class.methods.push(method);
                        }
                    }
                    "property_declaration" => {
                        if let Some(property) = self.extract_property(&member) {
                            class.properties.push(property);
                        }
                    }
                    "field_declaration" => {
                        self.extract_fields(&member, &mut class.fields);
                    }
                    _ => {}
                }
            }
        }

        Some(class)
    }

    fn extract_method(&self, node: &TSNode) -> Option<ExtractedMethod> {
        let source = self.parsed.source_bytes();
        let name = method_name(node, source)?;
        let modifiers = modifier_texts(node, source);
        let return_type = find_type_child(node)
            .map(|t| extract_text(&t, source).to_string())
            .unwrap_or_else(|| "void".to_string());

        let mut parameters = Vec::new();
        if let Some(param_list) = find_child_by_kind(node, "parameter_list") {
            let mut cursor = param_list.walk();
            for param in param_list.named_children(&mut cursor) {
                if param.kind() != "parameter" {
                    continue;
                }
                let type_node = find_type_child(&param);
                let mut p_cursor = param.walk();
                let name_node = param
                    .children(&mut p_cursor)
                    .filter(|c| c.kind() == "identifier")
                    .last();
                if let (Some(ty), Some(pn)) = (type_node, name_node) {
                    // `Foo x` yields two identifiers; the first one is the type.
                    if ty.id() == pn.id() {
                        continue;
                    }
                    parameters.push(ExtractedParameter {
                        name: extract_text(&pn, source).to_string(),
                        type_text: extract_text(&ty, source).to_string(),
                    });
                }
            }
        }

        Some(ExtractedMethod {
            name,
            return_type,
            access: AccessLevel::from_modifiers(&modifiers),
            is_static: modifiers.iter().any(|m| m == "static"),
            is_abstract: modifiers.iter().any(|m| m == "abstract"),
            is_virtual: modifiers.iter().any(|m| m == "virtual"),
            is_override: modifiers.iter().any(|m| m == "override"),
            parameters,
            line_number: line_of(node),
        })
    }

    fn extract_property(&self, node: &TSNode) -> Option<ExtractedProperty> {
        let source = self.parsed.source_bytes();
        let type_node = find_type_child(node)?;
        let mut cursor = node.walk();
        let name_node = node
            .children(&mut cursor)
            .filter(|c| c.kind() == "identifier")
            .last()?;
        if name_node.id() == type_node.id() {
            return None;
        }
        let modifiers = modifier_texts(node, source);

        let mut has_getter = false;
        let mut has_setter = false;
        if let Some(accessors) = find_child_by_kind(node, "accessor_list") {
            for accessor in find_children_by_kind(&accessors, "accessor_declaration") {
                let mut a_cursor = accessor.walk();
                for token in accessor.children(&mut a_cursor) {
                    match extract_text(&token, source) {
                        "get" => has_getter = true,
                        "set" | "init" => has_setter = true,
                        _ => {}
                    }
                }
            }
        } else if find_child_by_kind(node, "arrow_expression_clause").is_some() {
            // Expression-bodied property reads as getter-only.
            has_getter = true;
        }

        Some(ExtractedProperty {
            name: extract_text(&name_node, source).to_string(),
            type_text: extract_text(&type_node, source).to_string(),
            access: AccessLevel::from_modifiers(&modifiers),
            has_getter,
            has_setter,
            initializer: property_initializer(node, source),
            line_number: line_of(node),
        })
    }

    /// Multi-variable declarations expand to one field per declarator.
    fn extract_fields(&self, node: &TSNode, out: &mut Vec<ExtractedField>) {
        let source = self.parsed.source_bytes();
        let Some(declaration) = find_child_by_kind(node, "variable_declaration") else {
            return;
        };
        let Some(type_node) = find_type_child(&declaration) else {
            return;
        };
        let type_text = extract_text(&type_node, source).to_string();
        let modifiers = modifier_texts(node, source);

        for declarator in find_children_by_kind(&declaration, "variable_declarator") {
            let Some(name_node) = find_child_by_kind(&declarator, "identifier") else {
                continue;
            };
            out.push(ExtractedField {
                name: extract_text(&name_node, source).to_string(),
                type_text: type_text.clone(),
                access: AccessLevel::from_modifiers(&modifiers),
                is_static: modifiers.iter().any(|m| m == "static"),
                is_readonly: modifiers.iter().any(|m| m == "readonly" || m == "const"),
                line_number: line_of(node),
            });
        }
    }
}

/// Property initializer text: everything after the `=` that follows the
/// accessor list, kept verbatim as opaque text.
fn property_initializer(node: &TSNode, source: &[u8]) -> Option<String> {
    if let Some(clause) = find_child_by_kind(node, "equals_value_clause") {
        let mut cursor = clause.walk();
        return clause
            .named_children(&mut cursor)
            .last()
            .map(|value| extract_text(&value, source).to_string());
    }
    let mut cursor = node.walk();
    let mut seen_equals = false;
    for child in node.children(&mut cursor) {
        if child.kind() == "=" {
            seen_equals = true;
            continue;
        }
        if seen_equals && child.kind() != ";" {
            return Some(extract_text(&child, source).to_string());
        }
    }
    None
}

/// Phase-two step: classify each base-list name through the symbol table.
/// Names that resolve to interface declarations land in
/// `implemented_interfaces`; unresolved names stay in `base_types` only.
pub fn resolve_implemented_interfaces(
    classes: &mut [ExtractedClass],
    usings: &[String],
    model: &SemanticModel,
) {
    for class in classes.iter_mut() {
        class.implemented_interfaces = class
            .base_types
            .iter()
            .filter(|base| {
                model
                    .resolve_type(base, &class.namespace, usings)
                    .map(|ty| ty.kind == TypeKind::Interface)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
    }
}
