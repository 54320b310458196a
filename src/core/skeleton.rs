use tree_sitter::Node as TSNode;

use crate::parser::{extract_text, find_child_by_kind, find_children_by_kind, ParsedFile};

const INDENT: &str = "    ";

/// Reduces a parsed file to its declaration surface: method and constructor
/// bodies become `;` stubs, property accessors become auto-property stubs,
/// field and property initializers are dropped, and comments disappear.
/// The output is syntactically valid source that re-parses without errors.
pub struct Skeletonizer<'a> {
    parsed: &'a ParsedFile,
}

impl<'a> Skeletonizer<'a> {
    pub fn new(parsed: &'a ParsedFile) -> Self {
        Self { parsed }
    }

    pub fn skeletonize(&self) -> String {
        let mut out = String::new();
        let root = self.parsed.root();
        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            self.emit_top_level(&child, &mut out);
        }
        out
    }

    fn source(&self) -> &[u8] {
        self.parsed.source_bytes()
    }

    fn emit_top_level(&self, node: &TSNode, out: &mut String) {
        match node.kind() {
            "using_directive" => {
                out.push_str(&clean_text(node, self.source()));
                out.push('\n');
            }
            // The file-scoped form carries the rest of the file's
            // declarations as its children.
            "file_scoped_namespace_declaration" => {
                let name = namespace_name(node, self.source());
                out.push('\n');
                out.push_str(&format!("namespace {};\n\n", name));
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.emit_declaration(&child, 0, out);
                }
            }
            "namespace_declaration" => {
                let name = namespace_name(node, self.source());
                out.push('\n');
                out.push_str(&format!("namespace {}\n{{\n", name));
                if let Some(body) = find_child_by_kind(node, "declaration_list") {
                    let mut cursor = body.walk();
                    for child in body.named_children(&mut cursor) {
                        self.emit_declaration(&child, 1, out);
                    }
                }
                out.push_str("}\n");
            }
            _ => self.emit_declaration(node, 0, out),
        }
    }

    fn emit_declaration(&self, node: &TSNode, indent: usize, out: &mut String) {
        match node.kind() {
            "namespace_declaration" => {
                let name = namespace_name(node, self.source());
                push_line(out, indent, &format!("namespace {}", name));
                push_line(out, indent, "{");
                if let Some(body) = find_child_by_kind(node, "declaration_list") {
                    let mut cursor = body.walk();
                    for child in body.named_children(&mut cursor) {
                        self.emit_declaration(&child, indent + 1, out);
                    }
                }
                push_line(out, indent, "}");
            }
            "class_declaration" | "interface_declaration" | "struct_declaration"
            | "record_declaration" => self.emit_type(node, indent, out),
            "enum_declaration" | "delegate_declaration" => {
                push_line(out, indent, &clean_text(node, self.source()));
            }
            _ => {}
        }
    }

    fn emit_type(&self, node: &TSNode, indent: usize, out: &mut String) {
        let header = self.member_header(node, &["declaration_list", ";"]);
        let Some(body) = find_child_by_kind(node, "declaration_list") else {
            // Body-less record declarations keep their `;` form.
            push_line(out, indent, &format!("{};", header));
            return;
        };
        push_line(out, indent, &header);
        push_line(out, indent, "{");
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            self.emit_member(&member, indent + 1, out);
        }
        push_line(out, indent, "}");
    }

    fn emit_member(&self, node: &TSNode, indent: usize, out: &mut String) {
        match node.kind() {
            "method_declaration"
            | "constructor_declaration"
            | "destructor_declaration"
            | "operator_declaration"
            | "conversion_operator_declaration" => {
                let header = self.member_header(
                    node,
                    &[
                        "block",
                        "arrow_expression_clause",
                        "constructor_initializer",
                        ";",
                    ],
                );
                push_line(out, indent, &format!("{};", header));
            }
            "property_declaration" | "indexer_declaration" => {
                self.emit_property(node, indent, out);
            }
            "field_declaration" | "event_field_declaration" => {
                self.emit_field(node, indent, out);
            }
            "event_declaration" => {
                // `event T E { add {...} remove {...} }` collapses the same
                // way accessors do.
                let header = self.member_header(node, &["accessor_list", ";"]);
                push_line(out, indent, &format!("{} {{ add; remove; }}", header));
            }
            "class_declaration" | "interface_declaration" | "struct_declaration"
            | "record_declaration" | "enum_declaration" | "delegate_declaration" => {
                self.emit_declaration(node, indent, out);
            }
            _ => {}
        }
    }

    fn emit_property(&self, node: &TSNode, indent: usize, out: &mut String) {
        let header = self.member_header(node, &["accessor_list", "arrow_expression_clause", "="]);
        let accessors = match find_child_by_kind(node, "accessor_list") {
            Some(list) => {
                let mut kinds = Vec::new();
                for accessor in find_children_by_kind(&list, "accessor_declaration") {
                    let mut cursor = accessor.walk();
                    for token in accessor.children(&mut cursor) {
                        match extract_text(&token, self.source()) {
                            "get" => kinds.push("get;"),
                            "set" => kinds.push("set;"),
                            "init" => kinds.push("init;"),
                            _ => {}
                        }
                    }
                }
                if kinds.is_empty() {
                    "{ get; set; }".to_string()
                } else {
                    format!("{{ {} }}", kinds.join(" "))
                }
            }
            // Expression-bodied property stubs as getter-only.
            None => "{ get; }".to_string(),
        };
        push_line(out, indent, &format!("{} {}", header, accessors));
    }

    /// Field stub: modifiers, type, declarator names. Initializers are gone,
    /// multi-variable declarations keep all their names.
    fn emit_field(&self, node: &TSNode, indent: usize, out: &mut String) {
        let source = self.source();
        let Some(declaration) = find_child_by_kind(node, "variable_declaration") else {
            return;
        };
        let mut parts: Vec<String> = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "variable_declaration" {
                break;
            }
            if child.kind() == "attribute_list" || child.kind() == "comment" {
                continue;
            }
            parts.push(clean_text(&child, source));
        }

        let mut names = Vec::new();
        let mut type_text = String::new();
        let mut d_cursor = declaration.walk();
        for child in declaration.children(&mut d_cursor) {
            match child.kind() {
                "variable_declarator" => {
                    if let Some(n) = find_child_by_kind(&child, "identifier") {
                        names.push(extract_text(&n, source).to_string());
                    }
                }
                "comment" | "," => {}
                _ => {
                    if type_text.is_empty() {
                        type_text = clean_text(&child, source);
                    }
                }
            }
        }
        if type_text.is_empty() || names.is_empty() {
            return;
        }
        parts.push(type_text);
        parts.push(names.join(", "));
        push_line(out, indent, &format!("{};", parts.join(" ")));
    }

    /// Declaration header: every child before the first stop kind, comments
    /// removed, joined with single spaces. Attribute lists survive as part of
    /// the header.
    fn member_header(&self, node: &TSNode, stop_kinds: &[&str]) -> String {
        let source = self.source();
        let mut parts = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if stop_kinds.contains(&child.kind()) {
                break;
            }
            if child.kind() == "comment" {
                continue;
            }
            parts.push(clean_text(&child, source));
        }
        parts.join(" ")
    }
}

fn push_line(out: &mut String, indent: usize, text: &str) {
    for _ in 0..indent {
        out.push_str(INDENT);
    }
    out.push_str(text);
    out.push('\n');
}

fn namespace_name(node: &TSNode, source: &[u8]) -> String {
    let mut cursor = node.walk();
    let name = node
        .named_children(&mut cursor)
        .find(|c| matches!(c.kind(), "identifier" | "qualified_name"));
    name.map(|n| extract_text(&n, source).to_string())
        .unwrap_or_default()
}

fn has_comment(node: &TSNode) -> bool {
    if node.kind() == "comment" {
        return true;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if has_comment(&child) {
            return true;
        }
    }
    false
}

/// Node text with comment tokens removed. The common no-comment case is a
/// verbatim slice; otherwise leaf tokens are re-joined, and the whitespace
/// around each removed comment collapses to a single space.
pub fn clean_text(node: &TSNode, source: &[u8]) -> String {
    if !has_comment(node) {
        return extract_text(node, source).to_string();
    }
    let mut out = String::new();
    let mut prev_end = node.start_byte();
    let mut dropped = false;
    append_clean(node, source, &mut out, &mut prev_end, &mut dropped);
    out
}

fn append_clean(
    node: &TSNode,
    source: &[u8],
    out: &mut String,
    prev_end: &mut usize,
    dropped: &mut bool,
) {
    if node.kind() == "comment" {
        *dropped = true;
        *prev_end = node.end_byte();
        return;
    }
    if node.child_count() == 0 {
        let start = node.start_byte();
        if *dropped {
            if !out.is_empty() {
                out.push(' ');
            }
            *dropped = false;
        } else if start > *prev_end {
            out.push_str(std::str::from_utf8(&source[*prev_end..start]).unwrap_or(" "));
        }
        out.push_str(extract_text(node, source));
        *prev_end = node.end_byte();
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        append_clean(&child, source, out, prev_end, dropped);
    }
}
