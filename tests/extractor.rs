use marrow::core::{
    AccessLevel, AnalysisReport, AnalyzerConfig, CompilationAnalyzer, ExtractedClass,
};

fn analyze(sources: &[(&str, &str)]) -> AnalysisReport {
    CompilationAnalyzer::new(AnalyzerConfig::default())
        .analyze_sources(sources)
        .expect("analysis failed")
}

fn find_class<'a>(report: &'a AnalysisReport, name: &str) -> &'a ExtractedClass {
    report
        .structure
        .classes
        .iter()
        .find(|c| c.name == name)
        .unwrap_or_else(|| panic!("class {} not extracted", name))
}

#[test]
fn extracts_class_with_nested_namespace() {
    let source = r#"
namespace Outer
{
    namespace Inner
    {
        public class Widget { }
    }
}
"#;
    let report = analyze(&[("widget.cs", source)]);
    let class = find_class(&report, "Widget");
    assert_eq!(class.namespace, "Outer.Inner");
    assert_eq!(class.qualified_name(), "Outer.Inner.Widget");
}

#[test]
fn extracts_class_with_dotted_and_file_scoped_namespaces() {
    let dotted = r#"
namespace My.App.Services
{
    public class Dotted { }
}
"#;
    let scoped = r#"
namespace My.App.Models;

public class Scoped { }
"#;
    let report = analyze(&[("a.cs", dotted), ("b.cs", scoped)]);
    assert_eq!(find_class(&report, "Dotted").namespace, "My.App.Services");
    assert_eq!(find_class(&report, "Scoped").namespace, "My.App.Models");
}

#[test]
fn separates_interfaces_from_base_classes() {
    let source = r#"
namespace App
{
    public interface IBaz { }
    public class Bar { }
    public class Foo : Bar, IBaz { }
}
"#;
    let report = analyze(&[("foo.cs", source)]);
    let foo = find_class(&report, "Foo");
    assert_eq!(foo.base_types, vec!["Bar", "IBaz"]);
    assert_eq!(foo.implemented_interfaces, vec!["IBaz"]);
}

#[test]
fn unresolved_base_names_stay_out_of_interfaces() {
    let source = r#"
namespace App
{
    public class Foo : UnknownBase, IUnknown { }
}
"#;
    let report = analyze(&[("foo.cs", source)]);
    let foo = find_class(&report, "Foo");
    assert_eq!(foo.base_types, vec!["UnknownBase", "IUnknown"]);
    assert!(foo.implemented_interfaces.is_empty());
}

#[test]
fn interfaces_structs_and_enums_are_not_extracted_as_classes() {
    let source = r#"
namespace App
{
    public interface IThing { }
    public struct Point { }
    public enum Color { Red, Green }
    public class Keeper { }
}
"#;
    let report = analyze(&[("types.cs", source)]);
    assert_eq!(report.structure.classes.len(), 1);
    assert_eq!(report.structure.classes[0].name, "Keeper");
}

#[test]
fn extracts_method_signatures_and_modifiers() {
    let source = r#"
namespace App
{
    public abstract class Shape
    {
        public abstract double Area();
        public virtual string Describe(string prefix, int width) { return prefix; }
        protected override string ToString() { return ""; }
        static void Helper() { }
    }
}
"#;
    let report = analyze(&[("shape.cs", source)]);
    let shape = find_class(&report, "Shape");
    assert!(shape.is_abstract);
    assert_eq!(shape.methods.len(), 4);

    let area = shape.methods.iter().find(|m| m.name == "Area").unwrap();
    assert!(area.is_abstract);
    assert_eq!(area.return_type, "double");
    assert_eq!(area.access, AccessLevel::Public);

    let describe = shape.methods.iter().find(|m| m.name == "Describe").unwrap();
    assert!(describe.is_virtual);
    assert_eq!(describe.parameters.len(), 2);
    assert_eq!(describe.parameters[0].name, "prefix");
    assert_eq!(describe.parameters[0].type_text, "string");
    assert_eq!(describe.parameters[1].type_text, "int");

    let to_string = shape.methods.iter().find(|m| m.name == "ToString").unwrap();
    assert!(to_string.is_override);
    assert_eq!(to_string.access, AccessLevel::Protected);

    let helper = shape.methods.iter().find(|m| m.name == "Helper").unwrap();
    assert!(helper.is_static);
    assert_eq!(helper.access, AccessLevel::Private);
    assert_eq!(helper.return_type, "void");
}

#[test]
fn method_with_identifier_return_type_keeps_its_name() {
    let source = r#"
namespace App
{
    public class Factory
    {
        public Widget Build() { return null; }
    }
    public class Widget { }
}
"#;
    let report = analyze(&[("factory.cs", source)]);
    let factory = find_class(&report, "Factory");
    let build = &factory.methods[0];
    assert_eq!(build.name, "Build");
    assert_eq!(build.return_type, "Widget");
}

#[test]
fn multi_variable_field_declaration_expands_per_name() {
    let source = r#"
namespace App
{
    public class Counters
    {
        private int a, b, c;
        public static readonly string Tag = "x";
        const double Ratio = 1.5;
    }
}
"#;
    let report = analyze(&[("counters.cs", source)]);
    let counters = find_class(&report, "Counters");
    assert_eq!(counters.fields.len(), 5);

    let names: Vec<&str> = counters.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c", "Tag", "Ratio"]);

    let tag = counters.fields.iter().find(|f| f.name == "Tag").unwrap();
    assert!(tag.is_static);
    assert!(tag.is_readonly);
    assert_eq!(tag.access, AccessLevel::Public);

    let ratio = counters.fields.iter().find(|f| f.name == "Ratio").unwrap();
    assert!(ratio.is_readonly);
    // No modifier written means private.
    assert_eq!(ratio.access, AccessLevel::Private);
}

#[test]
fn extracts_properties_with_accessors_and_initializer() {
    let source = r#"
namespace App
{
    public class Config
    {
        public string Name { get; set; } = "default";
        public int Count { get; }
        internal double Ratio => 1.5;
    }
}
"#;
    let report = analyze(&[("config.cs", source)]);
    let config = find_class(&report, "Config");
    assert_eq!(config.properties.len(), 3);

    let name = config.properties.iter().find(|p| p.name == "Name").unwrap();
    assert!(name.has_getter && name.has_setter);
    assert_eq!(name.initializer.as_deref(), Some("\"default\""));

    let count = config.properties.iter().find(|p| p.name == "Count").unwrap();
    assert!(count.has_getter);
    assert!(!count.has_setter);
    assert!(count.initializer.is_none());

    let ratio = config.properties.iter().find(|p| p.name == "Ratio").unwrap();
    assert!(ratio.has_getter);
    assert!(!ratio.has_setter);
    assert_eq!(ratio.access, AccessLevel::Internal);
}

#[test]
fn nested_classes_become_separate_entities() {
    let source = r#"
namespace App
{
    public class Outer
    {
        private int x;
        public class Inner
        {
            public void Go() { }
        }
    }
}
"#;
    let report = analyze(&[("outer.cs", source)]);
    assert_eq!(report.structure.classes.len(), 2);
    let outer = find_class(&report, "Outer");
    let inner = find_class(&report, "Inner");
    assert_eq!(outer.fields.len(), 1);
    assert_eq!(inner.methods.len(), 1);
    assert_eq!(inner.namespace, "App");
}

#[test]
fn file_with_syntax_errors_is_skipped_not_fatal() {
    let good = r#"
namespace App
{
    public class Fine { }
}
"#;
    let bad = "namespace App { public class {{{";
    let report = analyze(&[("good.cs", good), ("bad.cs", bad)]);
    assert_eq!(report.structure.classes.len(), 1);
    assert_eq!(report.failed_files.len(), 1);
    assert_eq!(report.files_analyzed, 1);
    assert!(report.failed_files[0]
        .path
        .to_string_lossy()
        .contains("bad.cs"));
}

#[test]
fn repeated_extraction_yields_identical_results() {
    let lib = r#"
namespace App.Lib
{
    public class Greeter
    {
        private int uses;
        public string Tone { get; set; } = "warm";
        public void Greet() { Record(); }
        private void Record() { }
    }
}
"#;
    let main = r#"
using App.Lib;

namespace App.Main;

public class Program
{
    public void Run(Greeter greeter) { greeter.Greet(); }
}
"#;
    let sources = [("lib.cs", lib), ("main.cs", main)];
    let first = analyze(&sources);
    let second = analyze(&sources);
    assert_eq!(first.structure.classes, second.structure.classes);
    assert_eq!(
        first.structure.call_graph.call_count(),
        second.structure.call_graph.call_count()
    );
    assert_eq!(
        first.structure.call_graph.node_count(),
        second.structure.call_graph.node_count()
    );
}

#[test]
fn relative_path_is_recorded_on_classes() {
    let source = "namespace App { public class Thing { } }";
    let report = analyze(&[("src/Things/Thing.cs", source)]);
    let thing = find_class(&report, "Thing");
    assert_eq!(thing.relative_path, "src/Things/Thing.cs");
}
