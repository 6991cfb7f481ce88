use crate::config::{LinkOption, Settings};
use crate::glossary::GlossaryEntry;
use crate::pass::Annotator;
use crate::tree::{DocumentTree, NodeId, PageTree};

pub fn entry(name: &str, synonyms: &[&str], kind: &str, url: &str) -> GlossaryEntry {
    GlossaryEntry::new(
        name,
        synonyms.iter().map(|s| s.to_string()).collect(),
        kind,
        format!("About {}", name),
        url,
    )
}

pub fn vitamin_d() -> GlossaryEntry {
    entry("Vitamin D", &["Vit D"], "glossary", "/vitamin-d")
}

pub fn settings(link_option: LinkOption) -> Settings {
    Settings {
        link_option,
        ..Settings::default()
    }
}

/// `<body><main><p>{text}</p></main></body>`
pub fn single_paragraph(text: &str) -> (PageTree, NodeId) {
    let mut page = PageTree::new();
    let main = page.element(page.root(), "main");
    let p = page.element(main, "p");
    page.add_text(p, text);
    (page, main)
}

pub fn annotator(page: PageTree, entries: Vec<GlossaryEntry>, link_option: LinkOption) -> Annotator<PageTree> {
    let mut annotator = Annotator::new(page, "example.org", settings(link_option));
    annotator.set_dictionary(entries);
    annotator
}

/// (matched text, data-url) for every annotation, in document order
pub fn annotations(page: &PageTree) -> Vec<(String, String)> {
    use crate::tree::DocumentMut;
    page.annotations()
        .iter()
        .map(|a| {
            (
                page.text_content(a),
                page.attribute(a, "data-url").unwrap_or_default(),
            )
        })
        .collect()
}

/// A page with prose, excluded contexts and repeated terms
pub fn mixed_page() -> PageTree {
    let mut page = PageTree::new();
    let root = page.root();
    let header = page.element(root, "header");
    page.add_text(header, "Zinc header outside main");

    let main = page.element(root, "main");
    let h1 = page.element(main, "h1");
    page.add_text(h1, "Zinc and Vitamin D");
    let p = page.element(main, "p");
    page.add_text(p, "Low vitamin d is common; zinc helps. ");
    let em = page.element(p, "em");
    page.add_text(em, "Vit D");
    page.add_text(p, " and creatine too.");
    let link = page.element_with(p, "a", &[("href", "/elsewhere")]);
    page.add_text(link, "creatine");
    let script = page.element(main, "script");
    page.add_text(script, "const zinc = 1;");
    let button = page.element(main, "button");
    let span = page.element(button, "span");
    page.add_text(span, "Buy creatine");
    page.add_text(main, "Creatine, zinc, and Vitamin D again.");
    page
}

pub fn mixed_entries() -> Vec<GlossaryEntry> {
    vec![
        vitamin_d(),
        entry("Zinc", &[], "interventions", "/supplements/zinc"),
        entry("Creatine", &[], "interventions", "/supplements/creatine"),
    ]
}
