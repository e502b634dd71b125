use annotex::typeset::parse;
use annotex::{
    Comment, Composition, Document, ExportConfig, Highlight, LatexConverter, Node, export,
};
use uuid::Uuid;

fn tag(index: u128) -> Uuid {
    Uuid::from_u128(0xb000 + index)
}

fn wrap(index: u128) -> String {
    format!("\\highLight[tag-{}]{{", tag(index))
}

fn run(doc: &Document, highlights: &[Highlight], comments: &[Comment]) -> Composition {
    let config = ExportConfig::default();
    let composition = export(doc, highlights, comments, &LatexConverter::new(), &config).unwrap();
    parse(&composition.output, &config.compositor.boundary_table())
        .expect("composed output should parse");
    composition
}

#[test]
fn highlight_inside_one_paragraph_is_one_region() {
    let doc = Document::new(vec![Node::paragraph("The quick brown fox.")]);
    let composition = run(&doc, &[Highlight::new(tag(0), 4, 15)], &[]);
    assert_eq!(
        composition.output,
        format!("The {}quick brown}} fox.\n", wrap(0))
    );
    assert_eq!(composition.stats.wrap_regions, 1);
    assert_eq!(composition.stats.boundary_splits, 0);
}

#[test]
fn highlight_across_heading_is_two_regions() {
    let doc = Document::new(vec![Node::heading(1, "Intro"), Node::paragraph("Body text")]);
    let composition = run(&doc, &[Highlight::new(tag(0), 2, 10)], &[]);
    assert_eq!(
        composition.output,
        format!("\\section{{In{w}tro}}}}\n\n{w}Body}} text\n", w = wrap(0))
    );
    assert_eq!(composition.stats.wrap_regions, 2);
    assert_eq!(composition.stats.boundary_splits, 1);
}

#[test]
fn three_overlapping_highlights_nest_in_opening_order() {
    // one two three four five
    let doc = Document::new(vec![Node::paragraph("one two three four five")]);
    let highlights = [
        Highlight::new(tag(0), 0, 13),
        Highlight::new(tag(1), 4, 18),
        Highlight::new(tag(2), 8, 23),
    ];
    let composition = run(&doc, &highlights, &[]);
    assert_eq!(
        composition.output,
        format!(
            "{a}one }}{a}{b}two }}}}{a}{b}{c}three}}}}}}{b}{c} four}}}}{c} five}}\n",
            a = wrap(0),
            b = wrap(1),
            c = wrap(2)
        )
    );
    assert_eq!(composition.stats.wrap_regions, 5);
    assert_eq!(composition.stats.reordered_closes, 2);
}

#[test]
fn highlight_ending_at_document_end() {
    let doc = Document::new(vec![Node::heading(1, "Hello"), Node::paragraph("last words")]);
    let len = doc.canonical_text().chars().count();
    assert_eq!(len, 16);
    let composition = run(&doc, &[Highlight::new(tag(0), 6, len)], &[]);
    assert_eq!(
        composition.output,
        format!("\\section{{Hello}}\n\n{}last words}}\n", wrap(0))
    );
    assert_eq!(composition.stats.wrap_regions, 1);
}

#[test]
fn close_out_of_nesting_order_reopens_inner() {
    let doc = Document::new(vec![Node::paragraph("abcdefghij")]);
    let highlights = [Highlight::new(tag(0), 0, 5), Highlight::new(tag(1), 2, 8)];
    let composition = run(&doc, &highlights, &[]);
    assert_eq!(
        composition.output,
        format!(
            "{a}ab}}{a}{b}cde}}}}{b}fgh}}ij\n",
            a = wrap(0),
            b = wrap(1)
        )
    );
    assert_eq!(composition.stats.reordered_closes, 1);
}

#[test]
fn annotation_follows_its_highlight() {
    let doc = Document::new(vec![Node::paragraph("Hello world")]);
    let highlight = Highlight::new(tag(0), 0, 5);
    let comment = Comment {
        highlight_id: highlight.id,
        author: "R_2".into(),
        text: "needs #1".into(),
        timestamp: "today".into(),
    };
    let composition = run(&doc, &[highlight], &[comment]);
    assert_eq!(
        composition.output,
        format!(
            "{}Hello}}\\annot{{tag-{}}}{{\\annotcomment{{R\\_2}}{{today}}{{needs \\#1}}}} world\n",
            wrap(0),
            tag(0)
        )
    );
    assert_eq!(composition.stats.annotations, 1);
}
