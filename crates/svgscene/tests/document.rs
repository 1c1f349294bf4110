// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use svgscene::{Document, ElementKind, ElementTag, Error, LengthUnit, Tree};

fn parse(text: &str) -> Document {
    let mut doc = Document::default();
    doc.parse_str(text).unwrap();
    doc
}

fn tag_of(doc: &Document, id: &str) -> ElementTag {
    let node = doc.element_by_id(Some(id)).unwrap();
    doc.tree().node(node).unwrap().tag()
}

// Every registered ID must point to a live node with the same ID.
fn check_resources(tree: &Tree) {
    for (key, id) in tree.resources().iter() {
        let node = tree.node(id).unwrap();
        assert_eq!(node.id(), Some(key));
    }
}

#[test]
fn size_detection() {
    let doc = parse("<svg width='30' height='40%' xmlns='http://www.w3.org/2000/svg'/>");
    let (w, h) = doc.size();
    assert_eq!(w.number, 30.0);
    assert_eq!(h.number, 40.0);
    assert_eq!(h.unit, LengthUnit::Percent);

    let doc = Document::default();
    assert_eq!(doc.size().0.number, 0.0);
}

#[test]
fn elements_lookup() {
    let doc = parse(
        "
    <svg xmlns='http://www.w3.org/2000/svg'>
        <g id='g1' class='layer top'>
            <rect id='r1' class='shape' width='10' height='10'/>
            <circle id='c1' class='shape' r='5'/>
        </g>
    </svg>
    ",
    );

    assert_eq!(tag_of(&doc, "g1"), ElementTag::Group);
    assert_eq!(tag_of(&doc, "c1"), ElementTag::Circle);
    assert_eq!(doc.element_by_id(None), doc.tree().root());
    assert!(doc.element_by_id(Some("missing")).is_none());

    let shape = doc.element_by_class("shape").unwrap();
    assert_eq!(Some(shape), doc.element_by_id(Some("r1")));
    assert!(doc.tree().node(doc.element_by_class("top").unwrap()).unwrap().has_class("layer"));
    assert!(matches!(doc.element_by_class("none"), Err(Error::NoSuchElement)));
}

#[test]
fn unknown_elements_are_skipped() {
    let doc = parse(
        "
    <svg xmlns='http://www.w3.org/2000/svg'>
        <title>Title</title>
        <marker id='m1'/>
        <rect id='r1'/>
    </svg>
    ",
    );

    let root = doc.tree().root().unwrap();
    assert_eq!(doc.tree().children(root).len(), 1);
    assert!(doc.element_by_id(Some("m1")).is_none());
}

#[test]
fn invalid_root() {
    let mut doc = Document::default();
    let res = doc.parse_str("<g xmlns='http://www.w3.org/2000/svg'/>");
    assert!(matches!(res, Err(Error::ParsingFailed(_))));
    assert!(doc.tree().root().is_none());

    let res = doc.parse_str("<svg><g></svg>");
    assert!(matches!(res, Err(Error::ParsingFailed(_))));
}

#[test]
fn not_utf8() {
    let mut doc = Document::default();
    let res = doc.parse_buffer(b"<svg>\xff\xfe</svg>");
    assert!(matches!(res, Err(Error::NotAnUtf8Str)));
}

#[test]
fn missing_file() {
    let mut doc = Document::default();
    let res = doc.parse("this/file/does/not/exist.svg");
    assert!(matches!(res, Err(Error::FileNotFound)));
}

#[test]
fn invalid_attribute_propagates() {
    let mut doc = Document::default();
    let res = doc.parse_str("<svg xmlns='http://www.w3.org/2000/svg'><rect width='q'/></svg>");
    assert!(matches!(res, Err(Error::ParseError(_))));

    // Style declarations are more forgiving.
    let res = doc.parse_str(
        "<svg xmlns='http://www.w3.org/2000/svg'><rect style='opacity:q;fill:red'/></svg>",
    );
    assert!(res.is_ok());
}

#[test]
fn negative_image_size() {
    let mut doc = Document::default();
    let res = doc.parse_str(
        "<svg xmlns='http://www.w3.org/2000/svg'><image width='-1' height='5'/></svg>",
    );
    assert!(matches!(res, Err(Error::InvalidValue(_))));
}

#[test]
fn elements_limit() {
    let mut text = String::from("<svg xmlns='http://www.w3.org/2000/svg'>");
    for _ in 0..1100 {
        text.push_str("<g>");
    }
    for _ in 0..1100 {
        text.push_str("</g>");
    }
    text.push_str("</svg>");

    let mut doc = Document::default();
    assert!(matches!(doc.parse_str(&text), Err(Error::ElementsLimitReached)));
    assert_eq!(doc.tree().nodes().count(), 0);
}

#[test]
fn duplicated_id() {
    let doc = parse(
        "
    <svg xmlns='http://www.w3.org/2000/svg'>
        <rect id='r1'/>
        <circle id='r1'/>
    </svg>
    ",
    );

    assert_eq!(tag_of(&doc, "r1"), ElementTag::Rect);
    let root = doc.tree().root().unwrap();
    let circle = doc.tree().children(root)[1];
    assert_eq!(doc.tree().node(circle).unwrap().id(), None);
}

#[test]
fn gzip() {
    use std::io::Write;

    let text = "<svg xmlns='http://www.w3.org/2000/svg'><rect id='r1'/></svg>";
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    let data = encoder.finish().unwrap();

    let mut doc = Document::default();
    doc.parse_buffer(&data).unwrap();
    assert_eq!(tag_of(&doc, "r1"), ElementTag::Rect);

    let mut doc = Document::default();
    doc.parse_file(data.as_slice()).unwrap();
    assert_eq!(tag_of(&doc, "r1"), ElementTag::Rect);

    let res = Document::default().parse_buffer(&data[..data.len() / 2]);
    assert!(matches!(res, Err(Error::MalformedGZip)));
}

#[test]
fn chunked_parsing() {
    let text = "
    <svg xmlns='http://www.w3.org/2000/svg' viewBox='0 0 10 10'>
        <g id='g1'><rect id='r1' width='5' height='5'/></g>
        <path id='p1' d='M 0 0 L 10 10'/>
    </svg>
    ";

    let mut doc1 = Document::default();
    doc1.parse_buffer(text.as_bytes()).unwrap();

    let mut doc2 = Document::default();
    doc2.parse_chunk_begin().unwrap();
    for chunk in text.as_bytes().chunks(7) {
        doc2.parse_chunk(chunk).unwrap();
    }
    doc2.parse_chunk_end().unwrap();

    let list1: Vec<_> = doc1.tree().nodes().map(|(_, n)| (n.tag(), n.id().map(String::from))).collect();
    let list2: Vec<_> = doc2.tree().nodes().map(|(_, n)| (n.tag(), n.id().map(String::from))).collect();
    assert_eq!(list1, list2);
}

#[test]
fn chunk_without_begin() {
    let mut doc = Document::default();
    assert!(matches!(doc.parse_chunk(b"<svg/>"), Err(Error::InvalidCall)));
    assert!(matches!(doc.parse_chunk_end(), Err(Error::InvalidCall)));
}

#[test]
fn forward_use() {
    let doc = parse(
        "
    <svg xmlns='http://www.w3.org/2000/svg' xmlns:xlink='http://www.w3.org/1999/xlink'>
        <use id='u1' xlink:href='#r1' x='5'/>
        <rect id='r1' width='10' height='10'/>
    </svg>
    ",
    );

    let tree = doc.tree();
    let use_node = doc.element_by_id(Some("u1")).unwrap();
    assert_eq!(tree.children(use_node).len(), 1);

    let copy = tree.node(tree.children(use_node)[0]).unwrap();
    assert_eq!(copy.tag(), ElementTag::Rect);
    assert_eq!(copy.id(), None);
    check_resources(tree);
}

#[test]
fn nested_use() {
    let doc = parse(
        "
    <svg xmlns='http://www.w3.org/2000/svg'>
        <g id='g1'><use href='#r1'/></g>
        <use id='u2' href='#g1'/>
        <rect id='r1'/>
    </svg>
    ",
    );

    let tree = doc.tree();
    let u2 = doc.element_by_id(Some("u2")).unwrap();
    let g_copy = tree.children(u2)[0];
    let use_copy = tree.children(g_copy)[0];
    assert_eq!(tree.node(use_copy).unwrap().tag(), ElementTag::Use);
    assert_eq!(tree.children(use_copy).len(), 1);
}

#[test]
fn recursive_use() {
    let doc = parse(
        "
    <svg xmlns='http://www.w3.org/2000/svg'>
        <g id='g1'><use id='u1' href='#g1'/></g>
        <use id='u2' href='#u3'/>
        <use id='u3' href='#u2'/>
    </svg>
    ",
    );

    let u1 = doc.element_by_id(Some("u1")).unwrap();
    assert!(doc.tree().children(u1).is_empty());
}

#[test]
fn symbol_size_from_use() {
    let doc = parse(
        "
    <svg xmlns='http://www.w3.org/2000/svg'>
        <symbol id='s1' viewBox='0 0 10 10'><rect width='10' height='10'/></symbol>
        <use id='u1' href='#s1' width='20' height='30'/>
    </svg>
    ",
    );

    let tree = doc.tree();
    let u1 = doc.element_by_id(Some("u1")).unwrap();
    let copy = tree.node(tree.children(u1)[0]).unwrap();
    match copy.kind {
        ElementKind::Symbol(ref vp) => {
            assert_eq!(vp.width.number, 20.0);
            assert_eq!(vp.height.number, 30.0);
            assert!(vp.view_box.is_some());
        }
        _ => unreachable!(),
    }
}

#[test]
fn gradient_inheritance() {
    let doc = parse(
        "
    <svg xmlns='http://www.w3.org/2000/svg'>
        <linearGradient id='lg1' x2='50%' spreadMethod='reflect'>
            <stop offset='0.2' stop-color='red'/>
            <stop offset='10%' style='stop-color:blue;stop-opacity:0.5'/>
        </linearGradient>
        <linearGradient id='lg2' href='#lg1' x1='10%'/>
    </svg>
    ",
    );

    let id = doc.element_by_id(Some("lg2")).unwrap();
    match doc.tree().node(id).unwrap().kind {
        ElementKind::Gradient(ref g) => {
            assert_eq!(g.spread, svgscene::SpreadMethod::Reflect);
            assert_eq!(g.stops.len(), 2);
            // Offsets are monotonic.
            assert_eq!(g.stops[1].offset, 0.2);
            assert_eq!(g.stops[1].opacity, 0.5);
            assert_eq!(g.stops[1].color, svgscene::Color::new_rgb(0, 0, 255));
            match g.kind {
                svgscene::GradientKind::Linear { x1, x2, .. } => {
                    assert_eq!(x1.number, 10.0);
                    assert_eq!(x2.number, 50.0);
                }
                _ => unreachable!(),
            }
        }
        _ => unreachable!(),
    }
}

#[test]
fn filter_primitives() {
    let doc = parse(
        "
    <svg xmlns='http://www.w3.org/2000/svg'>
        <filter id='f1'>
            <feOffset dx='2'/>
            <feGaussianBlur stdDeviation='1 2' result='blur'/>
            <feBlend in='SourceGraphic' in2='blur' mode='multiply'/>
            <rect/>
        </filter>
        <rect id='r1' filter='url(#f1)'/>
    </svg>
    ",
    );

    let tree = doc.tree();
    let f1 = doc.element_by_id(Some("f1")).unwrap();
    assert!(tree.children(f1).is_empty());
    match tree.node(f1).unwrap().kind {
        ElementKind::Filter(ref f) => {
            assert_eq!(f.primitives().len(), 3);
            assert_eq!(f.result_index("blur"), Some(1));
        }
        _ => unreachable!(),
    }

    let r1 = tree.node(doc.element_by_id(Some("r1")).unwrap()).unwrap();
    assert_eq!(r1.style.filter_node(), Some(f1));
}

#[test]
fn css_precedence() {
    let doc = parse(
        "
    <svg xmlns='http://www.w3.org/2000/svg'>
        <style>rect { opacity: 0.1; fill-opacity: 0.2; stroke-opacity: 0.3 }</style>
        <rect id='r1' style='fill-opacity:0.4;stroke-opacity:0.5' stroke-opacity='0.6'/>
    </svg>
    ",
    );

    let r1 = doc.tree().node(doc.element_by_id(Some("r1")).unwrap()).unwrap();
    assert_eq!(r1.style.opacity, 0.1);
    assert_eq!(r1.style.fill_opacity, 0.4);
    assert_eq!(r1.style.stroke_opacity, 0.6);
}

#[test]
fn ignore_style_sheets() {
    let mut doc = Document::new(svgscene::Options {
        ignore_style_sheets: true,
        ..svgscene::Options::default()
    });
    doc.parse_str(
        "
    <svg xmlns='http://www.w3.org/2000/svg'>
        <style>rect { opacity: 0.1 }</style>
        <rect id='r1'/>
    </svg>
    ",
    )
    .unwrap();

    let r1 = doc.tree().node(doc.element_by_id(Some("r1")).unwrap()).unwrap();
    assert_eq!(r1.style.opacity, 1.0);
}

#[test]
fn text_content() {
    let doc = parse(
        "
    <svg xmlns='http://www.w3.org/2000/svg'>
        <text id='t1' x='5'>
            Hello,   <tspan id='s1'>big</tspan>
            world
        </text>
    </svg>
    ",
    );

    let tree = doc.tree();
    let t1 = doc.element_by_id(Some("t1")).unwrap();
    match tree.node(t1).unwrap().kind {
        ElementKind::Text(ref t) => assert_eq!(t.text, "Hello, world"),
        _ => unreachable!(),
    }

    assert_eq!(tree.children(t1).to_vec(), vec![doc.element_by_id(Some("s1")).unwrap()]);
}

#[test]
fn inject_fragment() {
    let mut doc = parse(
        "
    <svg xmlns='http://www.w3.org/2000/svg'>
        <g id='g1'/>
        <rect id='r1'/>
    </svg>
    ",
    );

    let g1 = doc.element_by_id(Some("g1")).unwrap();
    let r1 = doc.element_by_id(Some("r1")).unwrap();

    let fragment = b"<g xmlns='http://www.w3.org/2000/svg'><circle id='c1' r='5'/></g>";
    assert!(matches!(
        doc.parse_buffer_and_inject(r1, fragment),
        Err(Error::InvalidCall)
    ));

    let root = doc.parse_buffer_and_inject(g1, fragment).unwrap();
    assert_eq!(doc.tree().children(g1).to_vec(), vec![root]);
    assert_eq!(tag_of(&doc, "c1"), ElementTag::Circle);

    // A broken fragment leaves no traces.
    let count = doc.tree().nodes().count();
    let broken = b"<g xmlns='http://www.w3.org/2000/svg'><rect id='r2' width='q'/></g>";
    assert!(doc.parse_buffer_and_inject(g1, broken).is_err());
    assert_eq!(doc.tree().nodes().count(), count);
    assert!(doc.element_by_id(Some("r2")).is_none());
    assert_eq!(doc.tree().children(g1).len(), 1);
}

#[test]
fn release_invariant() {
    let mut doc = parse(
        "
    <svg xmlns='http://www.w3.org/2000/svg'>
        <g id='g1'>
            <rect id='r1'/>
            <g id='g2'><circle id='c1'/></g>
        </g>
        <rect id='r2'/>
    </svg>
    ",
    );

    let g1 = doc.element_by_id(Some("g1")).unwrap();
    let c1 = doc.element_by_id(Some("c1")).unwrap();
    doc.drop_element(g1).unwrap();

    let tree = doc.tree();
    assert!(!tree.is_alive(g1));
    assert!(!tree.is_alive(c1));
    for id in ["g1", "r1", "g2", "c1"] {
        assert!(!tree.resources().contains_key(id));
    }

    assert_eq!(tree.resources().len(), 1);
    check_resources(tree);

    // Already released.
    assert!(matches!(doc.drop_element(g1), Err(Error::InvalidCall)));
}

#[test]
fn clone_law() {
    let mut doc = parse(
        "
    <svg xmlns='http://www.w3.org/2000/svg'>
        <g id='g1' style='opacity:0.5;stroke:red'><rect id='r1'/></g>
    </svg>
    ",
    );

    let tree = doc.tree_mut();
    let g1 = tree.element_by_id(Some("g1")).unwrap();
    let copy1 = tree.clone_element(Some("copy1"), g1).unwrap();
    let copy2 = tree.clone_element(Some("copy2"), copy1).unwrap();
    assert_eq!(tree.node(copy2).unwrap().style, tree.node(g1).unwrap().style);
    assert_eq!(tree.children(copy2).len(), 1);

    assert!(matches!(tree.clone_element(Some("r1"), g1), Err(Error::InvalidCall)));

    tree.release_element(copy1).unwrap();
    assert!(tree.is_alive(g1));
    assert!(tree.is_alive(copy2));
    assert_eq!(tree.element_by_id(Some("r1")), Some(tree.children(g1)[0]));
    check_resources(tree);
}

#[test]
fn inject_element() {
    let mut doc = parse(
        "
    <svg xmlns='http://www.w3.org/2000/svg'>
        <g id='g1'/>
        <rect id='r1'/>
    </svg>
    ",
    );

    let tree = doc.tree_mut();
    let g1 = tree.element_by_id(Some("g1")).unwrap();
    let r1 = tree.element_by_id(Some("r1")).unwrap();

    assert!(matches!(tree.inject(Some("r2"), r1, g1), Err(Error::InvalidCall)));
    assert!(matches!(tree.inject(Some("g1"), g1, r1), Err(Error::InvalidCall)));

    let copy = tree.inject(Some("r2"), g1, r1).unwrap();
    assert_eq!(tree.parent(copy), Some(g1));
    assert_eq!(tree.element_by_id(Some("r2")), Some(copy));
}

#[test]
fn drop_from_non_container() {
    let mut tree = Tree::new();
    let path = tree.create_element(ElementTag::Path, None).unwrap();
    // The parent link is set, but a path cannot own children.
    let rect = tree.create_element(ElementTag::Rect, Some(path)).unwrap();
    assert!(matches!(tree.append_child(path, rect), Err(Error::InvalidCall)));

    assert!(matches!(tree.drop_element(rect), Err(Error::InvalidCall)));
    assert!(tree.is_alive(rect));
}
