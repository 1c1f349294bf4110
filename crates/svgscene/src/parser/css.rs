// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use crate::style::Style;

/// Collects all `style` elements into a single style sheet.
pub(crate) fn resolve_css<'a>(xml: &'a roxmltree::Document<'a>) -> simplecss::StyleSheet<'a> {
    let mut sheet = simplecss::StyleSheet::new();

    for node in xml.descendants().filter(|n| n.has_tag_name("style")) {
        match node.attribute("type") {
            Some("text/css") => {}
            Some(_) => continue,
            None => {}
        }

        let text = match node.text() {
            Some(v) => v,
            None => continue,
        };

        sheet.parse_more(text);
    }

    sheet
}

/// Applies matching style sheet rules to a style.
pub(crate) fn apply_rules(
    style: &mut Style,
    sheet: &simplecss::StyleSheet,
    xml_node: roxmltree::Node,
) {
    for rule in &sheet.rules {
        if rule.selector.matches(&XmlNode(xml_node)) {
            for declaration in &rule.declarations {
                style.apply_declaration(declaration.name, declaration.value);
            }
        }
    }
}

struct XmlNode<'a, 'input: 'a>(roxmltree::Node<'a, 'input>);

impl simplecss::Element for XmlNode<'_, '_> {
    fn parent_element(&self) -> Option<Self> {
        self.0.parent_element().map(XmlNode)
    }

    fn prev_sibling_element(&self) -> Option<Self> {
        self.0.prev_sibling_element().map(XmlNode)
    }

    fn has_local_name(&self, local_name: &str) -> bool {
        self.0.tag_name().name() == local_name
    }

    fn attribute_matches(&self, local_name: &str, operator: simplecss::AttributeOperator) -> bool {
        match self.0.attribute(local_name) {
            Some(value) => operator.matches(value),
            None => false,
        }
    }

    fn pseudo_class_matches(&self, class: simplecss::PseudoClass) -> bool {
        match class {
            simplecss::PseudoClass::FirstChild => self.prev_sibling_element().is_none(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_rules() {
        let doc = roxmltree::Document::parse(
            "<svg><style>.a { fill: red } rect { opacity: 0.5 }</style><rect class='a'/></svg>",
        )
        .unwrap();
        let sheet = resolve_css(&doc);
        let rect = doc.descendants().find(|n| n.has_tag_name("rect")).unwrap();

        let mut style = Style::default();
        apply_rules(&mut style, &sheet, rect);
        assert_eq!(style.fill, crate::style::Paint::Color(svgtypes::Color::new_rgb(255, 0, 0)));
        assert_eq!(style.opacity, 0.5);
    }
}
