//! Heading outline (table of contents) for detail pages.

use crate::markdown::html_escape;
use serde::Serialize;

/// A heading found in a rendered body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heading {
    /// 1 through 6
    pub level: u8,
    pub text: String,
    /// Page-unique anchor carried as the heading's `id`
    pub anchor: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineNode {
    pub heading: Heading,
    pub children: Vec<OutlineNode>,
}

/// Build the outline forest from headings in document order
///
/// A heading becomes a child of the nearest open heading with a strictly
/// lower level; a heading closes every open heading at its level or deeper.
pub fn build_outline(headings: &[Heading]) -> Vec<OutlineNode> {
    let mut roots = Vec::new();
    let mut stack: Vec<OutlineNode> = Vec::new();

    for heading in headings {
        while stack
            .last()
            .is_some_and(|open| open.heading.level >= heading.level)
        {
            close_top(&mut stack, &mut roots);
        }
        stack.push(OutlineNode {
            heading: heading.clone(),
            children: Vec::new(),
        });
    }

    while !stack.is_empty() {
        close_top(&mut stack, &mut roots);
    }

    roots
}

fn close_top(stack: &mut Vec<OutlineNode>, roots: &mut Vec<OutlineNode>) {
    if let Some(node) = stack.pop() {
        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => roots.push(node),
        }
    }
}

/// Render the outline as nested lists, or `None` when there are no headings
pub fn render_outline(nodes: &[OutlineNode]) -> Option<String> {
    if nodes.is_empty() {
        return None;
    }
    let mut html = String::from(r#"<nav class="toc-nav">"#);
    render_list(nodes, &mut html);
    html.push_str("</nav>");
    Some(html)
}

fn render_list(nodes: &[OutlineNode], html: &mut String) {
    html.push_str(r#"<ul class="toc-list">"#);
    for node in nodes {
        html.push_str(&format!(
            r##"<li class="toc-level-{}"><a href="#{}">{}</a>"##,
            node.heading.level,
            html_escape(&node.heading.anchor),
            html_escape(&node.heading.text)
        ));
        if !node.children.is_empty() {
            render_list(&node.children, html);
        }
        html.push_str("</li>");
    }
    html.push_str("</ul>");
}
