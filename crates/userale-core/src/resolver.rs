use userale_common::protocol::{DomEvent, Node};

/// Builds a CSS-like selector (`tag#id.class`) for a node.
pub fn selector_of(node: &Node) -> String {
    let name = node
        .local_name
        .as_deref()
        .filter(|name| !name.is_empty())
        .or_else(|| node.node_name.as_deref().filter(|name| !name.is_empty()));

    match name {
        Some(name) => {
            let mut selector = name.to_string();
            if let Some(id) = node.id.as_deref().filter(|id| !id.is_empty()) {
                selector.push('#');
                selector.push_str(id);
            }
            if let Some(class) = node.class_name.as_deref().filter(|c| !c.is_empty()) {
                selector.push('.');
                selector.push_str(class);
            }
            selector
        }
        None if node.window.is_window() => "Window".to_string(),
        None => "Unknown".to_string(),
    }
}

/// Selectors from the event target up to the root.
pub fn path_of(event: &DomEvent) -> Vec<String> {
    match &event.composed_path {
        Some(path) => selectorize(path.iter()),
        None => selectorize(ancestors(&event.target)),
    }
}

pub fn selectorize<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> Vec<String> {
    nodes.into_iter().map(selector_of).collect()
}

fn ancestors(node: &Node) -> impl Iterator<Item = &Node> {
    std::iter::successors(Some(node), |node| node.parent_element())
}
