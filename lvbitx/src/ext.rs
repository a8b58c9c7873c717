use roxmltree::{Document, Node};

use crate::{error::XmlError, FromValue, XmlLoad};

pub trait NodeExt<'a, 'input: 'a> {
    fn first_child_with_name(&self, name: &str) -> Result<Node<'a, 'input>, XmlError>;

    fn with_name(&self, name: &str) -> impl Iterator<Item = Node<'a, 'input>>;

    fn try_attribute(&self, name: &str) -> Result<&'a str, XmlError>;
}

impl<'a, 'input: 'a> NodeExt<'a, 'input> for Node<'a, 'input> {
    fn first_child_with_name(&self, name: &str) -> Result<Node<'a, 'input>, XmlError> {
        self.with_name(name)
            .next()
            .ok_or_else(|| XmlError::missing_field(self, name))
    }

    fn with_name(&self, name: &str) -> impl Iterator<Item = Node<'a, 'input>> {
        self.children().filter(move |n| n.has_tag_name(name))
    }

    fn try_attribute(&self, name: &str) -> Result<&'a str, XmlError> {
        self.attribute(name)
            .ok_or_else(|| XmlError::missing_attribute(self, name))
    }
}

/// Find the first element with the given tag name anywhere in the document.
/// The tree only guarantees ordered children, so this is a plain
/// depth-first scan.
pub fn find_descendant<'a, 'input>(
    doc: &'a Document<'input>,
    name: &str,
) -> Option<Node<'a, 'input>> {
    doc.root().descendants().find(|n| n.has_tag_name(name))
}

/// Like [`find_descendant`], but the element is required.
pub fn descendant_with_name<'a, 'input>(
    doc: &'a Document<'input>,
    name: &str,
) -> Result<Node<'a, 'input>, XmlError> {
    find_descendant(doc, name).ok_or_else(|| XmlError::missing_field(&doc.root(), name))
}

pub fn children_with_name<'input, T: XmlLoad<'input>>(
    node: &Node<'_, 'input>,
    name: &str,
) -> Result<Vec<T>, XmlError> {
    node.with_name(name).map(|e| T::load(&e)).collect()
}

pub fn value_from_contents<'input, T: FromValue>(node: &Node<'_, 'input>) -> Result<T, XmlError> {
    T::from_value(node, "content", node.text().unwrap_or_default())
}
