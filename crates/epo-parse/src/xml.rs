//! Per-file exchange-document extraction.
//!
//! Files are parsed into an in-memory tree and queried by local element
//! name, so namespace prefixes in the source never matter. A single
//! malformed document rejects the whole file; the caller counts it failed
//! and moves on.

use crate::error::{ParseError, Result};
use crate::record::{
    Citation, DocId, ExchangeDocument, FamilyMember, PatentClassification, PublicationReference,
};
use roxmltree::{Document, Node};
use std::path::Path;

/// Parse a file's content and extract every `exchange-document`.
///
/// # Errors
/// Returns error if the XML is malformed or any document violates the
/// required-field rules.
pub fn extract_documents(path: &Path, content: &str) -> Result<Vec<ExchangeDocument>> {
    let doc = Document::parse(content).map_err(|e| ParseError::Xml {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut documents = Vec::new();
    for node in doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "exchange-document")
    {
        documents.push(parse_exchange_document(path, node)?);
    }
    Ok(documents)
}

fn parse_exchange_document(path: &Path, node: Node<'_, '_>) -> Result<ExchangeDocument> {
    let country = required_attr(path, node, "country")?;
    let doc_number = required_attr(path, node, "doc-number")?;
    let kind = required_attr(path, node, "kind")?;
    let status = required_attr(path, node, "status")?;

    Ok(ExchangeDocument {
        country,
        doc_number,
        kind,
        status,
        classifications: parse_classifications(path, node)?,
        citations: parse_citations(node),
        family_members: parse_family(path, node)?,
    })
}

/// A non-empty attribute on `exchange-document`; anything else rejects the
/// document.
fn required_attr(path: &Path, node: Node<'_, '_>, name: &str) -> Result<String> {
    match node.attribute(name) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(ParseError::missing(
            path,
            format!("attribute '{name}' on exchange-document"),
        )),
    }
}

fn parse_classifications(path: &Path, node: Node<'_, '_>) -> Result<Vec<PatentClassification>> {
    let mut classifications = Vec::new();
    for item in node
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "patent-classification")
    {
        let scheme = child_element(item, "classification-scheme")
            .and_then(|s| s.attribute("scheme"))
            .ok_or_else(|| {
                ParseError::missing(path, "classification-scheme/@scheme on patent-classification")
            })?;
        let symbol = child_element(item, "classification-symbol")
            .ok_or_else(|| ParseError::missing(path, "classification-symbol on patent-classification"))?;
        classifications.push(PatentClassification {
            scheme: scheme.to_string(),
            symbol: element_text(symbol),
        });
    }
    Ok(classifications)
}

fn parse_citations(node: Node<'_, '_>) -> Vec<Citation> {
    node.descendants()
        .filter(|n| {
            n.is_element()
                && n.tag_name().name() == "citation"
                && n.parent()
                    .is_some_and(|p| p.tag_name().name() == "references-cited")
        })
        .map(parse_citation)
        .collect()
}

fn parse_citation(node: Node<'_, '_>) -> Citation {
    // categories live in two places: a direct child, or under rel-passage
    let mut categories = Vec::new();
    for child in node.children().filter(Node::is_element) {
        match child.tag_name().name() {
            "category" => push_category(&mut categories, child),
            "rel-passage" => {
                for nested in child
                    .children()
                    .filter(|n| n.is_element() && n.tag_name().name() == "category")
                {
                    push_category(&mut categories, nested);
                }
            }
            _ => {}
        }
    }

    let cited_id = child_element(node, "patcit")
        .and_then(|patcit| child_element(patcit, "document-id"))
        .map(|doc_id| parse_doc_id(doc_id).composed())
        .unwrap_or_default();

    Citation {
        cited_id,
        categories,
    }
}

fn push_category(categories: &mut Vec<String>, node: Node<'_, '_>) {
    let text = element_text(node);
    if !text.is_empty() {
        categories.push(text);
    }
}

fn parse_family(path: &Path, node: Node<'_, '_>) -> Result<Vec<FamilyMember>> {
    let mut members = Vec::new();
    for member in node.descendants().filter(|n| {
        n.is_element()
            && n.tag_name().name() == "family-member"
            && n.parent()
                .is_some_and(|p| p.tag_name().name() == "patent-family")
    }) {
        let mut references = Vec::new();
        for reference in member
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == "publication-reference")
        {
            let data_format = reference.attribute("data-format").ok_or_else(|| {
                ParseError::missing(path, "data-format on publication-reference")
            })?;
            let doc_id = child_element(reference, "document-id")
                .ok_or_else(|| ParseError::missing(path, "document-id on publication-reference"))?;
            references.push(PublicationReference {
                data_format: data_format.to_string(),
                doc_id: parse_doc_id(doc_id),
            });
        }
        if references.is_empty() {
            return Err(ParseError::missing(
                path,
                "publication-reference on family-member",
            ));
        }
        members.push(FamilyMember {
            publication_references: references,
        });
    }
    Ok(members)
}

fn parse_doc_id(node: Node<'_, '_>) -> DocId {
    DocId {
        country: child_text(node, "country"),
        doc_number: child_text(node, "doc-number"),
        kind: child_text(node, "kind"),
    }
}

fn child_element<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

fn child_text(node: Node<'_, '_>, name: &str) -> String {
    child_element(node, name).map_or_else(String::new, element_text)
}

fn element_text(node: Node<'_, '_>) -> String {
    node.text().unwrap_or_default().trim().to_string()
}
