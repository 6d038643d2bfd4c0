//! Exchange-document model and row synthesis.
//!
//! One [`ExchangeDocument`] per `<exchange-document>` element, reduced to a
//! [`CsvRow`] with the normalization rules of the output contract: CPCI-only
//! classifications deduplicated and sorted, citations kept in document order
//! with empty cited ids dropped, docdb family members deduplicated, sorted,
//! and stripped of the document's own id.

use std::collections::BTreeSet;

/// A classification entry on a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatentClassification {
    /// Classification scheme, e.g. `CPCI`.
    pub scheme: String,
    /// Classification symbol, trimmed.
    pub symbol: String,
}

/// A citation entry on a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    /// Composed cited document id; empty when the citation has none.
    pub cited_id: String,
    /// Category codes, trimmed, empties dropped.
    pub categories: Vec<String>,
}

/// A document identifier triple.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocId {
    /// Country code.
    pub country: String,
    /// Document number.
    pub doc_number: String,
    /// Kind code.
    pub kind: String,
}

impl DocId {
    /// Concatenated id: country + number + kind.
    #[must_use]
    pub fn composed(&self) -> String {
        format!("{}{}{}", self.country, self.doc_number, self.kind)
    }
}

/// One publication reference inside a family member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicationReference {
    /// Identifier format, e.g. `docdb`.
    pub data_format: String,
    /// The referenced document id.
    pub doc_id: DocId,
}

/// One family member with its publication references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyMember {
    /// Publication references; always at least one.
    pub publication_references: Vec<PublicationReference>,
}

/// One `<exchange-document>` with everything the row needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeDocument {
    /// `country` attribute.
    pub country: String,
    /// `doc-number` attribute.
    pub doc_number: String,
    /// `kind` attribute.
    pub kind: String,
    /// `status` attribute.
    pub status: String,
    /// All `patent-classification` descendants.
    pub classifications: Vec<PatentClassification>,
    /// All `references-cited/citation` descendants, in document order.
    pub citations: Vec<Citation>,
    /// All `patent-family/family-member` descendants.
    pub family_members: Vec<FamilyMember>,
}

/// One output row, fields in column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRow {
    /// Composed document id.
    pub patent_id: String,
    /// `status` attribute, verbatim.
    pub status: String,
    /// Sorted unique CPCI symbols, `;`-joined.
    pub cpc_list: String,
    /// Citations in document order, `;`-joined.
    pub citations: String,
    /// Sorted unique docdb family ids, `;`-joined.
    pub family_patents: String,
}

impl ExchangeDocument {
    /// Composed document id: country + number + kind.
    #[must_use]
    pub fn patent_id(&self) -> String {
        format!("{}{}{}", self.country, self.doc_number, self.kind)
    }

    /// Reduce the document to its output row.
    #[must_use]
    pub fn to_row(&self) -> CsvRow {
        let patent_id = self.patent_id();

        let cpc: BTreeSet<&str> = self
            .classifications
            .iter()
            .filter(|c| c.scheme == "CPCI")
            .map(|c| c.symbol.as_str())
            .collect();

        let citations: Vec<String> = self
            .citations
            .iter()
            .filter(|c| !c.cited_id.is_empty())
            .map(|c| format!("{} ({})", c.cited_id, c.categories.join(",")))
            .collect();

        let family: BTreeSet<String> = self
            .family_members
            .iter()
            .flat_map(|m| &m.publication_references)
            .filter(|r| r.data_format == "docdb")
            .map(|r| r.doc_id.composed())
            .filter(|id| *id != patent_id)
            .collect();

        CsvRow {
            patent_id,
            status: self.status.clone(),
            cpc_list: cpc.into_iter().collect::<Vec<_>>().join(";"),
            citations: citations.join(";"),
            family_patents: family.into_iter().collect::<Vec<_>>().join(";"),
        }
    }
}
