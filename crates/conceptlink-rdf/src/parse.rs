//! Sophia-backed parsing into the crate's term model.

use crate::{vocab, Literal, RdfError, RdfNode, RdfObject, RdfStatement, Result};
use sophia::api::prelude::*;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdfFormat {
    NTriples,
    Turtle,
    NQuads,
    TriG,
    RdfXml,
}

impl RdfFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase();
        match ext.as_str() {
            "nt" | "ntriples" => Ok(RdfFormat::NTriples),
            "ttl" | "turtle" => Ok(RdfFormat::Turtle),
            "nq" | "nquads" => Ok(RdfFormat::NQuads),
            "trig" => Ok(RdfFormat::TriG),
            "rdf" | "owl" | "xml" => Ok(RdfFormat::RdfXml),
            other => Err(RdfError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Extension used when persisting a graph that was read in this format.
    ///
    /// Output is always N-Triples syntax; it is kept under `.nt` when the input
    /// was N-Triples and under `.ttl` otherwise.
    pub fn output_extension(self) -> &'static str {
        match self {
            RdfFormat::NTriples => "nt",
            _ => "ttl",
        }
    }
}

fn node(term: impl Term) -> Option<RdfNode> {
    match term.kind() {
        TermKind::Iri => term.iri().map(|iri| RdfNode::Iri(iri.as_str().to_string())),
        TermKind::BlankNode => term
            .bnode_id()
            .map(|id| RdfNode::BlankNode(id.as_str().to_string())),
        _ => None,
    }
}

fn object(term: impl Term) -> Option<RdfObject> {
    if term.kind() != TermKind::Literal {
        return node(term).map(RdfObject::Node);
    }
    // xsd:string and rdf:langString carry nothing beyond the lexical form.
    let datatype = term
        .datatype()
        .map(|dt| dt.as_str().to_string())
        .filter(|dt| dt != vocab::XSD_STRING && dt != vocab::RDF_LANG_STRING);
    Some(RdfObject::Literal(Literal {
        lexical: term.lexical_form()?.to_string(),
        datatype,
        language: term.language_tag().map(|tag| tag.as_str().to_string()),
    }))
}

/// Statements with a quoted-triple or variable term are skipped.
fn push_statement(out: &mut Vec<RdfStatement>, s: impl Term, p: impl Term, o: impl Term) {
    if let (Some(subject), Some(RdfNode::Iri(predicate)), Some(object)) =
        (node(s), node(p), object(o))
    {
        out.push(RdfStatement {
            subject,
            predicate,
            object,
        });
    }
}

/// Feed every triple (or quad, graph name dropped) of `$parser` into `$out`.
macro_rules! drain {
    ($parser:expr, $each:ident, $out:ident, $what:literal) => {
        $parser
            .$each(|t| push_statement(&mut $out, t.s(), t.p(), t.o()))
            .map_err(|e| RdfError::Parse(format!(concat!("failed to parse ", $what, ": {}"), e)))
    };
}

/// Parse a serialized RDF document into statements, in document order.
pub fn parse_statements(bytes: &[u8], format: RdfFormat) -> Result<Vec<RdfStatement>> {
    use sophia::turtle::parser::{nq, nt, trig, turtle};

    let reader = std::io::BufReader::new(std::io::Cursor::new(bytes));
    let mut out: Vec<RdfStatement> = Vec::new();
    match format {
        RdfFormat::NTriples => drain!(nt::parse_bufread(reader), for_each_triple, out, "N-Triples")?,
        RdfFormat::Turtle => drain!(turtle::parse_bufread(reader), for_each_triple, out, "Turtle")?,
        RdfFormat::NQuads => drain!(nq::parse_bufread(reader), for_each_quad, out, "N-Quads")?,
        RdfFormat::TriG => drain!(trig::parse_bufread(reader), for_each_quad, out, "TriG")?,
        RdfFormat::RdfXml => {
            drain!(sophia::xml::parser::parse_bufread(reader), for_each_triple, out, "RDF/XML")?
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals_keep_language_and_drop_string_datatype() {
        let ntriples = concat!(
            "<http://ex/a> <http://ex/p> \"diab\\u00E8te\" .\n",
            "<http://ex/a> <http://ex/p> \"Diab\u{e8}te\"@fr .\n",
            "<http://ex/a> <http://ex/p> \"C0011849\"^^<http://www.w3.org/2001/XMLSchema#string> .\n",
            "<http://ex/a> <http://ex/p> \"3\"^^<http://www.w3.org/2001/XMLSchema#integer> .\n",
            "_:b0 <http://ex/p> <http://ex/a> .\n",
        );
        let statements = parse_statements(ntriples.as_bytes(), RdfFormat::NTriples).unwrap();
        let objects: Vec<RdfObject> = statements.iter().map(|s| s.object.clone()).collect();
        assert_eq!(
            objects,
            vec![
                RdfObject::Literal(Literal::plain("diabète")),
                RdfObject::Literal(Literal::tagged("Diabète", "fr")),
                RdfObject::Literal(Literal::plain("C0011849")),
                RdfObject::Literal(Literal {
                    lexical: "3".into(),
                    datatype: Some("http://www.w3.org/2001/XMLSchema#integer".into()),
                    language: None,
                }),
                RdfObject::Node(RdfNode::Iri("http://ex/a".into())),
            ]
        );
        assert_eq!(statements[4].subject, RdfNode::BlankNode("b0".into()));
    }

    #[test]
    fn rejects_unknown_extension() {
        let err = RdfFormat::from_path(Path::new("onto.csv")).unwrap_err();
        assert!(matches!(err, RdfError::UnsupportedFormat(ext) if ext == "csv"));
        assert_eq!(
            RdfFormat::from_path(Path::new("onto.OWL")).unwrap(),
            RdfFormat::RdfXml
        );
    }

    #[test]
    fn parses_turtle_document() {
        let turtle = r#"
@prefix ex: <http://example.org/> .
@prefix skos: <http://www.w3.org/2004/02/skos/core#> .
ex:a skos:prefLabel "Alpha"@en ;
     skos:exactMatch ex:b .
"#;
        let statements = parse_statements(turtle.as_bytes(), RdfFormat::Turtle).unwrap();
        assert_eq!(statements.len(), 2);
        assert!(statements.iter().all(|s| s.subject == RdfNode::Iri("http://example.org/a".into())));
        assert!(statements.iter().any(|s| s.object
            == RdfObject::Literal(Literal::tagged("Alpha", "en"))));
    }
}
