//! N-Triples serialization.

use crate::{OntologyGraph, RdfNode, RdfObject};
use std::io::{self, Write};

fn escape_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

fn node_display(node: &RdfNode) -> String {
    match node {
        RdfNode::Iri(iri) => format!("<{iri}>"),
        RdfNode::BlankNode(bn) => format!("_:{bn}"),
    }
}

fn object_display(object: &RdfObject) -> String {
    match object {
        RdfObject::Node(node) => node_display(node),
        RdfObject::Literal(lit) => {
            let mut out = format!("\"{}\"", escape_literal(&lit.lexical));
            if let Some(lang) = &lit.language {
                out.push('@');
                out.push_str(lang);
            } else if let Some(dt) = &lit.datatype {
                out.push_str(&format!("^^<{dt}>"));
            }
            out
        }
    }
}

/// Write every statement of `graph` as one N-Triples line, in graph order.
pub fn write_ntriples<W: Write>(graph: &OntologyGraph, out: &mut W) -> io::Result<()> {
    for (subject, predicate, object) in graph.statements() {
        writeln!(
            out,
            "{} <{}> {} .",
            node_display(subject),
            predicate,
            object_display(object)
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GraphWriter, Literal};

    #[test]
    fn escapes_quotes_and_newlines() {
        let mut graph = OntologyGraph::new("g");
        graph.add_literal("http://ex/a", "http://ex/p", "say \"hi\"\nnow", Some("en"));
        let mut buf = Vec::new();
        write_ntriples(&graph, &mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "<http://ex/a> <http://ex/p> \"say \\\"hi\\\"\\nnow\"@en .\n"
        );
    }

    #[test]
    fn typed_literal_keeps_datatype() {
        let lit = Literal {
            lexical: "3".into(),
            datatype: Some("http://www.w3.org/2001/XMLSchema#integer".into()),
            language: None,
        };
        assert_eq!(
            object_display(&RdfObject::Literal(lit)),
            "\"3\"^^<http://www.w3.org/2001/XMLSchema#integer>"
        );
    }
}
