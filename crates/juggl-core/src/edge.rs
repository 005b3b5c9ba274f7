use crate::element::{ClassList, EdgeData, EdgeDefinition, Group};
use crate::model::Reference;
use crate::typed_link::{link_alias, parse_typed_link, TypedLink, TypedLinkGrammar};

/// Describe one reference occurrence as a graph edge.
///
/// `content` holds the lines of the source document. The edge count is always
/// 1; callers merging parallel edges aggregate it themselves.
pub fn build_edge(
    reference: &Reference,
    content: &[&str],
    id: &str,
    source: &str,
    target: &str,
    grammar: &TypedLinkGrammar,
) -> EdgeDefinition {
    let line = context_line(reference, content);
    let typed = grammar.parse(&reference.original, line);
    assemble(reference, line, id, source, target, typed)
}

/// [`build_edge`] with a grammar compiled for `typed_link_prefix`.
pub fn parse_ref_cache(
    reference: &Reference,
    content: &[&str],
    id: &str,
    source: &str,
    target: &str,
    typed_link_prefix: &str,
) -> EdgeDefinition {
    let line = context_line(reference, content);
    let typed = parse_typed_link(&reference.original, line, typed_link_prefix);
    assemble(reference, line, id, source, target, typed)
}

fn context_line<'a>(reference: &Reference, content: &[&'a str]) -> &'a str {
    content
        .get(reference.position.start.line)
        .copied()
        .unwrap_or_default()
}

fn assemble(
    reference: &Reference,
    line: &str,
    id: &str,
    source: &str,
    target: &str,
    typed: Option<TypedLink>,
) -> EdgeDefinition {
    let start = reference.position.start;
    let mut data = EdgeData {
        id: id.to_string(),
        source: source.to_string(),
        target: target.to_string(),
        context: line.to_string(),
        edge_count: 1,
        line: start.line,
        start: start.col,
        end: reference.position.end.col,
        alias: link_alias(&reference.original),
        relation: None,
        year: None,
        extra: Default::default(),
    };

    let mut classes = ClassList::new();
    match typed {
        // typed properties first, base attributes win on collision
        Some(typed) => {
            let properties = typed.properties;
            data.alias = data.alias.or(properties.alias);
            data.relation = Some(properties.relation);
            data.year = properties.year;
            data.extra = properties
                .extra
                .into_iter()
                .filter(|(key, _)| !is_base_key(key))
                .collect();
            classes.push(typed.class);
        }
        None => classes.push("inline"),
    }

    EdgeDefinition {
        group: Group::Edges,
        data,
        classes,
    }
}

fn is_base_key(key: &str) -> bool {
    matches!(
        key,
        "id" | "source" | "target" | "context" | "edgeCount" | "line" | "start" | "end"
            | "alias" | "type" | "year"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_file_cache;
    use serde_json::json;

    fn edge_for(text: &str, prefix: &str) -> EdgeDefinition {
        let cache = parse_file_cache(text);
        let lines: Vec<&str> = text.lines().collect();
        parse_ref_cache(&cache.links[0], &lines, "core:A->core:B0", "core:A", "core:B", prefix)
    }

    #[test]
    fn test_inline_edge() {
        let edge = edge_for("intro\nsee [[B|the b]] here", "-");

        assert_eq!(edge.group, Group::Edges);
        assert_eq!(edge.data.context, "see [[B|the b]] here");
        assert_eq!(edge.data.edge_count, 1);
        assert_eq!(edge.data.line, 1);
        assert_eq!(edge.data.start, 4);
        assert_eq!(edge.data.end, 15);
        assert_eq!(edge.data.alias.as_deref(), Some("the b"));
        assert_eq!(edge.data.relation, None);
        assert_eq!(edge.classes.as_slice(), ["inline"]);
    }

    #[test]
    fn test_typed_edge() {
        let edge = edge_for("- cites [[B]], [[C]]", "-");

        assert_eq!(edge.classes.as_slice(), ["type-cites"]);
        assert_eq!(edge.data.relation.as_deref(), Some("cites"));
        assert_eq!(edge.data.context, "- cites [[B]], [[C]]");
        assert_eq!(edge.data.alias, None);
    }

    #[test]
    fn test_published_in_edge_serializes() {
        let edge = edge_for("- publishedIn 2001 [[B]]", "-");
        let value = serde_json::to_value(&edge).unwrap();
        assert_eq!(
            value,
            json!({
                "group": "edges",
                "data": {
                    "id": "core:A->core:B0",
                    "source": "core:A",
                    "target": "core:B",
                    "context": "- publishedIn 2001 [[B]]",
                    "edgeCount": 1,
                    "line": 0,
                    "start": 19,
                    "end": 24,
                    "type": "publishedIn",
                    "year": "2001"
                },
                "classes": "type-publishedIn"
            })
        );
    }

    #[test]
    fn test_line_out_of_range_gives_empty_context() {
        let cache = parse_file_cache("[[B]]");
        let edge = parse_ref_cache(&cache.links[0], &[], "e", "s", "t", "-");
        assert_eq!(edge.data.context, "");
        assert!(edge.classes.contains("inline"));
    }
}
