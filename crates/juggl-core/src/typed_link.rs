//! Typed links: a line such as `- cites [[Paper]], [[Other]]` names the
//! relation between the document and the linked targets.
//!
//! The grammar is an ordered list of [`TypedLinkRule`]s. Each rule is a
//! line-anchored pattern template plus an extractor; the first rule whose
//! pattern matches the whole line wins. New relation kinds are added by
//! passing extra rules to [`TypedLinkGrammar::with_rules`].

use crate::error::Result;
use log::warn;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `[[target]]` or `[[target|display]]`
pub const WIKILINK_PATTERN: &str = r"\[\[([^\]\r\n]+?)\]\]";
/// Relation names: a letter or underscore followed by word characters
pub const NAME_PATTERN: &str = r"[A-Za-z_][A-Za-z0-9_]*";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypedLinkProperties {
    #[serde(rename = "type")]
    pub relation: String,
    pub context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedLink {
    pub class: String,
    pub is_inline: bool,
    pub properties: TypedLinkProperties,
}

impl TypedLink {
    pub fn new(relation: &str, properties: TypedLinkProperties) -> Self {
        Self {
            class: format!("type-{relation}"),
            is_inline: false,
            properties,
        }
    }
}

/// Builds the result of a matched rule from its captures and the link alias.
pub type Extractor = fn(&Captures<'_>, Option<String>) -> Option<TypedLink>;

/// Pattern template placeholders: `{prefix}` (escaped typed-link prefix,
/// templates allow optional spaces after it),
/// `{name}` ([`NAME_PATTERN`]) and `{wikilinks}` (one or more wikilinks
/// separated by optional commas and spaces).
#[derive(Debug, Clone, Copy)]
pub struct TypedLinkRule {
    pub name: &'static str,
    pub template: &'static str,
    pub extract: Extractor,
}

pub const PUBLISHED_IN: TypedLinkRule = TypedLinkRule {
    name: "publishedIn",
    template: r"^{prefix} *(publishedIn) ([0-9]{4}) {wikilinks}$",
    extract: extract_published_in,
};

pub const NAMED_RELATION: TypedLinkRule = TypedLinkRule {
    name: "named",
    template: r"^{prefix} *({name}) {wikilinks}$",
    extract: extract_named_relation,
};

pub const DEFAULT_RULES: &[TypedLinkRule] = &[PUBLISHED_IN, NAMED_RELATION];

fn extract_published_in(caps: &Captures<'_>, _alias: Option<String>) -> Option<TypedLink> {
    let relation = caps.get(1)?.as_str();
    Some(TypedLink::new(
        relation,
        TypedLinkProperties {
            relation: relation.to_string(),
            context: String::new(),
            year: Some(caps.get(2)?.as_str().to_string()),
            ..Default::default()
        },
    ))
}

fn extract_named_relation(caps: &Captures<'_>, alias: Option<String>) -> Option<TypedLink> {
    let relation = caps.get(1)?.as_str();
    Some(TypedLink::new(
        relation,
        TypedLinkProperties {
            relation: relation.to_string(),
            context: String::new(),
            alias,
            ..Default::default()
        },
    ))
}

/// Display text of a piped wikilink: `[[Target|Shown]]` -> `Shown`.
pub fn link_alias(original: &str) -> Option<String> {
    let (_, rest) = original.split_once('|')?;
    Some(rest.strip_suffix("]]").unwrap_or(rest).to_string())
}

struct CompiledRule {
    rule: TypedLinkRule,
    regex: Regex,
}

/// Typed-link rules compiled for one prefix.
pub struct TypedLinkGrammar {
    prefix: String,
    rules: Vec<CompiledRule>,
}

impl TypedLinkGrammar {
    pub fn new(prefix: &str) -> Result<Self> {
        Self::with_rules(prefix, DEFAULT_RULES.iter().copied())
    }

    pub fn with_rules(prefix: &str, rules: impl IntoIterator<Item = TypedLinkRule>) -> Result<Self> {
        let escaped = regex::escape(prefix);
        let wikilinks = format!("(?:{WIKILINK_PATTERN},? *)+");
        let rules = rules
            .into_iter()
            .map(|rule| {
                let pattern = rule
                    .template
                    .replace("{prefix}", &escaped)
                    .replace("{name}", NAME_PATTERN)
                    .replace("{wikilinks}", &wikilinks);
                Ok(CompiledRule {
                    rule,
                    regex: Regex::new(&pattern)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            prefix: prefix.to_string(),
            rules,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(|r| r.rule.name)
    }

    /// Match `line` against the rules in order; `raw_link` supplies the alias.
    pub fn parse(&self, raw_link: &str, line: &str) -> Option<TypedLink> {
        self.rules.iter().find_map(|compiled| {
            let caps = compiled.regex.captures(line)?;
            (compiled.rule.extract)(&caps, link_alias(raw_link))
        })
    }
}

/// One-shot typed-link parse. Never fails: an unusable grammar matches nothing.
pub fn parse_typed_link(raw_link: &str, line: &str, prefix: &str) -> Option<TypedLink> {
    match TypedLinkGrammar::new(prefix) {
        Ok(grammar) => grammar.parse(raw_link, line),
        Err(e) => {
            warn!("typed link grammar for prefix {:?} unusable: {}", prefix, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_published_in() {
        let link = parse_typed_link("[[Journal]]", "::publishedIn 1999 [[Journal]]", "::").unwrap();
        assert_eq!(link.class, "type-publishedIn");
        assert!(!link.is_inline);
        assert_eq!(link.properties.relation, "publishedIn");
        assert_eq!(link.properties.year.as_deref(), Some("1999"));
        assert_eq!(link.properties.context, "");
        assert_eq!(link.properties.alias, None);

        let spaced = parse_typed_link("[[Journal]]", ":: publishedIn 1999 [[Journal]]", "::");
        assert_eq!(spaced, Some(link));
    }

    #[test]
    fn test_published_in_takes_precedence() {
        let link = parse_typed_link("[[J|Journal]]", "- publishedIn 2020 [[J|Journal]]", "-").unwrap();
        assert_eq!(link.class, "type-publishedIn");
        assert_eq!(link.properties.alias, None);

        // a non-year falls through to the named relation rule
        let link = parse_typed_link("[[J]]", "- publishedIn [[J]]", "-").unwrap();
        assert_eq!(link.class, "type-publishedIn");
        assert_eq!(link.properties.year, None);
    }

    #[test]
    fn test_named_relation_with_alias() {
        let link = parse_typed_link(
            "[[Paper|The Paper]]",
            "- cites [[Paper|The Paper]], [[Other]]",
            "-",
        )
        .unwrap();
        assert_eq!(link.class, "type-cites");
        assert_eq!(link.properties.relation, "cites");
        assert_eq!(link.properties.alias.as_deref(), Some("The Paper"));
    }

    #[test]
    fn test_no_match() {
        assert_eq!(parse_typed_link("[[A]]", "see [[A]] for details", "-"), None);
        assert_eq!(parse_typed_link("[[A]]", "- 2cites [[A]]", "-"), None);
        assert_eq!(parse_typed_link("[[A]]", "- cites [[A]] and more", "-"), None);
        assert_eq!(parse_typed_link("[[A]]", "- cites", "-"), None);
        assert_eq!(parse_typed_link("", "", "-"), None);
    }

    #[test]
    fn test_prefix_is_literal() {
        assert!(parse_typed_link("[[A]]", "*. rel [[A]]", "*.").is_some());
        assert_eq!(parse_typed_link("[[A]]", "xx rel [[A]]", ".."), None);
        assert!(parse_typed_link("[[A]]", "[(? rel [[A]]", "[(?").is_some());
    }

    #[test]
    fn test_link_alias() {
        assert_eq!(link_alias("[[Target|Shown Text]]"), Some("Shown Text".to_string()));
        assert_eq!(link_alias("[[Target]]"), None);
        assert_eq!(link_alias("[[T|a|b]]"), Some("a|b".to_string()));
    }

    #[test]
    fn test_custom_rule() {
        fn extract(caps: &Captures<'_>, alias: Option<String>) -> Option<TypedLink> {
            let mut properties = TypedLinkProperties {
                relation: "rated".to_string(),
                alias,
                ..Default::default()
            };
            properties
                .extra
                .insert("stars".to_string(), Value::from(caps.get(1)?.as_str().len()));
            Some(TypedLink::new("rated", properties))
        }
        let rated = TypedLinkRule {
            name: "rated",
            template: r"^{prefix} (\*+) {wikilinks}$",
            extract,
        };
        let grammar = TypedLinkGrammar::with_rules(
            "-",
            [rated].into_iter().chain(DEFAULT_RULES.iter().copied()),
        )
        .unwrap();
        assert_eq!(grammar.rule_names().collect::<Vec<_>>(), ["rated", "publishedIn", "named"]);

        let link = grammar.parse("[[Film]]", "- *** [[Film]]").unwrap();
        assert_eq!(link.class, "type-rated");
        assert_eq!(link.properties.extra["stars"], 3);
        assert_eq!(grammar.parse("[[A]]", "- likes [[A]]").unwrap().class, "type-likes");
    }
}
