use crate::line_map::LineMap;
use crate::model::{FileCache, Reference, TagRef, TextRange};
use once_cell::sync::Lazy;
use pulldown_cmark::{Event, LinkType, MetadataBlockKind, Options, Parser, Tag, TagEnd};
use regex::Regex;
use serde_json::Value;

static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[\s(])(#[\p{L}\p{N}_/\-]+)").expect("tag pattern is valid"));

struct PendingLink {
    dest: String,
    has_pothole: bool,
    start: usize,
    is_embed: bool,
    is_wikilink: bool,
    display: String,
}

/// Build the metadata cache entry of one markdown document.
pub fn parse_file_cache(text: &str) -> FileCache {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_WIKILINKS);
    options.insert(Options::ENABLE_YAML_STYLE_METADATA_BLOCKS);

    let parser = Parser::new_ext(text, options);
    let line_map = LineMap::new(text);
    let mut cache = FileCache::default();

    let mut in_frontmatter = false;
    let mut frontmatter_content = String::new();
    let mut in_code_block = false;
    let mut pending: Option<PendingLink> = None;

    for (event, range) in parser.into_offset_iter() {
        match event {
            Event::Start(Tag::MetadataBlock(MetadataBlockKind::YamlStyle)) => {
                in_frontmatter = true;
            }
            Event::End(TagEnd::MetadataBlock(MetadataBlockKind::YamlStyle)) => {
                in_frontmatter = false;
                if let Ok(Value::Object(mut map)) =
                    serde_yaml::from_str::<Value>(&frontmatter_content)
                {
                    let position = TextRange {
                        start: line_map.loc(text, range.start),
                        end: line_map.loc(text, range.end),
                    };
                    if let Ok(position) = serde_json::to_value(position) {
                        map.insert("position".to_string(), position);
                    }
                    cache.frontmatter = Some(map);
                }
            }

            Event::Start(Tag::CodeBlock(_)) => in_code_block = true,
            Event::End(TagEnd::CodeBlock) => in_code_block = false,

            Event::Start(Tag::Link {
                link_type,
                dest_url,
                ..
            }) => match link_type {
                LinkType::WikiLink { has_pothole } => {
                    pending = Some(PendingLink {
                        dest: dest_url.to_string(),
                        has_pothole,
                        start: range.start,
                        is_embed: false,
                        is_wikilink: true,
                        display: String::new(),
                    });
                }
                LinkType::Inline if is_local_target(&dest_url) => {
                    pending = Some(PendingLink {
                        dest: dest_url.replace("%20", " "),
                        has_pothole: true,
                        start: range.start,
                        is_embed: false,
                        is_wikilink: false,
                        display: String::new(),
                    });
                }
                _ => {}
            },
            Event::Start(Tag::Image {
                link_type: LinkType::WikiLink { has_pothole },
                dest_url,
                ..
            }) => {
                pending = Some(PendingLink {
                    dest: dest_url.to_string(),
                    has_pothole,
                    start: range.start,
                    is_embed: true,
                    is_wikilink: true,
                    display: String::new(),
                });
            }
            Event::End(TagEnd::Link) | Event::End(TagEnd::Image) => {
                if let Some(link) = pending.take() {
                    let mut end = range.end;
                    if link.is_wikilink {
                        // the reported range may stop before the closing brackets
                        while end < text.len() && text.as_bytes()[end] == b']' {
                            end += 1;
                        }
                    }
                    let display = link.display.trim();
                    let reference = Reference {
                        link: link.dest.trim().to_string(),
                        original: text[link.start..end].to_string(),
                        display_text: (link.has_pothole && !display.is_empty())
                            .then(|| display.to_string()),
                        position: TextRange {
                            start: line_map.loc(text, link.start),
                            end: line_map.loc(text, end),
                        },
                    };
                    if link.is_embed {
                        cache.embeds.push(reference);
                    } else {
                        cache.links.push(reference);
                    }
                }
            }

            Event::Text(cow_str) => {
                if in_frontmatter {
                    frontmatter_content.push_str(cow_str.as_ref());
                } else if let Some(link) = pending.as_mut() {
                    link.display.push_str(cow_str.as_ref());
                } else if !in_code_block {
                    if let Some(source) = text.get(range.clone()) {
                        for caps in TAG_RE.captures_iter(source) {
                            let Some(m) = caps.get(1) else { continue };
                            let tag = m.as_str();
                            if tag[1..].chars().all(|c| c.is_ascii_digit()) {
                                continue;
                            }
                            cache.tags.push(TagRef {
                                tag: tag.to_string(),
                                position: TextRange {
                                    start: line_map.loc(text, range.start + m.start()),
                                    end: line_map.loc(text, range.start + m.end()),
                                },
                            });
                        }
                    }
                }
            }
            _ => {}
        }
    }

    cache
}

fn is_local_target(dest: &str) -> bool {
    !dest.is_empty() && !dest.starts_with('#') && url::Url::parse(dest).is_err()
}
