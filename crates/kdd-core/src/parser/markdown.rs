//! Markdown/front-matter parser.
//!
//! Extracts an optional YAML front-matter block and an ordered sequence of
//! heading-delimited sections. Parse failures fall back to safe defaults:
//! empty front-matter, verbatim body.

use crate::types::Section;
use serde_json::{Map, Value};
use unicode_normalization::UnicodeNormalization;

/// Result of parsing one markdown buffer.
#[derive(Debug, Clone, Default)]
pub struct ParsedMarkdown {
    pub front_matter: Map<String, Value>,
    pub body: String,
    pub sections: Vec<Section>,
}

/// Parse front-matter and sections in one pass.
pub fn parse(content: &str) -> ParsedMarkdown {
    let (front_matter, body) = split_front_matter(content);
    let sections = parse_sections(&body);
    ParsedMarkdown {
        front_matter,
        body,
        sections,
    }
}

/// Split an optional leading YAML front-matter block (delimited by `---`
/// lines, `...` accepted as terminator) from the body.
///
/// On any parse failure the whole content is returned as body with empty
/// front-matter.
pub fn split_front_matter(content: &str) -> (Map<String, Value>, String) {
    let fallback = || (Map::new(), content.to_string());

    let mut lines = content.lines();
    let Some(first) = lines.next() else {
        return fallback();
    };
    if first.trim_start_matches('\u{feff}').trim_end() != "---" {
        return fallback();
    }

    let mut yaml_lines: Vec<&str> = Vec::new();
    let mut closed = false;
    let mut consumed = 1usize;
    for line in lines {
        consumed += 1;
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            closed = true;
            break;
        }
        yaml_lines.push(line);
    }
    if !closed {
        return fallback();
    }

    let raw_yaml = yaml_lines.join("\n");
    let front_matter = match parse_yaml_map(&raw_yaml) {
        Some(map) => map,
        None => return fallback(),
    };

    let body = content
        .lines()
        .skip(consumed)
        .collect::<Vec<_>>()
        .join("\n");
    (front_matter, body)
}

/// Parse YAML into a JSON-compatible map for uniform downstream handling.
fn parse_yaml_map(yaml: &str) -> Option<Map<String, Value>> {
    if yaml.trim().is_empty() {
        return Some(Map::new());
    }
    let yaml_value: serde_yaml::Value = serde_yaml::from_str(yaml).ok()?;
    let json_value: Value = serde_json::to_value(yaml_value).ok()?;
    match json_value {
        Value::Object(map) => Some(map),
        Value::Null => Some(Map::new()),
        _ => None,
    }
}

/// Scan the body for headings and produce ordered sections.
///
/// A line of one to six `#` followed by whitespace opens a section; sibling
/// and deeper open sections are popped so each section's path is the chain
/// of ancestor heading slugs joined by `.`.
pub fn parse_sections(body: &str) -> Vec<Section> {
    let lines: Vec<&str> = body.lines().collect();

    struct Heading {
        text: String,
        level: u8,
        line: usize,
    }

    let mut headings = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        if let Some((level, text)) = heading_of(line) {
            headings.push(Heading {
                text,
                level,
                line: idx,
            });
        }
    }

    let mut sections = Vec::with_capacity(headings.len());
    let mut stack: Vec<(u8, String)> = Vec::new();

    for (i, heading) in headings.iter().enumerate() {
        while stack.last().is_some_and(|(level, _)| *level >= heading.level) {
            stack.pop();
        }
        let slug = anchor_slug(&heading.text);
        let path = stack
            .iter()
            .map(|(_, s)| s.as_str())
            .chain(std::iter::once(slug.as_str()))
            .collect::<Vec<_>>()
            .join(".");
        stack.push((heading.level, slug));

        let body_start = heading.line + 1;
        let body_end = headings
            .get(i + 1)
            .map(|next| next.line)
            .unwrap_or(lines.len());
        let body = trim_blank_lines(&lines[body_start..body_end]);

        sections.push(Section {
            heading: heading.text.clone(),
            level: heading.level,
            body,
            path,
        });
    }

    sections
}

fn heading_of(line: &str) -> Option<(u8, String)> {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    if !(1..=6).contains(&hashes) {
        return None;
    }
    let rest = &line[hashes..];
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    Some((hashes as u8, rest.trim().to_string()))
}

/// Join lines, dropping blank lines at both ends while keeping interior
/// text verbatim.
fn trim_blank_lines(lines: &[&str]) -> String {
    let start = lines
        .iter()
        .position(|l| !l.trim().is_empty())
        .unwrap_or(lines.len());
    let end = lines
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .map(|i| i + 1)
        .unwrap_or(start);
    lines[start..end].join("\n")
}

/// Anchor slug: NFKD normalization, lowercasing, stripping characters
/// outside `[a-z0-9_-]`, whitespace runs collapsed to `-`, outer `-`
/// trimmed.
pub fn anchor_slug(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.nfkd() {
        for lc in c.to_lowercase() {
            if lc.is_ascii_alphanumeric() || lc == '_' || lc == '-' {
                out.push(lc);
            } else if lc.is_whitespace() {
                out.push(' ');
            }
        }
    }
    let collapsed = out.split_whitespace().collect::<Vec<_>>().join("-");
    collapsed.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_front_matter() {
        let input = "---\nkind: entity\nid: Pedido\nstatus: approved\n---\n# Pedido\nBody";
        let (fm, body) = split_front_matter(input);
        assert_eq!(fm["kind"], Value::String("entity".into()));
        assert_eq!(fm["id"], Value::String("Pedido".into()));
        assert!(body.starts_with("# Pedido"));
    }

    #[test]
    fn front_matter_with_alias_list() {
        let input = "---\nkind: entity\naliases:\n  - order\n  - pedido\n---\n";
        let (fm, _) = split_front_matter(input);
        let aliases = fm["aliases"].as_array().unwrap();
        assert_eq!(aliases.len(), 2);
    }

    #[test]
    fn bom_is_tolerated() {
        let input = "\u{feff}---\nkind: event\n---\nbody";
        let (fm, _) = split_front_matter(input);
        assert_eq!(fm["kind"], Value::String("event".into()));
    }

    #[test]
    fn missing_front_matter_keeps_body_verbatim() {
        let input = "# Title\nBody";
        let (fm, body) = split_front_matter(input);
        assert!(fm.is_empty());
        assert_eq!(body, input);
    }

    #[test]
    fn invalid_yaml_falls_back_to_verbatim_body() {
        let input = "---\nkind: [unterminated\n---\nBody";
        let (fm, body) = split_front_matter(input);
        assert!(fm.is_empty());
        assert_eq!(body, input);
    }

    #[test]
    fn unclosed_front_matter_falls_back() {
        let input = "---\nkind: entity\nno closing delimiter";
        let (fm, body) = split_front_matter(input);
        assert!(fm.is_empty());
        assert_eq!(body, input);
    }

    #[test]
    fn sections_carry_dotted_paths() {
        let body = "# Pedido\nintro\n\n## Attributes\n- id\n\n### Details\ndeep\n\n## Relations\ntable";
        let sections = parse_sections(body);
        let paths: Vec<&str> = sections.iter().map(|s| s.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "pedido",
                "pedido.attributes",
                "pedido.attributes.details",
                "pedido.relations"
            ]
        );
        assert_eq!(sections[1].body, "- id");
        assert_eq!(sections[1].level, 2);
    }

    #[test]
    fn sibling_headings_pop_the_stack() {
        let body = "## A\n\n## B\ncontent";
        let sections = parse_sections(body);
        assert_eq!(sections[0].path, "a");
        assert_eq!(sections[1].path, "b");
        assert_eq!(sections[0].body, "");
    }

    #[test]
    fn hashes_without_whitespace_are_not_headings() {
        let sections = parse_sections("#hashtag\nreal body");
        assert!(sections.is_empty());
    }

    #[test]
    fn body_blank_lines_are_trimmed() {
        let body = "# H\n\n\nline one\nline two\n\n\n";
        let sections = parse_sections(body);
        assert_eq!(sections[0].body, "line one\nline two");
    }

    #[test]
    fn slug_normalizes_diacritics() {
        assert_eq!(anchor_slug("Descripción"), "descripcion");
        assert_eq!(anchor_slug("Máquina de Estados"), "maquina-de-estados");
    }

    #[test]
    fn slug_collapses_whitespace_and_trims() {
        assert_eq!(anchor_slug("  Main   Flow  "), "main-flow");
        assert_eq!(anchor_slug("What? Why!"), "what-why");
        assert_eq!(anchor_slug("snake_case kept"), "snake_case-kept");
    }
}
