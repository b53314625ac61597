//! Section-body parsing helpers shared by the extractors.

use crate::parser;
use crate::rules;

/// Parse an aligned pipe-delimited table. The first non-separator line is
/// the header. Cells are trimmed and stripped of back-ticks; rows shorter
/// than the header are dropped.
pub fn parse_table(body: &str) -> Option<(Vec<String>, Vec<Vec<String>>)> {
    let mut header: Option<Vec<String>> = None;
    let mut rows = Vec::new();

    for line in body.lines() {
        let trimmed = line.trim();
        if !trimmed.starts_with('|') {
            continue;
        }
        let cells = split_row(trimmed);
        if cells.is_empty() || is_separator(&cells) {
            continue;
        }
        match &header {
            None => header = Some(cells),
            Some(head) => {
                if cells.len() >= head.len() {
                    rows.push(cells);
                }
            }
        }
    }

    header.map(|head| (head, rows))
}

fn split_row(line: &str) -> Vec<String> {
    let inner = line.trim().trim_start_matches('|').trim_end_matches('|');
    inner
        .split('|')
        .map(|cell| cell.trim().trim_matches('`').trim().to_string())
        .collect()
}

fn is_separator(cells: &[String]) -> bool {
    cells
        .iter()
        .all(|cell| !cell.is_empty() && cell.chars().all(|c| matches!(c, '-' | ':' | ' ')))
}

/// Lines beginning with `- ` or `* `, marker removed.
pub fn list_items(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| {
            let trimmed = line.trim_start();
            trimmed
                .strip_prefix("- ")
                .or_else(|| trimmed.strip_prefix("* "))
                .map(|item| item.trim().to_string())
        })
        .filter(|item| !item.is_empty())
        .collect()
}

/// Every target a section body references: wiki links anywhere in the
/// text, plus the leading token of each list item when it is a bare typed
/// reference (`- EVT-001` without brackets). Order preserved, no
/// duplicates.
pub fn section_targets(body: &str) -> Vec<String> {
    let mut targets: Vec<String> = Vec::new();
    for link in parser::extract_links(body) {
        if !targets.contains(&link.target) {
            targets.push(link.target);
        }
    }
    for item in list_items(body) {
        let Some(token) = item.split_whitespace().next() else {
            continue;
        };
        let token =
            token.trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '-' && c != '_');
        if rules::is_typed_reference(token) && !targets.iter().any(|t| t == token) {
            targets.push(token.to_string());
        }
    }
    targets
}

/// Index of the first header cell (lower-cased) matching any candidate.
pub fn column_index(header: &[String], candidates: &[&str]) -> Option<usize> {
    header
        .iter()
        .position(|cell| candidates.contains(&cell.trim().to_lowercase().as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_parses_header_and_rows() {
        let body = "\
| Relation | Entity | Cardinality |
|----------|--------|-------------|
| has      | `LineaPedido` | 1..* |
| short row |
";
        let (header, rows) = parse_table(body).unwrap();
        assert_eq!(header, vec!["Relation", "Entity", "Cardinality"]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], vec!["has", "LineaPedido", "1..*"]);
    }

    #[test]
    fn table_without_pipes_is_none() {
        assert!(parse_table("plain prose, no table").is_none());
    }

    #[test]
    fn aligned_separators_are_skipped() {
        let body = "| A | B |\n|:--|--:|\n| 1 | 2 |";
        let (_, rows) = parse_table(body).unwrap();
        assert_eq!(rows, vec![vec!["1".to_string(), "2".to_string()]]);
    }

    #[test]
    fn list_items_strip_markers() {
        let body = "- first\n* second\n  - nested\nnot a list\n-dashes-but-no-space";
        assert_eq!(list_items(body), vec!["first", "second", "nested"]);
    }

    #[test]
    fn section_targets_accept_bare_typed_list_items() {
        let body = "Emits [[EVT-001]] on save.\n\n- EVT-002 after cancellation\n- state saved\n- `EVT-001` again";
        assert_eq!(section_targets(body), vec!["EVT-001", "EVT-002"]);
    }

    #[test]
    fn bare_entity_names_in_lists_are_not_targets() {
        // only typed references may appear without brackets
        assert!(section_targets("- Pedido\n- Cliente").is_empty());
    }

    #[test]
    fn column_lookup_is_case_insensitive() {
        let header = vec!["Relation".to_string(), "Entidad".to_string()];
        assert_eq!(column_index(&header, &["entity", "entidad"]), Some(1));
        assert_eq!(column_index(&header, &["cardinality"]), None);
    }
}
