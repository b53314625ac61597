pub mod markdown;
pub mod wikilink;

pub use markdown::{anchor_slug, parse, split_front_matter, ParsedMarkdown};
pub use wikilink::{extract_links, WikiLink};
