//! Paragraph-level chunker for embeddable sections.
//!
//! Packs paragraphs greedily up to a size limit, seeding the next chunk
//! with the tail paragraph when it is short enough to serve as overlap.
//! Oversized paragraphs fall back to sentence splitting.

use crate::rules;
use crate::types::{Chunk, Document, KddKind};

#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    pub max_chunk_chars: usize,
    pub overlap_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: 1500,
            overlap_chars: 200,
        }
    }
}

/// Chunk every embeddable section of the document. Chunk IDs are
/// monotonic within the document.
pub fn chunk_document(doc: &Document, kind: KddKind, config: &ChunkerConfig) -> Vec<Chunk> {
    let embeddable = rules::embeddable_sections(kind);
    if embeddable.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    for section in &doc.sections {
        let heading = section.heading.trim().to_lowercase();
        if !embeddable.contains(&heading.as_str()) {
            continue;
        }
        if section.body.trim().is_empty() {
            continue;
        }
        for (content, offset) in pack_section(&section.body, config) {
            let index = chunks.len();
            let context = context_preface(doc, kind, &section.heading) + &content;
            chunks.push(Chunk {
                id: format!("{}:chunk-{}", doc.document_id, index),
                document_id: doc.document_id.clone(),
                section: section.heading.clone(),
                content,
                context,
                offset,
            });
        }
    }
    chunks
}

/// Identity preface prepended to every chunk before encoding.
fn context_preface(doc: &Document, kind: KddKind, heading: &str) -> String {
    let mut preface = format!(
        "Document: {}\nKind: {}\nLayer: {}\n",
        doc.document_id,
        kind.as_str(),
        doc.layer.as_str()
    );
    if let Some(title) = doc.title() {
        preface.push_str(&format!("Title: {title}\n"));
    }
    preface.push_str(&format!("Section: {heading}\n\n"));
    preface
}

/// Greedily pack paragraphs into `(content, offset)` chunks. The offset is
/// the character position of the chunk's first paragraph within the
/// section body.
fn pack_section(body: &str, config: &ChunkerConfig) -> Vec<(String, usize)> {
    let paragraphs = split_paragraphs(body);
    let mut chunks = Vec::new();

    let mut acc = String::new();
    let mut acc_offset = 0usize;
    let mut tail: Option<(String, usize)> = None;

    for (paragraph, offset) in paragraphs {
        if paragraph.len() > config.max_chunk_chars {
            // flush whatever was accumulated, then sentence-split
            if !acc.is_empty() {
                chunks.push((std::mem::take(&mut acc), acc_offset));
            }
            tail = None;
            chunks.extend(split_oversized(&paragraph, offset, config.max_chunk_chars));
            continue;
        }

        let projected = if acc.is_empty() {
            paragraph.len()
        } else {
            acc.len() + 2 + paragraph.len()
        };

        if projected > config.max_chunk_chars && !acc.is_empty() {
            chunks.push((acc.clone(), acc_offset));
            // a short tail paragraph seeds the next accumulator as overlap
            match tail.take() {
                Some((tail_text, tail_offset)) if tail_text.len() <= config.overlap_chars => {
                    acc = tail_text;
                    acc_offset = tail_offset;
                    acc.push_str("\n\n");
                    acc.push_str(&paragraph);
                }
                _ => {
                    acc = paragraph.clone();
                    acc_offset = offset;
                }
            }
        } else if acc.is_empty() {
            acc = paragraph.clone();
            acc_offset = offset;
        } else {
            acc.push_str("\n\n");
            acc.push_str(&paragraph);
        }
        tail = Some((paragraph, offset));
    }

    if !acc.is_empty() {
        chunks.push((acc, acc_offset));
    }
    chunks
}

/// Split on double newlines, trimming each paragraph and tracking its
/// character position in the body.
fn split_paragraphs(body: &str) -> Vec<(String, usize)> {
    let mut paragraphs = Vec::new();
    let mut position = 0usize;
    for raw in body.split("\n\n") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            let leading = raw.len() - raw.trim_start().len();
            paragraphs.push((trimmed.to_string(), position + leading));
        }
        position += raw.len() + 2;
    }
    paragraphs
}

/// Sentence-split an oversized paragraph (break after `.` followed by
/// whitespace) and pack sentences under the same size rule. A paragraph
/// with no sentence boundary stays one chunk.
fn split_oversized(paragraph: &str, offset: usize, max_chars: usize) -> Vec<(String, usize)> {
    let sentences = split_sentences(paragraph);
    let mut chunks = Vec::new();
    let mut acc = String::new();
    let mut acc_offset = 0usize;

    for (sentence, sentence_offset) in sentences {
        let projected = if acc.is_empty() {
            sentence.len()
        } else {
            acc.len() + 1 + sentence.len()
        };
        if projected > max_chars && !acc.is_empty() {
            chunks.push((std::mem::take(&mut acc), offset + acc_offset));
        }
        if acc.is_empty() {
            acc_offset = sentence_offset;
            acc = sentence;
        } else {
            acc.push(' ');
            acc.push_str(&sentence);
        }
    }
    if !acc.is_empty() {
        chunks.push((acc, offset + acc_offset));
    }
    chunks
}

/// Break points after a `.` that is followed by whitespace.
fn split_sentences(text: &str) -> Vec<(String, usize)> {
    let bytes = text.as_bytes();
    let mut sentences = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] == b'.' && i + 1 < bytes.len() && bytes[i + 1].is_ascii_whitespace() {
            let mut end = i + 1;
            while end < bytes.len() && bytes[end].is_ascii_whitespace() {
                end += 1;
            }
            sentences.push((text[start..i + 1].to_string(), start));
            start = end;
            i = end;
        } else {
            i += 1;
        }
    }
    if start < text.len() {
        sentences.push((text[start..].to_string(), start));
    }
    sentences
}
