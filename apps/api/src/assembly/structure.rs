//! Line classification for week bodies — the input contract every sink
//! consumes. Week content is markdown-ish model output; this module turns it
//! into typed blocks (headings with levels, list items, code fences, rules,
//! merged paragraphs) so sinks never re-parse raw text.

use once_cell::sync::Lazy;
use regex::Regex;

static NUMBERED_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\.\s+(.*)$").expect("Invalid numbered item regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, text: String },
    Bullet(String),
    Numbered(String),
    Code(Vec<String>),
    Rule,
    Paragraph(String),
}

/// Classifies a week body into typed blocks. Consecutive plain lines merge
/// into one paragraph, split on blank lines.
pub fn parse_blocks(body: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut paragraph = String::new();
    let mut code: Option<Vec<String>> = None;

    let flush_paragraph = |paragraph: &mut String, blocks: &mut Vec<Block>| {
        if !paragraph.is_empty() {
            blocks.push(Block::Paragraph(std::mem::take(paragraph)));
        }
    };

    for raw_line in body.lines() {
        let line = raw_line.trim();

        // Code fences keep their lines verbatim, indentation included.
        if line.starts_with("```") {
            match code.take() {
                Some(lines) => blocks.push(Block::Code(lines)),
                None => {
                    flush_paragraph(&mut paragraph, &mut blocks);
                    code = Some(Vec::new());
                }
            }
            continue;
        }
        if let Some(lines) = code.as_mut() {
            lines.push(raw_line.to_string());
            continue;
        }

        if line.is_empty() {
            flush_paragraph(&mut paragraph, &mut blocks);
            continue;
        }

        if let Some(heading) = parse_heading(line) {
            flush_paragraph(&mut paragraph, &mut blocks);
            blocks.push(heading);
        } else if let Some(item) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
            flush_paragraph(&mut paragraph, &mut blocks);
            blocks.push(Block::Bullet(item.trim().to_string()));
        } else if let Some(cap) = NUMBERED_ITEM.captures(line) {
            flush_paragraph(&mut paragraph, &mut blocks);
            blocks.push(Block::Numbered(cap[2].trim().to_string()));
        } else if is_rule(line) {
            flush_paragraph(&mut paragraph, &mut blocks);
            blocks.push(Block::Rule);
        } else {
            if !paragraph.is_empty() {
                paragraph.push(' ');
            }
            paragraph.push_str(line);
        }
    }

    // An unterminated fence still renders as code rather than vanishing.
    if let Some(lines) = code.take() {
        blocks.push(Block::Code(lines));
    }
    flush_paragraph(&mut paragraph, &mut blocks);
    blocks
}

fn parse_heading(line: &str) -> Option<Block> {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if !(1..=6).contains(&hashes) {
        return None;
    }
    let rest = &line[hashes..];
    if !rest.starts_with(' ') {
        return None;
    }
    Some(Block::Heading {
        level: hashes as u8,
        text: rest.trim().to_string(),
    })
}

fn is_rule(line: &str) -> bool {
    line.len() >= 3
        && (line.chars().all(|c| c == '-') || line.chars().all(|c| c == '='))
}

/// Renders blocks back to clean markdown — the shipping sink format.
pub fn render_markdown(blocks: &[Block]) -> String {
    let mut out = String::new();
    let mut numbered = 0usize;

    for block in blocks {
        if !matches!(block, Block::Numbered(_)) {
            numbered = 0;
        }
        match block {
            Block::Heading { level, text } => {
                out.push_str(&format!("{} {}\n\n", "#".repeat(*level as usize), text));
            }
            Block::Bullet(text) => out.push_str(&format!("- {text}\n")),
            Block::Numbered(text) => {
                numbered += 1;
                out.push_str(&format!("{numbered}. {text}\n"));
            }
            Block::Code(lines) => {
                out.push_str("```\n");
                for line in lines {
                    out.push_str(line);
                    out.push('\n');
                }
                out.push_str("```\n\n");
            }
            Block::Rule => out.push_str("---\n\n"),
            Block::Paragraph(text) => out.push_str(&format!("{text}\n\n")),
        }
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headings_at_all_levels() {
        let blocks = parse_blocks("## Guided Practice\n###### Fine Print");
        assert_eq!(
            blocks,
            vec![
                Block::Heading {
                    level: 2,
                    text: "Guided Practice".to_string()
                },
                Block::Heading {
                    level: 6,
                    text: "Fine Print".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_hash_without_space_is_not_a_heading() {
        let blocks = parse_blocks("#hashtag in prose");
        assert_eq!(blocks, vec![Block::Paragraph("#hashtag in prose".to_string())]);
    }

    #[test]
    fn test_consecutive_lines_merge_into_one_paragraph() {
        let blocks = parse_blocks("first line\nsecond line\n\nnew paragraph");
        assert_eq!(
            blocks,
            vec![
                Block::Paragraph("first line second line".to_string()),
                Block::Paragraph("new paragraph".to_string()),
            ]
        );
    }

    #[test]
    fn test_lists_and_rules() {
        let blocks = parse_blocks("- alpha\n* beta\n1. first\n2. second\n---");
        assert_eq!(
            blocks,
            vec![
                Block::Bullet("alpha".to_string()),
                Block::Bullet("beta".to_string()),
                Block::Numbered("first".to_string()),
                Block::Numbered("second".to_string()),
                Block::Rule,
            ]
        );
    }

    #[test]
    fn test_code_fences_preserve_lines_verbatim() {
        let blocks = parse_blocks("before\n```\nfn main() {}\n    indented\n```\nafter");
        assert_eq!(
            blocks,
            vec![
                Block::Paragraph("before".to_string()),
                Block::Code(vec!["fn main() {}".to_string(), "    indented".to_string()]),
                Block::Paragraph("after".to_string()),
            ]
        );
    }

    #[test]
    fn test_unterminated_fence_still_emits_code() {
        let blocks = parse_blocks("```\nlet x = 1;");
        assert_eq!(blocks, vec![Block::Code(vec!["let x = 1;".to_string()])]);
    }

    #[test]
    fn test_render_markdown_renumbers_lists() {
        let blocks = vec![
            Block::Numbered("first".to_string()),
            Block::Numbered("second".to_string()),
            Block::Paragraph("break".to_string()),
            Block::Numbered("restart".to_string()),
        ];
        let md = render_markdown(&blocks);
        assert!(md.contains("1. first"));
        assert!(md.contains("2. second"));
        assert!(md.contains("1. restart"));
    }
}
