//! Week segmentation engine.
//!
//! Takes one concatenated text corpus (planning output, then deep-elaboration
//! output) and produces an ordered sequence of per-week blocks. Model output
//! drifts, so matching is a cascade of strategies tried in priority order;
//! the first strategy yielding at least one valid block wins, and a synthetic
//! single-week fallback guarantees the engine never returns an empty
//! sequence.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

/// `=== WEEK N COMPLETED ===` — the canonical completion marker.
static COMPLETION_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)===\s*WEEK\s+(\d+)\s+COMPLETED\s*===").expect("Invalid completion regex")
});

/// `# Week N[: Title]` at line start — the canonical start marker.
static STRICT_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?mi)^#\s+week\s+(\d+)\s*:?\s*(.*)$").expect("Invalid strict start regex")
});

/// Looser start-marker variants, in fixed priority order.
static ALT_STARTS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?mi)^===\s*WEEK\s+(\d+)\s*===\s*()$",
        r"(?mi)^week\s+(\d+)\s*:\s*(.*)$",
        r"(?mi)^##\s+week\s+(\d+)\s*:?\s*(.*)$",
        r"(?mi)^###\s+week\s+(\d+)\s*:?\s*(.*)$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid alternative start regex"))
    .collect()
});

/// Any line mentioning "Week N" — the weakest signal, only trusted alongside
/// at least one completion marker.
static WEEK_MENTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bweek\s+(\d+)\b").expect("Invalid mention regex"));

/// `=== PROCESSING WEEK N ===` preamble emitted by the deep-content stage.
static PROCESSING_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)===\s*PROCESSING\s+WEEK\s+\d+\s*===").expect("Invalid processing regex")
});

/// `<<HALT_FOR_SECONDS:N>>` pacing markers, dropped from bodies.
static HALT_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<<HALT_FOR_SECONDS:\d+>>").expect("Invalid halt regex"));

/// The normalized unit of one week's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekBlock {
    pub week_number: u32,
    pub title: String,
    pub raw_body: String,
    /// Byte offsets of the block in the source corpus, for diagnostics.
    pub source_span: (usize, usize),
}

/// Which cascade strategy produced the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    StrictMarkers,
    AltMarkers(usize),
    MentionHeuristic,
    SyntheticFallback,
}

#[derive(Debug, Clone)]
pub struct Segmentation {
    pub weeks: Vec<WeekBlock>,
    pub strategy: Strategy,
}

impl Segmentation {
    pub fn is_synthetic(&self) -> bool {
        self.strategy == Strategy::SyntheticFallback
    }
}

/// Splits a corpus into ordered week blocks. Pure and deterministic: the
/// same corpus always yields the same sequence.
pub fn segment_weeks(corpus: &str) -> Segmentation {
    let completions = find_completions(corpus);

    let strict = pair_blocks(corpus, &STRICT_START, &completions);
    if !strict.is_empty() {
        debug!("Segmented {} weeks with strict markers", strict.len());
        return Segmentation {
            weeks: finalize(strict),
            strategy: Strategy::StrictMarkers,
        };
    }

    for (variant, start_re) in ALT_STARTS.iter().enumerate() {
        let blocks = pair_blocks(corpus, start_re, &completions);
        if !blocks.is_empty() {
            debug!(
                "Segmented {} weeks with alternative marker variant {}",
                blocks.len(),
                variant + 1
            );
            return Segmentation {
                weeks: finalize(blocks),
                strategy: Strategy::AltMarkers(variant),
            };
        }
    }

    if !completions.is_empty() {
        let blocks = mention_heuristic(corpus, &completions);
        if !blocks.is_empty() {
            debug!("Segmented {} weeks with the mention heuristic", blocks.len());
            return Segmentation {
                weeks: finalize(blocks),
                strategy: Strategy::MentionHeuristic,
            };
        }
    }

    // A corpus with no usable markers still yields one week so downstream
    // rendering always has something to work with. Flagged: output quality
    // is degraded at this point.
    warn!("No week markers found; treating entire corpus as a single synthetic week");
    Segmentation {
        weeks: vec![WeekBlock {
            week_number: 1,
            title: "Week 1".to_string(),
            raw_body: corpus.trim().to_string(),
            source_span: (0, corpus.len()),
        }],
        strategy: Strategy::SyntheticFallback,
    }
}

struct CompletionMark {
    number: u32,
    start: usize,
    end: usize,
}

fn find_completions(corpus: &str) -> Vec<CompletionMark> {
    COMPLETION_MARKER
        .captures_iter(corpus)
        .filter_map(|cap| {
            let m = cap.get(0)?;
            let number = parse_week_number(cap.get(1)?.as_str())?;
            Some(CompletionMark {
                number,
                start: m.start(),
                end: m.end(),
            })
        })
        .collect()
}

/// Base-10 parse; zero and overflowing values are parsing false-positives,
/// not real weeks.
fn parse_week_number(raw: &str) -> Option<u32> {
    raw.parse::<u32>().ok().filter(|&n| n >= 1)
}

/// Pairs each start marker with the first completion marker carrying the
/// same week number that appears after it.
fn pair_blocks(corpus: &str, start_re: &Regex, completions: &[CompletionMark]) -> Vec<WeekBlock> {
    let mut blocks = Vec::new();
    for cap in start_re.captures_iter(corpus) {
        let Some(whole) = cap.get(0) else { continue };
        let Some(number) = cap.get(1).and_then(|m| parse_week_number(m.as_str())) else {
            continue;
        };
        let Some(end_mark) = completions
            .iter()
            .find(|c| c.number == number && c.start >= whole.end())
        else {
            continue;
        };

        let title = cap
            .get(2)
            .map(|m| clean_title(m.as_str()))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| format!("Week {number}"));

        blocks.push(WeekBlock {
            week_number: number,
            title,
            raw_body: clean_body(&corpus[whole.end()..end_mark.start]),
            source_span: (whole.start(), end_mark.end),
        });
    }
    blocks
}

/// Marker-absent reconstruction: candidate week numbers are the union of
/// "Week N" mentions and completion markers; each number captures from its
/// first mention up to the first mention of N+1 (or end of corpus).
fn mention_heuristic(corpus: &str, completions: &[CompletionMark]) -> Vec<WeekBlock> {
    let mut numbers: Vec<u32> = WEEK_MENTION
        .captures_iter(corpus)
        .filter_map(|cap| parse_week_number(cap.get(1)?.as_str()))
        .chain(completions.iter().map(|c| c.number))
        .collect();
    numbers.sort_unstable();
    numbers.dedup();

    let first_mention = |n: u32| -> Option<usize> {
        WEEK_MENTION
            .captures_iter(corpus)
            .filter(|cap| {
                cap.get(1)
                    .and_then(|m| parse_week_number(m.as_str()))
                    .is_some_and(|found| found == n)
            })
            .map(|cap| cap.get(0).map(|m| m.start()).unwrap_or(0))
            .next()
    };

    let mut blocks = Vec::new();
    for &number in &numbers {
        let Some(start) = first_mention(number) else {
            continue;
        };
        let end = first_mention(number + 1)
            .filter(|&e| e > start)
            .unwrap_or(corpus.len());
        blocks.push(WeekBlock {
            week_number: number,
            title: format!("Week {number}"),
            raw_body: clean_body(&corpus[start..end]),
            source_span: (start, end),
        });
    }
    blocks
}

fn clean_title(raw: &str) -> String {
    raw.trim()
        .trim_start_matches([':', '-', '—'])
        .trim()
        .to_string()
}

/// Strips delimiter lines from a captured body: completion markers of any
/// week, processing preambles, and halt markers must never leak into
/// rendered content.
fn clean_body(raw: &str) -> String {
    raw.lines()
        .filter(|line| {
            !COMPLETION_MARKER.is_match(line) && !PROCESSING_MARKER.is_match(line)
        })
        .map(|line| HALT_MARKER.replace_all(line, "").into_owned())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// De-duplicates equal week numbers keeping the longest captured body (the
/// best proxy for the most complete capture), then sorts ascending.
fn finalize(mut blocks: Vec<WeekBlock>) -> Vec<WeekBlock> {
    blocks.sort_by(|a, b| {
        a.week_number
            .cmp(&b.week_number)
            .then(b.raw_body.len().cmp(&a.raw_body.len()))
    });
    blocks.dedup_by_key(|b| b.week_number);
    blocks
}
