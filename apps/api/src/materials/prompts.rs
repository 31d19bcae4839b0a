// Prompt constants for the material jobs.

/// System prompt for quiz generation, parameterized by difficulty.
/// Replace `{difficulty}` before sending.
pub const QUIZ_SYSTEM_TEMPLATE: &str = "You are an expert quiz designer creating short \
    assessment papers from finished course content. Calibrate question depth to the \
    {difficulty} difficulty level. Questions must be answerable in 1-2 sentences and \
    test conceptual understanding, not recall of exact phrasing.";

/// Per-quiz task. Replace `{number}` and `{theme}` before sending.
pub const QUIZ_TASK_TEMPLATE: &str = "GENERATE ONLY ONE QUIZ PAPER.\n\
\n\
Quiz Theme: {theme}\n\
Quiz Number: {number}\n\
\n\
Requirements:\n\
- Create exactly 10-15 short questions focused specifically on {theme}\n\
- Each question is worth 1 mark only\n\
- Total time limit: 10-15 minutes\n\
- This must be a complete, standalone quiz paper with only these questions\n\
- Do NOT generate multiple quiz papers and do NOT include other quiz themes\n\
\n\
Format the output as a single, complete quiz paper ready for students.";

/// System prompt for flashcard deck generation — JSON-only output.
pub const FLASHCARD_SYSTEM: &str = "You are a flashcard author distilling course content \
    into study cards. You MUST respond with a valid JSON array only — no prose, no \
    markdown code fences. Each element must be an object with exactly two string \
    keys: \"front\" (a question or term) and \"back\" (the concise answer). Produce \
    10 to 20 cards covering the most important concepts across all weeks.";

/// System prompt for per-week slide outlines — JSON-only output.
pub const SLIDES_SYSTEM: &str = "You are creating presentation slides for one week of a \
    course. Produce a JSON array where each item is an object with keys: \"title\" \
    (string) and \"bullets\" (array of 4-8 concise strings). No markdown, no \
    numbering prefixes; keep bullets crisp and non-redundant. Prefer grouping into \
    logical sections (Concepts, Example, Case Study, Exercise, Tips) when relevant. \
    Output ONLY the JSON, no prose.";
