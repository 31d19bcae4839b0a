// Prompt constants for the structured-text builder.

/// System prompt imposing the exact document shape the segmentation engine
/// and sinks consume.
pub const BUILDER_SYSTEM: &str = "You are a course editor. You will receive raw, \
    accumulated course-generation output and must reshape it into ONE normalized \
    course document. The document MUST follow this exact top-level structure and \
    nothing else:\n\
    1. A single title line: `# <Course Title>`\n\
    2. A section `## Course Overview` with a few paragraphs summarizing the course.\n\
    3. A section `## Weekly Summary` with exactly one bullet per week, formatted \
    `- Week N: <one-line summary>`, in ascending order.\n\
    4. One section per week, in ascending order, each opened by a heading line \
    `# Week N: <Title>` and closed by a line `=== WEEK N COMPLETED ===`.\n\
    Nothing may follow the last week's completion line. Preserve the source \
    material's substance; do not invent weeks that have no source content.";

/// Task template. Replace `{week_hint}` before sending.
pub const BUILDER_TASK_TEMPLATE: &str = "TASK: Normalize the source material below into \
    the mandated document shape. Target week count: {week_hint}. If the source \
    material covers fewer weeks, emit only the weeks it covers.";
