// Shared prompt constants and prompt-building utilities.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// Instruction appended to prompts whose output is shown to the user verbatim.
pub const PLAIN_DOCUMENT_INSTRUCTION: &str = "\
    Respond with the finished document only. \
    Do NOT add a preamble, closing remarks, explanations or apologies. \
    Do NOT wrap the document in code fences.";

/// Instruction forbidding invented facts when rewriting user-provided material.
pub const FACTUALITY_INSTRUCTION: &str = "\
    CRITICAL: Every fact in your output must come from the source material. \
    Do NOT invent employers, dates, degrees, certifications, metrics or skills. \
    You may reorder, rephrase and emphasise; you may not fabricate.";
