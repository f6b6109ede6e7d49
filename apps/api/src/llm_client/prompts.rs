// Shared prompt fragments for every extraction call.
// Each extraction client defines its own task prompt alongside it.

/// System instruction that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise document data extractor for a healthcare \
    staffing agency. You MUST respond with a single valid JSON object only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Appended to every extraction prompt.
pub const NO_GUESSING_INSTRUCTION: &str = "\
    CRITICAL: Only report what the document actually says. \
    Never invent names, numbers, or dates. \
    When a field cannot be found, use the stated fallback value.";
