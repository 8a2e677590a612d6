// Prompt constants for resume optimization.

/// System message sent with every optimization request.
pub const OPTIMIZE_SYSTEM: &str = "You are an expert in ATS resume optimization.";

/// User message template. Replace `{resume}` and `{job_description}` before sending.
/// Both texts are embedded verbatim; the provider's own length limit governs size.
pub const OPTIMIZE_PROMPT_TEMPLATE: &str =
    "Optimize this resume: {resume} for this job: {job_description}";

/// Returned as the optimized resume when the provider's success reply has no content.
pub const FALLBACK_RESPONSE: &str = "Error processing response.";

pub fn build_optimize_prompt(resume: &str, job_description: &str) -> String {
    // Substituted in one pass so a resume containing "{job_description}" stays literal.
    let (head, tail) = OPTIMIZE_PROMPT_TEMPLATE
        .split_once("{resume}")
        .unwrap_or((OPTIMIZE_PROMPT_TEMPLATE, ""));
    format!(
        "{head}{resume}{}",
        tail.replace("{job_description}", job_description)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_both_texts_verbatim() {
        assert_eq!(
            build_optimize_prompt("Jane Doe, Rust", "Senior Engineer"),
            "Optimize this resume: Jane Doe, Rust for this job: Senior Engineer"
        );
    }

    #[test]
    fn test_placeholders_inside_resume_are_not_substituted() {
        let prompt = build_optimize_prompt("see {job_description}", "JD");
        assert_eq!(
            prompt,
            "Optimize this resume: see {job_description} for this job: JD"
        );
    }
}
