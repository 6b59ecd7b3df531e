// Prompt constants for cover-letter generation.

/// System prompt: plain-text letter, no preamble.
pub const COVER_LETTER_SYSTEM: &str =
    "You are an expert cover letter writer and recruitment strategist. \
    You write complete, ready-to-send cover letters in plain text. \
    Do NOT include any text before or after the letter. \
    Do NOT use markdown. \
    Do NOT invent experience the resume does not show.";

/// Replace `{title}`, `{company}`, `{location}`, `{job_description}`,
/// `{resume_content}` and `{candidate_name}` before sending.
pub const COVER_LETTER_PROMPT_TEMPLATE: &str = r#"Write a professional, four-paragraph cover letter for the role below.

Job:
- Title: {title}
- Company: {company}
- Location: {location}

Job description:
{job_description}

Candidate resume:
{resume_content}

Instructions:
- Focus on the 3-4 most important requirements of the job.
- Match them only with evidence from the resume, quantified where the resume allows.
- Paragraph 1: the role, genuine enthusiasm and a value-driven hook.
- Paragraph 2: experience aligned with the job's duties, with concrete examples.
- Paragraph 3: interest in the company and culture fit.
- Paragraph 4: reaffirm fit, ask for an interview, close professionally.

Constraints:
- 350 to 500 words.
- No placeholders such as [Company] or [Your Name].
- Sign off with the candidate's name: {candidate_name}."#;
