//! Outline generation and refinement prompts.

/// JSON shape the provider is asked to emit alongside its prose outline.
const PAGES_JSON_INSTRUCTION: &str = r#"Write the outline for every page in the format above. Then, so the result can be parsed programmatically, also emit the same outline as JSON:

```json
{
    "pages": [
        {
            "page": 1,
            "theme": "page theme",
            "title": "page title",
            "content": "core points (may span multiple lines)"
        }
    ]
}
```"#;

/// Worked example embedded in the outline prompt so the provider matches the
/// expected granularity.
const OUTLINE_EXAMPLE: &str = "\
[Example result format]

Page 1: Core strategy overview
Page title: 2026 core strategy: contain risk + trade more
Core points:
Keyword one: contain risk
\tGoal: guard against tail risk.
\tActions: iterate the risk system (shift from pure return attribution to risk monitoring).
Keyword two: trade more
\tGoal: capture absolute returns.
\tActions: build systematic trading signals and strategies.

Page 2: Why contain risk? (background and logic)
Page title: Market environment: tail risks emerging
Core points (three reasons):
Macro narrative in doubt: the consensus trade is crowded and may be falsified.
Valuations stretched: assets have rallied for months and sit at highs.
Correlations rising: cross-asset correlation is up sharply, weakening diversification.
Conclusion: prepare for volatility expanding across assets simultaneously.";

/// Structured inputs for the outline prompt.
///
/// Empty side-inputs are omitted from the rendered prompt entirely.
#[derive(Debug, Default)]
pub struct OutlineInputs<'a> {
    pub idea: &'a str,
    pub page_count: Option<u32>,
    pub page_instructions: &'a str,
    pub audio_transcript: &'a str,
    pub support_docs_text: &'a str,
}

/// Render the outline-generation instruction string.
pub fn build_outline_prompt(inputs: &OutlineInputs<'_>) -> String {
    let mut sections = Vec::with_capacity(7);

    sections.push(
        "Based on the user's overall idea for a slide deck, work out the core points of every \
         page. These points will be used later to produce the deck."
            .to_string(),
    );

    if let Some(count) = inputs.page_count {
        sections.push(format!(
            "[Page count requirement] Produce exactly {count} pages."
        ));
    }

    if !inputs.page_instructions.is_empty() {
        sections.push(format!(
            "[Per-page instructions]\n{}",
            inputs.page_instructions
        ));
    }

    let mut idea_block = format!("[The user's idea]\n{}", inputs.idea);
    if !inputs.audio_transcript.is_empty() {
        idea_block.push_str(&format!(
            "\n\n[Meeting transcript]\n{}",
            inputs.audio_transcript
        ));
    }
    if !inputs.support_docs_text.is_empty() {
        idea_block.push_str(&format!(
            "\n\n[Supporting documents (use these as source material for the outline)]\n{}",
            inputs.support_docs_text
        ));
    }
    sections.push(idea_block);

    sections.push(OUTLINE_EXAMPLE.to_string());
    sections.push(PAGES_JSON_INSTRUCTION.to_string());

    sections.join("\n\n")
}

/// Render the outline-refinement instruction string.
pub fn build_outline_refine_prompt(current_outline: &str, feedback: &str) -> String {
    format!(
        "The user has feedback on the current slide outline. Adjust it accordingly.\n\
         \n\
         [Current outline]\n\
         {current_outline}\n\
         \n\
         [User feedback]\n\
         {feedback}\n\
         \n\
         Output the complete revised outline, keeping the earlier format. {PAGES_JSON_INSTRUCTION}"
    )
}
