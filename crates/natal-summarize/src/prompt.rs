//! Instruction templates and prompt assembly

use natal_core::TopicKey;
use serde_json::Value;

/// Instruction used when folding old conversation into the rolling digest
pub const COMPACTION_INSTRUCTION: &str = "Condense this conversation between a user and their \
astrology assistant into a digest of at most 200 words. If a previous digest is included, fold \
it in. Keep the questions asked, the answers given, personal facts the user shared and any \
follow-ups promised. Write in third person, plain prose, no headings.";

/// Per-topic instruction for deriving a cached chart summary
pub fn instruction_for(key: TopicKey) -> &'static str {
    match key {
        TopicKey::Planets => {
            "Summarize these natal planet placements in 4-6 sentences: sign, house and any \
             retrograde or combust planets, most prominent first."
        }
        TopicKey::Houses => {
            "Summarize these house cusps and lords in 4-6 sentences, noting occupied houses \
             and where each house lord sits."
        }
        TopicKey::Navamsa => {
            "Summarize this D9 (navamsa) chart in 3-5 sentences: ascendant, placements that \
             differ in dignity from the birth chart, and partnership themes."
        }
        TopicKey::Dasamsa => {
            "Summarize this D10 (dasamsa) chart in 3-5 sentences with a focus on career and \
             public standing."
        }
        TopicKey::Dasha => {
            "Summarize the currently running planetary period and the next upcoming one in \
             3-5 sentences, with their start and end dates and active sub-periods."
        }
        TopicKey::Yogas => {
            "List the yogas present in this chart, one sentence each, strongest first."
        }
        TopicKey::Strengths => {
            "Summarize these planetary strength scores in 3-4 sentences: strongest and weakest \
             planets and anything unusually lopsided."
        }
    }
}

/// Prompt text sent to the model: instruction, then the JSON input, truncated
/// to `max_input_chars` characters on a char boundary
pub fn build_prompt(instruction: &str, input: &Value, max_input_chars: usize) -> String {
    let serialized = match input {
        Value::String(text) => text.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    };
    let truncated = truncate_chars(&serialized, max_input_chars);
    let marker = if truncated.len() < serialized.len() {
        "\n[input truncated]"
    } else {
        ""
    };
    format!("{}\n\n<input>\n{}{}\n</input>", instruction, truncated, marker)
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
