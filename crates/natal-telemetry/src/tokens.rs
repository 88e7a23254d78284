//! Token estimation for prompt budgeting

/// Rough BPE token count for a prompt fragment.
///
/// Chat text sits near 4 chars/token; serialized chart slices are dense with
/// punctuation and digits and tokenize closer to 2.5 chars/token. The ratio is
/// interpolated by the share of structural characters.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }

    let total_chars = text.chars().count();
    let structural = text
        .chars()
        .filter(|c| c.is_ascii_digit() || "{}[]\":,.-+".contains(*c))
        .count();

    let structural_fraction = ((structural as f64 / total_chars as f64) * 2.5).min(1.0);
    let chars_per_token = structural_fraction * 2.5 + (1.0 - structural_fraction) * 4.0;

    (total_chars as f64 / chars_per_token).max(1.0) as usize
}
