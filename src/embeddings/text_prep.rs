// text_prep.rs — Normalize free-text profile fields before embedding.
//
// Only whitespace is touched. Length is left to the tokenizer, which cuts at
// MAX_TOKENS word pieces in the engine.

/// Trim and collapse internal whitespace runs to one space.
///
/// Returns an empty string exactly when `text` is empty or whitespace-only.
pub fn prepare_field_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
