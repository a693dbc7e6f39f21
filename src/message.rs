//! Short result line returned by the cast action.

/// Formats `"@{name} - {total} {suffix}"`, falling back to `"{total} {suffix}"`
/// when the decorated line is longer than `budget` characters.
///
/// The fallback is not truncated further: a suffix that alone exceeds the
/// budget is passed through as-is.
pub fn format_message(
    display_name: &str,
    total_count: u64,
    suffix_label: &str,
    budget: usize,
) -> String {
    let decorated = format!("@{display_name} - {total_count} {suffix_label}");
    if decorated.chars().count() <= budget {
        return decorated;
    }
    format!("{total_count} {suffix_label}")
}
