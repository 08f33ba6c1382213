/// Returns whether `items` holds an element exactly equal to `needle`.
pub fn exact_contains<S: AsRef<str>>(items: &[S], needle: &str) -> bool {
    items.iter().any(|item| item.as_ref() == needle)
}
