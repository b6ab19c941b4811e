/// Keep the last `max_turns` entries of `history`, in original order.
///
/// Shorter histories pass through unchanged; `max_turns == 0` yields an empty
/// history. Dropped turns are discarded, never summarized.
pub fn trim<T>(mut history: Vec<T>, max_turns: usize) -> Vec<T> {
    let excess = history.len().saturating_sub(max_turns);
    if excess > 0 {
        history.drain(..excess);
    }
    history
}
