/// Outcome of offering a key to a component.
///
/// Components that own a piece of interaction (a picker, an input line) return
/// this so the owning view knows whether to keep looking for a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<T> {
  /// Consumed, nothing for the parent to do
  Handled,
  /// Consumed, and the parent has something to act on
  Event(T),
  /// Not for this component
  NotHandled,
}
