/// Outcome of offering a key to a component.
///
/// Views ask their overlays first and fall back to their own bindings only
/// on `NotHandled`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<T> {
  /// Consumed; nothing for the view to do
  Handled,
  /// Consumed, and the view has to act on `T`
  Event(T),
  /// Not consumed
  NotHandled,
}
