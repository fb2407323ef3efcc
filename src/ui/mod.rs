pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

/// Keep a list/table selection inside `0..len`, selecting the first row of a
/// non-empty list that has no selection yet.
pub fn clamp_selection(selected: Option<usize>, len: usize) -> Option<usize> {
  if len == 0 {
    return None;
  }
  Some(selected.unwrap_or(0).min(len - 1))
}
