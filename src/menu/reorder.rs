use thiserror::Error as ThisError;

use super::models::Sequenced;

#[derive(Debug, PartialEq, Eq, ThisError)]
#[error("Cannot move position {from} to {to} in a list of {len}")]
pub struct ReorderError {
    pub from: usize,
    pub to: usize,
    pub len: usize,
}

/// Moves the element at `from` so that it ends up at `to`, shifting the rest.
pub fn move_item<T>(mut items: Vec<T>, from: usize, to: usize) -> Result<Vec<T>, ReorderError> {
    let len = items.len();
    if from >= len || to >= len {
        return Err(ReorderError { from, to, len });
    }
    if from != to {
        let item = items.remove(from);
        items.insert(to, item);
    }
    Ok(items)
}

/**
Applies a drag and drop move and renumbers the list.

After the move every element's `seq` is its new position, starting at 0, so the
whole list has to be written back.
*/
pub fn resequence<T: Sequenced>(
    items: Vec<T>,
    from: usize,
    to: usize,
) -> Result<Vec<T>, ReorderError> {
    let mut items = move_item(items, from, to)?;
    for (index, item) in items.iter_mut().enumerate() {
        item.set_seq(index as i64);
    }
    Ok(items)
}

/// Rank for a row appended at the end of the list.
pub fn next_seq<T: Sequenced>(items: &[T]) -> i64 {
    items.iter().map(Sequenced::seq).max().map_or(0, |seq| seq + 1)
}
