use crate::events::RawTransaction;

/// Picks the transactions of `window` that still need an alert, oldest first.
///
/// The window is stable-sorted by timestamp (missing timestamps first, ties in
/// feed order). Without a cursor everything is new. With a cursor, only the
/// transactions after it are new; if the cursor has already left the window,
/// the whole window is newer than it.
pub fn select_new(mut window: Vec<RawTransaction>, cursor: Option<&str>) -> Vec<RawTransaction> {
    window.sort_by_key(RawTransaction::sort_timestamp);

    let Some(cursor) = cursor else {
        return window;
    };

    match window.iter().rposition(|tx| tx.signature == cursor) {
        Some(idx) => window.split_off(idx + 1),
        None => window,
    }
}
