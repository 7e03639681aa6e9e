/// Scroll positions derived from the run state and the current geometry.
/// This is the only state the display keeps between frames.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ViewState {
    pub(crate) list_offset: usize,
    pub(crate) output_offset: usize,
    pub(crate) notice: Option<String>,
}

/// First visible entry of the object list. The previous window is kept as
/// long as it still shows `current`; otherwise it moves just far enough.
pub(crate) fn list_window_offset(
    previous: usize,
    current: Option<usize>,
    visible: usize,
    len: usize,
) -> usize {
    if visible == 0 || len <= visible {
        return 0;
    }
    let offset = previous.min(len - visible);
    let Some(current) = current else {
        return offset;
    };
    if current < offset {
        current
    } else if current >= offset + visible {
        current + 1 - visible
    } else {
        offset
    }
}

/// Index of the first line shown when the output pane is pinned to the tail.
pub(crate) fn tail_offset(len: usize, visible: usize) -> usize {
    len.saturating_sub(visible)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_window_stays_put_while_current_is_visible() {
        assert_eq!(list_window_offset(0, Some(3), 5, 20), 0);
        assert_eq!(list_window_offset(4, Some(6), 5, 20), 4);
    }

    #[test]
    fn list_window_scrolls_minimally_when_current_leaves_view() {
        assert_eq!(list_window_offset(0, Some(5), 5, 20), 1);
        assert_eq!(list_window_offset(0, Some(12), 5, 20), 8);
        assert_eq!(list_window_offset(10, Some(2), 5, 20), 2);
    }

    #[test]
    fn list_window_resets_when_everything_fits() {
        assert_eq!(list_window_offset(7, Some(3), 10, 8), 0);
        assert_eq!(list_window_offset(7, Some(3), 0, 8), 0);
    }

    #[test]
    fn list_window_clamps_after_resize() {
        assert_eq!(list_window_offset(15, Some(19), 10, 20), 10);
        assert_eq!(list_window_offset(15, None, 10, 20), 10);
    }

    #[test]
    fn tail_offset_pins_to_last_lines() {
        assert_eq!(tail_offset(100, 10), 90);
        assert_eq!(tail_offset(3, 10), 0);
    }
}
