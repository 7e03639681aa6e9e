use std::time::Duration;

pub(crate) const INPUT_POLL_WAIT: Duration = Duration::from_millis(30);
pub(crate) const REDRAW_TICK: Duration = Duration::from_millis(250);

pub(crate) const MIN_WIDTH: u16 = 40;
pub(crate) const MIN_HEIGHT: u16 = 8;
pub(crate) const MIN_LIST_WIDTH: u16 = 18;
