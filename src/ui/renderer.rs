use crate::ui::widgets::{KeyValue, MessageBlock, NoticeLevel, StepState, SummaryCounts, TableSpec};

pub type UiResult<T> = Result<T, UiError>;

#[derive(Debug, thiserror::Error)]
pub enum UiError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

pub trait Renderer {
    fn text(&mut self, body: &str) -> UiResult<()>;
    fn section(&mut self, title: &str) -> UiResult<()>;
    fn notice(&mut self, level: NoticeLevel, body: &str) -> UiResult<()>;

    fn error_block(&mut self, block: &MessageBlock) -> UiResult<()>;

    fn key_values(&mut self, items: &[KeyValue]) -> UiResult<()>;
    fn step(&mut self, label: &str, state: StepState) -> UiResult<()>;
    fn summary(&mut self, counts: SummaryCounts) -> UiResult<()>;

    fn table(&mut self, spec: &TableSpec) -> UiResult<()>;
}
