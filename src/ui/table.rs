use tabled::builder::Builder;
use tabled::settings::{Padding, Style};

use crate::ui::widgets::TableSpec;

const MAX_CELL_CHARS: usize = 60;

pub fn render_table(spec: &TableSpec) -> String {
    let mut builder = Builder::default();
    if !spec.headers.is_empty() {
        builder.push_record(spec.headers.iter().map(String::as_str));
    }
    for row in &spec.rows {
        builder.push_record(row.iter().map(|cell| fit_cell(cell)));
    }
    let mut table = builder.build();
    table.with(Style::blank());
    table.with(Padding::new(0, 2, 0, 0));
    table.to_string()
}

/// One line per row: embedded newlines are flattened and long cells cut.
fn fit_cell(cell: &str) -> String {
    let flat = cell.split_whitespace().collect::<Vec<&str>>().join(" ");
    if flat.chars().count() <= MAX_CELL_CHARS {
        return flat;
    }
    let mut cut = flat.chars().take(MAX_CELL_CHARS - 3).collect::<String>();
    cut.push_str("...");
    cut
}
