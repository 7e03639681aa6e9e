use clap::Parser;

use sweep::cli::CliArgs;
use sweep::logging::init_logging;
use sweep::runner::{emit_report, run_command};
use sweep::ui::{MessageBlock, OutputMode, PlainRenderer, Renderer};
use sweep::EXIT_FAILURE;

fn main() {
    let args = CliArgs::parse();
    init_logging(args.log_level);
    let output_mode = OutputMode::from_env();

    let report = match run_command(&args) {
        Ok(report) => report,
        Err(err) => {
            let mut block = MessageBlock::new(err.title(), err.to_string());
            if let Some(hint) = err.hint() {
                block = block.with_hint(hint);
            }
            let mut renderer = PlainRenderer::stderr(output_mode);
            let _ = renderer.error_block(&block);
            std::process::exit(err.exit_code());
        }
    };

    if let Err(err) = emit_report(&report, args.json) {
        let mut renderer = PlainRenderer::stderr(output_mode);
        let _ = renderer.error_block(&MessageBlock::new(err.title(), err.to_string()));
        std::process::exit(EXIT_FAILURE);
    }
    std::process::exit(report.exit_code());
}
