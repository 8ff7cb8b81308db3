//! Rewrite an MCI IPM clearing file's wire character encoding.
use clap::Parser;
use snafu::Report;

use cardutil_cli::{init_logging, CliError, CommonArgs};
use cardutil_ipm::convert::convert_encoding;

/// Convert an MCI IPM clearing file from one wire character encoding to
/// another, preserving its 1014-block framing.
#[derive(Debug, Parser)]
#[command(version)]
struct App {
    #[command(flatten)]
    common: CommonArgs,
}

fn main() {
    let args = App::parse();
    init_logging(args.common.verbose);

    run(args).unwrap_or_else(|e| {
        let code = e.to_exit_code();
        tracing::error!("{}", Report::from_error(e));
        std::process::exit(code);
    });
}

fn run(args: App) -> Result<(), CliError> {
    let config = args.common.load_config()?;
    let in_encoding = args.common.in_encoding()?;
    let out_encoding = args.common.out_encoding()?;

    let input = args.common.open_input()?;
    let output = args.common.open_output()?;
    convert_encoding(
        input,
        output,
        &config.bit_config,
        in_encoding,
        out_encoding,
        args.common.use_1014_blocking(),
        true,
    )?;
    Ok(())
}
