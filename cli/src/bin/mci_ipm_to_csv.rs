//! Project an MCI IPM clearing file into CSV, one row per message.
use clap::Parser;
use snafu::Report;

use cardutil_cli::{init_logging, CliError, CommonArgs};
use cardutil_ipm::csv::record_to_row;
use cardutil_ipm::IpmReader;
use cardutil_parser::Iso8583Codec;

/// Convert an MCI IPM clearing file to CSV.
#[derive(Debug, Parser)]
#[command(version)]
struct App {
    #[command(flatten)]
    common: CommonArgs,

    /// Render binary-typed field values as opaque bytes instead of
    /// uppercase hex text.
    #[arg(long = "no-hex-bin")]
    no_hex_bin: bool,
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

    let codec = Iso8583Codec::new(&config.bit_config, in_encoding, !args.no_hex_bin);
    let input = args.common.open_input()?;
    let mut reader = IpmReader::new(input, codec, args.common.use_1014_blocking());

    let columns = &config.output_data_elements;
    let output = args.common.open_output()?;
    let mut writer = csv::WriterBuilder::new().from_writer(output);
    writer.write_record(columns)?;

    while let Some(record) = reader.next_record()? {
        writer.write_record(record_to_row(&record, columns))?;
    }
    writer.flush()?;
    Ok(())
}
