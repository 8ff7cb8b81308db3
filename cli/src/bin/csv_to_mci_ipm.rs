//! Build an MCI IPM clearing file from a CSV file with a header row.
use clap::Parser;
use snafu::Report;

use cardutil_cli::{init_logging, CliError, CommonArgs};
use cardutil_ipm::csv::row_to_record;
use cardutil_ipm::IpmWriter;
use cardutil_parser::Iso8583Codec;

/// Convert CSV into an MCI IPM clearing file.
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
    let out_encoding = args.common.out_encoding()?;

    let input = args.common.open_input()?;
    let mut csv_reader = csv::ReaderBuilder::new().from_reader(input);
    let columns: Vec<String> = csv_reader.headers()?.iter().map(str::to_owned).collect();

    let codec = Iso8583Codec::new(&config.bit_config, out_encoding, true);
    let output = args.common.open_output()?;
    let mut writer = IpmWriter::new(output, codec, args.common.use_1014_blocking());

    for row in csv_reader.records() {
        let row = row?;
        let values: Vec<String> = row.iter().map(str::to_owned).collect();
        let record = row_to_record(&values, &columns);
        writer.write_record(&record)?;
    }
    writer.finalize()?;
    Ok(())
}
