//! Extract one declared parameter table from an MCI IPM parameter file
//! into CSV.
use clap::Parser;
use snafu::Report;

use cardutil_cli::{init_logging, CliError, CommonArgs};
use cardutil_ipm::paramtable::{ParamTableExtractor, PARAM_FIELD};
use cardutil_ipm::IpmReader;
use cardutil_parser::Iso8583Codec;

/// The column name, within a parameter table layout, that selects which
/// table a row belongs to.
const TABLE_ID_COLUMN: &str = "table_id";

/// Extract an MCI IPM parameter table into CSV.
#[derive(Debug, Parser)]
#[command(version)]
struct App {
    #[command(flatten)]
    common: CommonArgs,

    /// The id of the parameter table to extract, matched against each
    /// row's own `table_id` column.
    table_id: String,
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

    let layout = config
        .mci_parameter_tables
        .get(&args.table_id)
        .ok_or_else(|| CliError::UnknownParamTable { table_id: args.table_id.clone() })?;
    let extractor = ParamTableExtractor::new(layout);

    let codec = Iso8583Codec::new(&config.bit_config, in_encoding, false);
    let input = args.common.open_input()?;
    let mut reader = IpmReader::new(input, codec, args.common.use_1014_blocking());

    let columns: Vec<String> = layout.columns.iter().map(|c| c.name.clone()).collect();
    let output = args.common.open_output()?;
    let mut writer = csv::WriterBuilder::new().from_writer(output);
    writer.write_record(&columns)?;

    while let Some(message) = reader.next_record()? {
        let Some(payload) = message.de(PARAM_FIELD).and_then(|v| v.as_text()) else {
            continue;
        };
        if let Some(row) = extractor.extract(payload, TABLE_ID_COLUMN, &args.table_id)? {
            let values: Vec<String> =
                columns.iter().map(|c| row.get(c).and_then(|v| v.as_text()).unwrap_or_default().to_owned()).collect();
            writer.write_record(&values)?;
        }
    }
    writer.flush()?;
    Ok(())
}
