use clap::Parser;

/// This is a survey tabulation program: it validates the responses to a survey and
/// computes the statistics of each question.
#[derive(Parser, Debug, Clone, Default)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON file describing the tabulation: the survey, the response files and
    /// the outputs. For more information about the file format, read the documentation of the
    /// survey_stats::manual module.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path, optional) A JSON file containing only the definition of the survey. Use it with --input
    /// when no configuration file is provided.
    #[clap(short, long, value_parser)]
    pub survey: Option<String>,

    /// (file path) A reference file containing the summary of a survey in JSON format. If provided,
    /// surveytab will check that the tabulated output matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of the survey will be written in JSON format
    /// to the given location. Setting this option overrides the path that may be specified with the --config
    /// option.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) If specified, the statistics will also be written as an Excel workbook, with one
    /// worksheet per question.
    #[clap(long, value_parser)]
    pub excel: Option<String>,

    /// (file path or empty) If specified, the file containing the responses. Setting this option overrides
    /// the response sources of the --config option.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (default json) The type of the input: json, csv or xlsx.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (RFC 3339 timestamp) The time at which the survey window is evaluated, for the responses that do
    /// not carry their own submission time. Defaults to the current time.
    #[clap(long, value_parser)]
    pub now: Option<String>,

    /// If passed as an argument, the first rejected submission stops the tabulation.
    #[clap(long, takes_value = false)]
    pub strict: bool,

    /// (default ;) The delimiter between the labels of a multiple selection in a spreadsheet cell.
    #[clap(long, value_parser)]
    pub multiple_delimiter: Option<String>,

    /// When using an Excel file, indicates the name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
