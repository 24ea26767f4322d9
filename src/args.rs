use clap::{Parser, Subcommand};

/// This is the automated analysis program for coded survey responses.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Command,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Computes the engagement, demographic and theme tables of a season.
    Analyse {
        /// (file path) The pipeline configuration, in JSON format. Code scheme paths are
        /// relative to this file.
        #[clap(short, long, value_parser)]
        config: String,

        /// (file path) The messages dataset, in JSON Lines format.
        #[clap(short, long, value_parser)]
        messages: String,

        /// (file path) The individuals dataset, in JSON Lines format.
        #[clap(short, long, value_parser)]
        individuals: String,

        /// (directory) Where the CSV tables are written. It is created if needed.
        #[clap(short, long, value_parser)]
        out: String,

        /// (directory, optional) A directory holding reference tables. If provided, every
        /// table except the sample of messages is checked against the file of the same name.
        #[clap(short, long, value_parser)]
        reference: Option<String>,

        /// (integer, optional) Seed of the sample of messages. Without it, every run draws a
        /// different sample.
        #[clap(long, value_parser)]
        sample_seed: Option<u64>,
    },

    /// Exports the contacts of the participants located in the target locations.
    LocationContacts {
        /// (file path) The pipeline configuration, in JSON format.
        #[clap(short, long, value_parser)]
        config: String,

        /// (file path) The code scheme of the location field.
        #[clap(long, value_parser)]
        scheme: String,

        /// (field name, default county_coded) The coded field holding the location.
        #[clap(long, value_parser, default_value = "county_coded")]
        coded_field: String,

        /// (list of values) The string values of the locations to export.
        #[clap(long, value_parser, required = true)]
        target: Vec<String>,

        /// (file path) The CSV file of contacts to write.
        #[clap(short, long, value_parser)]
        out: String,

        /// (file paths) Messages or individuals datasets, in JSON Lines format.
        #[clap(value_parser, required = true)]
        inputs: Vec<String>,
    },

    /// Exports the contacts of every participant who did not opt out.
    AdContacts {
        /// (file path) The pipeline configuration, in JSON format.
        #[clap(short, long, value_parser)]
        config: String,

        /// (file path, optional) A JSON list of uids to leave out.
        #[clap(long, value_parser)]
        exclusion_list: Option<String>,

        /// (file path) The CSV file of contacts to write.
        #[clap(short, long, value_parser)]
        out: String,

        /// (file paths) Messages or individuals datasets, in JSON Lines format.
        #[clap(value_parser, required = true)]
        inputs: Vec<String>,
    },
}
