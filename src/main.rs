use clap::Parser;
use log::{info, LevelFilter};
use snafu::ErrorCompat;

mod analysis;
mod args;

use crate::analysis::*;
use crate::args::{Args, Command};

fn run(args: Args) -> BAnResult<()> {
    match args.command {
        Command::Analyse {
            config,
            messages,
            individuals,
            out,
            reference,
            sample_seed,
        } => run_analysis(&config, &messages, &individuals, &out, reference, sample_seed),
        Command::LocationContacts {
            config,
            scheme,
            coded_field,
            target,
            out,
            inputs,
        } => run_location_contacts(&config, &scheme, &coded_field, &target, &inputs, &out),
        Command::AdContacts {
            config,
            exclusion_list,
            out,
            inputs,
        } => run_ad_contacts(&config, exclusion_list, &inputs, &out),
    }
}

fn main() {
    let args = Args::parse();
    if args.verbose {
        env_logger::Builder::new()
            .filter_level(LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    info!("args: {:?}", args);

    if let Err(e) = run(args) {
        eprintln!("An error occured {}", e);
        if let Some(bt) = ErrorCompat::backtrace(e.as_ref()) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
