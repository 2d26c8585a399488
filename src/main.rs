use clap::Parser;
use env_logger::Env;
use log::{info, LevelFilter};
use snafu::ErrorCompat;

mod args;
mod tab;

fn main() {
    let args = args::Args::parse();

    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    if args.verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
    info!("surveytab {}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = tab::run_tabulation(&args) {
        eprintln!("An error occured: {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
