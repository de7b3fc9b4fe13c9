use std::error::Error;
use std::process::ExitCode;

use arff_labeler::config::Cli;
use arff_labeler::runner::Runner;
use clap::Parser;

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    let runner = Runner::new(&cli.model);
    log::debug!("model file: {}", runner.model_path().display());

    let stdout = std::io::stdout();
    match runner.run(&cli.data, &mut stdout.lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            let mut source = err.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::from(err.exit_code())
        }
    }
}
