use clap::Parser;
use methodmine::cli::Cli;
use methodmine::error::MinerError;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    methodmine::logging::init(cli.common.quiet);

    match cli.execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            let code = err
                .chain()
                .find_map(|e| e.downcast_ref::<MinerError>())
                .map_or(1, MinerError::exit_code);
            ExitCode::from(code as u8)
        }
    }
}
