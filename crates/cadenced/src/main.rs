use std::process::ExitCode;

fn main() -> ExitCode {
    match cadenced::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("cadenced: {error}");
            ExitCode::FAILURE
        }
    }
}
