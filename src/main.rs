use std::process::ExitCode;

fn main() -> ExitCode {
    taxmemo_lib::run()
}
