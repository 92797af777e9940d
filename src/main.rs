use std::env;
use std::process;

fn main() {
    let argv: Vec<String> = env::args().collect();
    if let Err(e) = ds::cli::main(&argv) {
        if !e.is_reported() {
            ds::ui::error(&e.to_string());
        }
        process::exit(e.exit_code());
    }
}
