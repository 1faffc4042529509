fn main() -> Result<(), anyhow::Error> {
    std::process::exit(
        match cellsweep::cli::run_cellsweep(std::env::args_os().collect::<Vec<_>>().as_slice()) {
            Ok(_) => 0,
            Err(_) => 1,
        },
    );
}
