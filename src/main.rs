fn main() {
    use clap::Parser;
    use std::error::Error;
    let args = readability_export::cli::Args::parse();
    if let Err(e) = readability_export::cli::run(&args) {
        eprintln!("{}", e);
        if args.verbose {
            let mut source = e.source();
            while let Some(s) = source {
                eprintln!("  cause: {}", s);
                source = s.source();
            }
        }
        std::process::exit(e.exit_code());
    }
}
