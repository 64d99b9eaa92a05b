use colored::Colorize;

fn main() {
    if let Err(e) = vega::cli::parse(None) {
        eprintln!("{} {e:#}", "error:".red().bold());
        std::process::exit(1);
    }
}
