use clap::Parser;
use image_release::ansi::{BOLD, BOLD_RED, RESET};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(error) = image_release::cli::Cli::parse().run() {
        eprintln!("{BOLD_RED}error{RESET}{BOLD}:{RESET} {error}");
        std::process::exit(1);
    }
}
