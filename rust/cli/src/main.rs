fn main() {
    let mut out = std::io::stdout();
    let mut err = std::io::stderr();
    let code = kabo_cli::run(std::env::args(), &mut out, &mut err);
    std::process::exit(code);
}
