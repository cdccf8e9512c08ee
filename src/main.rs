fn main() {
    if let Err(error) = ember::run() {
        log::error!("{error}");
        eprintln!("ember: {error}");
        std::process::exit(1);
    }
}
