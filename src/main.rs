fn main() {
    if let Err(error) = ember::run() {
        log::error!("{error}");
        std::process::exit(1);
    }
}
