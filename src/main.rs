fn main() {
    if let Err(err) = roster_dedup::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
