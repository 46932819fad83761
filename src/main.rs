fn main() {
    if let Err(err) = survey_ingest::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
