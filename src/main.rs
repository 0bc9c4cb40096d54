fn main() {
    if let Err(e) = econ_dashboards_lib::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
