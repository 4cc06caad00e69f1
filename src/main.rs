fn main() {
  if let Err(e) = wellness_log_lib::run() {
    eprintln!("wellness-log: {}", e);
    std::process::exit(1);
  }
}
