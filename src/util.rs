pub fn time_str() -> String {
    chrono::Local::now().to_rfc2822()
}
