/// Renders whole seconds as `m:ss`. Minutes are not wrapped into hours.
pub fn format_duration(total_secs: u64) -> String {
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}
