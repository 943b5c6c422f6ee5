/// Display version information
pub fn execute() {
    println!("role-migrator {}", env!("CARGO_PKG_VERSION"));
    println!("Operator CLI for sequenced role migrations");
}
