// Build provenance reported by `avrlink version --extended`.
fn main() {
    for (source, exported) in [
        ("TARGET", "AVRLINK_BUILD_TARGET"),
        ("PROFILE", "AVRLINK_BUILD_PROFILE"),
    ] {
        if let Ok(value) = std::env::var(source) {
            println!("cargo:rustc-env={exported}={value}");
        }
        println!("cargo:rerun-if-env-changed={source}");
    }
}
