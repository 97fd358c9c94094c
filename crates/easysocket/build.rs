fn main() {
    for (var, exported) in [
        ("TARGET", "EASYSOCKET_BUILD_TARGET"),
        ("PROFILE", "EASYSOCKET_BUILD_PROFILE"),
    ] {
        if let Ok(value) = std::env::var(var) {
            println!("cargo:rustc-env={exported}={value}");
        }
        println!("cargo:rerun-if-env-changed={var}");
    }
}
