// Build script for ckdctl - embeds version at compile time

fn main() {
    // Get version from environment (set by CI) or Cargo.toml
    let version =
        std::env::var("CKD_VERSION").unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());

    println!("cargo:rustc-env=CKD_VERSION={}", version);

    println!("cargo:rerun-if-changed=Cargo.toml");
    println!("cargo:rerun-if-env-changed=CKD_VERSION");
}
