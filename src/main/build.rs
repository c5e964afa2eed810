fn main() {
    // Defaults are baked in at compile time by toml-cfg
    println!("cargo:rerun-if-changed=cfg.toml");
}
