fn main() {
    // Keep `check-cfg` happy even when we skip `tauri_build::build()` (core-only unit tests).
    println!("cargo:rustc-check-cfg=cfg(desktop)");
    println!("cargo:rustc-check-cfg=cfg(mobile)");

    // `tauri_build::build()` reads tauri.conf.json and env vars exported by the `tauri` crate,
    // so it only runs when the desktop runtime (`app` feature) is compiled in.
    if std::env::var_os("CARGO_FEATURE_APP").is_some() {
        tauri_build::build()
    }
}
