//! Compile-time build information, shown by `level-sim --version`.

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// `levelforge <version> (<commit> <date>)`.
pub fn version_string() -> String {
    format!(
        "levelforge {} ({} {})",
        env!("CARGO_PKG_VERSION"),
        BUILD_COMMIT,
        BUILD_DATE
    )
}
