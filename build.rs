fn main() {
    // ESP-IDF build environment propagation is only meaningful when the
    // espidf feature (and toolchain) is active; host test builds skip it.
    if std::env::var_os("CARGO_FEATURE_ESPIDF").is_some()
        && std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf")
    {
        embuild::espidf::sysenv::output();
    }
}
