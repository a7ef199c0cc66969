//! Generates Kotlin and Swift bindings for the `credkit` library.

fn main() {
    uniffi::uniffi_bindgen_main();
}
