use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=src");

    let crate_dir = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").unwrap());
    let out_dir = PathBuf::from(std::env::var("OUT_DIR").unwrap());

    match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("SNOW_CONNECTOR_H")
        .with_documentation(true)
        .generate()
    {
        Ok(bindings) => {
            let header = out_dir.join("snow_connector.h");
            bindings.write_to_file(&header);
            println!("cargo:rustc-env=SNOW_CONNECTOR_HEADER={}", header.display());
        }
        // A header that fails to generate should not break the Rust build.
        Err(e) => println!("cargo:warning=cbindgen: {e}"),
    }
}
