#[cfg(target_os = "windows")]
compile_error!("apogee-camera does not support Windows");

#[cfg(feature = "libapogee")]
fn main() {
    use std::{env, path::PathBuf};

    use bindgen::CargoCallbacks;

    println!("cargo:rerun-if-changed=include/wrapper.h");
    println!("cargo:rerun-if-changed=include/apogee_shim.cpp");

    // Canonicalize the path as `rustc-link-search` requires an absolute path.
    let include_path = PathBuf::from("include")
        .canonicalize()
        .expect("cannot canonicalize path");

    let headers_path = include_path.join("wrapper.h");
    let headers_path_str = headers_path.to_str().expect("Path is not a valid string");

    // libapogee installs its headers under <prefix>/include/libapogee-3.x/apogee
    let apogee_include = env::var("APOGEE_INCLUDE_DIR")
        .unwrap_or_else(|_| "/usr/local/include/libapogee-3.0".to_owned());

    // Tell cargo to tell rustc to find libapogee in LD_LIBRARY_PATH on Linux. This is not
    // an issue on macOS.
    #[cfg(target_os = "linux")]
    {
        if let Ok(libdir) = env::var("LD_LIBRARY_PATH") {
            for path in libdir.split(':').filter(|x| !x.is_empty()) {
                println!("cargo:rustc-link-search={}", path);
            }
        } else {
            panic!(
                "LD_LIBRARY_PATH is not set. Please set it to the directory containing libapogee: LD_LIBRARY_PATH=/path/to/libapogee:$LD_LIBRARY_PATH"
            );
        }
    }

    cc::Build::new()
        .cpp(true)
        .file(include_path.join("apogee_shim.cpp"))
        .include(&include_path)
        .include(&apogee_include)
        .compile("apogee_shim");

    println!("cargo:rustc-link-lib=apogee");
    println!("cargo:rustc-link-lib=usb-1.0");
    #[cfg(target_os = "linux")]
    println!("cargo:rustc-link-lib=stdc++");
    #[cfg(target_os = "macos")]
    println!("cargo:rustc-link-lib=c++");

    let bindings = bindgen::Builder::default()
        .header(headers_path_str)
        .allowlist_function("apg_.*")
        .allowlist_type("apg_.*")
        .allowlist_var("APG_.*")
        .parse_callbacks(Box::new(CargoCallbacks::new()))
        .generate()
        .expect("Unable to generate bindings");

    let out_path = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is not set"));
    bindings
        .write_to_file(out_path.join("bindings.rs"))
        .expect("Couldn't write bindings!");
}

#[cfg(not(feature = "libapogee"))]
fn main() {}
