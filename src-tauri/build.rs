use std::fs;
use std::path::Path;

fn ensure_bundled_runtime_dir() {
    let runtime_dir = Path::new("resources/runtime");
    let placeholder = runtime_dir.join(".keep");

    if let Err(error) = fs::create_dir_all(runtime_dir) {
        panic!("failed to create bundled runtime directory: {error}");
    }

    if !placeholder.exists() {
        if let Err(error) = fs::write(&placeholder, b"java-21 runtime is copied here before bundling\n") {
            panic!("failed to create bundled runtime placeholder file: {error}");
        }
    }
}

fn main() {
    ensure_bundled_runtime_dir();
    tauri_build::build();
}
