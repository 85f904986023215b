use std::env;

use dotenvy::from_path;

fn main() {
    let _ = from_path(".env");

    println!("cargo:rerun-if-changed=.env");
    println!("cargo:rerun-if-changed=station.json");

    for key in ["WIFI_SSID", "WIFI_PASSWORD"] {
        if let Ok(value) = env::var(key) {
            println!("cargo:rustc-env={}={}", key, value);
        }
    }

    embuild::espidf::sysenv::output();
}
