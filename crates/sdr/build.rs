// Copyright 2025-2026 CEMAXECUTER LLC

fn main() {
    #[cfg(feature = "rtlsdr")]
    {
        println!("cargo:rustc-link-lib=rtlsdr");
    }
}
