// src/banner.rs

/// Prints the application startup banner to the console.
pub fn print_banner() {
    let banner = r#"
 _                           _
(_)_ __  ___ _ __   ___  ___| |_ ___  _ __
| | '_ \/ __| '_ \ / _ \/ __| __/ _ \| '__|
| | | | \__ \ |_) |  __/ (__| || (_) | |
|_|_| |_|___/ .__/ \___|\___|\__\___/|_|
            |_|

    Python & EXE Malware Analysis Client
"#;
    eprintln!("{}", banner);
}
