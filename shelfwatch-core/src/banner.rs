// Startup banner shared by the console and the web server

const BANNER: &str = r#"
  ____  _          _  __              _       _
 / ___|| |__   ___| |/ _|_      ____ _| |_ ___| |__
 \___ \| '_ \ / _ \ | |_\ \ /\ / / _` | __/ __| '_ \
  ___) | | | |  __/ |  _|\ V  V / (_| | || (__| | | |
 |____/|_| |_|\___|_|_|   \_/\_/ \__,_|\__\___|_| |_|
"#;

pub fn banner_text() -> String {
    format!(
        "{}\n  Smart Shelf Monitoring v{}\n",
        BANNER,
        env!("CARGO_PKG_VERSION")
    )
}

pub fn print_colored_banner() {
    // 36 = cyan
    println!("\x1b[36m{}\x1b[0m", banner_text());
}
