use signflow_pdf::HayroPageSource;

use signflow_editor::PageSource;
use std::path::PathBuf;

fn main() {
    let path = std::env::args_os().nth(1).map(PathBuf::from);

    let Some(path) = path else {
        eprintln!("Usage: cargo run -p signflow-pdf --example extract_text -- <file.pdf>");
        std::process::exit(2);
    };

    let source = HayroPageSource::open(&path).unwrap_or_else(|e| {
        eprintln!("Failed to load {}: {e}", path.display());
        std::process::exit(1);
    });

    for page in 1..=source.page_count() {
        println!("=== Page {page} ===");
        let items = source.page_text(page).unwrap_or_else(|e| {
            eprintln!("Failed to read page {page}: {e}");
            std::process::exit(1);
        });
        for item in items {
            let b = item.bbox;
            println!(
                "{:>8.1} {:>8.1} {:>8.1} {:>8.1}  {}",
                b.x0,
                b.y0,
                b.width(),
                b.height(),
                item.text
            );
        }
    }
}
