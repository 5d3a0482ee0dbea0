use bran::platform::browser::{WidgetRegistry, boot};

fn main() {
    if let Err(error) = boot(WidgetRegistry::new()) {
        bran::zoon::eprintln!("[bran] {error}");
    }
}
