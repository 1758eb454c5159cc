use stepwise_lib::platform::{Platform, shared_library_extension, shared_library_prefix};
use stepwise_lib::plugin::{ABI_VERSION, DEFAULT_ENTRY_POINT};

use crate::output::print_stat;

pub fn cmd_info() {
  println!("System:");
  match Platform::host() {
    Some(platform) => print_stat("Platform", platform.as_str()),
    None => println!("Could not detect platform."),
  }
  print_stat(
    "Shared library",
    &format!("{}<name>.{}", shared_library_prefix(), shared_library_extension()),
  );

  println!();
  println!("Plugins:");
  print_stat("Default entry point", DEFAULT_ENTRY_POINT);
  print_stat("ABI version", &ABI_VERSION.to_string());
}
