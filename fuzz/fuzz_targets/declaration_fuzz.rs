//! Declaration parser fuzz target: feed arbitrary text to the struct declaration parser.
//! The parser must not panic; it should return Ok(structs) or Err(LayoutError).
//! Build with: cargo fuzz run declaration_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let s = match std::str::from_utf8(data) {
        Ok(x) => x,
        Err(_) => return,
    };
    if let Ok(structs) = rawlayout::parse_declarations(s, rawlayout::Catalog::builtin()) {
        for s in &structs {
            let _ = s.render(0);
        }
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run declaration_fuzz");
}
