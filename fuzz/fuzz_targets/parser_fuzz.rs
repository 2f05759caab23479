//! Schema parser fuzz target: arbitrary text must parse or fail cleanly, and
//! anything that parses must lint and resolve without panicking.
//! Build with: cargo fuzz run parser_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(schema) = schemadec::parse(s) {
        let _ = schemadec::lint::lint(&schema);
        let _ = schemadec::ResolvedSchema::resolve(schema);
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run parser_fuzz");
}
