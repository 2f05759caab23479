//! Class file fuzz target: arbitrary bytes through the class file schema.
//! Decoding must return Ok or Err without panicking or over-allocating on
//! huge declared counts.
//! Build with: cargo fuzz run classfile_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let _ = schemadec::classfile::ClassFile::decode(std::io::Cursor::new(data));
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run classfile_fuzz");
}
