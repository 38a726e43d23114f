//! Executable mappings of the current process
//!
//! Read from `/proc/<pid>/maps` so that offline tools can attribute tick
//! addresses outside generated code to the right binary.

use std::fs;
use std::io;

use crate::domain::Address;

/// One executable mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedLibrary {
    /// Mapped file, or `<start>-<end>` in hex for anonymous mappings
    pub path: String,
    /// Load base: mapping start minus its file offset
    pub start: Address,
    pub end: Address,
    pub aslr_slide: i64,
}

/// Parse the contents of a maps file, keeping readable, executable,
/// non-writable mappings.
#[must_use]
pub fn parse_maps(maps: &str) -> Vec<SharedLibrary> {
    maps.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<SharedLibrary> {
    // "start-end perms offset dev inode pathname"
    let mut parts = line.split_whitespace();
    let (start, end) = parts.next()?.split_once('-')?;
    let perms = parts.next()?.as_bytes();
    let offset = u64::from_str_radix(parts.next()?, 16).ok()?;
    let _dev = parts.next()?;
    let _inode = parts.next()?;
    let path = parts.collect::<Vec<_>>().join(" ");

    if perms.len() < 3 || perms[0] != b'r' || perms[1] == b'w' || perms[2] != b'x' {
        return None;
    }
    let start = u64::from_str_radix(start, 16).ok()?;
    let end = u64::from_str_radix(end, 16).ok()?;
    let path = if path.is_empty() { format!("{start:08x}-{end:08x}") } else { path };
    Some(SharedLibrary {
        path,
        start: Address(start.saturating_sub(offset)),
        end: Address(end),
        aslr_slide: 0,
    })
}

/// Executable mappings of process `pid`.
///
/// # Errors
/// Returns an error if `/proc/<pid>/maps` cannot be read.
pub fn read_shared_libraries(pid: u32) -> io::Result<Vec<SharedLibrary>> {
    let maps = fs::read_to_string(format!("/proc/{pid}/maps"))?;
    Ok(parse_maps(&maps))
}
