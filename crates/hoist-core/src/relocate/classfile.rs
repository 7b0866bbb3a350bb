//! Structural rewrite of class-file constant pools.
//!
//! Qualified-name references live in the constant pool as UTF-8 entries
//! pointed at by class, package, name-and-type, and method-type constants.
//! The pool is parsed, exactly those referenced slots are rewritten, and the
//! rest of the file is carried over byte-for-byte — constant indices never
//! change, so code and attributes after the pool need no adjustment.

use anyhow::{bail, Result};
use std::collections::HashSet;

use super::rule::CanonicalRule;

const MAGIC: u32 = 0xCAFE_BABE;

const TAG_UTF8: u8 = 1;
const TAG_INTEGER: u8 = 3;
const TAG_FLOAT: u8 = 4;
const TAG_LONG: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_CLASS: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_FIELDREF: u8 = 9;
const TAG_METHODREF: u8 = 10;
const TAG_INTERFACE_METHODREF: u8 = 11;
const TAG_NAME_AND_TYPE: u8 = 12;
const TAG_METHOD_HANDLE: u8 = 15;
const TAG_METHOD_TYPE: u8 = 16;
const TAG_DYNAMIC: u8 = 17;
const TAG_INVOKE_DYNAMIC: u8 = 18;
const TAG_MODULE: u8 = 19;
const TAG_PACKAGE: u8 = 20;

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.bytes.len() {
            bail!("truncated class file");
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn rest(&self) -> &'a [u8] {
        &self.bytes[self.pos..]
    }
}

enum PoolEntry {
    Utf8(Vec<u8>),
    /// Tag plus raw payload, carried over verbatim.
    Other(u8, Vec<u8>),
    /// Second slot of a long/double constant.
    Reserved,
}

/// Rewrites qualified-name references in one class file according to `rules`,
/// returning the new class bytes. Fails on anything that is not a well-formed
/// class file (malformed artifacts are fatal for relocation, not skipped).
pub(crate) fn rewrite(bytes: &[u8], rules: &[CanonicalRule]) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(bytes);
    if cursor.u32()? != MAGIC {
        bail!("not a class file (bad magic)");
    }
    let minor = cursor.u16()?;
    let major = cursor.u16()?;
    let count = cursor.u16()?;

    // Pool indices are 1-based; slot 0 is unused.
    let mut entries: Vec<PoolEntry> = Vec::with_capacity(count as usize);
    entries.push(PoolEntry::Reserved);
    // UTF-8 slots referenced as internal names (class/package) vs. descriptors.
    let mut name_slots: HashSet<u16> = HashSet::new();
    let mut descriptor_slots: HashSet<u16> = HashSet::new();

    let mut index: u16 = 1;
    while index < count {
        let tag = cursor.u8()?;
        match tag {
            TAG_UTF8 => {
                let len = cursor.u16()? as usize;
                entries.push(PoolEntry::Utf8(cursor.take(len)?.to_vec()));
            }
            TAG_INTEGER | TAG_FLOAT => {
                entries.push(PoolEntry::Other(tag, cursor.take(4)?.to_vec()));
            }
            TAG_LONG | TAG_DOUBLE => {
                entries.push(PoolEntry::Other(tag, cursor.take(8)?.to_vec()));
                entries.push(PoolEntry::Reserved);
                index += 1;
            }
            TAG_CLASS | TAG_PACKAGE => {
                let payload = cursor.take(2)?;
                name_slots.insert(u16::from_be_bytes([payload[0], payload[1]]));
                entries.push(PoolEntry::Other(tag, payload.to_vec()));
            }
            TAG_STRING | TAG_MODULE => {
                entries.push(PoolEntry::Other(tag, cursor.take(2)?.to_vec()));
            }
            TAG_FIELDREF | TAG_METHODREF | TAG_INTERFACE_METHODREF | TAG_DYNAMIC
            | TAG_INVOKE_DYNAMIC => {
                entries.push(PoolEntry::Other(tag, cursor.take(4)?.to_vec()));
            }
            TAG_NAME_AND_TYPE => {
                let payload = cursor.take(4)?;
                descriptor_slots.insert(u16::from_be_bytes([payload[2], payload[3]]));
                entries.push(PoolEntry::Other(tag, payload.to_vec()));
            }
            TAG_METHOD_HANDLE => {
                entries.push(PoolEntry::Other(tag, cursor.take(3)?.to_vec()));
            }
            TAG_METHOD_TYPE => {
                let payload = cursor.take(2)?;
                descriptor_slots.insert(u16::from_be_bytes([payload[0], payload[1]]));
                entries.push(PoolEntry::Other(tag, payload.to_vec()));
            }
            other => bail!("unsupported constant pool tag {}", other),
        }
        index += 1;
    }

    for slot in &name_slots {
        rewrite_slot(&mut entries, *slot, rules, rewrite_internal_name)?;
    }
    for slot in &descriptor_slots {
        rewrite_slot(&mut entries, *slot, rules, rewrite_descriptor)?;
    }

    let remainder = cursor.rest();
    let mut out = Vec::with_capacity(bytes.len());
    out.extend_from_slice(&MAGIC.to_be_bytes());
    out.extend_from_slice(&minor.to_be_bytes());
    out.extend_from_slice(&major.to_be_bytes());
    out.extend_from_slice(&count.to_be_bytes());
    for entry in entries.iter().skip(1) {
        match entry {
            PoolEntry::Utf8(text) => {
                out.push(TAG_UTF8);
                out.extend_from_slice(&(text.len() as u16).to_be_bytes());
                out.extend_from_slice(text);
            }
            PoolEntry::Other(tag, payload) => {
                out.push(*tag);
                out.extend_from_slice(payload);
            }
            PoolEntry::Reserved => {}
        }
    }
    out.extend_from_slice(remainder);
    Ok(out)
}

fn rewrite_slot(
    entries: &mut [PoolEntry],
    slot: u16,
    rules: &[CanonicalRule],
    apply: fn(&str, &[CanonicalRule]) -> Option<String>,
) -> Result<()> {
    let Some(entry) = entries.get_mut(slot as usize) else {
        bail!("constant reference to out-of-range slot {}", slot);
    };
    if let PoolEntry::Utf8(text) = entry {
        // Non-UTF-8 (modified UTF-8 surrogates) names can't match an ASCII
        // rule prefix; leave them as-is.
        if let Ok(s) = std::str::from_utf8(text) {
            if let Some(rewritten) = apply(s, rules) {
                *text = rewritten.into_bytes();
            }
        }
    }
    Ok(())
}

/// Rewrites an internal name (`org/acme/Foo`); array classes carry
/// descriptors and are handled as such.
fn rewrite_internal_name(name: &str, rules: &[CanonicalRule]) -> Option<String> {
    if name.starts_with('[') {
        return rewrite_descriptor(name, rules);
    }
    for rule in rules {
        let from = format!("{}/", rule.from_internal());
        if let Some(rest) = name.strip_prefix(&from) {
            return Some(format!("{}/{}", rule.to_internal(), rest));
        }
    }
    None
}

/// Rewrites object-type references (`Lorg/acme/Foo;`) inside a descriptor.
fn rewrite_descriptor(descriptor: &str, rules: &[CanonicalRule]) -> Option<String> {
    let mut out = descriptor.to_string();
    let mut changed = false;
    for rule in rules {
        let from = format!("L{}/", rule.from_internal());
        if out.contains(&from) {
            let to = format!("L{}/", rule.to_internal());
            out = out.replace(&from, &to);
            changed = true;
        }
    }
    changed.then_some(out)
}
