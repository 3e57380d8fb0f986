//! Rebind runtime: string codecs for generated bindings.
//!
//! Generated shims call into this crate at the native boundary:
//!
//! - [`Utf8ToNative`] copies a host string into a null-terminated
//!   [`TransientBuffer`] owned by the caller for exactly one call. The buffer
//!   is released by `Drop`, so it goes away on normal return, early return
//!   and unwinding alike.
//! - [`Utf8FromNative`] reads a null-terminated string owned by native code
//!   into a host `String`. The native memory is never released.
//!
//! # Safety
//!
//! Decoding reads through a raw pointer handed back by native code; the
//! caller vouches for it.

#![allow(
    unsafe_code,
    reason = "decoding reads a null-terminated string through a native pointer"
)]

use std::cell::Cell;
use std::ffi::{c_char, CStr};

thread_local! {
    static ALLOCATED: Cell<u64> = const { Cell::new(0) };
    static RELEASED: Cell<u64> = const { Cell::new(0) };
}

/// Transient buffer bookkeeping for the current thread.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct TransientStats {
    pub allocated: u64,
    pub released: u64,
}

impl TransientStats {
    /// Buffers allocated on this thread and not yet released.
    pub fn outstanding(self) -> u64 {
        self.allocated.saturating_sub(self.released)
    }
}

/// Counters for buffers created and dropped on the calling thread.
pub fn transient_stats() -> TransientStats {
    TransientStats {
        allocated: ALLOCATED.with(Cell::get),
        released: RELEASED.with(Cell::get),
    }
}

fn bump(counter: &'static std::thread::LocalKey<Cell<u64>>) {
    counter.with(|c| c.set(c.get().saturating_add(1)));
}

/// A null-terminated copy of a host string, valid until dropped.
#[derive(Debug)]
pub struct TransientBuffer {
    /// Content bytes followed by one `0`.
    bytes: Box<[u8]>,
}

impl TransientBuffer {
    /// Pointer to the first byte; valid while `self` is alive.
    pub fn as_ptr(&self) -> *const c_char {
        self.bytes.as_ptr().cast()
    }

    /// Length without the terminator.
    pub fn len(&self) -> usize {
        self.bytes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.bytes
    }
}

impl Drop for TransientBuffer {
    fn drop(&mut self) {
        bump(&RELEASED);
    }
}

/// Host string to native: caller-owned transient buffer.
#[derive(Copy, Clone, Debug)]
pub struct Utf8ToNative;

impl Utf8ToNative {
    /// Copy `s` into a fresh null-terminated buffer.
    ///
    /// Interior NUL bytes are copied as-is; native code sees the prefix
    /// before the first one.
    pub fn encode(s: &str) -> TransientBuffer {
        let mut bytes = Vec::with_capacity(s.len() + 1);
        bytes.extend_from_slice(s.as_bytes());
        bytes.push(0);
        bump(&ALLOCATED);
        TransientBuffer {
            bytes: bytes.into_boxed_slice(),
        }
    }

    /// Run `f` with a native view of `s`; the buffer is released when `f`
    /// returns or unwinds.
    pub fn with_native<R>(s: &str, f: impl FnOnce(*const c_char) -> R) -> R {
        let buffer = Self::encode(s);
        f(buffer.as_ptr())
    }
}

/// Native string to host: callee-owned memory, read but never released.
#[derive(Copy, Clone, Debug)]
pub struct Utf8FromNative;

impl Utf8FromNative {
    /// Decode a null-terminated string. Invalid UTF-8 is replaced with
    /// U+FFFD; a null pointer decodes to an empty string.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or point to a readable, null-terminated byte
    /// sequence that stays valid for the duration of the call.
    pub unsafe fn decode(ptr: *const c_char) -> String {
        if ptr.is_null() {
            return String::new();
        }
        // SAFETY: non-null, and the caller guarantees termination and validity.
        let text = unsafe { CStr::from_ptr(ptr) };
        text.to_string_lossy().into_owned()
    }
}
