//! Headers through generation to written bindings.

#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use rebind_diagnostic::{Diagnostic, ErrorCode};
use rebind_emit::{emit, render, EmitError, MemoryFs, OutputFs, PhysicalFs};
use rebind_gen::{generate, GeneratorConfig};
use rebind_header::HeaderParser;
use rebind_ir::model::GeneratedUnit;

const NNG_H: &str = r#"#define NNG_DECL extern
#define NNG_FLAG_NONBLOCK 2
#define NNG_OPT_SOCKNAME "socket-name"

typedef struct nng_socket_s {
    uint32_t id;
} nng_socket;

// Return a description of an error.
NNG_DECL const char *nng_strerror(int);
NNG_DECL int nng_dial(nng_socket, const char *, int);
"#;

const GOLDEN: &str = r#"// @generated by rebind from C headers. Do not edit by hand.

#![allow(
    non_camel_case_types,
    non_snake_case,
    non_upper_case_globals,
    dead_code,
    clippy::missing_safety_doc
)]

use core::ffi::c_char;
use core::ffi::c_int;
use rebind_rt::Utf8FromNative;
use rebind_rt::Utf8ToNative;

#[link(name = "nng")]
unsafe extern "C" {}

pub const NNG_FLAG_NONBLOCK: c_int = 2;

pub const NNG_OPT_SOCKNAME: &str = "socket-name";

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct nng_socket_s {
    pub id: u32,
}

pub type nng_socket = nng_socket_s;

unsafe extern "C" {
    #[link_name = "nng_strerror"]
    fn __rebind_raw_nng_strerror(arg0: c_int) -> *const c_char;
}

/// Return a description of an error.
pub unsafe fn nng_strerror(arg0: c_int) -> String {
    unsafe { Utf8FromNative::decode(__rebind_raw_nng_strerror(arg0)) }
}

unsafe extern "C" {
    #[link_name = "nng_dial"]
    fn __rebind_raw_nng_dial(arg0: nng_socket, arg1: *const c_char, arg2: c_int) -> c_int;
}

pub unsafe fn nng_dial(arg0: nng_socket, arg1: &str, arg2: c_int) -> c_int {
    let arg1 = Utf8ToNative::encode(arg1);
    unsafe { __rebind_raw_nng_dial(arg0, arg1.as_ptr(), arg2) }
}
"#;

fn generated_unit() -> (GeneratedUnit, Vec<Diagnostic>) {
    let config = GeneratorConfig::default();
    let mut parser = HeaderParser::new(&config.header_options().unwrap());
    parser.parse_source("nng.h", NNG_H);
    let headers = parser.finish();
    let generated = generate(
        &headers,
        &config.registry().unwrap(),
        &config.transform_options(),
        &config.value_equality_suffix,
    );
    assert!(!generated.has_errors(), "{:?}", generated.diagnostics);
    (generated.unit.unwrap(), generated.diagnostics)
}

#[test]
fn test_golden_render() {
    let (unit, _) = generated_unit();
    assert_eq!(render(&unit), GOLDEN);
}

#[test]
fn test_emit_to_memory() {
    let (unit, diagnostics) = generated_unit();
    let mut out = MemoryFs::new();
    let report = emit(unit, &diagnostics, &mut out).unwrap();

    assert_eq!(report.path, Path::new("nng_generated.rs"));
    assert_eq!(report.bytes, GOLDEN.len());
    assert_eq!(report.decls, 6);
    assert_eq!(out.get("nng_generated.rs"), Some(GOLDEN.as_bytes()));
}

#[test]
fn test_emit_to_disk_replaces_previous_output() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("nng_generated.rs");
    fs::write(&target, "// old bindings\n").unwrap();

    let (unit, diagnostics) = generated_unit();
    let mut out = PhysicalFs::new(dir.path());
    let report = emit(unit, &diagnostics, &mut out).unwrap();

    assert_eq!(report.path, target);
    assert_eq!(fs::read_to_string(&target).unwrap(), GOLDEN);
}

#[test]
fn test_errors_block_emission() {
    let (unit, mut diagnostics) = generated_unit();
    diagnostics.push(Diagnostic::warning(ErrorCode::W2001).with_message("shadowed"));
    diagnostics.push(Diagnostic::error(ErrorCode::E2001).with_message("bad retype"));

    let mut out = MemoryFs::new();
    let err = emit(unit, &diagnostics, &mut out).unwrap_err();
    assert!(matches!(
        err,
        EmitError::Diagnostics {
            errors: 1,
            warnings: 1
        }
    ));
    assert_eq!(out.files().count(), 0);
}

#[test]
fn test_warnings_do_not_block_emission() {
    let (unit, _) = generated_unit();
    let warnings = vec![Diagnostic::warning(ErrorCode::W1001).with_message("not comparable")];
    let mut out = MemoryFs::new();
    assert!(emit(unit, &warnings, &mut out).is_ok());
    assert_eq!(out.files().count(), 1);
}

#[test]
fn test_missing_destination() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("nng-sys/src");
    let (unit, diagnostics) = generated_unit();

    let mut out = PhysicalFs::new(&root);
    assert!(!out.exists());
    let err = emit(unit, &diagnostics, &mut out).unwrap_err();
    let EmitError::Io { path, source } = err else {
        panic!("expected an io error");
    };
    assert_eq!(path, root.join("nng_generated.rs"));
    assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
    assert!(!root.exists());
}
