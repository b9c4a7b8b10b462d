//! Shared fixtures for interceptor tests.
//!
//! Provides:
//! - Sample method signatures under the `ru` namespace
//! - An interceptor wired to a shared in-memory sink
//! - A simple error type standing in for a thrown exception

#![allow(dead_code)]

use std::fmt;

use spanwrap::{Interceptor, InterceptorConfig, MemorySink, MethodSignature, Parameter};

pub static PROCESS: MethodSignature = MethodSignature::new("ru::billing", Some("InvoiceService"), "process")
    .with_params(&[Parameter::new("invoice_id", "u64")])
    .returning("String");

pub static RECALCULATE: MethodSignature = MethodSignature::function("ru::billing::tax", "recalculate")
    .with_params(&[Parameter::new("amount", "u64")])
    .returning("u64");

pub static GET_BALANCE: MethodSignature =
    MethodSignature::new("ru::billing", Some("InvoiceService"), "getBalance").returning("u64");

pub static SET_BALANCE: MethodSignature = MethodSignature::new("ru::billing", Some("InvoiceService"), "setBalance")
    .with_params(&[Parameter::new("balance", "u64")]);

pub static HASH_CODE: MethodSignature =
    MethodSignature::new("ru::billing", Some("InvoiceService"), "hashCode").returning("i32");

pub static TO_STRING: MethodSignature =
    MethodSignature::new("ru::billing", Some("InvoiceService"), "toString").returning("String");

pub static EQUALS: MethodSignature = MethodSignature::new("ru::billing", Some("InvoiceService"), "equals")
    .with_params(&[Parameter::new("other", "&Object")])
    .returning("bool");

pub static FOREIGN: MethodSignature =
    MethodSignature::new("vendor::billing", Some("InvoiceService"), "process").returning("String");

/// Error raised by a wrapped call in these tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IllegalState(pub String);

impl fmt::Display for IllegalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for IllegalState {}

/// Interceptor over a memory sink; the returned sink shares the interceptor's log.
pub fn memory_interceptor(skip_tracing: bool) -> (MemorySink, Interceptor<MemorySink>) {
    let sink = MemorySink::new();
    let config = InterceptorConfig {
        skip_tracing,
        ..InterceptorConfig::default()
    };
    (sink.clone(), Interceptor::new(sink, &config))
}
