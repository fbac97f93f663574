// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::sync::OnceLock;
use tagwire::{ByteBuffer, RegistryConfig, TypeRegistry};

#[derive(Debug, Default)]
struct Track {
    id: u32,
    label: String,
    points: Vec<Vec<f64>>,
    flags: Vec<bool>,
}

tagwire::wire_struct!(Track {
    id,
    label,
    points,
    flags
});

fn registry() -> &'static TypeRegistry {
    static REGISTRY: OnceLock<TypeRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let config = RegistryConfig::default()
            .with_builtin_leaves(true)
            .with_max_sequence_len(4096);
        let mut registry = TypeRegistry::with_config(config).expect("builtin registry");
        registry.register_type::<Track>().expect("register Track");
        registry
    })
}

fuzz_target!(|data: &[u8]| {
    let registry = registry();

    // Header dispatch over arbitrary input, read to exhaustion
    let mut buf = ByteBuffer::from_bytes(data);
    while buf.remaining() > 0 {
        if registry.deserialize(&mut buf).is_err() {
            break;
        }
    }

    // A peek must never move the cursor, success or failure
    let mut buf = ByteBuffer::from_bytes(data);
    let _ = registry.read::<Track>(&mut buf, true);
    assert_eq!(buf.position(), 0);
});
