use criterion::{black_box, criterion_group, criterion_main, Criterion};
use adscore_signature::cipher::{Aes256Cbc, Aes256Gcm, Secretbox};
use adscore_signature::codec::{Json, Msgpack, NativeSerialize};
use adscore_signature::hashers::hmac_sha256;
use adscore_signature::signature4::hash_base;
use adscore_signature::{
    compact_pem, create_ec_private_key, default_formatter, expand_pem, Formatter, Payload, Signature4, Signature5,
    StaticKey, StructCodec, SymmetricCipher, Value,
};

const KEY: [u8; 32] = [0x42; 32];
const UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

fn sample_payload() -> Payload {
    let mut p = Payload::new();
    p.insert("result".into(), Value::Int(0));
    p.insert("ipv4.ip".into(), Value::from("203.0.113.7"));
    p.insert("ipv4.v".into(), Value::Int(4));
    p.insert("b.ua".into(), Value::from(UA));
    p.insert("zone".into(), Value::Int(1234));
    p
}

fn v4_signature() -> String {
    let base = hash_base(9, 1_700_000_000, 1_700_000_001, "203.0.113.7", UA);
    let token = hmac_sha256(&KEY, base.as_bytes()).unwrap_or_default();
    let mut data = vec![4, 4, 0x00];
    data.extend_from_slice(&1_700_000_000u32.to_be_bytes());
    data.push(0x01);
    data.extend_from_slice(&1_700_000_001u32.to_be_bytes());
    data.extend_from_slice(&[0x81, 1, 0xC1, 0, 32]);
    data.extend_from_slice(&token);
    default_formatter().format(&data)
}

fn bench_v4_verify(c: &mut Criterion) {
    let text = v4_signature();
    // Worst case: last table entry, second candidate.
    c.bench_function("v4_create_from_request", |b| {
        b.iter(|| {
            let _ = Signature4::create_from_request(
                black_box(&text),
                black_box(["198.51.100.1", "203.0.113.7"]),
                black_box(UA),
                black_box(&KEY),
                None,
            );
        });
    });
}

fn bench_v5_verify(c: &mut Criterion) {
    let text = Signature5::new(Some(1234), sample_payload())
        .format(&Json, &Aes256Gcm, &KEY, &default_formatter())
        .unwrap_or_default();
    let resolver = StaticKey::new(KEY);
    c.bench_function("v5_create_from_request", |b| {
        b.iter(|| {
            let _ = Signature5::create_from_request(
                black_box(&text),
                black_box(["203.0.113.7"]),
                black_box(UA),
                &resolver,
                None,
            );
        });
    });
}

fn bench_ciphers(c: &mut Criterion) {
    let plaintext = vec![0x5a; 512];
    let secretbox = Secretbox::default();
    let engines: [(&str, &dyn SymmetricCipher); 3] = [
        ("aes256cbc_decrypt_512", &Aes256Cbc),
        ("aes256gcm_decrypt_512", &Aes256Gcm),
        ("secretbox_decrypt_512", &secretbox),
    ];
    for (name, engine) in engines {
        let frame = engine.encrypt(&plaintext, &KEY, &[]).unwrap_or_default();
        c.bench_function(name, |b| {
            b.iter(|| {
                let _ = engine.decrypt(black_box(&frame), black_box(&KEY), &[]);
            });
        });
    }
}

fn bench_codecs(c: &mut Criterion) {
    let value = Value::Map(sample_payload());
    let codecs: [(&str, &dyn StructCodec); 3] = [
        ("json_decode", &Json),
        ("msgpack_decode", &Msgpack),
        ("native_decode", &NativeSerialize),
    ];
    for (name, codec) in codecs {
        let frame = codec.encode(&value).unwrap_or_default();
        c.bench_function(name, |b| {
            b.iter(|| {
                let _ = codec.decode(black_box(&frame));
            });
        });
    }
}

fn bench_pem(c: &mut Criterion) {
    let compact = create_ec_private_key("prime256v1").map(|k| k.to_vec()).unwrap_or_default();
    let pem = expand_pem(&compact, 64).unwrap_or_default();
    c.bench_function("pem_expand", |b| {
        b.iter(|| {
            let _ = expand_pem(black_box(&compact), 64);
        });
    });
    c.bench_function("pem_compact", |b| {
        b.iter(|| {
            let _ = compact_pem(black_box(&pem));
        });
    });
}

criterion_group!(benches, bench_v4_verify, bench_v5_verify, bench_ciphers, bench_codecs, bench_pem);
criterion_main!(benches);
