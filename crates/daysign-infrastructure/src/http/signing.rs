//! DS anti-tamper signature required by the community API.
//!
//! The header value is `"{t},{r},{c}"` where `t` is a unix timestamp, `r`
//! a random lowercase-alphanumeric nonce and `c` the MD5 of
//! `salt=…&t=…&r=…`.

use md5::{Digest, Md5};
use rand::Rng;

const WEB_SALT: &str = "G1ktdwFL4IyGkHuuWSmz0wUe9Db9scyK";

pub fn generate_ds() -> String {
    let t = chrono::Utc::now().timestamp();
    let r = random_nonce(6);
    let c = md5_hex(&format!("salt={}&t={}&r={}", WEB_SALT, t, r));
    format!("{},{},{}", t, r, c)
}

pub fn device_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn random_nonce(len: usize) -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

fn md5_hex(input: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}
